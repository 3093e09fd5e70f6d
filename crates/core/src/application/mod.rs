// Application Layer - Dispatch use cases and the services they share

pub mod dispatcher;
pub mod host;
pub mod interceptors;
pub mod notification;
pub mod observers;
pub mod registry;
pub mod serialization;
pub mod sessions;
pub mod shutdown;
pub mod wiring;

// Re-exports
pub use dispatcher::Dispatcher;
pub use host::{ComponentHost, ComponentHostBuilder};
pub use interceptors::{CallInterceptorCollection, InterceptorBuilder};
pub use notification::NotificationService;
pub use observers::CallObservers;
pub use registry::ComponentRegistry;
pub use serialization::{JsonSerializationHandler, SerializationHandling};
pub use sessions::{SessionManager, SessionSweeper};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
