// Remora Core - Dispatch Logic, Domain & Ports
// NO transport, storage or crypto dependencies (hexagonal layout)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{ComponentHost, ComponentHostBuilder, Dispatcher};
pub use error::{DispatchError, InvocationFault, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
