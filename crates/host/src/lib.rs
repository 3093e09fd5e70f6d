// Remora Host - Composition root library (config, telemetry, runtime wiring)

pub mod bootstrap;
pub mod config;
pub mod telemetry;

pub use bootstrap::HostRuntime;
pub use config::{HostConfig, LogFormat};
