pub mod app;
pub mod loader;

pub use app::{AppConfig, AuthConfig, CallsConfig, DatabaseConfig, LoggingConfig, ServerConfig};
pub use loader::{ConfigLoader, DEFAULT_CONFIG_PATH};
