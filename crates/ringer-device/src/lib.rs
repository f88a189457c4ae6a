pub mod db;
pub mod directory;
pub mod error;
pub mod model;
pub mod registry;

pub use db::{device, setup_schema, user};
pub use directory::DeviceDirectory;
pub use error::{DeviceError, Result};
pub use model::{summarize_token, Device, DeviceRegistration, PushEnvironment, TokenKind, User};
pub use registry::DeviceRegistry;
