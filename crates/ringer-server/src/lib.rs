pub mod bootstrap;
pub mod shutdown;
pub mod telemetry;

pub use bootstrap::{build_services, connect_database, issue_token, Services};
pub use shutdown::{shutdown_signal, ShutdownSignal};
pub use telemetry::init_tracing;
