pub mod apns;
pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod pool;

pub use apns::ApnsConnector;
pub use channel::{select_channel, ChannelPlan, PushTarget, WakeChannel};
pub use config::{EnvMode, GatewayCredentials, PushConfig};
pub use dispatcher::{PushDispatcher, PushJob, PushOutcome, MAX_BATCH_SIZE};
pub use envelope::{Envelope, InterruptionLevel, PushPayload};
pub use error::{PushError, Result};
pub use gateway::{BatchResponse, FailureReason, GatewayConnection, GatewayConnector, TokenFailure};
pub use pool::GatewayPool;
