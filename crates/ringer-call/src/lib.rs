pub mod clock;
pub mod db;
pub mod delivery;
pub mod error;
pub mod lock;
pub mod model;
pub mod notifier;
pub mod repository;
pub mod service;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use db::{call, room, setup_schema};
pub use delivery::{
    CallInvitation, CallPushSummary, ChannelTally, PushDelivery, TargetedPushResult, UserPush,
};
pub use error::{CallError, Result};
pub use lock::{KeyGuard, KeyedLock};
pub use model::{Call, CallState, NewCall, Transition};
pub use notifier::{CallEndNotifier, PushEndNotifier};
pub use repository::CallRepository;
pub use service::{CallService, InviteOutcome, InviteRequest, DEFAULT_DEDUP_WINDOW};
pub use store::CallStore;
