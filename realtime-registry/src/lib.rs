//! Keeps at most one live realtime subscription per logical key.
//!
//! UI code asks the registry for the channel behind a key before attaching listeners and
//! releases it on unmount. Opening and closing the underlying subscription stays with the
//! caller, through the `factory` and `teardown` callbacks.

pub mod channel;
pub mod config;
pub mod errors;
pub mod metrics_consts;
pub mod registry;
pub mod sweeper;

pub use channel::{ChannelHandle, ChannelKey};
pub use config::RegistryConfig;
pub use errors::{BoxError, RegistryError};
pub use registry::{ReleaseSummary, SubscriptionRegistry};
pub use sweeper::{spawn_pending_sweeper, MIN_SWEEP_INTERVAL};
