use thiserror::Error;

use crate::channel::ChannelKey;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures of the caller-supplied callbacks. The registry's own bookkeeping cannot fail;
/// by the time one of these is returned it is already consistent again.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("failed to create channel {key}: {source}")]
    FactoryFailed {
        key: ChannelKey,
        #[source]
        source: BoxError,
    },
    #[error("failed to tear down channel {key}: {source}")]
    TeardownFailed {
        key: ChannelKey,
        #[source]
        source: BoxError,
    },
}

impl RegistryError {
    pub fn key(&self) -> &ChannelKey {
        match self {
            RegistryError::FactoryFailed { key, .. } | RegistryError::TeardownFailed { key, .. } => {
                key
            }
        }
    }
}
