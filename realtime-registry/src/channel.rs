use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Identifies one logical subscription, e.g. `messages:conversation_id=eq.42`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelKey(String);

impl ChannelKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The `table:filter` composite used for row-level subscriptions.
    pub fn scoped(table: &str, filter: &str) -> Self {
        Self(format!("{table}:{filter}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChannelKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ChannelKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChannelKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ChannelKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&ChannelKey> for ChannelKey {
    fn from(key: &ChannelKey) -> Self {
        key.clone()
    }
}

/// What `get_or_create` hands back.
///
/// `Live` shares the registry's own reference: every caller asking for the same key before it
/// is released gets a pointer-equal `Arc`. `Placeholder` is returned while another caller is
/// still creating the channel; it carries nothing to listen on and should simply be dropped.
///
/// `Superseded` is returned to a creator that finished after another caller had already stored
/// a channel for the key. `existing` is the registered channel to listen on; `discarded` is the
/// one this caller's factory opened, which the registry never tracked. The caller must tear
/// `discarded` down itself.
#[derive(Debug)]
pub enum ChannelHandle<H> {
    Live(Arc<H>),
    Placeholder(ChannelKey),
    Superseded { existing: Arc<H>, discarded: H },
}

impl<H> ChannelHandle<H> {
    pub fn is_live(&self) -> bool {
        matches!(self, ChannelHandle::Live(_))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, ChannelHandle::Placeholder(_))
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, ChannelHandle::Superseded { .. })
    }

    /// The registered channel, if there is one to listen on.
    pub fn live(&self) -> Option<&Arc<H>> {
        match self {
            ChannelHandle::Live(handle) => Some(handle),
            ChannelHandle::Superseded { existing, .. } => Some(existing),
            ChannelHandle::Placeholder(_) => None,
        }
    }

    /// Only for `Live`. A superseded handle is not converted, so its discarded channel can't
    /// be dropped here without a teardown.
    pub fn into_live(self) -> Option<Arc<H>> {
        match self {
            ChannelHandle::Live(handle) => Some(handle),
            ChannelHandle::Placeholder(_) | ChannelHandle::Superseded { .. } => None,
        }
    }
}
