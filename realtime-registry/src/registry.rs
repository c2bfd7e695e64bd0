use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use common_metrics::{gauge, inc};
use tracing::instrument;

use crate::{
    channel::{ChannelHandle, ChannelKey},
    config::RegistryConfig,
    errors::{BoxError, RegistryError},
    metrics_consts::{
        CHANNELS_CREATED_COUNTER, CHANNELS_RELEASED_COUNTER, CHANNELS_REUSED_COUNTER,
        CHANNEL_CONTENTION_COUNTER, CHANNEL_FACTORY_ERRORS_COUNTER,
        CHANNEL_TEARDOWN_ERRORS_COUNTER, LIVE_CHANNELS_GAUGE, PENDING_EXPIRED_COUNTER,
    },
};

#[derive(Debug, Clone, Copy)]
struct PendingEntry {
    generation: u64,
    started_at: Instant,
}

struct RegistryState<H> {
    live: HashMap<ChannelKey, Arc<H>>,
    pending: HashMap<ChannelKey, PendingEntry>,
    next_generation: u64,
}

impl<H> RegistryState<H> {
    /// Only the creator that set a marker may clear it. A marker that expired and was
    /// re-claimed belongs to the newer creator.
    fn clear_pending(&mut self, key: &ChannelKey, generation: u64) {
        if self
            .pending
            .get(key)
            .is_some_and(|entry| entry.generation == generation)
        {
            self.pending.remove(key);
        }
    }

    fn report_live(&self) {
        gauge(LIVE_CHANNELS_GAUGE, &[], self.live.len() as f64);
    }
}

enum Claim<H> {
    Live(Arc<H>),
    Contended,
    Creating(u64),
}

/// Outcome of `release_all`. Teardown failures are collected rather than returned early,
/// so every channel gets its teardown call.
#[derive(Debug, Default)]
pub struct ReleaseSummary {
    pub released: usize,
    pub failed: Vec<(ChannelKey, RegistryError)>,
}

impl ReleaseSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Deduplicates realtime subscriptions by key.
///
/// The registry owns the bookkeeping, the caller owns the channel lifecycle:
/// - `get_or_create` calls `factory` at most once per key until that key is released.
///   While a creation is in flight, other callers for the same key receive a
///   `ChannelHandle::Placeholder` instead of opening a duplicate subscription.
/// - The internal lock is never held while `factory` or `teardown` runs, so callbacks may
///   call back into the registry. A `factory` asking for its own key gets a placeholder.
/// - A pending marker older than the grace period no longer blocks creation. This covers
///   callers that never finish, e.g. a task cancelled mid-creation.
pub struct SubscriptionRegistry<H> {
    state: Mutex<RegistryState<H>>,
    pending_grace_period: Duration,
}

impl<H> SubscriptionRegistry<H> {
    pub fn new(pending_grace_period: Duration) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                live: HashMap::new(),
                pending: HashMap::new(),
                next_generation: 0,
            }),
            pending_grace_period,
        }
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(config.pending_grace_period())
    }

    pub fn pending_grace_period(&self) -> Duration {
        self.pending_grace_period
    }

    /// Returns the live channel for `key`, creating it with `factory` if there is none.
    ///
    /// If `factory` fails or panics, the pending marker is cleared and a later call retries.
    /// If another creator stored a channel for the same key while `factory` ran (only possible
    /// after its marker expired), the stored channel wins. The new one comes back untracked in
    /// `ChannelHandle::Superseded` for the caller to tear down.
    #[instrument(skip_all, fields(key))]
    pub fn get_or_create<F, E>(
        &self,
        key: impl Into<ChannelKey>,
        factory: F,
    ) -> Result<ChannelHandle<H>, RegistryError>
    where
        F: FnOnce() -> Result<H, E>,
        E: Into<BoxError>,
    {
        let key = key.into();
        tracing::Span::current().record("key", key.as_str());

        let generation = match self.claim(&key) {
            Claim::Live(handle) => {
                inc(CHANNELS_REUSED_COUNTER, &[], 1);
                return Ok(ChannelHandle::Live(handle));
            }
            Claim::Contended => {
                tracing::warn!("channel creation already in progress, returning placeholder");
                inc(CHANNEL_CONTENTION_COUNTER, &[], 1);
                return Ok(ChannelHandle::Placeholder(key));
            }
            Claim::Creating(generation) => generation,
        };

        let mut guard = PendingGuard {
            registry: self,
            key: key.clone(),
            generation,
            armed: true,
        };

        let created = match factory() {
            Ok(channel) => channel,
            Err(e) => {
                drop(guard);
                let source: BoxError = e.into();
                tracing::warn!(error = %source, "channel factory failed");
                inc(CHANNEL_FACTORY_ERRORS_COUNTER, &[], 1);
                return Err(RegistryError::FactoryFailed { key, source });
            }
        };

        let mut state = self.lock_state();
        state.clear_pending(&key, generation);
        guard.armed = false;

        if let Some(existing) = state.live.get(&key) {
            tracing::warn!("channel was created concurrently, returning the new one for teardown");
            inc(CHANNEL_CONTENTION_COUNTER, &[], 1);
            return Ok(ChannelHandle::Superseded {
                existing: existing.clone(),
                discarded: created,
            });
        }

        let created = Arc::new(created);
        state.live.insert(key, created.clone());
        state.report_live();
        drop(state);

        tracing::debug!("channel created");
        inc(CHANNELS_CREATED_COUNTER, &[], 1);
        Ok(ChannelHandle::Live(created))
    }

    /// Removes `key` and runs `teardown` on its channel.
    ///
    /// Returns `Ok(false)` when nothing was registered under `key`. The entry is removed
    /// before `teardown` runs, so it is gone even when `teardown` fails.
    #[instrument(skip_all, fields(key))]
    pub fn release<F, E>(
        &self,
        key: impl Into<ChannelKey>,
        teardown: F,
    ) -> Result<bool, RegistryError>
    where
        F: FnOnce(&H) -> Result<(), E>,
        E: Into<BoxError>,
    {
        let key = key.into();
        tracing::Span::current().record("key", key.as_str());

        let removed = {
            let mut state = self.lock_state();
            state.pending.remove(&key);
            let removed = state.live.remove(&key);
            state.report_live();
            removed
        };

        let Some(channel) = removed else {
            tracing::debug!("release of unknown channel ignored");
            return Ok(false);
        };

        inc(CHANNELS_RELEASED_COUNTER, &[], 1);
        teardown(&channel).map_err(|e| {
            let source: BoxError = e.into();
            tracing::warn!(error = %source, "channel teardown failed");
            inc(CHANNEL_TEARDOWN_ERRORS_COUNTER, &[], 1);
            RegistryError::TeardownFailed { key, source }
        })?;

        Ok(true)
    }

    /// Empties the registry, running `teardown` on every live channel in key order.
    /// A failing or panicking teardown is logged and recorded; the rest still run.
    pub fn release_all<F, E>(&self, mut teardown: F) -> ReleaseSummary
    where
        F: FnMut(&ChannelKey, &H) -> Result<(), E>,
        E: Into<BoxError>,
    {
        let mut drained: Vec<(ChannelKey, Arc<H>)> = {
            let mut state = self.lock_state();
            state.pending.clear();
            let drained = state.live.drain().collect();
            state.report_live();
            drained
        };
        drained.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut summary = ReleaseSummary::default();
        for (key, channel) in drained {
            inc(CHANNELS_RELEASED_COUNTER, &[], 1);

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| teardown(&key, &channel)));
            let source: BoxError = match outcome {
                Ok(Ok(())) => {
                    summary.released += 1;
                    continue;
                }
                Ok(Err(e)) => e.into(),
                Err(payload) => format!("teardown panicked: {}", panic_message(&*payload)).into(),
            };

            tracing::warn!(key = %key, error = %source, "channel teardown failed during release_all");
            inc(CHANNEL_TEARDOWN_ERRORS_COUNTER, &[], 1);
            summary
                .failed
                .push((key.clone(), RegistryError::TeardownFailed { key, source }));
        }

        tracing::info!(
            released = summary.released,
            failed = summary.failed.len(),
            "released all channels"
        );
        summary
    }

    /// Number of live channels. In-flight creations are not counted.
    pub fn count(&self) -> usize {
        self.lock_state().live.len()
    }

    /// Keys of the live channels, sorted.
    pub fn keys(&self) -> Vec<ChannelKey> {
        let mut keys: Vec<ChannelKey> = self.lock_state().live.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock_state().live.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.lock_state().pending.len()
    }

    /// Drops pending markers older than the grace period. Returns how many were dropped.
    pub fn sweep_expired_pending(&self) -> usize {
        let grace = self.pending_grace_period;
        let mut state = self.lock_state();
        let before = state.pending.len();
        state
            .pending
            .retain(|_, entry| entry.started_at.elapsed() < grace);
        let expired = before - state.pending.len();
        drop(state);

        if expired > 0 {
            tracing::warn!(expired, "dropped expired pending channel markers");
            inc(PENDING_EXPIRED_COUNTER, &[], expired as u64);
        }
        expired
    }

    fn claim(&self, key: &ChannelKey) -> Claim<H> {
        let mut state = self.lock_state();

        if let Some(channel) = state.live.get(key) {
            return Claim::Live(channel.clone());
        }

        if let Some(entry) = state.pending.get(key) {
            if entry.started_at.elapsed() < self.pending_grace_period {
                return Claim::Contended;
            }
            tracing::warn!(
                key = %key,
                pending_ms = entry.started_at.elapsed().as_millis() as u64,
                "pending channel marker expired, creating anew"
            );
            inc(PENDING_EXPIRED_COUNTER, &[], 1);
        }

        let generation = state.next_generation;
        state.next_generation += 1;
        state.pending.insert(
            key.clone(),
            PendingEntry {
                generation,
                started_at: Instant::now(),
            },
        );
        Claim::Creating(generation)
    }

    fn lock_state(&self) -> MutexGuard<'_, RegistryState<H>> {
        // Callbacks never run under the lock, so a poisoned state is still consistent
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

// Clears the pending marker when creation bails out, including by panic.
struct PendingGuard<'a, H> {
    registry: &'a SubscriptionRegistry<H>,
    key: ChannelKey,
    generation: u64,
    armed: bool,
}

impl<H> Drop for PendingGuard<'_, H> {
    fn drop(&mut self) {
        if self.armed {
            self.registry
                .lock_state()
                .clear_pending(&self.key, self.generation);
        }
    }
}
