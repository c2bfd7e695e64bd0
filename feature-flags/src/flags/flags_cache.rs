use std::sync::Arc;
use std::time::Duration;

use common_metrics::inc;
use moka::future::Cache;

use crate::{
    errors::FlagError,
    flags::{flag_models::FeatureFlagList, flag_source::FlagSource},
    metrics_consts::{
        FLAG_DEFINITION_CACHE_HIT_COUNTER, FLAG_DEFINITION_CACHE_MISS_COUNTER,
        FLAG_INVALID_DEFINITIONS_COUNTER,
    },
};

/// In-memory cache of the full flag definition list.
///
/// - **TTL**: entries expire after the configured time, so edits in the store show up eventually.
/// - **Explicit invalidation**: `invalidate` drops the list right away, for callers that know
///   the store changed (e.g. after an admin edit).
/// - **Coalescing**: concurrent misses share a single fetch through moka's `try_get_with`.
///   Failed fetches are not cached.
pub struct FlagDefinitionCache<S: FlagSource> {
    source: Arc<S>,
    cache: Cache<(), Arc<FeatureFlagList>>,
}

impl<S: FlagSource> FlagDefinitionCache<S> {
    pub fn new(source: Arc<S>, ttl_seconds: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(ttl_seconds))
            .max_capacity(1)
            .build();

        Self { source, cache }
    }

    pub async fn get_flags(&self) -> Result<Arc<FeatureFlagList>, FlagError> {
        if let Some(cached) = self.cache.get(&()).await {
            inc(FLAG_DEFINITION_CACHE_HIT_COUNTER, &[], 1);
            return Ok(cached);
        }

        inc(FLAG_DEFINITION_CACHE_MISS_COUNTER, &[], 1);
        let source = self.source.clone();

        self.cache
            .try_get_with((), async move {
                let definitions = source.fetch_flag_definitions().await.inspect_err(|e| {
                    tracing::warn!(error = %e, "failed to fetch flag definitions");
                })?;

                // A bad row only takes down its own flag, which then reads as unknown (off).
                let flags = definitions
                    .into_iter()
                    .filter(|flag| match flag.validate() {
                        Ok(()) => true,
                        Err(e) => {
                            inc(FLAG_INVALID_DEFINITIONS_COUNTER, &[], 1);
                            tracing::warn!(flag_key = %flag.key, error = %e, "skipping invalid flag definition");
                            false
                        }
                    })
                    .collect();

                Ok::<_, FlagError>(Arc::new(FeatureFlagList::new(flags)))
            })
            .await
            .map_err(|arc_err| (*arc_err).clone())
    }

    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
    }
}
