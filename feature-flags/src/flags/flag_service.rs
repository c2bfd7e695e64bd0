use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use common_metrics::{inc, timing_guard};
use serde::Serialize;
use tokio::time::timeout;
use tracing::instrument;

use crate::{
    config::Config,
    errors::FlagError,
    flags::{
        flag_matching::FeatureFlagMatcher,
        flag_models::{EvaluationContext, EvaluationResult},
        flag_source::FlagSource,
        flags_cache::FlagDefinitionCache,
    },
    metrics_consts::{FLAG_EVALUATION_TIME, FLAG_SOURCE_ERRORS_COUNTER},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagsResponse {
    pub flags: EvaluationResult,
    pub errors_while_computing_flags: bool,
}

/// Loads flag data from a `FlagSource` and evaluates it for one identity.
///
/// Never fails: if the source errors or times out, every requested flag is off and
/// `errors_while_computing_flags` is set, so UI code degrades to the non-flagged path.
pub struct FlagService<S: FlagSource> {
    source: Arc<S>,
    definitions: FlagDefinitionCache<S>,
    matcher: FeatureFlagMatcher,
    source_timeout: Duration,
}

impl<S: FlagSource> FlagService<S> {
    pub fn new(source: S, config: &Config) -> Self {
        let source = Arc::new(source);
        Self {
            definitions: FlagDefinitionCache::new(source.clone(), config.cache_ttl_seconds),
            source,
            matcher: FeatureFlagMatcher::new(config.bucketing_hash),
            source_timeout: Duration::from_millis(config.source_timeout_ms),
        }
    }

    pub fn matcher(&self) -> &FeatureFlagMatcher {
        &self.matcher
    }

    #[instrument(skip_all, fields(user_id = ?context.identity(), flags = context.flag_keys.len()))]
    pub async fn evaluate(&self, context: &EvaluationContext) -> FlagsResponse {
        let _timing = timing_guard(FLAG_EVALUATION_TIME, &[]);

        // Anonymous requests resolve to all-off without touching the source
        let Some(user_id) = context.identity() else {
            return FlagsResponse {
                flags: self.matcher.evaluate(context, &[], &[]),
                errors_while_computing_flags: false,
            };
        };

        let definitions = match self
            .with_timeout("fetch_definitions", self.definitions.get_flags())
            .await
        {
            Ok(definitions) => definitions,
            Err(e) => return fail_closed(context, &e),
        };

        let overrides = match self
            .with_timeout(
                "fetch_overrides",
                self.source.fetch_user_overrides(user_id, &context.flag_keys),
            )
            .await
        {
            Ok(overrides) => overrides,
            Err(e) => return fail_closed(context, &e),
        };

        FlagsResponse {
            flags: self
                .matcher
                .evaluate(context, &definitions.flags, &overrides),
            errors_while_computing_flags: false,
        }
    }

    /// Drops cached definitions; the next evaluation re-reads the source.
    pub async fn invalidate_definitions(&self) {
        tracing::info!("invalidating cached flag definitions");
        self.definitions.invalidate().await;
    }

    async fn with_timeout<T, F>(&self, operation: &'static str, fut: F) -> Result<T, FlagError>
    where
        F: Future<Output = Result<T, FlagError>>,
    {
        let result = match timeout(self.source_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.source_timeout.as_millis() as u64,
                    "flag source timed out"
                );
                Err(FlagError::TimeoutError)
            }
        };

        if let Err(e) = &result {
            inc(
                FLAG_SOURCE_ERRORS_COUNTER,
                &[
                    ("operation".to_string(), operation.to_string()),
                    ("error".to_string(), e.error_code().to_string()),
                ],
                1,
            );
        }
        result
    }
}

fn fail_closed(context: &EvaluationContext, error: &FlagError) -> FlagsResponse {
    tracing::warn!(error = %error, "failed to load flag data, disabling requested flags");
    FlagsResponse {
        flags: context
            .flag_keys
            .iter()
            .map(|key| (key.clone(), false))
            .collect(),
        errors_while_computing_flags: true,
    }
}
