use std::collections::HashMap;

use common_metrics::inc;
use tracing::instrument;

use crate::{
    flags::{
        flag_match_reason::FeatureFlagMatchReason,
        flag_matching_utils::BucketingHash,
        flag_models::{
            EvaluationContext, EvaluationResult, FlagDefinition, UserOverride,
            MAX_ROLLOUT_PERCENTAGE,
        },
    },
    metrics_consts::FLAG_EVALUATION_COUNTER,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlagMatch {
    pub matches: bool,
    pub reason: FeatureFlagMatchReason,
}

impl FeatureFlagMatch {
    fn new(matches: bool, reason: FeatureFlagMatchReason) -> Self {
        Self { matches, reason }
    }
}

/// Decides flags for one identity at a time. Stateless apart from the hash choice, so a
/// single matcher can be shared freely.
///
/// Precedence, highest first:
///   1. a per-user override, returned verbatim
///   2. no definition: off
///   3. the user is on the target list: on
///   4. percentage bucketing, gated by the global switch
///
/// Anonymous callers get every flag off, since bucketing needs a stable identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureFlagMatcher {
    hash: BucketingHash,
}

impl FeatureFlagMatcher {
    pub fn new(hash: BucketingHash) -> Self {
        FeatureFlagMatcher { hash }
    }

    pub fn bucketing_hash(&self) -> BucketingHash {
        self.hash
    }

    pub fn evaluate(
        &self,
        context: &EvaluationContext,
        definitions: &[FlagDefinition],
        overrides: &[UserOverride],
    ) -> EvaluationResult {
        self.evaluate_with_reasons(context, definitions, overrides)
            .into_iter()
            .map(|(key, flag_match)| (key, flag_match.matches))
            .collect()
    }

    #[instrument(skip_all, fields(user_id = ?context.identity(), flags = context.flag_keys.len()))]
    pub fn evaluate_with_reasons(
        &self,
        context: &EvaluationContext,
        definitions: &[FlagDefinition],
        overrides: &[UserOverride],
    ) -> HashMap<String, FeatureFlagMatch> {
        let Some(user_id) = context.identity() else {
            return context
                .flag_keys
                .iter()
                .map(|key| {
                    let flag_match =
                        FeatureFlagMatch::new(false, FeatureFlagMatchReason::MissingIdentity);
                    record_decision(key, &flag_match);
                    (key.clone(), flag_match)
                })
                .collect();
        };

        // Later rows win on duplicate keys, both for definitions and overrides.
        let definitions_by_key: HashMap<&str, &FlagDefinition> = definitions
            .iter()
            .map(|flag| (flag.key.as_str(), flag))
            .collect();
        let overrides_by_key: HashMap<&str, bool> = overrides
            .iter()
            .filter(|user_override| user_override.user_id == user_id)
            .map(|user_override| (user_override.flag_key.as_str(), user_override.is_enabled))
            .collect();

        context
            .flag_keys
            .iter()
            .map(|key| {
                let flag_match = self.get_match(
                    user_id,
                    definitions_by_key.get(key.as_str()).copied(),
                    overrides_by_key.get(key.as_str()).copied(),
                );
                record_decision(key, &flag_match);
                (key.clone(), flag_match)
            })
            .collect()
    }

    /// Resolves a single flag for an identity that is already known to be non-blank.
    pub fn get_match(
        &self,
        user_id: &str,
        feature_flag: Option<&FlagDefinition>,
        user_override: Option<bool>,
    ) -> FeatureFlagMatch {
        if let Some(is_enabled) = user_override {
            return FeatureFlagMatch::new(is_enabled, FeatureFlagMatchReason::UserOverride);
        }

        let Some(feature_flag) = feature_flag else {
            return FeatureFlagMatch::new(false, FeatureFlagMatchReason::UnknownFlag);
        };

        if feature_flag.targets(user_id) {
            return FeatureFlagMatch::new(true, FeatureFlagMatchReason::TargetUser);
        }

        // Definitions are validated on load; anything that slipped through is clamped to 0..=100
        let rollout_percentage = feature_flag.effective_rollout_percentage();

        if rollout_percentage == MAX_ROLLOUT_PERCENTAGE {
            return if feature_flag.is_enabled_globally {
                FeatureFlagMatch::new(true, FeatureFlagMatchReason::FullRollout)
            } else {
                FeatureFlagMatch::new(false, FeatureFlagMatchReason::FlagDisabled)
            };
        }

        if rollout_percentage == 0 {
            return FeatureFlagMatch::new(false, FeatureFlagMatchReason::ZeroRollout);
        }

        if !feature_flag.is_enabled_globally {
            return FeatureFlagMatch::new(false, FeatureFlagMatchReason::FlagDisabled);
        }

        if self.hash.bucket(user_id) < rollout_percentage {
            FeatureFlagMatch::new(true, FeatureFlagMatchReason::InRolloutBucket)
        } else {
            FeatureFlagMatch::new(false, FeatureFlagMatchReason::OutOfRolloutBucket)
        }
    }
}

fn record_decision(key: &str, flag_match: &FeatureFlagMatch) {
    tracing::debug!(
        flag_key = key,
        matches = flag_match.matches,
        reason = %flag_match.reason,
        "evaluated feature flag"
    );
    inc(
        FLAG_EVALUATION_COUNTER,
        &[("reason".to_string(), flag_match.reason.to_string())],
        1,
    );
}
