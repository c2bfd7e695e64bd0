pub mod config;
pub mod errors;
pub mod flags;
pub mod metrics_consts;

// Shared with the integration tests under tests/, so it can't be cfg(test)
pub mod test_utils;

pub use flags::flag_matching::{FeatureFlagMatch, FeatureFlagMatcher};
pub use flags::flag_matching_utils::BucketingHash;
pub use flags::flag_models::{
    EvaluationContext, EvaluationResult, FeatureFlagList, FlagDefinition, UserOverride,
};
pub use flags::flag_service::{FlagService, FlagsResponse};
pub use flags::flag_source::{FlagSource, StaticFlagSource};
