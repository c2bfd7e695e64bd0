use strum::EnumString;

/// Why a flag resolved the way it did, in precedence order of the tier that decided it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString)]
pub enum FeatureFlagMatchReason {
    #[strum(serialize = "missing_identity")]
    MissingIdentity,
    #[strum(serialize = "user_override")]
    UserOverride,
    #[strum(serialize = "unknown_flag")]
    UnknownFlag,
    #[strum(serialize = "target_user")]
    TargetUser,
    #[strum(serialize = "full_rollout")]
    FullRollout,
    #[strum(serialize = "zero_rollout")]
    ZeroRollout,
    #[strum(serialize = "flag_disabled")]
    FlagDisabled,
    #[strum(serialize = "in_rollout_bucket")]
    InRolloutBucket,
    #[strum(serialize = "out_of_rollout_bucket")]
    OutOfRolloutBucket,
}

impl FeatureFlagMatchReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureFlagMatchReason::MissingIdentity => "missing_identity",
            FeatureFlagMatchReason::UserOverride => "user_override",
            FeatureFlagMatchReason::UnknownFlag => "unknown_flag",
            FeatureFlagMatchReason::TargetUser => "target_user",
            FeatureFlagMatchReason::FullRollout => "full_rollout",
            FeatureFlagMatchReason::ZeroRollout => "zero_rollout",
            FeatureFlagMatchReason::FlagDisabled => "flag_disabled",
            FeatureFlagMatchReason::InRolloutBucket => "in_rollout_bucket",
            FeatureFlagMatchReason::OutOfRolloutBucket => "out_of_rollout_bucket",
        }
    }
}

impl std::fmt::Display for FeatureFlagMatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
