use async_trait::async_trait;

use crate::{
    errors::FlagError,
    flags::flag_models::{FeatureFlagList, FlagDefinition, UserOverride},
};

/// Where flag definitions and per-user overrides come from. Fetching is the caller's
/// concern; the matcher only ever sees already-loaded data.
#[async_trait]
pub trait FlagSource: Send + Sync + 'static {
    async fn fetch_flag_definitions(&self) -> Result<Vec<FlagDefinition>, FlagError>;

    /// Overrides for `user_id`, restricted to `flag_keys`.
    async fn fetch_user_overrides(
        &self,
        user_id: &str,
        flag_keys: &[String],
    ) -> Result<Vec<UserOverride>, FlagError>;
}

/// A fixed set of definitions and overrides, e.g. loaded once from a JSON snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticFlagSource {
    flags: FeatureFlagList,
    overrides: Vec<UserOverride>,
}

impl StaticFlagSource {
    pub fn new(flags: FeatureFlagList, overrides: Vec<UserOverride>) -> Self {
        Self { flags, overrides }
    }

    pub fn from_json(flags_json: &str, overrides_json: &str) -> Result<Self, FlagError> {
        let flags = FeatureFlagList::from_json(flags_json)?;
        let overrides: Vec<UserOverride> = serde_json::from_str(overrides_json)?;
        Ok(Self::new(flags, overrides))
    }
}

#[async_trait]
impl FlagSource for StaticFlagSource {
    async fn fetch_flag_definitions(&self) -> Result<Vec<FlagDefinition>, FlagError> {
        Ok(self.flags.flags.clone())
    }

    async fn fetch_user_overrides(
        &self,
        user_id: &str,
        flag_keys: &[String],
    ) -> Result<Vec<UserOverride>, FlagError> {
        Ok(self
            .overrides
            .iter()
            .filter(|o| o.user_id == user_id && flag_keys.contains(&o.flag_key))
            .cloned()
            .collect())
    }
}
