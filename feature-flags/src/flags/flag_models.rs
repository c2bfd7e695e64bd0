use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::errors::FlagError;

pub const MAX_ROLLOUT_PERCENTAGE: u8 = 100;

fn default_rollout_percentage() -> i64 {
    i64::from(MAX_ROLLOUT_PERCENTAGE)
}

/// One globally configured flag, as stored in the `feature_flags` table.
///
/// The aliases accept the column names used by the admin tooling that writes these rows.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FlagDefinition {
    #[serde(alias = "flag_key")]
    pub key: String,
    #[serde(alias = "is_enabled", default)]
    pub is_enabled_globally: bool,
    // Wider than the valid range so a bad row fails validation by name instead of failing serde
    #[serde(default = "default_rollout_percentage")]
    pub rollout_percentage: i64,
    #[serde(alias = "target_users", default)]
    pub target_user_ids: HashSet<String>,
    #[serde(alias = "flag_name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FlagDefinition {
    pub fn new(key: impl Into<String>, is_enabled_globally: bool, rollout_percentage: u8) -> Self {
        Self {
            key: key.into(),
            is_enabled_globally,
            rollout_percentage: i64::from(rollout_percentage),
            target_user_ids: HashSet::new(),
            name: None,
            description: None,
        }
    }

    pub fn with_target_users<I, S>(mut self, user_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_user_ids = user_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), FlagError> {
        if !(0..=i64::from(MAX_ROLLOUT_PERCENTAGE)).contains(&self.rollout_percentage) {
            return Err(FlagError::InvalidRolloutPercentage {
                key: self.key.clone(),
                value: self.rollout_percentage,
            });
        }
        Ok(())
    }

    pub fn targets(&self, user_id: &str) -> bool {
        self.target_user_ids.contains(user_id)
    }

    /// The percentage used for bucketing: negative values read as 0, values above 100 as 100.
    pub fn effective_rollout_percentage(&self) -> u8 {
        let clamped = self
            .rollout_percentage
            .clamp(0, i64::from(MAX_ROLLOUT_PERCENTAGE));
        u8::try_from(clamped).unwrap_or(MAX_ROLLOUT_PERCENTAGE)
    }
}

/// An admin-forced decision for a single user and flag.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserOverride {
    pub user_id: String,
    #[serde(alias = "feature_flag_key")]
    pub flag_key: String,
    #[serde(alias = "enabled")]
    pub is_enabled: bool,
}

impl UserOverride {
    pub fn new(user_id: impl Into<String>, flag_key: impl Into<String>, is_enabled: bool) -> Self {
        Self {
            user_id: user_id.into(),
            flag_key: flag_key.into(),
            is_enabled,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FeatureFlagList {
    pub flags: Vec<FlagDefinition>,
}

impl FeatureFlagList {
    pub fn new(flags: Vec<FlagDefinition>) -> Self {
        Self { flags }
    }

    /// Parses a JSON array of flag rows, rejecting the whole payload if any row is invalid.
    pub fn from_json(serialized_flags: &str) -> Result<FeatureFlagList, FlagError> {
        let flags: Vec<FlagDefinition> = serde_json::from_str(serialized_flags).map_err(|e| {
            tracing::error!("failed to parse data to flags list: {}", e);
            FlagError::DataParsingError
        })?;

        for flag in &flags {
            flag.validate()?;
        }

        Ok(FeatureFlagList { flags })
    }

    pub fn get(&self, key: &str) -> Option<&FlagDefinition> {
        self.flags.iter().find(|flag| flag.key == key)
    }
}

/// Input to a single evaluation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationContext {
    pub user_id: Option<String>,
    pub flag_keys: Vec<String>,
}

impl EvaluationContext {
    pub fn new<I, S>(user_id: Option<String>, flag_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_id,
            flag_keys: flag_keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn for_user<I, S>(user_id: impl Into<String>, flag_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Some(user_id.into()), flag_keys)
    }

    /// The identity usable for bucketing; blank identities count as anonymous.
    pub fn identity(&self) -> Option<&str> {
        self.user_id
            .as_deref()
            .filter(|user_id| !user_id.trim().is_empty())
    }
}

/// Flag key to decision, owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EvaluationResult(HashMap<String, bool>);

impl EvaluationResult {
    pub fn is_enabled(&self, key: &str) -> bool {
        self.0.get(key).copied().unwrap_or(false)
    }

    pub fn get(&self, key: &str) -> Option<bool> {
        self.0.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &bool)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> HashMap<String, bool> {
        self.0
    }
}

impl FromIterator<(String, bool)> for EvaluationResult {
    fn from_iter<T: IntoIterator<Item = (String, bool)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
