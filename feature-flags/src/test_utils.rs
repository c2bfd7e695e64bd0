use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    errors::FlagError,
    flags::{
        flag_models::{FlagDefinition, UserOverride},
        flag_source::FlagSource,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFlagSourceCall {
    FetchDefinitions,
    FetchOverrides {
        user_id: String,
        flag_keys: Vec<String>,
    },
}

struct MockFlagSourceState {
    definitions_ret: Result<Vec<FlagDefinition>, FlagError>,
    overrides_ret: Result<Vec<UserOverride>, FlagError>,
    calls: Vec<MockFlagSourceCall>,
}

/// A `FlagSource` returning canned data and recording every call. Clones share state, so a
/// test can keep one handle while the code under test owns another.
#[derive(Clone)]
pub struct MockFlagSource {
    state: Arc<Mutex<MockFlagSourceState>>,
    delay: Option<Duration>,
}

impl Default for MockFlagSource {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockFlagSourceState {
                definitions_ret: Ok(Vec::new()),
                overrides_ret: Ok(Vec::new()),
                calls: Vec::new(),
            })),
            delay: None,
        }
    }
}

impl MockFlagSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_state(&self) -> MutexGuard<'_, MockFlagSourceState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn definitions_ret(self, ret: Result<Vec<FlagDefinition>, FlagError>) -> Self {
        self.set_definitions(ret);
        self
    }

    pub fn overrides_ret(self, ret: Result<Vec<UserOverride>, FlagError>) -> Self {
        self.set_overrides(ret);
        self
    }

    /// Every fetch sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_definitions(&self, ret: Result<Vec<FlagDefinition>, FlagError>) {
        self.lock_state().definitions_ret = ret;
    }

    pub fn set_overrides(&self, ret: Result<Vec<UserOverride>, FlagError>) {
        self.lock_state().overrides_ret = ret;
    }

    pub fn get_calls(&self) -> Vec<MockFlagSourceCall> {
        self.lock_state().calls.clone()
    }

    pub fn definition_fetches(&self) -> usize {
        self.get_calls()
            .iter()
            .filter(|call| matches!(call, MockFlagSourceCall::FetchDefinitions))
            .count()
    }

    pub fn override_fetches(&self) -> usize {
        self.get_calls()
            .iter()
            .filter(|call| matches!(call, MockFlagSourceCall::FetchOverrides { .. }))
            .count()
    }

    async fn maybe_delay(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl FlagSource for MockFlagSource {
    async fn fetch_flag_definitions(&self) -> Result<Vec<FlagDefinition>, FlagError> {
        self.lock_state().calls.push(MockFlagSourceCall::FetchDefinitions);
        self.maybe_delay().await;
        self.lock_state().definitions_ret.clone()
    }

    async fn fetch_user_overrides(
        &self,
        user_id: &str,
        flag_keys: &[String],
    ) -> Result<Vec<UserOverride>, FlagError> {
        self.lock_state().calls.push(MockFlagSourceCall::FetchOverrides {
            user_id: user_id.to_string(),
            flag_keys: flag_keys.to_vec(),
        });
        self.maybe_delay().await;
        self.lock_state().overrides_ret.clone()
    }
}

pub fn create_test_flag(
    key: &str,
    is_enabled_globally: bool,
    rollout_percentage: u8,
    target_user_ids: &[&str],
) -> FlagDefinition {
    FlagDefinition::new(key, is_enabled_globally, rollout_percentage)
        .with_target_users(target_user_ids.iter().copied())
}
