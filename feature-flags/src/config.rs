use envconfig::Envconfig;
use once_cell::sync::Lazy;

use crate::flags::flag_matching_utils::BucketingHash;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(from = "FLAGS_BUCKETING_HASH", default = "sha1")]
    pub bucketing_hash: BucketingHash,

    #[envconfig(from = "FLAGS_CACHE_TTL_SECONDS", default = "300")]
    pub cache_ttl_seconds: u64,

    #[envconfig(from = "FLAGS_SOURCE_TIMEOUT_MS", default = "1000")]
    pub source_timeout_ms: u64,
}

impl Config {
    pub fn default_test_config() -> Self {
        Self {
            bucketing_hash: BucketingHash::Sha1,
            cache_ttl_seconds: 300,
            source_timeout_ms: 1000,
        }
    }
}

pub static DEFAULT_TEST_CONFIG: Lazy<Config> = Lazy::new(Config::default_test_config);
