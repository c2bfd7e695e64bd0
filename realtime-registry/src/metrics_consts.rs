pub const CHANNELS_CREATED_COUNTER: &str = "realtime_channels_created_total";
pub const CHANNELS_REUSED_COUNTER: &str = "realtime_channels_reused_total";
pub const CHANNEL_CONTENTION_COUNTER: &str = "realtime_channel_contention_total";
pub const CHANNEL_FACTORY_ERRORS_COUNTER: &str = "realtime_channel_factory_errors_total";
pub const CHANNELS_RELEASED_COUNTER: &str = "realtime_channels_released_total";
pub const CHANNEL_TEARDOWN_ERRORS_COUNTER: &str = "realtime_channel_teardown_errors_total";
pub const PENDING_EXPIRED_COUNTER: &str = "realtime_pending_expired_total";
pub const LIVE_CHANNELS_GAUGE: &str = "realtime_live_channels";
