pub const FLAG_EVALUATION_COUNTER: &str = "flags_evaluations_total";
pub const FLAG_EVALUATION_TIME: &str = "flags_evaluation_time";
pub const FLAG_DEFINITION_CACHE_HIT_COUNTER: &str = "flags_definition_cache_hit_total";
pub const FLAG_DEFINITION_CACHE_MISS_COUNTER: &str = "flags_definition_cache_miss_total";
pub const FLAG_SOURCE_ERRORS_COUNTER: &str = "flags_source_errors_total";
pub const FLAG_INVALID_DEFINITIONS_COUNTER: &str = "flags_invalid_definitions_total";
