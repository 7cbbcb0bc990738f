use std::sync::LazyLock;

/// The trailer key carrying the JSON encoded statistics of a query.
pub const QUERY_STATISTICS_TRAILER: &str = "Influx-Query-Statistics";

/// The statistics metadata key recording how many bytes a response body took.
pub const RESPONSE_BYTES_METADATA_KEY: &str = "influxdb/response-bytes";

/// Report a failed unauthenticated lookup as unauthorized instead of not found,
/// so that callers without access cannot probe for the existence of a resource.
pub static CONCEAL_UNAUTHORIZED_LOOKUPS: LazyLock<bool> =
	lazy_env_parse!("FLUXGATE_CONCEAL_UNAUTHORIZED_LOOKUPS", bool, false);

/// The maximum number of script characters included in a query log record.
pub static QUERY_LOG_SCRIPT_LIMIT: LazyLock<usize> =
	lazy_env_parse!("FLUXGATE_QUERY_LOG_SCRIPT_LIMIT", usize, 1024);
