use std::time::Duration;

/// Room for multipart boundaries and the tag field on top of the file itself.
pub const MULTIPART_OVERHEAD: usize = 2 << 10;

/// How long running analyses may take to finish once the server stops accepting requests.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

pub const OPENAPI_JSON_PATH: &str = "/api/openapi.json";

/// Requests served at once before new ones wait for a slot.
pub const HTTP_CONCURRENCY_LIMIT: usize = 10_000;
