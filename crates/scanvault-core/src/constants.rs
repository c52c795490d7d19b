//! Shared constants.

use std::time::Duration;

/// Maximum tag length in bytes; longer tags are truncated, never rejected.
pub const TAG_MAX_LENGTH: usize = 128;

/// Default number of analyses allowed in flight at once.
pub const DEFAULT_ANALYSIS_CAPACITY: usize = 128;

/// Default number of scan attempts per document.
pub const DEFAULT_ANALYSIS_ATTEMPTS: u32 = 3;

/// Base delay of the linear back-off between scan attempts.
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(30);

/// Default upload size limit in bytes (1 MiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 1 << 20;

/// Name of the fingerprint algorithm, reported to clients.
pub const FINGERPRINT_ALGORITHM: &str = "SHA-256";

/// Deadline for a single backend reachability check.
pub const BACKEND_PING_TIMEOUT: Duration = Duration::from_secs(5);

/// The EICAR antivirus test signature. Every scanner reports it as infected.
pub const EICAR: &[u8] = br"X5O!P%@AP[4\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";
