use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use scanvault_core::constants::EICAR;
use scanvault_core::{ByteReader, Verdict};
use tokio::io::AsyncReadExt;

use super::{ScanError, Scanner};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// In-process scanner that flags the EICAR test signature.
///
/// Everything else is clean. Tests can take it offline, script failures,
/// add latency, and read back how often and how concurrently it was called.
#[derive(Debug)]
pub struct MockScanner {
    online: AtomicBool,
    timeout: Duration,
    latency_ms: AtomicU64,
    always_fail: AtomicBool,
    failures_left: AtomicUsize,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Default for MockScanner {
    fn default() -> Self {
        Self {
            online: AtomicBool::new(true),
            timeout: DEFAULT_TIMEOUT,
            latency_ms: AtomicU64::new(0),
            always_fail: AtomicBool::new(false),
            failures_left: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }
}

/// Decrements the in-flight counter when a scan ends, cancelled or not.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        self.set_latency(latency);
        self
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Fail the next `count` scans, then go back to normal.
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn set_always_fail(&self, always_fail: bool) {
        self.always_fail.store(always_fail, Ordering::SeqCst);
    }

    /// Number of `analyze` calls so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of scans observed running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn scripted_failure(&self) -> bool {
        self.always_fail.load(Ordering::SeqCst)
            || self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
    }
}

fn contains_eicar(data: &[u8]) -> bool {
    data.windows(EICAR.len()).any(|window| window == EICAR)
}

#[async_trait]
impl Scanner for MockScanner {
    async fn analyze(&self, mut data: ByteReader) -> Result<Verdict, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.online.load(Ordering::SeqCst) {
            return Err(ScanError::Unavailable("mock scanner is offline".to_string()));
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let mut buffer = Vec::new();
        data.read_to_end(&mut buffer).await?;

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.scripted_failure() {
            return Err(ScanError::Failed("scripted mock failure".to_string()));
        }

        if contains_eicar(&buffer) {
            Ok(Verdict::Infected)
        } else {
            Ok(Verdict::Clean)
        }
    }

    async fn ping(&self) -> Result<(), ScanError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ScanError::Unavailable("mock scanner is offline".to_string()))
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;

    fn reader(data: &[u8]) -> ByteReader {
        Box::pin(Cursor::new(data.to_vec()))
    }

    #[tokio::test]
    async fn test_detects_eicar_anywhere() {
        let scanner = MockScanner::new();
        let mut payload = b"header bytes ".to_vec();
        payload.extend_from_slice(EICAR);
        payload.extend_from_slice(b" trailer");

        assert_eq!(
            scanner.analyze(reader(&payload)).await.unwrap(),
            Verdict::Infected
        );
        assert_eq!(
            scanner.analyze(reader(b"hello world")).await.unwrap(),
            Verdict::Clean
        );
        assert_eq!(scanner.calls(), 2);
    }

    #[tokio::test]
    async fn test_fail_next_then_recover() {
        let scanner = MockScanner::new();
        scanner.fail_next(1);

        assert!(matches!(
            scanner.analyze(reader(b"data")).await,
            Err(ScanError::Failed(_))
        ));
        assert_eq!(
            scanner.analyze(reader(b"data")).await.unwrap(),
            Verdict::Clean
        );
    }

    #[tokio::test]
    async fn test_offline_scanner() {
        let scanner = MockScanner::new();
        scanner.set_online(false);

        assert!(matches!(
            scanner.ping().await,
            Err(ScanError::Unavailable(_))
        ));
        assert!(matches!(
            scanner.analyze(reader(b"data")).await,
            Err(ScanError::Unavailable(_))
        ));
        assert_eq!(scanner.calls(), 1);
    }

    #[tokio::test]
    async fn test_peak_concurrency_is_tracked() {
        let scanner = Arc::new(MockScanner::new().with_latency(Duration::from_millis(50)));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let scanner = Arc::clone(&scanner);
                tokio::spawn(async move { scanner.analyze(reader(b"data")).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(scanner.peak_concurrency() >= 2);
        assert!(scanner.peak_concurrency() <= 4);
        assert_eq!(scanner.calls(), 4);
    }
}
