use std::str;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use clamav_client::{clean, Tcp};
use scanvault_core::{ByteReader, Verdict};
use tokio::io::AsyncReadExt;

use super::{ScanError, Scanner};

/// ClamAV daemon scanner speaking the clamd protocol over TCP.
#[derive(Clone, Debug)]
pub struct ClamAvScanner {
    host: String,
    port: u16,
    timeout: Duration,
}

impl ClamAvScanner {
    /// Create a new ClamAvScanner.
    ///
    /// # Arguments
    /// * `host` - ClamAV daemon hostname
    /// * `port` - ClamAV daemon port (typically 3310)
    /// * `timeout` - Deadline for one scan; must be non-zero
    pub fn new(host: String, port: u16, timeout: Duration) -> anyhow::Result<Self> {
        if timeout.is_zero() {
            return Err(anyhow::anyhow!(
                "ClamAV timeout must be a strictly positive duration"
            ));
        }
        Ok(Self {
            host,
            port,
            timeout,
        })
    }

    fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Extract the signature name from a `stream: Eicar-Signature FOUND` reply.
fn signature_name(response: &[u8]) -> String {
    let response_str = match str::from_utf8(response) {
        Ok(s) => s.trim().trim_end_matches('\0'),
        Err(_) => return "unknown".to_string(),
    };
    if !response_str.contains("FOUND") {
        return "unknown".to_string();
    }
    response_str
        .split(':')
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or("unknown")
        .to_string()
}

#[async_trait]
impl Scanner for ClamAvScanner {
    /// Buffers the stream, then runs the blocking client inside spawn_blocking.
    async fn analyze(&self, mut data: ByteReader) -> Result<Verdict, ScanError> {
        let start = Instant::now();
        let mut buffer = Vec::new();
        data.read_to_end(&mut buffer).await?;

        tracing::debug!(
            host = %self.host,
            port = %self.port,
            size_bytes = buffer.len(),
            "Starting ClamAV scan"
        );

        let address = self.address();
        let response = tokio::task::spawn_blocking(move || {
            let connection = Tcp {
                host_address: address.as_str(),
            };
            clamav_client::scan_buffer(buffer.as_slice(), connection, None)
        })
        .await
        .map_err(|e| ScanError::Failed(format!("ClamAV scan task join error: {}", e)))?
        .map_err(|e| ScanError::Unavailable(format!("ClamAV scan error: {}", e)))?;

        match clean(&response) {
            Ok(true) => {
                tracing::info!(
                    duration_ms = start.elapsed().as_millis(),
                    "File scan completed: clean"
                );
                Ok(Verdict::Clean)
            }
            Ok(false) => {
                tracing::warn!(
                    duration_ms = start.elapsed().as_millis(),
                    virus = %signature_name(&response),
                    "File scan detected virus"
                );
                Ok(Verdict::Infected)
            }
            Err(e) => Err(ScanError::Failed(format!(
                "Failed to parse ClamAV response: {}",
                e
            ))),
        }
    }

    async fn ping(&self) -> Result<(), ScanError> {
        let address = self.address();
        let response = tokio::task::spawn_blocking(move || {
            let connection = Tcp {
                host_address: address.as_str(),
            };
            clamav_client::ping(connection)
        })
        .await
        .map_err(|e| ScanError::Failed(format!("ClamAV ping task join error: {}", e)))?
        .map_err(|e| ScanError::Unavailable(e.to_string()))?;

        if response == clamav_client::PONG {
            Ok(())
        } else {
            Err(ScanError::Unavailable(format!(
                "unexpected ClamAV ping reply: {}",
                String::from_utf8_lossy(&response).trim()
            )))
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn name(&self) -> &'static str {
        "clamav"
    }
}
