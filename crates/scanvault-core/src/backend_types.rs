use std::fmt::{Display, Formatter, Result as FmtResult};
use std::pin::Pin;
use std::str::FromStr;

use tokio::io::AsyncRead;

/// Owned byte stream handed between the blob store and the scanner.
pub type ByteReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Blob store backend types
///
/// Defined in core because configuration selects one and the storage crate
/// reports which one it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    Local,
    S3,
    Memory,
}

impl FromStr for BlobBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(BlobBackend::Local),
            "s3" | "minio" => Ok(BlobBackend::S3),
            "memory" => Ok(BlobBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for BlobBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            BlobBackend::Local => write!(f, "local"),
            BlobBackend::S3 => write!(f, "s3"),
            BlobBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Metadata store backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataBackend {
    Postgres,
    Memory,
}

impl FromStr for MetadataBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(MetadataBackend::Postgres),
            "memory" => Ok(MetadataBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid metadata backend: {}", s)),
        }
    }
}

impl Display for MetadataBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MetadataBackend::Postgres => write!(f, "postgres"),
            MetadataBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Scanner backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerBackend {
    ClamAv,
    Mock,
}

impl FromStr for ScannerBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clamav" => Ok(ScannerBackend::ClamAv),
            "mock" => Ok(ScannerBackend::Mock),
            _ => Err(anyhow::anyhow!("Invalid scanner backend: {}", s)),
        }
    }
}

impl Display for ScannerBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ScannerBackend::ClamAv => write!(f, "clamav"),
            ScannerBackend::Mock => write!(f, "mock"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing_is_case_insensitive() {
        assert_eq!("LOCAL".parse::<BlobBackend>().unwrap(), BlobBackend::Local);
        assert_eq!("minio".parse::<BlobBackend>().unwrap(), BlobBackend::S3);
        assert_eq!(
            "PostgreSQL".parse::<MetadataBackend>().unwrap(),
            MetadataBackend::Postgres
        );
        assert_eq!(
            "ClamAV".parse::<ScannerBackend>().unwrap(),
            ScannerBackend::ClamAv
        );
        assert!("nfs".parse::<BlobBackend>().is_err());
    }

    #[test]
    fn test_backend_display_round_trips() {
        for backend in [BlobBackend::Local, BlobBackend::S3, BlobBackend::Memory] {
            assert_eq!(backend.to_string().parse::<BlobBackend>().unwrap(), backend);
        }
    }
}
