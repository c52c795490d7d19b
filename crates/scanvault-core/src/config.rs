//! Configuration module
//!
//! Settings are read from the process environment (after loading `.env`)
//! into [`ServiceConfig`]; [`Config`] wraps it and exposes getters.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::backend_types::{BlobBackend, MetadataBackend, ScannerBackend};
use crate::constants::{
    DEFAULT_ANALYSIS_ATTEMPTS, DEFAULT_ANALYSIS_CAPACITY, DEFAULT_MAX_UPLOAD_SIZE,
    DEFAULT_RETRY_BASE_DELAY,
};

const SERVER_PORT: u16 = 8080;
const UPLOAD_TIMEOUT_SECS: u64 = 10;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const CLAMAV_PORT: u16 = 3310;
const CLAMAV_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub host: String,
    pub server_port: u16,
    pub version: String,
    pub information: String,
    pub max_upload_size: u64,
    pub upload_timeout: Duration,
    pub environment: String,
    // Analysis
    pub analysis_capacity: usize,
    pub analysis_attempts: u32,
    pub analysis_retry_delay: Duration,
    // Blob storage
    pub blob_backend: BlobBackend,
    pub local_storage_path: String,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // MinIO and other S3-compatible providers
    pub s3_allow_http: bool,
    // Metadata
    pub metadata_backend: MetadataBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Scanner
    pub scanner_backend: ScannerBackend,
    pub clamav_host: String,
    pub clamav_port: u16,
    pub clamav_timeout: Duration,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ServiceConfig>);

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ServiceConfig {
    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let version = non_empty(lookup("SCANVAULT_VERSION"))
            .ok_or_else(|| anyhow::anyhow!("SCANVAULT_VERSION must be set"))?;

        let max_upload_size = match parse_or(lookup("SCANVAULT_MAX_UPLOAD_SIZE"), 0u64) {
            0 => DEFAULT_MAX_UPLOAD_SIZE,
            n => n,
        };

        let blob_backend = match non_empty(lookup("STORAGE_BACKEND")) {
            Some(v) => v.parse::<BlobBackend>()?,
            None => BlobBackend::Local,
        };
        let metadata_backend = match non_empty(lookup("METADATA_BACKEND")) {
            Some(v) => v.parse::<MetadataBackend>()?,
            None => MetadataBackend::Postgres,
        };
        let scanner_backend = match non_empty(lookup("SCANNER_BACKEND")) {
            Some(v) => v.parse::<ScannerBackend>()?,
            None => ScannerBackend::ClamAv,
        };

        Ok(ServiceConfig {
            host: non_empty(lookup("SCANVAULT_HOST")).unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: parse_or(lookup("SCANVAULT_PORT"), SERVER_PORT),
            version,
            information: non_empty(lookup("SCANVAULT_INFORMATION"))
                .unwrap_or_else(|| "scanvault".to_string()),
            max_upload_size,
            upload_timeout: Duration::from_secs(parse_or(
                lookup("SCANVAULT_UPLOAD_TIMEOUT_SECS"),
                UPLOAD_TIMEOUT_SECS,
            )),
            environment: non_empty(lookup("ENVIRONMENT"))
                .or_else(|| non_empty(lookup("APP_ENV")))
                .unwrap_or_else(|| "development".to_string()),
            analysis_capacity: parse_or(lookup("ANALYSIS_CAPACITY"), DEFAULT_ANALYSIS_CAPACITY),
            analysis_attempts: parse_or(lookup("ANALYSIS_ATTEMPTS"), DEFAULT_ANALYSIS_ATTEMPTS),
            analysis_retry_delay: Duration::from_secs(parse_or(
                lookup("ANALYSIS_RETRY_DELAY_SECS"),
                DEFAULT_RETRY_BASE_DELAY.as_secs(),
            )),
            blob_backend,
            local_storage_path: non_empty(lookup("LOCAL_STORAGE_PATH"))
                .unwrap_or_else(|| "./data/blobs".to_string()),
            s3_bucket: non_empty(lookup("S3_BUCKET")),
            s3_region: non_empty(lookup("S3_REGION")).or_else(|| non_empty(lookup("AWS_REGION"))),
            s3_endpoint: non_empty(lookup("S3_ENDPOINT")),
            s3_allow_http: parse_or(lookup("S3_ALLOW_HTTP"), false),
            metadata_backend,
            database_url: non_empty(lookup("DATABASE_URL")),
            db_max_connections: parse_or(lookup("DB_MAX_CONNECTIONS"), MAX_CONNECTIONS),
            db_timeout_seconds: parse_or(lookup("DB_TIMEOUT_SECONDS"), CONNECTION_TIMEOUT_SECS),
            scanner_backend,
            clamav_host: non_empty(lookup("CLAMAV_HOST")).unwrap_or_else(|| "localhost".to_string()),
            clamav_port: parse_or(lookup("CLAMAV_PORT"), CLAMAV_PORT),
            clamav_timeout: Duration::from_secs(parse_or(
                lookup("CLAMAV_TIMEOUT_SECS"),
                CLAMAV_TIMEOUT_SECS,
            )),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.upload_timeout.is_zero() {
            return Err(anyhow::anyhow!(
                "SCANVAULT_UPLOAD_TIMEOUT_SECS must be greater than 0"
            ));
        }
        if self.clamav_timeout.is_zero() {
            return Err(anyhow::anyhow!("CLAMAV_TIMEOUT_SECS must be greater than 0"));
        }
        if self.analysis_capacity == 0 {
            return Err(anyhow::anyhow!("ANALYSIS_CAPACITY must be greater than 0"));
        }
        if self.analysis_attempts == 0 {
            return Err(anyhow::anyhow!("ANALYSIS_ATTEMPTS must be greater than 0"));
        }

        if self.metadata_backend == MetadataBackend::Postgres {
            match &self.database_url {
                None => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be set when using the postgres metadata backend"
                    ))
                }
                Some(url)
                    if !url.starts_with("postgres://") && !url.starts_with("postgresql://") =>
                {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string"
                    ))
                }
                Some(_) => {}
            }
        }

        if self.blob_backend == BlobBackend::S3 && self.s3_bucket.is_none() {
            return Err(anyhow::anyhow!(
                "S3_BUCKET must be set when using S3 storage backend"
            ));
        }

        Ok(())
    }
}

impl Config {
    fn inner(&self) -> &ServiceConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = ServiceConfig::from_lookup(|key| env::var(key).ok())?;
        Ok(Config(Box::new(config)))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Config(Box::new(ServiceConfig::from_lookup(lookup)?)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn host(&self) -> &str {
        &self.inner().host
    }

    pub fn server_port(&self) -> u16 {
        self.inner().server_port
    }

    pub fn version(&self) -> &str {
        &self.inner().version
    }

    pub fn information(&self) -> &str {
        &self.inner().information
    }

    pub fn max_upload_size(&self) -> u64 {
        self.inner().max_upload_size
    }

    pub fn upload_timeout(&self) -> Duration {
        self.inner().upload_timeout
    }

    pub fn environment(&self) -> &str {
        &self.inner().environment
    }

    pub fn analysis_capacity(&self) -> usize {
        self.inner().analysis_capacity
    }

    pub fn analysis_attempts(&self) -> u32 {
        self.inner().analysis_attempts
    }

    pub fn analysis_retry_delay(&self) -> Duration {
        self.inner().analysis_retry_delay
    }

    pub fn blob_backend(&self) -> BlobBackend {
        self.inner().blob_backend
    }

    pub fn local_storage_path(&self) -> &str {
        &self.inner().local_storage_path
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.inner().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn s3_allow_http(&self) -> bool {
        self.inner().s3_allow_http
    }

    pub fn metadata_backend(&self) -> MetadataBackend {
        self.inner().metadata_backend
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().db_timeout_seconds
    }

    pub fn scanner_backend(&self) -> ScannerBackend {
        self.inner().scanner_backend
    }

    pub fn clamav_host(&self) -> &str {
        &self.inner().clamav_host
    }

    pub fn clamav_port(&self) -> u16 {
        self.inner().clamav_port
    }

    pub fn clamav_timeout(&self) -> Duration {
        self.inner().clamav_timeout
    }
}
