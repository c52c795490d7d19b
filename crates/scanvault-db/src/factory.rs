use std::sync::Arc;
use std::time::Duration;

use scanvault_core::{Config, MetadataBackend};

use crate::{connect_pool, MemoryMetadataStore, MetadataStore, PostgresMetadataStore};

/// Create a metadata store based on configuration
pub async fn create_metadata_store(config: &Config) -> anyhow::Result<Arc<dyn MetadataStore>> {
    match config.metadata_backend() {
        MetadataBackend::Postgres => {
            let url = config
                .database_url()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL not configured"))?;
            let pool = connect_pool(
                url,
                config.db_max_connections(),
                Duration::from_secs(config.db_timeout_seconds()),
            )
            .await?;
            Ok(Arc::new(PostgresMetadataStore::new(pool)))
        }
        MetadataBackend::Memory => {
            tracing::warn!("Using in-memory metadata store; documents are lost on restart");
            Ok(Arc::new(MemoryMetadataStore::new()))
        }
    }
}
