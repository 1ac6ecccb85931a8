//! Persistence backend selection

use std::sync::Arc;

use tamarind_persistence::{ExternalDbPersistService, MemoryPersistService, PersistenceService};

use crate::model::config::Configuration;

/// Open the backend named by `db.url`, or the in-memory one when unset
///
/// The relational schema is created on first start.
pub async fn init_persistence(
    configuration: &Configuration,
) -> anyhow::Result<Arc<dyn PersistenceService>> {
    let Some(url) = configuration.database_url() else {
        tracing::warn!("db.url not set; using in-memory storage, data is lost on restart");
        return Ok(Arc::new(MemoryPersistService::new()));
    };

    let db = configuration.database_connection(url).await?;
    let service = ExternalDbPersistService::new(db);
    service.init_schema().await?;

    Ok(Arc::new(service))
}
