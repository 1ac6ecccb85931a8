//! Namespace service layer

use std::sync::Arc;

use tamarind_common::validate_name;
use tamarind_persistence::PersistenceService;

/// Namespace management on top of the persistence layer
pub struct NamespaceService {
    persistence: Arc<dyn PersistenceService>,
}

impl NamespaceService {
    pub fn new(persistence: Arc<dyn PersistenceService>) -> Self {
        Self { persistence }
    }

    pub async fn create(&self, name: &str) -> anyhow::Result<()> {
        validate_name("namespace", name)?;
        self.persistence.namespace_create(name).await?;
        tracing::info!("Created namespace '{}'", name);
        Ok(())
    }

    /// Delete an empty, non-default namespace
    pub async fn delete(&self, name: &str) -> anyhow::Result<()> {
        self.persistence.namespace_delete(name).await?;
        tracing::info!("Deleted namespace '{}'", name);
        Ok(())
    }

    pub async fn list(&self) -> anyhow::Result<Vec<String>> {
        self.persistence.namespace_find_all().await
    }

    pub async fn exists(&self, name: &str) -> anyhow::Result<bool> {
        self.persistence.namespace_check(name).await
    }
}
