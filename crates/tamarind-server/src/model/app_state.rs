//! Shared application state handed to every handler

use std::sync::Arc;
use std::time::Duration;

use tamarind_auth::{AuthSettings, SessionService, UserService};
use tamarind_config::{ConfigService, NamespaceService, Watcher};
use tamarind_persistence::PersistenceService;

use super::config::Configuration;

pub struct AppState {
    pub configuration: Configuration,
    pub persistence: Arc<dyn PersistenceService>,
    pub config_service: ConfigService,
    pub namespace_service: NamespaceService,
    pub session_service: SessionService,
    pub user_service: UserService,
    pub auth_settings: AuthSettings,
    pub watch_timeout: Duration,
}

impl AppState {
    /// Build every service on top of one persistence backend
    pub fn new(
        configuration: Configuration,
        persistence: Arc<dyn PersistenceService>,
    ) -> anyhow::Result<Self> {
        let auth_settings = configuration.auth_settings()?;
        let watch_timeout = configuration.watch_timeout();

        Ok(AppState {
            config_service: ConfigService::new(persistence.clone(), Watcher::new()),
            namespace_service: NamespaceService::new(persistence.clone()),
            session_service: SessionService::new(persistence.clone(), &auth_settings),
            user_service: UserService::new(persistence.clone(), auth_settings.bcrypt_cost),
            configuration,
            persistence,
            auth_settings,
            watch_timeout,
        })
    }
}
