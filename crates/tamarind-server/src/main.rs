//! Main entry point for the Tamarind configuration server.

use std::sync::Arc;

use tamarind_auth::service::sweeper::start_cleanup_task;
use tamarind_persistence::PersistenceService;
use tamarind_server::{
    model::{app_state::AppState, config::Configuration},
    startup,
};
use tracing::{error, info};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let configuration = Configuration::new()?;

    let logging_config = configuration.logging_config();
    let _logging_guard = startup::init_logging(&logging_config)?;

    let persistence = startup::init_persistence(&configuration).await?;
    info!("Persistence mode: {}", persistence.storage_mode());

    let server_address = configuration.server_address();
    let server_port = configuration.server_port();
    let admin_password = configuration.initial_admin_password();

    let app_state = Arc::new(AppState::new(configuration, persistence.clone())?);

    app_state
        .user_service
        .ensure_default_admin(&admin_password)
        .await?;

    let cleanup_handle =
        start_cleanup_task(persistence, app_state.auth_settings.cleanup_interval);

    info!(
        "Starting Tamarind server on {}:{}",
        server_address, server_port
    );
    let server = startup::main_server(app_state, server_address, server_port)?;
    let server_handle = server.handle();

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = startup::wait_for_shutdown_signal() => {
            server_handle.stop(true).await;
        }
    }

    cleanup_handle.abort();

    info!("Tamarind server shutdown complete");
    Ok(())
}
