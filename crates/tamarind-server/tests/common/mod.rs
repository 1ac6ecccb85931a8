// Shared fixtures for HTTP tests

#![allow(dead_code)]

use std::sync::Arc;

use config::Config;

use tamarind_persistence::{MemoryPersistService, PersistenceService};
use tamarind_server::{AppState, Configuration};

pub const TEST_SECRET: &str = "integration-test-secret";
pub const ADMIN_PASSWORD: &str = "admin";

pub fn configuration(overrides: &[(&str, &str)]) -> Configuration {
    let mut builder = Config::builder()
        .set_override("auth.token.secret", TEST_SECRET)
        .unwrap()
        .set_override("auth.bcrypt_cost", 4)
        .unwrap()
        .set_override("watch.timeout_seconds", 1)
        .unwrap();
    for (key, value) in overrides {
        builder = builder.set_override(*key, *value).unwrap();
    }
    Configuration::from_config(builder.build().unwrap())
}

/// State over a fresh in-memory store with the bootstrap admin in place
pub async fn app_state(overrides: &[(&str, &str)]) -> Arc<AppState> {
    let persistence: Arc<dyn PersistenceService> = Arc::new(MemoryPersistService::new());
    let state = Arc::new(AppState::new(configuration(overrides), persistence).unwrap());
    assert!(
        state
            .user_service
            .ensure_default_admin(ADMIN_PASSWORD)
            .await
            .unwrap()
    );
    state
}

macro_rules! init_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new().configure(tamarind_server::startup::configure_app($state.clone())),
        )
        .await
    };
}

/// Log in and return the issued token pair
macro_rules! login {
    ($app:expr, $username:expr, $password:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/api/v1/login")
            .set_json(serde_json::json!({"username": $username, "password": $password}))
            .to_request();
        let pair: tamarind_auth::TokenPair =
            actix_web::test::call_and_read_body_json($app, req).await;
        pair
    }};
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

/// State over an in-memory SQLite database
pub async fn sql_app_state() -> Arc<AppState> {
    let configuration = configuration(&[("db.url", "sqlite::memory:")]);
    let persistence = tamarind_server::startup::init_persistence(&configuration)
        .await
        .unwrap();
    let state = Arc::new(AppState::new(configuration, persistence).unwrap());
    state
        .user_service
        .ensure_default_admin(ADMIN_PASSWORD)
        .await
        .unwrap();
    state
}
