//! HTTP server setup

use std::sync::Arc;

use actix_web::{App, HttpServer, dev::Server, middleware::Logger, web};

use crate::{api, model::app_state::AppState};

/// Register shared state, extractor settings and routes
pub fn configure_app(app_state: Arc<AppState>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::from(app_state))
            .app_data(api::json_config())
            .app_data(api::path_config())
            .service(api::route::routes());
    }
}

/// Creates and binds the main HTTP server
///
/// Signal handling is left to the caller so shutdown can also stop
/// background tasks.
pub fn main_server(
    app_state: Arc<AppState>,
    address: String,
    port: u16,
) -> Result<Server, std::io::Error> {
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .configure(configure_app(app_state.clone()))
    })
    .disable_signals()
    .bind((address, port))?
    .run())
}
