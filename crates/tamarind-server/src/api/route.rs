use actix_web::{Scope, web};

use crate::middleware::auth::Authentication;

pub fn routes() -> Scope {
    web::scope("/api/v1")
        // Public endpoints
        .service(super::auth::login)
        .service(super::auth::refresh)
        .service(super::health::health)
        // Everything else requires a bearer token
        .service(
            web::scope("")
                .wrap(Authentication)
                .service(super::auth::logout)
                .service(super::namespace::list)
                .service(super::namespace::create)
                .service(super::namespace::remove)
                .service(super::config::list)
                .service(super::config::watch)
                .service(super::config::history)
                .service(super::config::rollback)
                .service(super::config::get_config)
                .service(super::config::publish)
                .service(super::config::remove)
                .service(super::user::list)
                .service(super::user::create)
                .service(super::user::get_user)
                .service(super::user::update)
                .service(super::user::remove),
        )
}
