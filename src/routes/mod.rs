use actix_web::{error::InternalError, web, HttpResponse};
use actix_web_httpauth::extractors::basic;
use serde_json::json;

use crate::auth::AUTH_REALM;

pub mod executors;
pub mod orders;
pub mod public;
pub mod schedule;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(basic::Config::default().realm(AUTH_REALM))
        .configure(public::configure)
        .configure(schedule::configure)
        .configure(orders::configure)
        .configure(executors::configure);
}

/// Malformed bodies get the same JSON error shape as validation failures.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let detail = err.to_string();
        log::debug!("Rejected payload: {detail}");
        InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(json!({ "code": "invalid_payload", "detail": detail })),
        )
        .into()
    })
}
