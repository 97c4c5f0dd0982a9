//! HTTP API

pub mod error;
pub mod health;
pub mod keys;

use actix_web::{HttpResponse, error::InternalError, web};

use crate::model::common::ErrorResponse;

/// Register every route and the JSON body settings.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(health::health)
        .service(keys::routes());
}

/// Malformed bodies answer 400 with the usual error payload.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest()
            .json(ErrorResponse::new(format!("invalid request body: {}", err)));
        InternalError::from_response(err, response).into()
    })
}
