//! Key-value endpoints under `/api`

use actix_web::{HttpResponse, Scope, delete, get, post, web};

use crate::api::error::ApiError;
use crate::model::common::{AppState, KeyValueResponse, SaveRequest};

#[post("/keys")]
async fn save(
    data: web::Data<AppState>,
    body: web::Json<SaveRequest>,
) -> Result<HttpResponse, ApiError> {
    let SaveRequest { key, value } = body.into_inner();
    if key.is_empty() {
        return Err(ApiError::BadRequest("key is required".to_string()));
    }

    data.store.save(&key, value.clone()).await?;

    Ok(HttpResponse::Created().json(KeyValueResponse { key, value }))
}

#[get("/keys/{key}")]
async fn retrieve(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let key = path.into_inner();
    let value = data.store.retrieve(&key).await?;

    Ok(HttpResponse::Ok().json(KeyValueResponse { key, value }))
}

#[delete("/keys/{key}")]
async fn remove(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    data.store.delete(&path.into_inner()).await?;

    Ok(HttpResponse::NoContent().finish())
}

pub fn routes() -> Scope {
    web::scope("/api")
        .service(save)
        .service(retrieve)
        .service(remove)
}
