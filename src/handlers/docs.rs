use axum::response::Json;
use utoipa::OpenApi;

use crate::api::openapi::ApiDoc;

/// GET /v3/api-docs - OpenAPI 3 document
pub async fn api_docs() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
