use axum::response::Json;

// served outside the security chain
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(crate::vigil::openapi())
}
