use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use super::{require::UNAUTHENTICATED_MESSAGE, SimpleResponse};
use crate::vigil::security::{Authentication, SecurityContext};

#[utoipa::path(
    get,
    path= "/user/me",
    responses (
        (status = 200, description = "Current authentication", body = Authentication),
        (status = 401, description = "Not authenticated", body = SimpleResponse)
    ),
    tag= "user"
)]
pub async fn me(context: Option<Extension<SecurityContext>>) -> Response {
    match context.as_ref().and_then(|Extension(context)| context.authentication()) {
        Some(authentication) => Json(authentication).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(SimpleResponse::new(UNAUTHENTICATED_MESSAGE)),
        )
            .into_response(),
    }
}
