use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::info;

use super::SimpleResponse;
use crate::vigil::security::{found, SecurityState, SessionId};

pub const UNAUTHENTICATED_MESSAGE: &str = "访问的服务需要身份认证，请引导用户到登录页";

#[utoipa::path(
    get,
    path= "/authentication/require",
    responses (
        (status = 302, description = "Page navigation, redirected to the login page"),
        (status = 401, description = "Authentication required", body = SimpleResponse)
    ),
    tag= "authentication"
)]
/// Where the chain sends unauthenticated requests.
///
/// Browsers that were navigating to an `html` page go to the login page, API
/// callers get a 401 they can act on. The saved request stays in the session
/// so a later login can return to it.
///
/// Mounted for every HTTP method, since the chain redirects challenged
/// requests of any method here; only `GET` is listed in the document.
pub async fn require_authentication(
    Extension(state): Extension<Arc<SecurityState>>,
    session: Option<Extension<SessionId>>,
) -> Response {
    let saved = match session {
        Some(Extension(session)) => state.sessions().saved_request(session.id).await,
        None => None,
    };

    if let Some(saved) = saved {
        info!("Request that triggered authentication: {}", saved.redirect_url);

        if saved.targets_html() {
            return found(state.properties().browser().login_page());
        }
    }

    (
        StatusCode::UNAUTHORIZED,
        Json(SimpleResponse::new(UNAUTHENTICATED_MESSAGE)),
    )
        .into_response()
}
