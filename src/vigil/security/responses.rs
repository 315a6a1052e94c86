use axum::{
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info};

use super::{
    session::{IssuedSession, SessionId},
    AuthMethod, Authentication, AuthenticationError, SecurityState,
};
use crate::vigil::{
    handlers::SimpleResponse,
    properties::{LoginType, DEFAULT_UNAUTHENTICATION_URL},
    users::UserDetails,
};

/// `302 Found` to `location`.
pub(crate) fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        Err(err) => {
            error!("Invalid redirect location {location}: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Bind the user to a fresh session id and answer per the configured login type.
pub(super) async fn authentication_success(
    state: &SecurityState,
    session: SessionId,
    user: UserDetails,
    method: AuthMethod,
    remember_me: bool,
) -> Response {
    let sessions = state.sessions();
    let id = sessions.migrate(session.id).await;

    let authentication = Authentication {
        principal: user.principal(),
        method,
    };
    sessions.set_authentication(id, authentication.clone()).await;

    let remember_me_cookie = if remember_me {
        match state.remember_me().login_success(user.username()).await {
            Ok(cookie) => Some(cookie),
            Err(err) => {
                error!("Failed to issue remember-me token for {}: {err}", user.username());
                None
            }
        }
    } else {
        None
    };

    info!("Login succeeded for {}", user.username());

    let mut response = match state.properties().browser().login_type() {
        LoginType::Json => (StatusCode::OK, Json(authentication)).into_response(),
        LoginType::Redirect => {
            let target = sessions
                .remove_saved_request(id)
                .await
                .map_or_else(|| "/".to_string(), |saved| saved.redirect_url);
            found(&target)
        }
    };

    response.extensions_mut().insert(IssuedSession(id));
    if let Some(cookie) = remember_me_cookie {
        response.headers_mut().append(SET_COOKIE, cookie);
    }

    response
}

pub(super) fn authentication_failure(
    state: &SecurityState,
    error: &AuthenticationError,
) -> Response {
    info!("Login failed: {error}");

    let mut response = match state.properties().browser().login_type() {
        LoginType::Json => {
            let status = match error {
                AuthenticationError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::UNAUTHORIZED,
            };
            (status, Json(SimpleResponse::new(error.to_string()))).into_response()
        }
        LoginType::Redirect => found(&format!("{DEFAULT_UNAUTHENTICATION_URL}?error")),
    };

    // A failed login also forgets any earlier remember-me choice.
    if let Ok(cancel) = state.remember_me().cancel_cookie() {
        response.headers_mut().append(SET_COOKIE, cancel);
    }

    response
}
