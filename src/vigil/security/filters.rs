//! The stages of the security chain, outermost first.

use axum::{
    extract::{FromRequest, Request, State},
    http::{header::SET_COOKIE, Method},
    middleware::Next,
    response::Response,
    Form,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{
    remember_me::{remember_me_requested, REMEMBER_ME_COOKIE_NAME},
    request_cache::SavedRequest,
    responses::{authentication_failure, authentication_success, found},
    session::{
        clear_session_cookie, extract_cookie, extract_session_id, session_cookie, IssuedSession,
        SessionId,
    },
    AuthMethod, Authentication, AuthenticationError, SecurityContext, SecurityState,
};
use crate::vigil::properties::{
    DEFAULT_LOGIN_PROCESSING_URL_FORM, DEFAULT_LOGIN_PROCESSING_URL_MOBILE, DEFAULT_LOGOUT_URL,
    DEFAULT_UNAUTHENTICATION_URL,
};

#[derive(Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(rename = "remember-me")]
    remember_me: Option<String>,
    #[serde(rename = "imageCode")]
    image_code: Option<String>,
}

#[derive(Deserialize)]
struct MobileLoginForm {
    #[serde(default)]
    mobile: String,
    #[serde(rename = "smsCode")]
    sms_code: Option<String>,
    #[serde(rename = "remember-me")]
    remember_me: Option<String>,
}

fn session_of(request: &Request) -> SessionId {
    request
        .extensions()
        .get::<SessionId>()
        .copied()
        .unwrap_or(SessionId {
            id: Uuid::new_v4(),
            is_new: true,
        })
}

fn context_of(request: &Request) -> SecurityContext {
    request
        .extensions()
        .get::<SecurityContext>()
        .cloned()
        .unwrap_or_default()
}

/// Load the session named by the cookie and expose it to the rest of the chain.
///
/// The session cookie is only sent when a login issued a new id or when a
/// fresh session ended up holding data.
pub async fn security_context(
    State(state): State<Arc<SecurityState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let sessions = state.sessions();

    let (session, authentication) = match extract_session_id(request.headers()) {
        Some(id) if sessions.contains(id).await => (
            SessionId { id, is_new: false },
            sessions.authentication(id).await,
        ),
        _ => (
            SessionId {
                id: Uuid::new_v4(),
                is_new: true,
            },
            None,
        ),
    };

    request.extensions_mut().insert(session);
    request
        .extensions_mut()
        .insert(SecurityContext::new(authentication));

    let mut response = next.run(request).await;

    let issue = match response.extensions().get::<IssuedSession>() {
        Some(issued) => Some(issued.0),
        None if session.is_new && sessions.contains(session.id).await => Some(session.id),
        None => None,
    };

    if let Some(id) = issue {
        match session_cookie(id, state.properties().browser().secure_cookies()) {
            Ok(cookie) => {
                response.headers_mut().append(SET_COOKIE, cookie);
            }
            Err(err) => error!("Failed to build session cookie: {err}"),
        }
    }

    response
}

/// Drop the session and remember-me tokens, then send the browser to the login page.
pub async fn logout(
    State(state): State<Arc<SecurityState>>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path() != DEFAULT_LOGOUT_URL {
        return next.run(request).await;
    }

    let session = session_of(&request);
    let context = context_of(&request);

    if let Some(authentication) = context.authentication() {
        let username = &authentication.principal.username;
        if let Err(err) = state.remember_me().logout(username).await {
            error!("Failed to remove remember-me tokens for {username}: {err}");
        }
        info!("User {username} logged out");
    }

    state.sessions().invalidate(session.id).await;

    let secure = state.properties().browser().secure_cookies();
    let mut response = found(&format!(
        "{}?logout",
        state.properties().browser().login_page()
    ));

    if let Ok(cookie) = clear_session_cookie(secure) {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    if let Ok(cookie) = state.remember_me().cancel_cookie() {
        response.headers_mut().append(SET_COOKIE, cookie);
    }

    response
}

/// Username and password login.
pub async fn form_login(
    State(state): State<Arc<SecurityState>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::POST
        || request.uri().path() != DEFAULT_LOGIN_PROCESSING_URL_FORM
    {
        return next.run(request).await;
    }

    let session = session_of(&request);

    let form = match Form::<LoginForm>::from_request(request, &()).await {
        Ok(Form(form)) => form,
        Err(rejection) => {
            debug!("Unreadable login form: {rejection}");
            return authentication_failure(&state, &AuthenticationError::BadCredentials);
        }
    };

    let username = form.username.trim();
    let password = SecretString::from(form.password);

    if let Err(err) = state
        .validators()
        .validate_image(session.id, Some(username), form.image_code.as_deref())
        .await
    {
        return authentication_failure(&state, &err.into());
    }

    match state
        .manager()
        .authenticate_password(username, password.expose_secret())
        .await
    {
        Ok(user) => {
            authentication_success(
                &state,
                session,
                user,
                AuthMethod::Form,
                remember_me_requested(form.remember_me.as_deref()),
            )
            .await
        }
        Err(err) => authentication_failure(&state, &err),
    }
}

/// Mobile number plus SMS code login.
pub async fn mobile_login(
    State(state): State<Arc<SecurityState>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::POST
        || request.uri().path() != DEFAULT_LOGIN_PROCESSING_URL_MOBILE
    {
        return next.run(request).await;
    }

    let session = session_of(&request);

    let form = match Form::<MobileLoginForm>::from_request(request, &()).await {
        Ok(Form(form)) => form,
        Err(rejection) => {
            debug!("Unreadable mobile login form: {rejection}");
            return authentication_failure(&state, &AuthenticationError::BadCredentials);
        }
    };

    let mobile = form.mobile.trim();

    if let Err(err) = state
        .validators()
        .validate_sms(session.id, Some(mobile), form.sms_code.as_deref())
        .await
    {
        return authentication_failure(&state, &err.into());
    }

    match state.manager().authenticate_mobile(mobile).await {
        Ok(user) => {
            authentication_success(
                &state,
                session,
                user,
                AuthMethod::Mobile,
                remember_me_requested(form.remember_me.as_deref()),
            )
            .await
        }
        Err(err) => authentication_failure(&state, &err),
    }
}

/// Authenticate anonymous requests from a remember-me cookie.
pub async fn remember_me(
    State(state): State<Arc<SecurityState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if context_of(&request).is_authenticated() {
        return next.run(request).await;
    }

    let Some(cookie) = extract_cookie(request.headers(), REMEMBER_ME_COOKIE_NAME)
        .filter(|value| !value.is_empty())
    else {
        return next.run(request).await;
    };

    let session = session_of(&request);

    match state.remember_me().auto_login(&cookie).await {
        Ok((user, rotated)) => {
            debug!("Remember-me login for {}", user.username());

            let authentication = Authentication {
                principal: user.principal(),
                method: AuthMethod::RememberMe,
            };
            state
                .sessions()
                .set_authentication(session.id, authentication.clone())
                .await;
            request
                .extensions_mut()
                .insert(SecurityContext::new(Some(authentication)));

            let mut response = next.run(request).await;
            response.headers_mut().append(SET_COOKIE, rotated);
            response
        }
        Err(err) => {
            warn!("Remember-me login rejected: {err}");

            let mut response = next.run(request).await;
            if let Ok(cancel) = state.remember_me().cancel_cookie() {
                response.headers_mut().append(SET_COOKIE, cancel);
            }
            response
        }
    }
}

/// Let allow-listed paths and authenticated requests through. Everything
/// else is redirected to the unauthenticated-access handler, and remembered
/// in the session unless it is a favicon fetch.
pub async fn authorize(
    State(state): State<Arc<SecurityState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.permit_all().permits(request.uri().path()) || context_of(&request).is_authenticated()
    {
        return next.run(request).await;
    }

    let saved = SavedRequest::new(request.method(), request.uri(), request.headers());

    debug!(
        "Access denied to {} {}, redirecting to {DEFAULT_UNAUTHENTICATION_URL}",
        saved.method, saved.redirect_url
    );

    if state.saves_request(request.uri().path()) {
        let session = session_of(&request);
        state.sessions().save_request(session.id, saved).await;
    }

    found(DEFAULT_UNAUTHENTICATION_URL)
}
