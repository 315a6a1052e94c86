//! Security filter chain.
//!
//! Each stage is an axum middleware; [`apply`] stacks them in a fixed order.
//! The authentication outcome travels with the request as a
//! [`SecurityContext`] extension, never through global state.

use anyhow::{bail, Result};
use axum::{middleware, Router};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use utoipa::ToSchema;

pub mod filters;
pub mod manager;
pub mod matcher;
pub mod remember_me;
pub mod request_cache;
mod responses;
pub mod session;
pub mod validate_code;

pub use self::manager::{AuthenticationError, AuthenticationManager};
pub use self::matcher::{AntMatcher, PermitAll};
pub use self::remember_me::RememberMeServices;
pub use self::request_cache::SavedRequest;
pub use self::session::{SessionId, SessionStore};
pub use self::validate_code::{CodeType, CodeValidator, CodeValidators, ValidateCodeError};

pub(crate) use self::responses::found;

use crate::vigil::{
    password::PasswordEncoder,
    properties::{
        SecurityProperties, DEFAULT_LOGIN_PROCESSING_URL_FORM,
        DEFAULT_LOGIN_PROCESSING_URL_MOBILE, DEFAULT_LOGOUT_URL, DEFAULT_UNAUTHENTICATION_URL,
        DEFAULT_VALIDATE_CODE_URL_PREFIX, HEALTH_URL, OPENAPI_URL, USER_ME_URL,
    },
    tokens::PersistentTokenRepository,
    users::{Principal, UserDetailsService},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Form,
    Mobile,
    RememberMe,
}

/// Who the request is authenticated as, and how.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Authentication {
    pub principal: Principal,
    pub method: AuthMethod,
}

/// Per-request authentication state.
#[derive(Clone, Debug, Default)]
pub struct SecurityContext {
    authentication: Option<Authentication>,
}

impl SecurityContext {
    #[must_use]
    pub fn new(authentication: Option<Authentication>) -> Self {
        Self { authentication }
    }

    #[must_use]
    pub fn authentication(&self) -> Option<&Authentication> {
        self.authentication.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authentication.is_some()
    }
}

/// Everything the filters and handlers share.
pub struct SecurityState {
    properties: SecurityProperties,
    sessions: SessionStore,
    manager: AuthenticationManager,
    remember_me: RememberMeServices,
    validators: CodeValidators,
    permit_all: PermitAll,
    not_saved: AntMatcher,
}

impl SecurityState {
    /// # Errors
    /// Returns an error if the login page is not a usable path.
    pub fn new(
        properties: SecurityProperties,
        users: Arc<dyn UserDetailsService>,
        encoder: Arc<dyn PasswordEncoder>,
        tokens: Arc<dyn PersistentTokenRepository>,
        validators: CodeValidators,
    ) -> Result<Self> {
        let browser = properties.browser();
        validate_login_page(browser.login_page())?;

        let permit_all = PermitAll::new([
            DEFAULT_UNAUTHENTICATION_URL.to_string(),
            DEFAULT_LOGIN_PROCESSING_URL_MOBILE.to_string(),
            browser.login_page().to_string(),
            format!("{DEFAULT_VALIDATE_CODE_URL_PREFIX}/*"),
        ])?;

        let remember_me = RememberMeServices::new(
            tokens,
            users.clone(),
            browser.remember_me_seconds(),
            browser.secure_cookies(),
        );

        Ok(Self {
            sessions: SessionStore::new(Duration::from_secs(browser.session_ttl_seconds())),
            manager: AuthenticationManager::new(users, encoder)?,
            remember_me,
            validators,
            permit_all,
            not_saved: AntMatcher::new(request_cache::NOT_SAVED_PATTERN)?,
            properties,
        })
    }

    #[must_use]
    pub fn properties(&self) -> &SecurityProperties {
        &self.properties
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    #[must_use]
    pub fn manager(&self) -> &AuthenticationManager {
        &self.manager
    }

    #[must_use]
    pub fn remember_me(&self) -> &RememberMeServices {
        &self.remember_me
    }

    #[must_use]
    pub fn validators(&self) -> &CodeValidators {
        &self.validators
    }

    #[must_use]
    pub fn permit_all(&self) -> &PermitAll {
        &self.permit_all
    }

    /// Whether a challenged request to `path` should become the post-login target.
    #[must_use]
    pub fn saves_request(&self, path: &str) -> bool {
        !self.not_saved.matches(path)
    }
}

fn validate_login_page(login_page: &str) -> Result<()> {
    if !login_page.starts_with('/') {
        bail!("login page must be an absolute path, got: {login_page}");
    }
    if login_page.contains(['*', '?', ':', '{', '}']) {
        bail!("login page must be a literal path, got: {login_page}");
    }
    if [
        DEFAULT_UNAUTHENTICATION_URL,
        DEFAULT_LOGIN_PROCESSING_URL_FORM,
        DEFAULT_LOGIN_PROCESSING_URL_MOBILE,
        DEFAULT_LOGOUT_URL,
        USER_ME_URL,
        HEALTH_URL,
        OPENAPI_URL,
    ]
    .contains(&login_page)
    {
        bail!("login page collides with a reserved path: {login_page}");
    }
    Ok(())
}

/// Wrap `router` (routes and fallback) in the security filter chain.
///
/// Routes added to the returned router afterwards bypass the chain.
pub fn apply(router: Router, state: Arc<SecurityState>) -> Router {
    // ServiceBuilder runs layers top to bottom.
    router.layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn_with_state(
                state.clone(),
                filters::security_context,
            ))
            .layer(middleware::from_fn_with_state(state.clone(), filters::logout))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                filters::form_login,
            ))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                filters::mobile_login,
            ))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                filters::remember_me,
            ))
            .layer(middleware::from_fn_with_state(state, filters::authorize)),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::vigil::password::Argon2PasswordEncoder;
    use crate::vigil::properties::BrowserProperties;
    use crate::vigil::tokens::InMemoryTokenRepository;
    use crate::vigil::users::DemoUserDetailsService;

    fn state(login_page: &str) -> Result<SecurityState> {
        let encoder: Arc<dyn PasswordEncoder> = Arc::new(Argon2PasswordEncoder);
        let users = Arc::new(DemoUserDetailsService::new(&encoder)?);
        SecurityState::new(
            SecurityProperties::new(
                BrowserProperties::default().with_login_page(login_page.to_string()),
            ),
            users,
            encoder,
            Arc::new(InMemoryTokenRepository::new()),
            CodeValidators::new(),
        )
    }

    #[test]
    fn allow_list_contains_the_public_paths() {
        let state = state("/demo-signIn.html").unwrap();
        let permit = state.permit_all();

        assert!(permit.permits("/authentication/require"));
        assert!(permit.permits("/authentication/mobile"));
        assert!(permit.permits("/demo-signIn.html"));
        assert!(permit.permits("/code/image"));
        assert!(permit.permits("/code/sms"));

        assert!(!permit.permits("/authentication/form"));
        assert!(!permit.permits("/signIn.html"));
        assert!(!permit.permits("/user/me"));
        assert!(!permit.permits("/api/data"));
        assert!(!permit.permits("/"));
    }

    #[test]
    fn favicon_fetches_are_not_saved() {
        let state = state("/signIn.html").unwrap();
        assert!(!state.saves_request("/favicon.ico"));
        assert!(!state.saves_request("/static/favicon.png"));
        assert!(state.saves_request("/some/page.html"));
        assert!(state.saves_request("/api/data"));
    }

    #[test]
    fn login_page_must_be_a_plain_path() {
        assert!(state("signIn.html").is_err());
        assert!(state("/pages/*").is_err());
        assert!(state("/logout").is_err());
        assert!(state("/authentication/require").is_err());
        assert!(state("/health").is_err());
        assert!(state("/openapi.json").is_err());
        assert!(state("/user/me").is_err());
        assert!(state("/pages/signIn.html").is_ok());
    }

    #[test]
    fn security_context_reports_authentication() {
        let anonymous = SecurityContext::default();
        assert!(!anonymous.is_authenticated());
        assert!(anonymous.authentication().is_none());

        let authentication = Authentication {
            principal: Principal {
                username: "alice".to_string(),
                authorities: crate::vigil::users::comma_separated_authorities("admin"),
            },
            method: AuthMethod::RememberMe,
        };
        let context = SecurityContext::new(Some(authentication.clone()));
        assert!(context.is_authenticated());
        assert_eq!(context.authentication(), Some(&authentication));

        let json = serde_json::to_value(&authentication).unwrap();
        assert_eq!(json["method"], "remember_me");
        assert_eq!(json["principal"]["username"], "alice");
    }
}
