//! Security properties and well-known URLs.

use std::fmt;
use std::str::FromStr;

pub const DEFAULT_UNAUTHENTICATION_URL: &str = "/authentication/require";
pub const DEFAULT_LOGIN_PROCESSING_URL_FORM: &str = "/authentication/form";
pub const DEFAULT_LOGIN_PROCESSING_URL_MOBILE: &str = "/authentication/mobile";
pub const DEFAULT_VALIDATE_CODE_URL_PREFIX: &str = "/code";
pub const DEFAULT_LOGIN_PAGE_URL: &str = "/signIn.html";
pub const DEFAULT_LOGOUT_URL: &str = "/logout";
pub const USER_ME_URL: &str = "/user/me";
pub const HEALTH_URL: &str = "/health";
pub const OPENAPI_URL: &str = "/openapi.json";
pub const DEFAULT_PARAMETER_NAME_MOBILE: &str = "mobile";
pub const DEFAULT_REMEMBER_ME_SECONDS: i64 = 3600;
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 30 * 60;

/// How login success and failure are reported to the browser.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoginType {
    #[default]
    Json,
    Redirect,
}

impl FromStr for LoginType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "redirect" => Ok(Self::Redirect),
            other => Err(format!("invalid login type: {other}")),
        }
    }
}

impl fmt::Display for LoginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Redirect => f.write_str("redirect"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BrowserProperties {
    login_page: String,
    login_type: LoginType,
    remember_me_seconds: i64,
    session_ttl_seconds: u64,
    secure_cookies: bool,
}

impl Default for BrowserProperties {
    fn default() -> Self {
        Self {
            login_page: DEFAULT_LOGIN_PAGE_URL.to_string(),
            login_type: LoginType::default(),
            remember_me_seconds: DEFAULT_REMEMBER_ME_SECONDS,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            secure_cookies: false,
        }
    }
}

impl BrowserProperties {
    #[must_use]
    pub fn with_login_page(mut self, login_page: String) -> Self {
        self.login_page = login_page;
        self
    }

    #[must_use]
    pub fn with_login_type(mut self, login_type: LoginType) -> Self {
        self.login_type = login_type;
        self
    }

    #[must_use]
    pub fn with_remember_me_seconds(mut self, seconds: i64) -> Self {
        self.remember_me_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn login_page(&self) -> &str {
        &self.login_page
    }

    #[must_use]
    pub fn login_type(&self) -> LoginType {
        self.login_type
    }

    #[must_use]
    pub fn remember_me_seconds(&self) -> i64 {
        self.remember_me_seconds
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }
}

/// Root of the configuration tree, populated once at startup.
#[derive(Clone, Debug, Default)]
pub struct SecurityProperties {
    browser: BrowserProperties,
}

impl SecurityProperties {
    #[must_use]
    pub fn new(browser: BrowserProperties) -> Self {
        Self { browser }
    }

    #[must_use]
    pub fn browser(&self) -> &BrowserProperties {
        &self.browser
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_defaults_and_overrides() {
        let properties = SecurityProperties::default();
        let browser = properties.browser();

        assert_eq!(browser.login_page(), DEFAULT_LOGIN_PAGE_URL);
        assert_eq!(browser.login_type(), LoginType::Json);
        assert_eq!(browser.remember_me_seconds(), DEFAULT_REMEMBER_ME_SECONDS);
        assert_eq!(browser.session_ttl_seconds(), DEFAULT_SESSION_TTL_SECONDS);
        assert!(!browser.secure_cookies());

        let browser = BrowserProperties::default()
            .with_login_page("/demo-signIn.html".to_string())
            .with_login_type(LoginType::Redirect)
            .with_remember_me_seconds(60)
            .with_session_ttl_seconds(120)
            .with_secure_cookies(true);

        assert_eq!(browser.login_page(), "/demo-signIn.html");
        assert_eq!(browser.login_type(), LoginType::Redirect);
        assert_eq!(browser.remember_me_seconds(), 60);
        assert_eq!(browser.session_ttl_seconds(), 120);
        assert!(browser.secure_cookies());
    }

    #[test]
    fn login_type_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LoginType>(), Ok(LoginType::Json));
        assert_eq!("redirect".parse::<LoginType>(), Ok(LoginType::Redirect));
        assert!("html".parse::<LoginType>().is_err());
        assert_eq!(LoginType::Redirect.to_string(), "redirect");
    }
}
