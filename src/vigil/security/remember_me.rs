//! Persistent-token remember-me.
//!
//! The browser holds `Base64(series:token)`. The series is stable for the life
//! of the login; the token is rotated on every automatic login. Presenting a
//! known series with a stale token means the cookie was copied, so every token
//! of that user is revoked.

use axum::http::{header::InvalidHeaderValue, HeaderValue};
use base64ct::{Base64, Encoding};
use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use super::manager::{check_account_status, AuthenticationError};
use crate::vigil::tokens::{PersistentRememberMeToken, PersistentTokenRepository};
use crate::vigil::users::{UserDetails, UserDetailsError, UserDetailsService};

pub const REMEMBER_ME_COOKIE_NAME: &str = "remember-me";
pub const REMEMBER_ME_PARAMETER: &str = "remember-me";
const SERIES_LENGTH: usize = 16;
const TOKEN_LENGTH: usize = 16;
const DELIMITER: char = ':';

#[derive(Debug, thiserror::Error)]
pub enum RememberMeError {
    #[error("invalid remember-me cookie: {0}")]
    InvalidCookie(String),
    #[error("no persistent token found for series")]
    SeriesNotFound,
    #[error("remember-me token mismatch, possible cookie theft")]
    CookieTheft,
    #[error("remember-me login has expired")]
    Expired,
    #[error("remembered user was not found")]
    UserNotFound,
    #[error("remembered user cannot log in: {0}")]
    Account(#[from] AuthenticationError),
    #[error("remember-me storage failure: {0}")]
    Repository(#[from] anyhow::Error),
}

pub struct RememberMeServices {
    repository: Arc<dyn PersistentTokenRepository>,
    users: Arc<dyn UserDetailsService>,
    token_validity_seconds: i64,
    secure_cookie: bool,
}

impl RememberMeServices {
    #[must_use]
    pub fn new(
        repository: Arc<dyn PersistentTokenRepository>,
        users: Arc<dyn UserDetailsService>,
        token_validity_seconds: i64,
        secure_cookie: bool,
    ) -> Self {
        Self {
            repository,
            users,
            token_validity_seconds,
            secure_cookie,
        }
    }

    /// Start a new series for `username` and return the cookie to set.
    ///
    /// # Errors
    /// Returns an error if the token cannot be stored.
    pub async fn login_success(&self, username: &str) -> Result<HeaderValue, RememberMeError> {
        let token = PersistentRememberMeToken {
            username: username.to_string(),
            series: generate_value(SERIES_LENGTH),
            token_value: generate_value(TOKEN_LENGTH),
            last_used: now_unix(),
        };
        self.repository.create_new_token(&token).await?;
        debug!("Created remember-me series for {username}");

        self.cookie_for(&token)
            .map_err(|e| RememberMeError::InvalidCookie(e.to_string()))
    }

    /// Authenticate from a cookie value, rotating its token.
    ///
    /// # Errors
    /// Returns why the cookie was not accepted; the caller should cancel it.
    pub async fn auto_login(
        &self,
        cookie_value: &str,
    ) -> Result<(UserDetails, HeaderValue), RememberMeError> {
        let (series, presented) = decode_cookie(cookie_value)?;

        let token = self
            .repository
            .get_token_for_series(&series)
            .await?
            .ok_or(RememberMeError::SeriesNotFound)?;

        if token.token_value != presented {
            warn!(
                "Remember-me token mismatch for {}, revoking all tokens",
                token.username
            );
            self.repository.remove_user_tokens(&token.username).await?;
            return Err(RememberMeError::CookieTheft);
        }

        let now = now_unix();
        if token.last_used.saturating_add(self.token_validity_seconds) < now {
            return Err(RememberMeError::Expired);
        }

        let rotated = PersistentRememberMeToken {
            token_value: generate_value(TOKEN_LENGTH),
            last_used: now,
            ..token
        };
        self.repository
            .update_token(&rotated.series, &rotated.token_value, rotated.last_used)
            .await?;

        let user = match self.users.load_user_by_username(&rotated.username).await {
            Ok(user) => user,
            Err(UserDetailsError::NotFound(_)) => return Err(RememberMeError::UserNotFound),
            Err(err) => return Err(RememberMeError::Repository(err.into())),
        };
        check_account_status(&user)?;

        let cookie = self
            .cookie_for(&rotated)
            .map_err(|e| RememberMeError::InvalidCookie(e.to_string()))?;

        Ok((user, cookie))
    }

    /// Drop every series of `username`.
    ///
    /// # Errors
    /// Returns an error if the tokens cannot be removed.
    pub async fn logout(&self, username: &str) -> Result<(), RememberMeError> {
        self.repository.remove_user_tokens(username).await?;
        Ok(())
    }

    /// `Set-Cookie` value that removes the remember-me cookie.
    ///
    /// # Errors
    /// Returns an error if the header value is invalid.
    pub fn cancel_cookie(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!("{REMEMBER_ME_COOKIE_NAME}=; Path=/; HttpOnly; Max-Age=0");
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }

    fn cookie_for(
        &self,
        token: &PersistentRememberMeToken,
    ) -> Result<HeaderValue, InvalidHeaderValue> {
        let value = encode_cookie(&token.series, &token.token_value);
        let mut cookie = format!(
            "{REMEMBER_ME_COOKIE_NAME}={value}; Path=/; HttpOnly; Max-Age={}",
            self.token_validity_seconds
        );
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}

/// `true`, `on`, `yes` or `1`, ignoring case.
#[must_use]
pub fn remember_me_requested(value: Option<&str>) -> bool {
    value.is_some_and(|value| {
        matches!(
            value.trim().to_lowercase().as_str(),
            "true" | "on" | "yes" | "1"
        )
    })
}

fn generate_value(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    OsRng.fill_bytes(&mut bytes);
    Base64::encode_string(&bytes)
}

fn encode_cookie(series: &str, token: &str) -> String {
    Base64::encode_string(format!("{series}{DELIMITER}{token}").as_bytes())
}

fn decode_cookie(value: &str) -> Result<(String, String), RememberMeError> {
    let mut padded = value.trim().to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    let decoded = Base64::decode_vec(&padded)
        .map_err(|_| RememberMeError::InvalidCookie("not Base64".to_string()))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| RememberMeError::InvalidCookie("not UTF-8".to_string()))?;

    let mut parts = decoded.split(DELIMITER);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(series), Some(token), None) if !series.is_empty() && !token.is_empty() => {
            Ok((series.to_string(), token.to_string()))
        }
        _ => Err(RememberMeError::InvalidCookie(
            "expected two tokens".to_string(),
        )),
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}
