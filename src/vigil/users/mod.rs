//! User records and the lookup seam used by every login path.
//!
//! A lookup either returns a complete [`UserDetails`] or a distinct
//! [`UserDetailsError::NotFound`]. Account-state checks happen later, in the
//! authentication manager, so stores never decide whether a login succeeds.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

mod demo;
mod storage;

pub use demo::{DemoUserDetailsService, DEMO_AUTHORITY, DEMO_PASSWORD};
pub use storage::PgUserDetailsService;

#[derive(Debug, thiserror::Error)]
pub enum UserDetailsError {
    #[error("user not found: {0}")]
    NotFound(String),
    #[error("user store unavailable: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("failed to build user record: {0}")]
    Internal(#[from] anyhow::Error),
}

#[async_trait]
pub trait UserDetailsService: Send + Sync {
    /// Load a user by the name it logs in with (a username or a mobile number).
    ///
    /// # Errors
    /// Returns [`UserDetailsError::NotFound`] when no account matches.
    async fn load_user_by_username(&self, username: &str) -> Result<UserDetails, UserDetailsError>;
}

/// Which [`UserDetailsService`] the server runs with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UserStore {
    #[default]
    Database,
    /// Accepts any username with the demo password.
    Demo,
}

impl FromStr for UserStore {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "database" => Ok(Self::Database),
            "demo" => Ok(Self::Demo),
            other => Err(format!("invalid user store: {other}")),
        }
    }
}

impl fmt::Display for UserStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database => f.write_str("database"),
            Self::Demo => f.write_str("demo"),
        }
    }
}

/// A user as seen by the authentication pipeline.
#[derive(Clone, PartialEq, Eq)]
pub struct UserDetails {
    username: String,
    password: String,
    enabled: bool,
    account_non_expired: bool,
    account_non_locked: bool,
    credentials_non_expired: bool,
    authorities: BTreeSet<String>,
}

impl UserDetails {
    #[must_use]
    pub fn new(username: String, password: String, authorities: BTreeSet<String>) -> Self {
        Self {
            username,
            password,
            enabled: true,
            account_non_expired: true,
            account_non_locked: true,
            credentials_non_expired: true,
            authorities,
        }
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_account_non_expired(mut self, non_expired: bool) -> Self {
        self.account_non_expired = non_expired;
        self
    }

    #[must_use]
    pub fn with_account_non_locked(mut self, non_locked: bool) -> Self {
        self.account_non_locked = non_locked;
        self
    }

    #[must_use]
    pub fn with_credentials_non_expired(mut self, non_expired: bool) -> Self {
        self.credentials_non_expired = non_expired;
        self
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Encoded password; never the raw secret.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn is_account_non_expired(&self) -> bool {
        self.account_non_expired
    }

    #[must_use]
    pub fn is_account_non_locked(&self) -> bool {
        self.account_non_locked
    }

    #[must_use]
    pub fn is_credentials_non_expired(&self) -> bool {
        self.credentials_non_expired
    }

    #[must_use]
    pub fn authorities(&self) -> &BTreeSet<String> {
        &self.authorities
    }

    /// The public part of the record, safe to keep in a session.
    #[must_use]
    pub fn principal(&self) -> Principal {
        Principal {
            username: self.username.clone(),
            authorities: self.authorities.clone(),
        }
    }
}

impl fmt::Debug for UserDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserDetails")
            .field("username", &self.username)
            .field("password", &"***")
            .field("enabled", &self.enabled)
            .field("account_non_expired", &self.account_non_expired)
            .field("account_non_locked", &self.account_non_locked)
            .field("credentials_non_expired", &self.credentials_non_expired)
            .field("authorities", &self.authorities)
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct Principal {
    pub username: String,
    #[schema(value_type = Vec<String>)]
    pub authorities: BTreeSet<String>,
}

/// Split `"admin, user"` into `{admin, user}`, dropping blanks.
#[must_use]
pub fn comma_separated_authorities(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|authority| !authority.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_store_parses_case_insensitively() {
        assert_eq!("Database".parse::<UserStore>(), Ok(UserStore::Database));
        assert_eq!("demo".parse::<UserStore>(), Ok(UserStore::Demo));
        assert!("ldap".parse::<UserStore>().is_err());
        assert_eq!(UserStore::default().to_string(), "database");
    }

    #[test]
    fn comma_separated_authorities_trims_and_dedups() {
        let authorities = comma_separated_authorities(" admin,user ,, admin");
        assert_eq!(
            authorities.into_iter().collect::<Vec<_>>(),
            vec!["admin".to_string(), "user".to_string()]
        );
        assert!(comma_separated_authorities("").is_empty());
    }

    #[test]
    fn new_user_is_fully_active() {
        let user = UserDetails::new(
            "alice".to_string(),
            "$argon2id$stub".to_string(),
            comma_separated_authorities("admin"),
        );
        assert!(user.is_enabled());
        assert!(user.is_account_non_expired());
        assert!(user.is_account_non_locked());
        assert!(user.is_credentials_non_expired());

        let locked = user.clone().with_account_non_locked(false);
        assert!(!locked.is_account_non_locked());
        assert_ne!(user, locked);
    }

    #[test]
    fn debug_and_principal_hide_the_password() {
        let user = UserDetails::new(
            "alice".to_string(),
            "secret-hash".to_string(),
            comma_separated_authorities("admin"),
        );
        let debug = format!("{user:?}");
        assert!(!debug.contains("secret-hash"));

        let principal = user.principal();
        assert_eq!(principal.username, "alice");
        let json = serde_json::to_value(&principal).unwrap_or_default();
        assert!(json.get("password").is_none());
        assert_eq!(json["authorities"][0], "admin");
    }
}
