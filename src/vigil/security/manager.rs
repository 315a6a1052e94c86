//! Credential checks shared by the form, mobile and remember-me paths.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error};

use super::validate_code::ValidateCodeError;
use crate::vigil::password::PasswordEncoder;
use crate::vigil::users::{UserDetails, UserDetailsError, UserDetailsService};

#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    /// Unknown user or wrong password; the two are not distinguished.
    #[error("Bad credentials")]
    BadCredentials,
    #[error("User is disabled")]
    Disabled,
    #[error("User account is locked")]
    Locked,
    #[error("User account has expired")]
    AccountExpired,
    #[error("User credentials have expired")]
    CredentialsExpired,
    #[error(transparent)]
    VerificationCode(#[from] ValidateCodeError),
    #[error("Authentication service unavailable")]
    Internal,
}

/// Checked against when the user does not exist, so unknown usernames cost
/// the same hashing work as wrong passwords.
const USER_NOT_FOUND_PASSWORD: &str = "userNotFoundPassword";

pub struct AuthenticationManager {
    users: Arc<dyn UserDetailsService>,
    encoder: Arc<dyn PasswordEncoder>,
    user_not_found_hash: String,
}

impl AuthenticationManager {
    /// # Errors
    /// Returns an error if the encoder cannot hash the placeholder password.
    pub fn new(
        users: Arc<dyn UserDetailsService>,
        encoder: Arc<dyn PasswordEncoder>,
    ) -> Result<Self> {
        let user_not_found_hash = encoder.encode(USER_NOT_FOUND_PASSWORD)?;
        Ok(Self {
            users,
            encoder,
            user_not_found_hash,
        })
    }

    /// Username + password login.
    ///
    /// # Errors
    /// Returns the reason the login was refused.
    pub async fn authenticate_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserDetails, AuthenticationError> {
        let user = match self.retrieve_user(username).await {
            Err(AuthenticationError::BadCredentials) => {
                self.encoder.matches(password, &self.user_not_found_hash);
                return Err(AuthenticationError::BadCredentials);
            }
            result => result?,
        };

        pre_authentication_checks(&user)?;

        if !self.encoder.matches(password, user.password()) {
            debug!("Password does not match stored value for {username}");
            return Err(AuthenticationError::BadCredentials);
        }

        post_authentication_checks(&user)?;

        Ok(user)
    }

    /// Login by mobile number once its SMS code has been accepted.
    ///
    /// # Errors
    /// Returns the reason the login was refused.
    pub async fn authenticate_mobile(
        &self,
        mobile: &str,
    ) -> Result<UserDetails, AuthenticationError> {
        let user = self.retrieve_user(mobile).await?;
        check_account_status(&user)?;
        Ok(user)
    }

    async fn retrieve_user(&self, username: &str) -> Result<UserDetails, AuthenticationError> {
        match self.users.load_user_by_username(username).await {
            Ok(user) => Ok(user),
            Err(UserDetailsError::NotFound(_)) => {
                debug!("User '{username}' not found");
                Err(AuthenticationError::BadCredentials)
            }
            Err(err) => {
                error!("Failed to load user '{username}': {err}");
                Err(AuthenticationError::Internal)
            }
        }
    }
}

/// Locked, disabled and expired accounts are refused before the password is checked.
fn pre_authentication_checks(user: &UserDetails) -> Result<(), AuthenticationError> {
    if !user.is_account_non_locked() {
        return Err(AuthenticationError::Locked);
    }
    if !user.is_enabled() {
        return Err(AuthenticationError::Disabled);
    }
    if !user.is_account_non_expired() {
        return Err(AuthenticationError::AccountExpired);
    }
    Ok(())
}

fn post_authentication_checks(user: &UserDetails) -> Result<(), AuthenticationError> {
    if !user.is_credentials_non_expired() {
        return Err(AuthenticationError::CredentialsExpired);
    }
    Ok(())
}

/// All four account-state flags, for logins that carry no password.
pub(crate) fn check_account_status(user: &UserDetails) -> Result<(), AuthenticationError> {
    pre_authentication_checks(user)?;
    post_authentication_checks(user)
}
