//! Hooks for verification codes submitted with a login.
//!
//! Generating and delivering codes lives outside this service; the login
//! filters only ask a validator whether the submitted code is acceptable.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeType {
    Image,
    Sms,
}

impl CodeType {
    /// Form parameter carrying the code.
    #[must_use]
    pub const fn parameter_name(self) -> &'static str {
        match self {
            Self::Image => "imageCode",
            Self::Sms => "smsCode",
        }
    }
}

impl fmt::Display for CodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => f.write_str("image"),
            Self::Sms => f.write_str("sms"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidateCodeError {
    #[error("{0} verification code must not be empty")]
    Missing(CodeType),
    #[error("{0} verification code does not match")]
    Mismatch(CodeType),
    #[error("{0} verification code has expired")]
    Expired(CodeType),
    #[error("{0} verification is not available")]
    Unavailable(CodeType),
}

#[async_trait]
pub trait CodeValidator: Send + Sync {
    /// Check `submitted` for the browser session `session`.
    ///
    /// `target` is the user the code was issued for (the mobile number for SMS).
    ///
    /// # Errors
    /// Returns why the code was rejected.
    async fn validate(
        &self,
        session: Uuid,
        target: Option<&str>,
        submitted: Option<&str>,
    ) -> Result<(), ValidateCodeError>;
}

/// Validators per code type. A missing image validator skips the image check;
/// a missing SMS validator disables mobile login.
#[derive(Clone, Default)]
pub struct CodeValidators {
    image: Option<Arc<dyn CodeValidator>>,
    sms: Option<Arc<dyn CodeValidator>>,
}

impl CodeValidators {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_image(mut self, validator: Arc<dyn CodeValidator>) -> Self {
        self.image = Some(validator);
        self
    }

    #[must_use]
    pub fn with_sms(mut self, validator: Arc<dyn CodeValidator>) -> Self {
        self.sms = Some(validator);
        self
    }

    /// # Errors
    /// Returns the image validator's rejection, if any.
    pub async fn validate_image(
        &self,
        session: Uuid,
        username: Option<&str>,
        submitted: Option<&str>,
    ) -> Result<(), ValidateCodeError> {
        match &self.image {
            Some(validator) => validator.validate(session, username, submitted).await,
            None => Ok(()),
        }
    }

    /// # Errors
    /// Returns [`ValidateCodeError::Unavailable`] when no SMS validator is set.
    pub async fn validate_sms(
        &self,
        session: Uuid,
        mobile: Option<&str>,
        submitted: Option<&str>,
    ) -> Result<(), ValidateCodeError> {
        match &self.sms {
            Some(validator) => validator.validate(session, mobile, submitted).await,
            None => Err(ValidateCodeError::Unavailable(CodeType::Sms)),
        }
    }
}

impl fmt::Debug for CodeValidators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeValidators")
            .field("image", &self.image.is_some())
            .field("sms", &self.sms.is_some())
            .finish()
    }
}
