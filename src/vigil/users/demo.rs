use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

use super::{comma_separated_authorities, UserDetails, UserDetailsError, UserDetailsService};
use crate::vigil::password::PasswordEncoder;

pub const DEMO_PASSWORD: &str = "123456";
pub const DEMO_AUTHORITY: &str = "admin";

/// Placeholder store: every username exists, shares one password and is an `admin`.
///
/// Only meant for local demos. Use [`super::PgUserDetailsService`] anywhere else.
pub struct DemoUserDetailsService {
    encoded_password: String,
}

impl DemoUserDetailsService {
    /// Hash the demo secret once up front.
    ///
    /// # Errors
    /// Returns an error if the encoder fails.
    pub fn new(encoder: &Arc<dyn PasswordEncoder>) -> Result<Self> {
        Ok(Self {
            encoded_password: encoder.encode(DEMO_PASSWORD)?,
        })
    }
}

#[async_trait]
impl UserDetailsService for DemoUserDetailsService {
    #[instrument(skip(self))]
    async fn load_user_by_username(&self, username: &str) -> Result<UserDetails, UserDetailsError> {
        info!("Demo lookup for user: {username}");

        Ok(UserDetails::new(
            username.to_string(),
            self.encoded_password.clone(),
            comma_separated_authorities(DEMO_AUTHORITY),
        ))
    }
}
