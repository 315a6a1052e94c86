use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{debug, Instrument};

use super::{comma_separated_authorities, UserDetails, UserDetailsError, UserDetailsService};

/// Store-backed lookup over the `users` table.
#[derive(Clone, Debug)]
pub struct PgUserDetailsService {
    pool: PgPool,
}

impl PgUserDetailsService {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDetailsService for PgUserDetailsService {
    async fn load_user_by_username(&self, username: &str) -> Result<UserDetails, UserDetailsError> {
        let query = r"
            SELECT
                username,
                password_hash,
                enabled,
                account_non_expired,
                account_non_locked,
                credentials_non_expired,
                authorities
            FROM users
            WHERE username = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        let Some(row) = row else {
            debug!("No user found for username: {username}");
            return Err(UserDetailsError::NotFound(username.to_string()));
        };

        let authorities: String = row.try_get("authorities")?;

        Ok(UserDetails::new(
            row.try_get("username")?,
            row.try_get("password_hash")?,
            comma_separated_authorities(&authorities),
        )
        .with_enabled(row.try_get("enabled")?)
        .with_account_non_expired(row.try_get("account_non_expired")?)
        .with_account_non_locked(row.try_get("account_non_locked")?)
        .with_credentials_non_expired(row.try_get("credentials_non_expired")?))
    }
}
