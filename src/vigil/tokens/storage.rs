use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::Instrument;

use super::{PersistentRememberMeToken, PersistentTokenRepository};

pub const CREATE_TABLE_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS persistent_logins (
        username VARCHAR(64) NOT NULL,
        series VARCHAR(64) PRIMARY KEY,
        token VARCHAR(64) NOT NULL,
        last_used TIMESTAMPTZ NOT NULL
    )
";

/// Token store over the `persistent_logins` table.
#[derive(Clone, Debug)]
pub struct PgTokenRepository {
    pool: PgPool,
}

impl PgTokenRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create `persistent_logins` if it does not exist yet.
    ///
    /// # Errors
    /// Returns an error if the DDL statement fails.
    pub async fn create_table(&self) -> Result<()> {
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "CREATE",
            db.statement = CREATE_TABLE_SQL
        );
        sqlx::query(CREATE_TABLE_SQL)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to create persistent_logins")?;
        Ok(())
    }
}

#[async_trait]
impl PersistentTokenRepository for PgTokenRepository {
    async fn create_new_token(&self, token: &PersistentRememberMeToken) -> Result<()> {
        let query = r"
            INSERT INTO persistent_logins
                (username, series, token, last_used)
            VALUES ($1, $2, $3, to_timestamp($4))
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(&token.username)
            .bind(&token.series)
            .bind(&token.token_value)
            .bind(token.last_used)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert remember-me token")?;
        Ok(())
    }

    async fn update_token(&self, series: &str, token_value: &str, last_used: i64) -> Result<()> {
        let query = r"
            UPDATE persistent_logins
            SET token = $1, last_used = to_timestamp($2)
            WHERE series = $3
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token_value)
            .bind(last_used)
            .bind(series)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to update remember-me token")?;
        Ok(())
    }

    async fn get_token_for_series(
        &self,
        series: &str,
    ) -> Result<Option<PersistentRememberMeToken>> {
        let query = r"
            SELECT
                username,
                series,
                token,
                EXTRACT(EPOCH FROM last_used)::BIGINT AS last_used_unix
            FROM persistent_logins
            WHERE series = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(series)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup remember-me token")?;

        row.map(|row| -> Result<PersistentRememberMeToken> {
            Ok(PersistentRememberMeToken {
                username: row.try_get("username")?,
                series: row.try_get("series")?,
                token_value: row.try_get("token")?,
                last_used: row.try_get("last_used_unix")?,
            })
        })
        .transpose()
    }

    async fn remove_user_tokens(&self, username: &str) -> Result<()> {
        let query = "DELETE FROM persistent_logins WHERE username = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(username)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to remove remember-me tokens")?;
        Ok(())
    }
}
