//! Persistent remember-me tokens.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

mod storage;

pub use storage::PgTokenRepository;

/// One row of `persistent_logins`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistentRememberMeToken {
    pub username: String,
    pub series: String,
    pub token_value: String,
    /// Unix seconds.
    pub last_used: i64,
}

#[async_trait]
pub trait PersistentTokenRepository: Send + Sync {
    /// # Errors
    /// Returns an error if the token cannot be stored.
    async fn create_new_token(&self, token: &PersistentRememberMeToken) -> Result<()>;

    /// # Errors
    /// Returns an error if the token cannot be updated.
    async fn update_token(&self, series: &str, token_value: &str, last_used: i64) -> Result<()>;

    /// # Errors
    /// Returns an error if the lookup fails; a missing series is `Ok(None)`.
    async fn get_token_for_series(&self, series: &str)
        -> Result<Option<PersistentRememberMeToken>>;

    /// # Errors
    /// Returns an error if the tokens cannot be removed.
    async fn remove_user_tokens(&self, username: &str) -> Result<()>;
}

/// Keeps tokens in process memory; tokens are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryTokenRepository {
    series: Mutex<HashMap<String, PersistentRememberMeToken>>,
}

impl InMemoryTokenRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistentTokenRepository for InMemoryTokenRepository {
    async fn create_new_token(&self, token: &PersistentRememberMeToken) -> Result<()> {
        let mut series = self.series.lock().await;
        if series.contains_key(&token.series) {
            anyhow::bail!("series id already exists: {}", token.series);
        }
        series.insert(token.series.clone(), token.clone());
        Ok(())
    }

    async fn update_token(&self, series: &str, token_value: &str, last_used: i64) -> Result<()> {
        let mut tokens = self.series.lock().await;
        if let Some(token) = tokens.get_mut(series) {
            token.token_value = token_value.to_string();
            token.last_used = last_used;
        }
        Ok(())
    }

    async fn get_token_for_series(
        &self,
        series: &str,
    ) -> Result<Option<PersistentRememberMeToken>> {
        Ok(self.series.lock().await.get(series).cloned())
    }

    async fn remove_user_tokens(&self, username: &str) -> Result<()> {
        self.series
            .lock()
            .await
            .retain(|_, token| token.username != username);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn token(username: &str, series: &str) -> PersistentRememberMeToken {
        PersistentRememberMeToken {
            username: username.to_string(),
            series: series.to_string(),
            token_value: "value".to_string(),
            last_used: 100,
        }
    }

    #[tokio::test]
    async fn duplicate_series_is_rejected() {
        let repository = InMemoryTokenRepository::new();
        repository.create_new_token(&token("alice", "s1")).await.unwrap();
        assert!(repository.create_new_token(&token("bob", "s1")).await.is_err());
    }

    #[tokio::test]
    async fn update_and_remove_by_user() {
        let repository = InMemoryTokenRepository::new();
        repository.create_new_token(&token("alice", "s1")).await.unwrap();
        repository.create_new_token(&token("alice", "s2")).await.unwrap();
        repository.create_new_token(&token("bob", "s3")).await.unwrap();

        repository.update_token("s1", "rotated", 200).await.unwrap();
        let updated = repository.get_token_for_series("s1").await.unwrap().unwrap();
        assert_eq!(updated.token_value, "rotated");
        assert_eq!(updated.last_used, 200);

        repository.remove_user_tokens("alice").await.unwrap();
        assert!(repository.get_token_for_series("s1").await.unwrap().is_none());
        assert!(repository.get_token_for_series("s2").await.unwrap().is_none());
        assert!(repository.get_token_for_series("s3").await.unwrap().is_some());
    }
}
