//! In-memory HTTP sessions keyed by the `vigil_session` cookie.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{request_cache::SavedRequest, Authentication};

pub const SESSION_COOKIE_NAME: &str = "vigil_session";

/// Session id attached to every request by the security context filter.
///
/// `is_new` is set when the browser did not present a live session; the id is
/// only handed to the browser if something was stored under it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionId {
    pub id: Uuid,
    pub is_new: bool,
}

/// Response marker telling the context filter which session id to set.
#[derive(Clone, Copy, Debug)]
pub struct IssuedSession(pub Uuid);

#[derive(Clone, Debug, Default)]
struct SessionData {
    authentication: Option<Authentication>,
    saved_request: Option<SavedRequest>,
}

struct SessionEntry {
    data: SessionData,
    touched_at: Instant,
}

#[derive(Default)]
struct Sessions {
    entries: HashMap<Uuid, SessionEntry>,
    last_sweep: Option<Instant>,
}

impl Sessions {
    /// Drop idle entries, at most once per `ttl`.
    fn sweep(&mut self, ttl: Duration) {
        if self
            .last_sweep
            .is_some_and(|swept_at| swept_at.elapsed() < ttl)
        {
            return;
        }
        self.entries
            .retain(|_, entry| entry.touched_at.elapsed() < ttl);
        self.last_sweep = Some(Instant::now());
    }
}

pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<Sessions>,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(Sessions::default()),
        }
    }

    /// Whether a live session exists for `id`; refreshes its idle timer.
    pub async fn contains(&self, id: Uuid) -> bool {
        let mut sessions = self.sessions.lock().await;
        self.live_entry(&mut sessions, id).is_some()
    }

    pub async fn authentication(&self, id: Uuid) -> Option<Authentication> {
        let mut sessions = self.sessions.lock().await;
        self.live_entry(&mut sessions, id)
            .and_then(|entry| entry.data.authentication.clone())
    }

    pub async fn set_authentication(&self, id: Uuid, authentication: Authentication) {
        self.update(id, |data| data.authentication = Some(authentication))
            .await;
    }

    pub async fn saved_request(&self, id: Uuid) -> Option<SavedRequest> {
        let mut sessions = self.sessions.lock().await;
        self.live_entry(&mut sessions, id)
            .and_then(|entry| entry.data.saved_request.clone())
    }

    pub async fn save_request(&self, id: Uuid, request: SavedRequest) {
        self.update(id, |data| data.saved_request = Some(request))
            .await;
    }

    pub async fn remove_saved_request(&self, id: Uuid) -> Option<SavedRequest> {
        let mut sessions = self.sessions.lock().await;
        self.live_entry(&mut sessions, id)
            .and_then(|entry| entry.data.saved_request.take())
    }

    /// Move the session contents under a fresh id and drop the old one.
    pub async fn migrate(&self, id: Uuid) -> Uuid {
        let new_id = Uuid::new_v4();
        let mut sessions = self.sessions.lock().await;
        let data = self
            .live_entry(&mut sessions, id)
            .map(|entry| entry.data.clone())
            .unwrap_or_default();
        sessions.entries.remove(&id);
        sessions.entries.insert(
            new_id,
            SessionEntry {
                data,
                touched_at: Instant::now(),
            },
        );
        new_id
    }

    /// Number of stored sessions, live or not yet swept.
    #[cfg(test)]
    async fn len(&self) -> usize {
        self.sessions.lock().await.entries.len()
    }

    pub async fn invalidate(&self, id: Uuid) {
        self.sessions.lock().await.entries.remove(&id);
    }

    async fn update<F>(&self, id: Uuid, apply: F)
    where
        F: FnOnce(&mut SessionData),
    {
        let mut sessions = self.sessions.lock().await;
        sessions.sweep(self.ttl);
        let entry = sessions.entries.entry(id).or_insert_with(|| SessionEntry {
            data: SessionData::default(),
            touched_at: Instant::now(),
        });
        entry.touched_at = Instant::now();
        apply(&mut entry.data);
    }

    fn live_entry<'a>(
        &self,
        sessions: &'a mut Sessions,
        id: Uuid,
    ) -> Option<&'a mut SessionEntry> {
        let entries = &mut sessions.entries;
        if entries
            .get(&id)
            .is_some_and(|entry| entry.touched_at.elapsed() >= self.ttl)
        {
            entries.remove(&id);
            return None;
        }
        let entry = entries.get_mut(&id)?;
        entry.touched_at = Instant::now();
        Some(entry)
    }
}

/// Build the `HttpOnly` session cookie.
pub(crate) fn session_cookie(id: Uuid, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}={id}; Path=/; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Read a cookie value by name from the `Cookie` headers.
pub(crate) fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| val.trim().to_string())
        })
}

pub(crate) fn extract_session_id(headers: &HeaderMap) -> Option<Uuid> {
    extract_cookie(headers, SESSION_COOKIE_NAME).and_then(|value| Uuid::parse_str(&value).ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::vigil::security::AuthMethod;
    use crate::vigil::users::{comma_separated_authorities, Principal};

    fn authentication() -> Authentication {
        Authentication {
            principal: Principal {
                username: "alice".to_string(),
                authorities: comma_separated_authorities("admin"),
            },
            method: AuthMethod::Form,
        }
    }

    fn saved(url: &str) -> SavedRequest {
        SavedRequest {
            method: "GET".to_string(),
            redirect_url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn stores_authentication_and_saved_request() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = Uuid::new_v4();
        assert!(!store.contains(id).await);

        store.save_request(id, saved("http://localhost/a.html")).await;
        store.set_authentication(id, authentication()).await;

        assert!(store.contains(id).await);
        assert_eq!(store.authentication(id).await, Some(authentication()));
        assert_eq!(
            store.saved_request(id).await,
            Some(saved("http://localhost/a.html"))
        );

        assert!(store.remove_saved_request(id).await.is_some());
        assert!(store.saved_request(id).await.is_none());
    }

    #[tokio::test]
    async fn migrate_moves_data_to_a_new_id() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = Uuid::new_v4();
        store.save_request(id, saved("http://localhost/a.html")).await;

        let new_id = store.migrate(id).await;
        assert_ne!(id, new_id);
        assert!(!store.contains(id).await);
        assert!(store.saved_request(new_id).await.is_some());
    }

    #[tokio::test]
    async fn expired_sessions_are_dropped() {
        let store = SessionStore::new(Duration::from_millis(10));
        let id = Uuid::new_v4();
        store.set_authentication(id, authentication()).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(store.authentication(id).await.is_none());
        assert!(!store.contains(id).await);
    }

    #[tokio::test]
    async fn idle_sessions_are_swept_on_write() {
        let store = SessionStore::new(Duration::from_millis(20));
        store.save_request(Uuid::new_v4(), saved("http://localhost/a")).await;
        store.save_request(Uuid::new_v4(), saved("http://localhost/b")).await;
        assert_eq!(store.len().await, 2);

        tokio::time::sleep(Duration::from_millis(50)).await;
        store.save_request(Uuid::new_v4(), saved("http://localhost/c")).await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn many_anonymous_sessions_are_stored_without_rescanning() {
        let store = SessionStore::new(Duration::from_secs(60));
        let started = Instant::now();
        for _ in 0..50_000 {
            store
                .save_request(Uuid::new_v4(), saved("http://localhost/api/data"))
                .await;
        }
        assert_eq!(store.len().await, 50_000);
        // A full scan per insert takes minutes at this size.
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn invalidate_removes_everything() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = Uuid::new_v4();
        store.set_authentication(id, authentication()).await;
        store.invalidate(id).await;
        assert!(store.authentication(id).await.is_none());
    }

    #[test]
    fn cookies_are_http_only_and_optionally_secure() {
        let id = Uuid::nil();
        let cookie = session_cookie(id, false).unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with(&format!("{SESSION_COOKIE_NAME}={id}")));
        assert!(cookie.contains("HttpOnly"));
        assert!(!cookie.contains("Secure"));

        let cleared = clear_session_cookie(true).unwrap();
        let cleared = cleared.to_str().unwrap();
        assert!(cleared.contains("Max-Age=0"));
        assert!(cleared.contains("Secure"));
    }

    #[test]
    fn extract_cookie_reads_across_pairs() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("a=1; {SESSION_COOKIE_NAME}={id}; remember-me=abc="))
                .unwrap(),
        );
        assert_eq!(extract_session_id(&headers), Some(id));
        assert_eq!(extract_cookie(&headers, "remember-me"), Some("abc=".to_string()));
        assert_eq!(extract_cookie(&headers, "missing"), None);
    }

    #[test]
    fn malformed_session_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("vigil_session=not-a-uuid"));
        assert_eq!(extract_session_id(&headers), None);
    }
}
