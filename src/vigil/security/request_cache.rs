//! The request that hit a protected path before the user logged in.

use axum::http::{header::HOST, HeaderMap, Method, Uri};
use serde::Serialize;
use url::Url;

const FORWARDED_PROTO: &str = "x-forwarded-proto";
/// Browsers fetch these on their own; they are never a post-login target.
pub const NOT_SAVED_PATTERN: &str = "/**/favicon.*";
const HTML_SUFFIX: &str = "html";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SavedRequest {
    pub method: String,
    /// Full URL of the original request, including scheme, host and query.
    pub redirect_url: String,
}

impl SavedRequest {
    #[must_use]
    pub fn new(method: &Method, uri: &Uri, headers: &HeaderMap) -> Self {
        Self {
            method: method.to_string(),
            redirect_url: full_request_url(uri, headers),
        }
    }

    /// Whether the original request was a page navigation rather than an API call.
    #[must_use]
    pub fn targets_html(&self) -> bool {
        self.redirect_url.ends_with(HTML_SUFFIX)
    }
}

fn full_request_url(uri: &Uri, headers: &HeaderMap) -> String {
    let scheme = headers
        .get(FORWARDED_PROTO)
        .and_then(|value| value.to_str().ok())
        .or_else(|| uri.scheme_str())
        .unwrap_or("http");
    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| uri.authority().map(|authority| authority.as_str()))
        .unwrap_or("localhost");

    match Url::parse(&format!("{scheme}://{host}")) {
        Ok(mut url) => {
            url.set_path(uri.path());
            url.set_query(uri.query());
            url.to_string()
        }
        Err(_) => uri
            .path_and_query()
            .map_or_else(|| uri.path().to_string(), ToString::to_string),
    }
}
