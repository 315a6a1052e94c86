//! # Vigil (Browser Authentication Gateway)
//!
//! `vigil` puts an ordered authentication pipeline in front of browser traffic.
//!
//! ## Pipeline
//!
//! Every request walks the same middleware list, in order:
//!
//! 1. **Security context:** the `vigil_session` cookie is resolved into an
//!    explicit [`vigil::security::SecurityContext`] stored in request extensions.
//! 2. **Logout:** `/logout` clears the session and remember-me tokens.
//! 3. **Form login:** `POST /authentication/form` checks username and password.
//! 4. **Mobile login:** `POST /authentication/mobile` checks an SMS code through a
//!    pluggable validator.
//! 5. **Remember-me:** anonymous requests carrying a `remember-me` cookie are
//!    re-authenticated from the persistent token store.
//! 6. **Authorize:** allow-listed paths pass; everything else requires an
//!    authenticated context, otherwise the request is cached in the session and the
//!    browser is sent to `/authentication/require`.
//!
//! ## Challenge Endpoint
//!
//! `/authentication/require` redirects HTML navigations to the login page and
//! answers API calls with `401` and a JSON message.
//!
//! CSRF tokens are not enforced.

pub mod cli;
pub mod vigil;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
