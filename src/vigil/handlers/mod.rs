use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod health;
pub use self::health::health;

pub mod me;
pub use self::me::me;

pub mod openapi;
pub use self::openapi::openapi_json;

pub mod require;
pub use self::require::require_authentication;

pub mod sign_in;
pub use self::sign_in::sign_in;

/// Body of every plain-message JSON response.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SimpleResponse {
    pub msg: String,
}

impl SimpleResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}
