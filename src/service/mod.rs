pub mod http;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::result::ResultPayload;

/// Bearer credential issued by the account service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn bearer(&self) -> &str {
        &self.0
    }
}

// Never print the token itself.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(..)")
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server returned status {status}")]
    Status { status: u16 },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("invalid sentence: {0}")]
    InvalidSentence(&'static str),
    #[error("network support is disabled in this build")]
    Offline,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StartTestResponse {
    pub sentence: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestTokenResponse {
    pub token: String,
}

/// Remote endpoints used by a typing test. Calls block; the engine runs them
/// on worker threads.
pub trait TestService: Send + Sync {
    fn start_test(
        &self,
        word_count: usize,
        credential: Option<&Credential>,
    ) -> Result<StartTestResponse, ServiceError>;

    fn generate_test_token(
        &self,
        sentence: &str,
        credential: &Credential,
    ) -> Result<TestTokenResponse, ServiceError>;

    /// Save through the authenticated endpoint, or the guest endpoint when no
    /// credential is given.
    fn save_result(
        &self,
        result: &ResultPayload,
        credential: Option<&Credential>,
        test_token: Option<&str>,
    ) -> Result<(), ServiceError>;

    fn save_guest_result(&self, result: &ResultPayload) -> Result<(), ServiceError>;
}
