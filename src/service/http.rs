use std::time::Duration;

use crate::service::{
    Credential, ServiceError, StartTestResponse, TestService, TestTokenResponse,
};
use crate::session::result::ResultPayload;

/// `TestService` over the JSON HTTP API.
pub struct HttpTestService {
    base_url: String,
    #[cfg(feature = "network")]
    client: reqwest::blocking::Client,
}

impl HttpTestService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let base_url = base_url.trim_end_matches('/').to_string();

        #[cfg(feature = "network")]
        {
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| ServiceError::Transport(e.to_string()))?;
            Ok(Self { base_url, client })
        }

        #[cfg(not(feature = "network"))]
        {
            let _ = timeout;
            Ok(Self { base_url })
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[cfg(feature = "network")]
mod wire {
    use reqwest::blocking::{RequestBuilder, Response};
    use serde::de::DeserializeOwned;

    use crate::service::{Credential, ServiceError};

    pub fn with_bearer(request: RequestBuilder, credential: Option<&Credential>) -> RequestBuilder {
        match credential {
            Some(c) => request.bearer_auth(c.bearer()),
            None => request,
        }
    }

    pub fn send(request: RequestBuilder) -> Result<Response, ServiceError> {
        let response = request
            .send()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ServiceError::Status {
                status: response.status().as_u16(),
            })
        }
    }

    pub fn json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ServiceError> {
        send(request)?
            .json()
            .map_err(|e| ServiceError::Decode(e.to_string()))
    }
}

#[cfg(feature = "network")]
impl TestService for HttpTestService {
    fn start_test(
        &self,
        word_count: usize,
        credential: Option<&Credential>,
    ) -> Result<StartTestResponse, ServiceError> {
        let request = self
            .client
            .post(self.url("/api/start-test"))
            .query(&[("wordCount", word_count)])
            .json(&serde_json::json!({}));
        wire::json(wire::with_bearer(request, credential))
    }

    fn generate_test_token(
        &self,
        sentence: &str,
        credential: &Credential,
    ) -> Result<TestTokenResponse, ServiceError> {
        let request = self
            .client
            .post(self.url("/api/generate-test-token"))
            .json(&serde_json::json!({ "sentence": sentence }));
        wire::json(wire::with_bearer(request, Some(credential)))
    }

    fn save_result(
        &self,
        result: &ResultPayload,
        credential: Option<&Credential>,
        test_token: Option<&str>,
    ) -> Result<(), ServiceError> {
        let Some(credential) = credential else {
            return self.save_guest_result(result);
        };

        let mut request = self.client.post(self.url("/api/results")).json(result);
        if let Some(token) = test_token {
            request = request.header("Test-Token", token);
        }
        wire::send(wire::with_bearer(request, Some(credential)))?;
        Ok(())
    }

    fn save_guest_result(&self, result: &ResultPayload) -> Result<(), ServiceError> {
        let request = self.client.post(self.url("/api/guest-results")).json(result);
        wire::send(request)?;
        Ok(())
    }
}

#[cfg(not(feature = "network"))]
impl TestService for HttpTestService {
    fn start_test(
        &self,
        _word_count: usize,
        _credential: Option<&Credential>,
    ) -> Result<StartTestResponse, ServiceError> {
        Err(ServiceError::Offline)
    }

    fn generate_test_token(
        &self,
        _sentence: &str,
        _credential: &Credential,
    ) -> Result<TestTokenResponse, ServiceError> {
        Err(ServiceError::Offline)
    }

    fn save_result(
        &self,
        _result: &ResultPayload,
        _credential: Option<&Credential>,
        _test_token: Option<&str>,
    ) -> Result<(), ServiceError> {
        Err(ServiceError::Offline)
    }

    fn save_guest_result(&self, _result: &ResultPayload) -> Result<(), ServiceError> {
        Err(ServiceError::Offline)
    }
}
