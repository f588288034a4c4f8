//! HTTP client for the backend answer endpoint
//!
//! The contract is a single JSON POST: `{"question": ...}` in,
//! `{"answer": ...}` out. Anything else (transport error, timeout, non-2xx,
//! malformed body) is uniformly a backend failure.

use crate::config::BackendConfig;
use crate::{ParleyError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
}

#[derive(Deserialize)]
struct AskResponse {
    answer: String,
}

/// Client for the question/answer endpoint
pub struct AskClient {
    client: reqwest::Client,
    endpoint: String,
}

impl AskClient {
    /// Create a client from configuration
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ParleyError::BackendError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Submit a question and return the backend's answer
    pub async fn ask(&self, question: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&AskRequest { question })
            .send()
            .await
            .map_err(|e| ParleyError::BackendError(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ParleyError::BackendError(format!(
                "backend error {}: {}",
                status, body
            )));
        }

        let parsed: AskResponse = response
            .json()
            .await
            .map_err(|e| ParleyError::BackendError(format!("malformed response: {}", e)))?;

        Ok(parsed.answer)
    }
}
