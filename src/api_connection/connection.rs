use async_trait::async_trait;
use reqwest::Client;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use super::endpoints::{GenerateContentRequest, GenerateContentResponse, GENERATION_BASE_URL};
use super::key_rotation::CredentialRotator;
use crate::offline;

#[derive(Debug)]
pub enum GenerationError {
    NetworkError(reqwest::Error),
    SerializationError(serde_json::Error),
    ApiError {
        status: reqwest::StatusCode,
        error_body: String,
    },
    EmptyResponse,
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::NetworkError(err) => write!(f, "Network error: {}", err),
            GenerationError::SerializationError(err) => {
                write!(f, "Serialization error: {}", err)
            }
            GenerationError::ApiError { status, error_body } => {
                write!(f, "API error {}: {}", status, error_body)
            }
            GenerationError::EmptyResponse => {
                write!(f, "API response carried no text candidates")
            }
        }
    }
}

impl Error for GenerationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GenerationError::NetworkError(err) => Some(err),
            GenerationError::SerializationError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::NetworkError(err)
    }
}

impl From<serde_json::Error> for GenerationError {
    fn from(err: serde_json::Error) -> Self {
        GenerationError::SerializationError(err)
    }
}

/// Why a call failed, for reporting. Every kind is retryable on the next
/// credential; classification prefers the HTTP status and only then falls
/// back to substring heuristics on the error body (a documented last resort
/// for transports that return 400 with a quota message inside).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Quota,
    RegionBlocked,
    Transport,
    Other,
}

impl GenerationError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            GenerationError::NetworkError(_) => FailureKind::Transport,
            GenerationError::ApiError { status, error_body } => {
                if status.as_u16() == 429 {
                    return FailureKind::Quota;
                }
                if status.as_u16() == 403 {
                    return FailureKind::RegionBlocked;
                }
                let body = error_body.to_lowercase();
                if body.contains("quota") || body.contains("rate limit") || body.contains("rate-limit")
                {
                    FailureKind::Quota
                } else if body.contains("location") || body.contains("region") {
                    FailureKind::RegionBlocked
                } else {
                    FailureKind::Other
                }
            }
            _ => FailureKind::Other,
        }
    }
}

impl FailureKind {
    fn describe(&self) -> &'static str {
        match self {
            FailureKind::Quota => "quota exhausted",
            FailureKind::RegionBlocked => "region blocked",
            FailureKind::Transport => "transport failure",
            FailureKind::Other => "call failed",
        }
    }
}

/// One outbound call with one credential. Broken out as a trait so the
/// gateway's retry loop can be exercised without a network.
#[async_trait]
pub trait GenerationTransport: Send + Sync {
    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String, GenerationError>;
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new() -> Self {
        HttpTransport {
            client: Client::new(),
            base_url: GENERATION_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        HttpTransport {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        HttpTransport::new()
    }
}

#[async_trait]
impl GenerationTransport for HttpTransport {
    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}?key={}", self.base_url, api_key);
        let request = GenerateContentRequest::for_prompt(prompt);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if response.status().is_success() {
            let payload = response.json::<GenerateContentResponse>().await?;
            payload.text_payload().ok_or(GenerationError::EmptyResponse)
        } else {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            Err(GenerationError::ApiError { status, error_body })
        }
    }
}

/// Issues prompts to the generation service with credential failover.
///
/// Tries each configured credential at most once per call, advancing the
/// rotator on any failure and resetting it on success. When every credential
/// is exhausted (or none is configured) the offline substitute answers
/// instead, so `generate` always returns usable text.
pub struct ModelGateway {
    transport: Arc<dyn GenerationTransport>,
    rotator: CredentialRotator,
}

impl ModelGateway {
    pub fn new(rotator: CredentialRotator) -> Self {
        ModelGateway {
            transport: Arc::new(HttpTransport::new()),
            rotator,
        }
    }

    pub fn with_transport(rotator: CredentialRotator, transport: Arc<dyn GenerationTransport>) -> Self {
        ModelGateway { transport, rotator }
    }

    pub fn rotator(&self) -> &CredentialRotator {
        &self.rotator
    }

    pub async fn generate(&mut self, prompt: &str) -> String {
        let attempts = self.rotator.len();
        if attempts == 0 {
            return offline::offline_completion(prompt);
        }

        for attempt in 1..=attempts {
            let api_key = match self.rotator.current() {
                Some(key) => key.to_string(),
                None => break,
            };
            match self.transport.generate(&api_key, prompt).await {
                Ok(text) => {
                    self.rotator.reset();
                    return text;
                }
                Err(err) => {
                    eprintln!(
                        "Credential {}/{}: {} ({})",
                        attempt,
                        attempts,
                        err.failure_kind().describe(),
                        err
                    );
                    self.rotator.advance();
                }
            }
        }

        eprintln!("All credentials exhausted, answering from the offline generator.");
        offline::offline_completion(prompt)
    }
}
