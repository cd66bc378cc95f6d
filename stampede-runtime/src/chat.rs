//! Chat-completion transport for Azure OpenAI style deployments.
use crate::error::RuntimeError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use stampede::Invoke;
use stampede_core::{Payload, RequestId, RunConfig};
use std::borrow::Cow;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_VERSION: &str = "2024-02-01";

/// Idle connections are kept around for the whole run.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(2_000);

/// Error bodies are cut to this many characters before they end up in logs.
const MAX_ERROR_BODY: usize = 512;

const MAX_TOKENS: u32 = 50;

/// Where chat requests go and how they authenticate.
#[derive(Clone)]
pub struct ChatTarget {
    endpoint: Url,
    api_key: String,
    deployment: String,
    api_version: String,
}

impl fmt::Debug for ChatTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatTarget")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"<redacted>")
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl ChatTarget {
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        deployment: impl Into<String>,
    ) -> Result<Self, RuntimeError> {
        let mut url = Url::parse(endpoint).map_err(|source| RuntimeError::Endpoint {
            endpoint: endpoint.to_string(),
            source,
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(RuntimeError::Scheme(url.scheme().to_string()));
        }

        // NOTE: Without the trailing slash `Url::join` would replace the last path segment.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(Self {
            endpoint: url,
            api_key: api_key.into(),
            deployment: deployment.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
        })
    }

    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    /// `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={version}`
    pub fn completions_url(&self) -> Result<Url, RuntimeError> {
        let path = format!("openai/deployments/{}/chat/completions", self.deployment);
        let mut url = self
            .endpoint
            .join(&path)
            .map_err(|source| RuntimeError::Endpoint {
                endpoint: self.endpoint.to_string(),
                source,
            })?;
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub n: u32,
    pub max_tokens: u32,
}

impl ChatRequest {
    /// The fixed request shape sent for every request id.
    pub fn for_request(request_id: RequestId) -> Self {
        Self {
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(format!(
                    "Hello, this is test request #{request_id}. Please respond with a short message."
                )),
            }],
            temperature: 0.,
            n: 1,
            max_tokens: MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub message: Option<ChatMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

impl Payload for ChatCompletion {
    fn has_payload(&self) -> bool {
        !self.choices.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
}

impl ChatError {
    pub fn label(&self) -> &'static str {
        match self {
            ChatError::Status { .. } => "HttpStatus",
            ChatError::Transport(err) if err.is_timeout() => "Timeout",
            ChatError::Transport(err) if err.is_connect() => "Connect",
            ChatError::Transport(err) if err.is_decode() => "Decode",
            ChatError::Transport(err) if err.is_body() => "Body",
            ChatError::Transport(err) if err.is_request() => "Request",
            ChatError::Transport(_) => "Transport",
        }
    }
}

/// Body of an error response for logging, cut to [`MAX_ERROR_BODY`] characters. A body that
/// failed to arrive keeps the read error instead.
fn error_body<E: fmt::Display>(body: Result<String, E>) -> String {
    match body {
        Ok(body) => body.chars().take(MAX_ERROR_BODY).collect(),
        Err(err) => format!("<body unreadable: {err}>"),
    }
}

/// HTTP client for one chat deployment, sized from the run configuration.
pub struct ChatClient {
    http: reqwest::Client,
    url: Url,
    api_key: String,
}

impl ChatClient {
    pub fn new(target: &ChatTarget, config: &RunConfig) -> Result<Self, RuntimeError> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .pool_max_idle_per_host(config.connection_pool_limit.get())
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .connect_timeout(config.connect_timeout)
            .timeout(config.per_call_timeout)
            .build()?;

        Ok(Self {
            http,
            url: target.completions_url()?,
            api_key: target.api_key.clone(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Invoke for ChatClient {
    type Response = ChatCompletion;
    type Error = ChatError;

    async fn invoke(&self, request_id: RequestId) -> Result<ChatCompletion, ChatError> {
        let response = self
            .http
            .post(self.url.clone())
            .header("api-key", &self.api_key)
            .json(&ChatRequest::for_request(request_id))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Status {
                status,
                body: error_body(response.text().await),
            });
        }

        Ok(response.json::<ChatCompletion>().await?)
    }

    fn failure_label(&self, error: &ChatError) -> Cow<'static, str> {
        Cow::Borrowed(error.label())
    }
}
