//! The process-wide model session.
//!
//! [`ModelSession::connect`] runs once at startup. It verifies that the
//! backend serves the requested model and fails with the list of
//! alternatives otherwise. The resulting session is immutable and cheap to
//! share: `reqwest::Client` pools connections internally, so concurrent
//! completions need no locking.

use async_trait::async_trait;
use futures_util::stream;
use reqwest::{Client, RequestBuilder, header};
use tracing::{debug, info, warn};
use vibeserver_core::{CompletionError, CompletionPort, FragmentStream};

use crate::config::BackendConfig;
use crate::error::{BackendError, BackendResult};
use crate::models::{ChatCompletionRequest, ChatCompletionResponse, ModelsResponse};
use crate::sse::sse_fragments;

/// Long-lived handle to one model on an OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct ModelSession {
    client: Client,
    config: BackendConfig,
    model_id: String,
}

impl ModelSession {
    /// Establish the session for `model_id`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::ModelUnavailable`] when the backend can't be
    /// reached or doesn't serve `model_id`, and [`BackendError::ClientBuild`]
    /// when the HTTP client can't be created.
    pub async fn connect(config: BackendConfig, model_id: impl Into<String>) -> BackendResult<Self> {
        let model_id = model_id.into();
        let client = build_client(&config)?;

        let available = match list_models_with(&client, &config).await {
            Ok(models) => models,
            Err(e) => {
                return Err(BackendError::ModelUnavailable {
                    requested: model_id,
                    available: Vec::new(),
                    reason: format!("could not list models at {}: {e}", config.base_url),
                });
            }
        };

        if !available.iter().any(|id| id == &model_id) {
            return Err(BackendError::ModelUnavailable {
                requested: model_id,
                available,
                reason: format!("not served by {}", config.base_url),
            });
        }

        info!("Model session ready: {model_id} via {}", config.base_url);
        Ok(Self {
            client,
            config,
            model_id,
        })
    }

    /// List the model identifiers a backend serves.
    pub async fn list_models(config: &BackendConfig) -> BackendResult<Vec<String>> {
        let client = build_client(config)?;
        list_models_with(&client, config).await
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub const fn config(&self) -> &BackendConfig {
        &self.config
    }
}

#[async_trait]
impl CompletionPort for ModelSession {
    async fn complete(&self, prompt: &str) -> Result<FragmentStream, CompletionError> {
        let mut body = ChatCompletionRequest::streaming(&self.model_id, prompt);
        body.temperature = self.config.temperature;
        body.max_tokens = self.config.max_tokens;

        let url = self.config.chat_completions_url();
        debug!("Requesting completion from {url} ({} prompt bytes)", prompt.len());

        let response = authorize(self.client.post(&url), &self.config)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CompletionError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        if is_event_stream(&response) {
            return Ok(sse_fragments(response.bytes_stream()));
        }

        // Some backends ignore `stream: true` and answer with a single JSON body.
        warn!("Backend did not stream; reading a single completion body");
        let full: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Interrupted(e.to_string()))?;
        let text = full.into_text();
        let single = (!text.is_empty()).then_some(Ok::<_, CompletionError>(text));
        Ok(Box::pin(stream::iter(single)))
    }
}

fn build_client(config: &BackendConfig) -> BackendResult<Client> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(config.connect_timeout)
        .pool_max_idle_per_host(10)
        .build()
        .map_err(BackendError::ClientBuild)
}

fn authorize(request: RequestBuilder, config: &BackendConfig) -> RequestBuilder {
    match &config.api_key {
        Some(key) => request.bearer_auth(key),
        None => request,
    }
}

async fn list_models_with(client: &Client, config: &BackendConfig) -> BackendResult<Vec<String>> {
    let url = config.models_url();
    let response = authorize(client.get(&url), config)
        .timeout(config.request_timeout)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(BackendError::ApiRequestFailed {
            status: status.as_u16(),
            url,
        });
    }

    let models: ModelsResponse =
        response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse {
                message: e.to_string(),
            })?;

    Ok(models.data.into_iter().map(|m| m.id).collect())
}

fn is_event_stream(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/event-stream"))
}
