//! OpenAI-compatible generation backend
//!
//! Each generation role is routed through the guardrail routing table: the
//! role's own profile first, then the `default` profile, then the endpoint in
//! `AppConfig`. Routing is read from the live guardrail channel on every call
//! so an edited profile takes effect without a restart.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::application::ports::outbound::{
    BackendError, ChatResponse, GeneratedImage, GenerationBackendPort, GenerationRole, TokenUsage,
};
use crate::domain::value_objects::{GuardrailConfig, RoutingProfile};
use crate::infrastructure::config::AppConfig;

const DEFAULT_PROFILE: &str = "default";

/// Endpoint settled on for one request
#[derive(Debug, Clone, PartialEq)]
struct Route {
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f32>,
}

pub struct OpenAiCompatibleBackend {
    client: Client,
    fallback: RoutingProfile,
    routing: watch::Receiver<GuardrailConfig>,
}

impl OpenAiCompatibleBackend {
    pub fn new(
        config: &AppConfig,
        routing: watch::Receiver<GuardrailConfig>,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.backend_timeout_secs))
            .build()
            .map_err(|e| BackendError::Request(e.to_string()))?;

        Ok(Self {
            client,
            fallback: RoutingProfile {
                base_url: config.backend_base_url.clone(),
                model: config.backend_model.clone(),
                api_key: config.backend_api_key.clone(),
                temperature: None,
            },
            routing,
        })
    }

    /// Settle the endpoint for a role
    ///
    /// The first layer naming a base URL supplies the endpoint together with its
    /// own key and model, so a secret is only ever sent to the host it was
    /// configured for. An endpoint without a model uses the configured default model.
    fn route(&self, role: GenerationRole) -> Result<Route, BackendError> {
        let guardrails = self.routing.borrow();
        let layers = [
            guardrails.routing.get(role.as_str()),
            guardrails.routing.get(DEFAULT_PROFILE),
            Some(&self.fallback),
        ];

        let (endpoint, base_url) = layers
            .iter()
            .flatten()
            .find_map(|p| {
                p.base_url
                    .as_deref()
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
                    .map(|u| (*p, u.trim_end_matches('/').to_string()))
            })
            .ok_or(BackendError::Unconfigured(role))?;

        let model = Some(endpoint.model.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.fallback.model.clone());
        let api_key = endpoint.api_key.clone().filter(|k| !k.is_empty());
        let temperature = layers.iter().flatten().find_map(|p| p.temperature);

        Ok(Route {
            base_url,
            model,
            api_key,
            temperature,
        })
    }

    async fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        route: &Route,
        path: &str,
        body: &Req,
    ) -> Result<Resp, BackendError> {
        let mut request = self
            .client
            .post(format!("{}/{}", route.base_url, path))
            .json(body);
        if let Some(key) = &route.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl GenerationBackendPort for OpenAiCompatibleBackend {
    async fn chat(
        &self,
        prompt: &str,
        system_prompt: &str,
        role: GenerationRole,
    ) -> Result<ChatResponse, BackendError> {
        let route = self.route(role)?;
        tracing::debug!("Chat request for role {} via {} ({})", role, route.base_url, route.model);

        let request = ChatCompletionRequest {
            model: &route.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: route.temperature,
        };
        let response: ChatCompletionResponse = self.post(&route, "chat/completions", &request).await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BackendError::Malformed("response has no choices".to_string()))?;

        Ok(ChatResponse {
            text,
            usage: response.usage,
        })
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, BackendError> {
        let route = self.route(GenerationRole::Image)?;
        tracing::debug!("Image request via {} ({})", route.base_url, route.model);

        let request = ImageRequest {
            model: &route.model,
            prompt,
            n: 1,
        };
        let response: ImageResponse = self.post(&route, "images/generations", &request).await?;

        let url = response
            .data
            .into_iter()
            .find_map(|d| d.url)
            .ok_or_else(|| BackendError::Malformed("response has no image url".to_string()))?;

        Ok(GeneratedImage {
            url,
            model: route.model,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}
