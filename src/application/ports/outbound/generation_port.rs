//! Generation backend port - text and image generation for the content pipeline

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role a request plays in the pipeline; selects the routing profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationRole {
    Creative,
    Logic,
    Portrait,
    Image,
}

impl GenerationRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationRole::Creative => "creative",
            GenerationRole::Logic => "logic",
            GenerationRole::Portrait => "portrait",
            GenerationRole::Image => "image",
        }
    }
}

impl std::fmt::Display for GenerationRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

impl ChatResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub url: String,
    pub model: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Backend request failed: {0}")]
    Request(String),
    #[error("Backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Backend response malformed: {0}")]
    Malformed(String),
    #[error("No backend configured for role {0}")]
    Unconfigured(GenerationRole),
}

#[async_trait]
pub trait GenerationBackendPort: Send + Sync {
    async fn chat(
        &self,
        prompt: &str,
        system_prompt: &str,
        role: GenerationRole,
    ) -> Result<ChatResponse, BackendError>;

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, BackendError>;
}
