use async_trait::async_trait;

use crate::domain::value_objects::GuardrailConfig;

#[derive(Debug, thiserror::Error)]
pub enum GuardrailError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Encryption error: {0}")]
    Encryption(String),
}

#[async_trait]
pub trait GuardrailRepositoryPort: Send + Sync {
    /// Load the stored document with secrets decrypted; `None` when nothing is stored yet
    async fn load(&self) -> Result<Option<GuardrailConfig>, GuardrailError>;

    /// Persist the document, encrypting secrets at rest
    async fn save(&self, config: &GuardrailConfig) -> Result<(), GuardrailError>;

    /// Content fingerprint of the stored document, used to detect external edits
    async fn fingerprint(&self) -> Result<Option<String>, GuardrailError>;
}
