//! Guardrail repository backed by a pretty-printed JSON file
//!
//! Secrets are encrypted on the way out and decrypted on the way in. A secret
//! that cannot be decrypted is dropped with a warning so one bad value never
//! takes the whole document down. Writes go through a temporary file and a
//! rename so the watcher never fingerprints a half-written document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::application::ports::outbound::{GuardrailError, GuardrailRepositoryPort};
use crate::domain::value_objects::GuardrailConfig;
use crate::infrastructure::crypto::SecretCipher;

pub struct FileGuardrailRepository {
    path: PathBuf,
    cipher: SecretCipher,
}

impl FileGuardrailRepository {
    pub fn new(path: impl Into<PathBuf>, cipher: SecretCipher) -> Self {
        Self {
            path: path.into(),
            cipher,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_bytes(&self) -> Result<Option<Vec<u8>>, GuardrailError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GuardrailError::Io(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn decrypt_secrets(&self, config: &mut GuardrailConfig) {
        for (role, profile) in config.routing.iter_mut() {
            let Some(secret) = profile.api_key.take() else {
                continue;
            };
            match self.cipher.decrypt(&secret) {
                Ok(plaintext) => profile.api_key = Some(plaintext),
                Err(e) => tracing::warn!("Dropping unreadable secret for routing role {}: {}", role, e),
            }
        }
    }

    fn encrypt_secrets(&self, config: &mut GuardrailConfig) -> Result<(), GuardrailError> {
        for profile in config.routing.values_mut() {
            if let Some(secret) = profile.api_key.as_mut() {
                if !secret.is_empty() {
                    *secret = self.cipher.encrypt(secret)?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl GuardrailRepositoryPort for FileGuardrailRepository {
    async fn load(&self) -> Result<Option<GuardrailConfig>, GuardrailError> {
        let Some(bytes) = self.read_bytes().await? else {
            return Ok(None);
        };
        let mut config: GuardrailConfig = serde_json::from_slice(&bytes)
            .map_err(|e| GuardrailError::Serialization(e.to_string()))?;
        self.decrypt_secrets(&mut config);
        Ok(Some(config))
    }

    async fn save(&self, config: &GuardrailConfig) -> Result<(), GuardrailError> {
        let mut stored = config.clone();
        self.encrypt_secrets(&mut stored)?;
        let json = serde_json::to_vec_pretty(&stored)
            .map_err(|e| GuardrailError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GuardrailError::Io(e.to_string()))?;
        }
        let temp = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp, json)
            .await
            .map_err(|e| GuardrailError::Io(e.to_string()))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| GuardrailError::Io(e.to_string()))?;

        tracing::debug!("Guardrail config written to {}", self.path.display());
        Ok(())
    }

    async fn fingerprint(&self) -> Result<Option<String>, GuardrailError> {
        Ok(self
            .read_bytes()
            .await?
            .map(|bytes| format!("{:x}", Sha256::digest(&bytes))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::GuardrailService;
    use crate::domain::value_objects::RoutingProfile;
    use std::sync::Arc;

    fn repository(dir: &tempfile::TempDir) -> FileGuardrailRepository {
        FileGuardrailRepository::new(
            dir.path().join("guardrails.json"),
            SecretCipher::from_passphrase("test-key"),
        )
    }

    fn with_secret(secret: &str) -> GuardrailConfig {
        let mut config = GuardrailConfig::default();
        config.routing.insert(
            "default".to_string(),
            RoutingProfile {
                base_url: Some("http://localhost:8080/v1".to_string()),
                model: "writer".to_string(),
                api_key: Some(secret.to_string()),
                temperature: None,
            },
        );
        config
    }

    #[tokio::test]
    async fn test_secrets_encrypted_on_disk_and_restored_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir);
        repo.save(&with_secret("sk-live-0123456789")).await.unwrap();

        let on_disk = std::fs::read_to_string(repo.path()).unwrap();
        assert!(on_disk.contains("enc:v1:"));
        assert!(!on_disk.contains("sk-live-0123456789"));

        let loaded = repo.load().await.unwrap().unwrap();
        assert_eq!(
            loaded.routing["default"].api_key.as_deref(),
            Some("sk-live-0123456789")
        );
    }

    #[tokio::test]
    async fn test_secret_starting_with_marker_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir);
        repo.save(&with_secret("enc:v1:handwritten")).await.unwrap();

        let loaded = repo.load().await.unwrap().unwrap();
        assert_eq!(
            loaded.routing["default"].api_key.as_deref(),
            Some("enc:v1:handwritten")
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir);
        assert!(repo.load().await.unwrap().is_none());
        assert!(repo.fingerprint().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_partial_document_backfills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir);
        std::fs::write(repo.path(), r#"{"budgets": {"max_damage": 12}, "features": {"restricted_mode": true}}"#)
            .unwrap();

        let config = repo.load().await.unwrap().unwrap();
        assert_eq!(config.budgets.max_damage, 12);
        assert_eq!(config.budgets.max_defense, 40);
        assert!(config.features.restricted_mode);
        assert!(config.features.require_approval);
        assert_eq!(config.throttles.generations_per_minute, 30);
    }

    #[tokio::test]
    async fn test_corrupt_document_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir);
        std::fs::write(repo.path(), "{ not json").unwrap();

        assert!(matches!(repo.load().await, Err(GuardrailError::Serialization(_))));
        let service = GuardrailService::load(Arc::new(repo)).await;
        assert_eq!(service.get_config().await, GuardrailConfig::default());
    }

    #[tokio::test]
    async fn test_undecryptable_secret_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        repository(&dir).save(&with_secret("sk-live-0123456789")).await.unwrap();

        let other_key = FileGuardrailRepository::new(
            dir.path().join("guardrails.json"),
            SecretCipher::from_passphrase("another-key"),
        );
        let loaded = other_key.load().await.unwrap().unwrap();
        assert!(loaded.routing["default"].api_key.is_none());
        assert_eq!(loaded.routing["default"].model, "writer");
    }

    #[tokio::test]
    async fn test_external_edit_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(repository(&dir));
        repo.save(&GuardrailConfig::default()).await.unwrap();
        let service = GuardrailService::load(repo.clone()).await;
        let mut updates = service.subscribe();
        assert!(!service.check_for_external_changes().await);

        let mut edited = GuardrailConfig::default();
        edited.budgets.max_item_value = 77;
        std::fs::write(repo.path(), serde_json::to_vec_pretty(&edited).unwrap()).unwrap();

        assert!(service.check_for_external_changes().await);
        assert_eq!(service.get_config().await.budgets.max_item_value, 77);
        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().budgets.max_item_value, 77);
    }
}
