//! Guardrail config store - cached guardrails with hot reload
//!
//! The in-memory copy always holds a complete document with plaintext secrets.
//! Subscribers receive every accepted change through a `watch` channel, whether
//! it came from `save_config` or from an external edit picked up by the watcher.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, RwLock};

use crate::application::ports::outbound::{GuardrailError, GuardrailRepositoryPort};
use crate::domain::value_objects::GuardrailConfig;

pub struct GuardrailService {
    repository: Arc<dyn GuardrailRepositoryPort>,
    cache: RwLock<GuardrailConfig>,
    last_fingerprint: RwLock<Option<String>>,
    updates: watch::Sender<GuardrailConfig>,
}

impl GuardrailService {
    /// Load the stored document, falling back to hard defaults when it is missing or unreadable
    pub async fn load(repository: Arc<dyn GuardrailRepositoryPort>) -> Self {
        let config = match repository.load().await {
            Ok(Some(config)) => {
                tracing::info!("Guardrail config loaded");
                config
            }
            Ok(None) => {
                tracing::info!("No guardrail config stored, using defaults");
                GuardrailConfig::default()
            }
            Err(e) => {
                tracing::warn!("Guardrail config unreadable, using defaults: {}", e);
                GuardrailConfig::default()
            }
        };

        let fingerprint = match repository.fingerprint().await {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                tracing::warn!("Could not fingerprint guardrail config: {}", e);
                None
            }
        };

        let (updates, _) = watch::channel(config.clone());

        Self {
            repository,
            cache: RwLock::new(config),
            last_fingerprint: RwLock::new(fingerprint),
            updates,
        }
    }

    /// Current guardrails with plaintext secrets
    pub async fn get_config(&self) -> GuardrailConfig {
        self.cache.read().await.clone()
    }

    /// Current guardrails with every secret replaced by its display mask
    pub async fn masked_config(&self) -> GuardrailConfig {
        self.cache.read().await.masked()
    }

    pub fn subscribe(&self) -> watch::Receiver<GuardrailConfig> {
        self.updates.subscribe()
    }

    /// Persist a new document and publish it to subscribers
    ///
    /// Secrets still carrying the mask are restored from the in-memory value for
    /// the same routing role before anything is written.
    pub async fn save_config(&self, mut config: GuardrailConfig) -> Result<(), GuardrailError> {
        let previous = self.get_config().await;
        config.restore_masked_secrets(&previous);

        self.repository.save(&config).await?;

        let fingerprint = self.repository.fingerprint().await.unwrap_or_else(|e| {
            tracing::warn!("Could not fingerprint saved guardrail config: {}", e);
            None
        });

        *self.last_fingerprint.write().await = fingerprint;
        *self.cache.write().await = config.clone();
        self.updates.send_replace(config);

        tracing::info!("Guardrail config saved");
        Ok(())
    }

    /// Reload if the backing document changed since it was last seen
    ///
    /// Returns whether a new config was published. An edit that cannot be parsed
    /// is remembered so it is not retried every poll, and the current config stays.
    pub async fn check_for_external_changes(&self) -> bool {
        let current = match self.repository.fingerprint().await {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                tracing::warn!("Guardrail fingerprint check failed: {}", e);
                return false;
            }
        };

        if *self.last_fingerprint.read().await == current {
            return false;
        }

        let reloaded = match self.repository.load().await {
            Ok(Some(config)) => config,
            Ok(None) => GuardrailConfig::default(),
            Err(e) => {
                tracing::warn!("Edited guardrail config rejected, keeping current: {}", e);
                *self.last_fingerprint.write().await = current;
                return false;
            }
        };

        *self.last_fingerprint.write().await = current;
        *self.cache.write().await = reloaded.clone();
        self.updates.send_replace(reloaded);

        tracing::info!("Guardrail config reloaded after external edit");
        true
    }

    /// Poll the backing document for external edits until the task is aborted
    pub async fn run_watcher(self: Arc<Self>, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.check_for_external_changes().await;
        }
    }
}
