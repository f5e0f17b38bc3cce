//! Shared application state and adapter wiring

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::application::ports::outbound::{
    ContentStorePort, GenerationBackendPort, SnapshotRepositoryPort,
};
use crate::application::services::{Director, DirectorDeps, GuardrailService};
use crate::infrastructure::backend::OpenAiCompatibleBackend;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::crypto::SecretCipher;
use crate::infrastructure::persistence::{
    load_static_content, FileGuardrailRepository, InMemoryContentStore,
    InMemorySnapshotRepository, SqliteContentStore, SqliteSnapshotRepository,
};
use crate::infrastructure::world::InMemoryWorld;

/// `database_url` value that keeps everything in memory
const MEMORY_DATABASE: &str = "memory";

/// Shared application state
pub struct AppState {
    pub config: AppConfig,
    pub director: Arc<Director>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let (store, snapshots) = open_stores(&config).await?;

        let cipher = SecretCipher::from_passphrase(&config.secret_key);
        let guardrail_file = FileGuardrailRepository::new(&config.guardrails_path, cipher);
        tracing::info!("Guardrails: {}", guardrail_file.path().display());
        let guardrails = Arc::new(GuardrailService::load(Arc::new(guardrail_file)).await);

        let backend = open_backend(&config, &guardrails)?;
        let static_content = load_static_content(&config.static_dir).await?;

        let director = Arc::new(Director::new(DirectorDeps {
            world: Arc::new(InMemoryWorld::new()),
            store,
            snapshots,
            guardrails,
            backend: Some(backend),
            static_content,
            seed: config.automation_seed,
        }));
        director
            .initialize()
            .await
            .context("Failed to initialize director")?;

        Ok(Self { config, director })
    }
}

async fn open_stores(
    config: &AppConfig,
) -> Result<(Arc<dyn ContentStorePort>, Arc<dyn SnapshotRepositoryPort>)> {
    if config.database_url == MEMORY_DATABASE {
        tracing::warn!("Running without a database, published content is not persisted");
        return Ok((
            Arc::new(InMemoryContentStore::default()),
            Arc::new(InMemorySnapshotRepository::default()),
        ));
    }

    let pool = SqlitePool::connect(&config.database_url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_url))?;
    let store = SqliteContentStore::new(pool.clone())
        .await
        .context("Failed to prepare content table")?;
    let snapshots = SqliteSnapshotRepository::new(pool)
        .await
        .context("Failed to prepare snapshot table")?;
    tracing::info!("Database: {}", config.database_url);
    Ok((Arc::new(store), Arc::new(snapshots)))
}

/// The backend is always wired; roles without an endpoint fail their passes until one is routed
fn open_backend(
    config: &AppConfig,
    guardrails: &GuardrailService,
) -> Result<Arc<dyn GenerationBackendPort>> {
    if !config.has_backend() {
        tracing::info!("No default backend endpoint, generation roles follow the guardrail routing table");
    }
    let backend = OpenAiCompatibleBackend::new(config, guardrails.subscribe())
        .context("Failed to build backend client")?;
    Ok(Arc::new(backend))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::generation::{
        GenerationContext, GenerationOutcome, PassOutcome,
    };
    use crate::domain::entities::ContentKind;
    use crate::domain::value_objects::RoutingProfile;

    #[tokio::test]
    async fn test_memory_state_starts_with_static_content() {
        let dir = tempfile::tempdir().unwrap();
        let static_dir = dir.path().join("static");
        std::fs::create_dir_all(&static_dir).unwrap();
        std::fs::write(
            static_dir.join("locations.json"),
            r#"[{"id": "loc_home", "name": "Home", "description": "Where it starts", "biome": "meadow", "x": 8, "y": 8}]"#,
        )
        .unwrap();

        let config = AppConfig {
            database_url: MEMORY_DATABASE.to_string(),
            guardrails_path: dir.path().join("guardrails.json").display().to_string(),
            static_dir: static_dir.display().to_string(),
            ..AppConfig::default()
        };
        let state = AppState::new(config).await.unwrap();

        assert_eq!(state.director.locations().await.len(), 1);
        assert!(!state.director.is_paused());
    }

    #[tokio::test]
    async fn test_routing_added_at_runtime_reaches_generators() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            database_url: MEMORY_DATABASE.to_string(),
            guardrails_path: dir.path().join("guardrails.json").display().to_string(),
            static_dir: dir.path().join("missing").display().to_string(),
            backend_base_url: None,
            backend_timeout_secs: 2,
            ..AppConfig::default()
        };
        let state = AppState::new(config).await.unwrap();
        let director = &state.director;

        let creative_error = |outcome: &GenerationOutcome| match &outcome.passes[0].outcome {
            PassOutcome::Failed { error } => error.clone(),
            other => panic!("expected a failed creative pass, got {:?}", other),
        };

        let before = director
            .generate_content(ContentKind::Item, GenerationContext::default())
            .await
            .unwrap();
        assert!(creative_error(&before).contains("No backend configured"));

        let mut guardrails = director.guardrails().await;
        guardrails.routing.insert(
            "default".to_string(),
            RoutingProfile {
                base_url: Some("http://127.0.0.1:9/v1".to_string()),
                model: "writer".to_string(),
                api_key: None,
                temperature: None,
            },
        );
        director.update_guardrails(guardrails).await.unwrap();

        let after = director
            .generate_content(ContentKind::Item, GenerationContext::default())
            .await
            .unwrap();
        let error = creative_error(&after);
        assert!(!error.contains("No backend configured"), "{}", error);
    }

    #[tokio::test]
    async fn test_sqlite_state_creates_tables() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            database_url: format!("sqlite://{}?mode=rwc", dir.path().join("director.db").display()),
            guardrails_path: dir.path().join("guardrails.json").display().to_string(),
            static_dir: dir.path().join("missing").display().to_string(),
            ..AppConfig::default()
        };
        let state = AppState::new(config).await.unwrap();
        assert!(state.director.list_snapshots().await.unwrap().is_empty());
    }
}
