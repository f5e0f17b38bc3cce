//! Director - orchestrates generation, approval, publishing and world events
//!
//! The director owns one instance of every service and exposes the command
//! surface that the control panel and the automation loop drive. Shared state
//! lives behind async locks taken only for short reads and writes, never across
//! a generation or store call.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

use crate::application::dto::{
    ChunkStatusDto, DirectorNotification, DirectorStatusDto, EventEndReason,
};
use crate::application::ports::outbound::{
    ContentRecord, ContentStoreError, ContentStorePort, GenerationBackendPort, GuardrailError,
    RecordLocation, RecordMetadata, SnapshotError, SnapshotRepositoryPort, WorldModelPort,
};
use crate::application::services::activity_tracker::{bucket_for, ActivityTracker, ACTIVITY_BUCKET_SIZE};
use crate::application::services::automation::AutomationActions;
use crate::application::services::chunk_tracker::{chunk_center, chunk_coords, ChunkTracker, CHUNK_SIZE};
use crate::application::services::event_manager::{
    choose_anchor, dress_entity, EventManager, SpawnContent,
};
use crate::application::services::generation::{
    default_generators, ContentGenerator, GenerationContext, GenerationOutcome, LocationContext,
};
use crate::application::services::guardrail_service::GuardrailService;
use crate::application::services::proposal_validator::validate;
use crate::application::services::publisher::{PublishError, Publisher};
use crate::application::services::registry::{
    CharacterRegistry, ItemRegistry, LocationRegistry, Registry, StaticContent,
};
use crate::application::services::snapshot_service::SnapshotService;
use crate::domain::entities::{
    ActiveEvent, CharacterDefinition, ContentKind, Definition, EntityKind, EventPayload,
    ItemDefinition, LocationDefinition, Originator, Proposal, ProposalError, ProposalPayload,
    ProposalStatus, SnapshotSummary, WorldEntity, WorldEventType, TAG_ACTOR, TAG_LOCATION,
};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{
    ChunkCoord, EntityId, EventId, EventSpawnConfig, GuardrailConfig, PersonalityConfig,
    Position, ProposalId, SnapshotId,
};

const NOTIFICATION_CAPACITY: usize = 256;
const DOMAIN_EVENT_CAPACITY: usize = 1024;
const THROTTLE_WINDOW: Duration = Duration::from_secs(60);
/// Grid step between a location and its frontier neighbors, one chunk
const FRONTIER_STEP: i64 = CHUNK_SIZE as i64;

#[derive(Debug, thiserror::Error)]
pub enum DirectorError {
    #[error("Proposal not found: {0}")]
    ProposalNotFound(ProposalId),
    #[error("Generation of {0} content is disabled")]
    FeatureDisabled(ContentKind),
    #[error("{0} events are disabled")]
    EventDisabled(WorldEventType),
    #[error("Generation throttled: {0}")]
    Throttled(String),
    #[error("No generator for {0} content")]
    NoGenerator(ContentKind),
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Proposal(#[from] ProposalError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error(transparent)]
    Store(#[from] ContentStoreError),
    #[error(transparent)]
    Guardrails(#[from] GuardrailError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Everything the director is wired to
pub struct DirectorDeps {
    pub world: Arc<dyn WorldModelPort>,
    pub store: Arc<dyn ContentStorePort>,
    pub snapshots: Arc<dyn SnapshotRepositoryPort>,
    pub guardrails: Arc<GuardrailService>,
    pub backend: Option<Arc<dyn GenerationBackendPort>>,
    pub static_content: StaticContent,
    /// Seed for anchors, frontier picks and proposal seeds
    pub seed: Option<u64>,
}

/// Result of asking for a world event
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TriggerOutcome {
    Queued { proposal: Box<Proposal> },
    Started { event: ActiveEvent },
}

/// Holds one expansion slot until dropped
struct ExpansionSlot<'a>(&'a AtomicUsize);

impl<'a> ExpansionSlot<'a> {
    fn claim(in_flight: &'a AtomicUsize, max: usize) -> Option<Self> {
        in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < max).then_some(n + 1))
            .ok()
            .map(|_| Self(in_flight))
    }
}

impl Drop for ExpansionSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Director {
    world: Arc<dyn WorldModelPort>,
    store: Arc<dyn ContentStorePort>,
    backend: Option<Arc<dyn GenerationBackendPort>>,
    guardrail_store: Arc<GuardrailService>,
    generators: HashMap<ContentKind, Arc<dyn ContentGenerator>>,
    publisher: Publisher,
    characters: CharacterRegistry,
    items: ItemRegistry,
    locations: LocationRegistry,
    chunks: ChunkTracker,
    events: EventManager,
    activity: Arc<ActivityTracker>,
    snapshots: SnapshotService,
    pending: RwLock<Vec<Proposal>>,
    personality: RwLock<PersonalityConfig>,
    event_config: RwLock<EventSpawnConfig>,
    paused: AtomicBool,
    recent_generations: Mutex<VecDeque<Instant>>,
    expansions_in_flight: AtomicUsize,
    rng: Mutex<StdRng>,
    notifications: broadcast::Sender<DirectorNotification>,
    domain_events: broadcast::Sender<DomainEvent>,
}

impl Director {
    pub fn new(deps: DirectorDeps) -> Self {
        let rng = match deps.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        let (domain_events, _) = broadcast::channel(DOMAIN_EVENT_CAPACITY);
        let StaticContent {
            characters,
            items,
            locations,
        } = deps.static_content;

        Self {
            publisher: Publisher::new(deps.store.clone()),
            characters: Registry::new(characters, deps.store.clone()),
            items: Registry::new(items, deps.store.clone()),
            locations: Registry::new(locations, deps.store.clone()),
            snapshots: SnapshotService::new(deps.snapshots),
            world: deps.world,
            store: deps.store,
            backend: deps.backend,
            guardrail_store: deps.guardrails,
            generators: default_generators(),
            chunks: ChunkTracker::new(),
            events: EventManager::new(),
            activity: Arc::new(ActivityTracker::new()),
            pending: RwLock::new(Vec::new()),
            personality: RwLock::new(PersonalityConfig::default()),
            event_config: RwLock::new(EventSpawnConfig::default()),
            paused: AtomicBool::new(false),
            recent_generations: Mutex::new(VecDeque::new()),
            expansions_in_flight: AtomicUsize::new(0),
            rng: Mutex::new(rng),
            notifications,
            domain_events,
        }
    }

    /// Load registries, rebuild the chunk set and place known locations in the world
    pub async fn initialize(&self) -> anyhow::Result<()> {
        let characters = self
            .characters
            .reload()
            .await
            .context("Failed to load character registry")?;
        let items = self.items.reload().await.context("Failed to load item registry")?;
        let locations = self
            .locations
            .reload()
            .await
            .context("Failed to load location registry")?;
        let chunks = self
            .chunks
            .rebuild_from_locations(self.store.as_ref())
            .await
            .context("Failed to rebuild generated chunks")?;
        let placed = self.instantiate_locations().await;

        info!(
            characters,
            items,
            locations,
            chunks,
            placed,
            "Director initialized"
        );
        Ok(())
    }

    // ---- Lifecycle and tuning ----

    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::SeqCst) {
            info!("Director paused");
            self.notify(DirectorNotification::Paused);
        }
    }

    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::SeqCst) {
            info!("Director resumed");
            self.notify(DirectorNotification::Resumed);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub async fn status(&self) -> DirectorStatusDto {
        let guardrails = self.guardrail_store.get_config().await;
        DirectorStatusDto {
            paused: self.is_paused(),
            pending_proposals: self.pending.read().await.len(),
            active_events: self.events.active_count().await,
            generated_chunks: self.chunks.generated_chunks().await.len(),
            require_approval: guardrails.features.require_approval,
            restricted_mode: guardrails.features.restricted_mode,
        }
    }

    pub async fn personality(&self) -> PersonalityConfig {
        self.personality.read().await.clone()
    }

    pub async fn update_personality(&self, config: PersonalityConfig) -> PersonalityConfig {
        *self.personality.write().await = config.clone();
        info!(?config, "Personality updated");
        self.notify(DirectorNotification::PersonalityUpdated);
        config
    }

    pub async fn event_config(&self) -> EventSpawnConfig {
        self.event_config.read().await.clone()
    }

    /// Replace the spawn tuning; out-of-range values are refused and the old config kept
    pub async fn update_event_config(
        &self,
        config: EventSpawnConfig,
    ) -> Result<EventSpawnConfig, DirectorError> {
        let problems = config.problems();
        if !problems.is_empty() {
            return Err(DirectorError::InvalidRequest(problems.join("; ")));
        }
        *self.event_config.write().await = config.clone();
        info!("Event spawn config updated");
        self.notify(DirectorNotification::EventConfigUpdated);
        Ok(config)
    }

    pub async fn guardrails(&self) -> GuardrailConfig {
        self.guardrail_store.get_config().await
    }

    pub async fn masked_guardrails(&self) -> GuardrailConfig {
        self.guardrail_store.masked_config().await
    }

    /// Persist new guardrails; masked secrets keep their stored values. Returns the masked result.
    #[instrument(skip(self, config))]
    pub async fn update_guardrails(
        &self,
        config: GuardrailConfig,
    ) -> Result<GuardrailConfig, DirectorError> {
        self.guardrail_store.save_config(config).await?;
        info!("Guardrails updated");
        self.notify(DirectorNotification::GuardrailsUpdated);
        Ok(self.guardrail_store.masked_config().await)
    }

    pub fn guardrail_service(&self) -> Arc<GuardrailService> {
        self.guardrail_store.clone()
    }

    // ---- Proposals ----

    pub async fn pending_proposals(&self) -> Vec<Proposal> {
        self.pending.read().await.clone()
    }

    #[instrument(skip(self), fields(proposal_id = %id))]
    pub async fn approve_proposal(&self, id: ProposalId) -> Result<Proposal, DirectorError> {
        let proposal = self
            .take_pending(id)
            .await
            .ok_or(DirectorError::ProposalNotFound(id))?;
        let guardrails = self.guardrail_store.get_config().await;

        let proposal = self.process_approval(proposal, &guardrails).await?;
        if proposal.status == ProposalStatus::Draft {
            return Err(DirectorError::Validation(proposal.validation_errors));
        }
        Ok(proposal)
    }

    /// Drop a pending proposal; `false` when it is not pending
    #[instrument(skip(self), fields(proposal_id = %id))]
    pub async fn reject_proposal(&self, id: ProposalId) -> bool {
        let Some(mut proposal) = self.take_pending(id).await else {
            debug!("Nothing to reject");
            return false;
        };
        if let Err(e) = proposal.reject() {
            warn!("Rejected proposal in unexpected state: {}", e);
        }
        info!(kind = %proposal.kind(), "Proposal rejected");
        self.notify(DirectorNotification::ProposalRejected { proposal_id: id });
        true
    }

    /// Fails fast when generation of `kind` is switched off
    pub async fn ensure_enabled(&self, kind: ContentKind) -> Result<(), DirectorError> {
        if self.guardrail_store.get_config().await.features.allows(kind) {
            Ok(())
        } else {
            Err(DirectorError::FeatureDisabled(kind))
        }
    }

    /// Generate a proposal and send it through the approval gate
    #[instrument(skip(self, context), fields(kind = %kind, originator = ?context.originator))]
    pub async fn generate_content(
        &self,
        kind: ContentKind,
        context: GenerationContext,
    ) -> Result<GenerationOutcome, DirectorError> {
        let guardrails = self.guardrail_store.get_config().await;
        if !guardrails.features.allows(kind) {
            return Err(DirectorError::FeatureDisabled(kind));
        }
        let generator = self
            .generators
            .get(&kind)
            .cloned()
            .ok_or(DirectorError::NoGenerator(kind))?;
        self.check_generation_rate(&guardrails).await?;

        let GenerationOutcome { proposal, passes } = generator
            .generate(&guardrails, self.backend.as_deref(), &context)
            .await;
        debug!(proposal_id = %proposal.id, score = ?proposal.score, "Generated {} draft", kind);

        let proposal = self.submit(proposal, &guardrails).await?;
        Ok(GenerationOutcome { proposal, passes })
    }

    /// Run a generation in the background, reporting failure as a notification
    pub fn spawn_generation(self: &Arc<Self>, kind: ContentKind, context: GenerationContext) {
        let director = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = director.generate_content(kind, context).await {
                warn!("Background {} generation failed: {}", kind, e);
                director.notify(DirectorNotification::GenerationFailed {
                    kind,
                    error: e.to_string(),
                });
            }
        });
    }

    /// Submit operator-supplied content through the same gate as generated content
    #[instrument(skip(self, payload), fields(kind = %payload.kind()))]
    pub async fn submit_payload(
        &self,
        payload: ProposalPayload,
        originator: Originator,
    ) -> Result<Proposal, DirectorError> {
        let guardrails = self.guardrail_store.get_config().await;
        let kind = payload.kind();
        if !guardrails.features.allows(kind) {
            return Err(DirectorError::FeatureDisabled(kind));
        }
        let proposal = Proposal::new(payload, self.next_seed().await, originator);
        self.submit(proposal, &guardrails).await
    }

    async fn submit(
        &self,
        proposal: Proposal,
        guardrails: &GuardrailConfig,
    ) -> Result<Proposal, DirectorError> {
        if guardrails.features.require_approval {
            self.queue(proposal.clone()).await;
            return Ok(proposal);
        }
        self.process_approval(proposal, guardrails).await
    }

    async fn queue(&self, proposal: Proposal) {
        info!(proposal_id = %proposal.id, kind = %proposal.kind(), "Proposal queued for approval");
        self.pending.write().await.push(proposal.clone());
        self.notify(DirectorNotification::ProposalQueued {
            proposal: Box::new(proposal),
        });
    }

    async fn take_pending(&self, id: ProposalId) -> Option<Proposal> {
        let mut pending = self.pending.write().await;
        let index = pending.iter().position(|p| p.id == id)?;
        Some(pending.remove(index))
    }

    /// Approve, validate, publish, reload, instantiate
    ///
    /// A proposal failing validation goes back to the pending list as a draft and
    /// is returned with `Ok`; callers look at its status.
    async fn process_approval(
        &self,
        mut proposal: Proposal,
        guardrails: &GuardrailConfig,
    ) -> Result<Proposal, DirectorError> {
        proposal.approve()?;

        if let ProposalPayload::Event(payload) = &proposal.payload {
            let event = self
                .spawn_event(payload.event_type, payload.duration_secs, payload.anchor, guardrails)
                .await;
            info!(proposal_id = %proposal.id, event_id = %event.id, "Approved event started");
            return Ok(proposal);
        }

        let report = validate(&proposal, guardrails);
        if !report.valid {
            warn!(
                proposal_id = %proposal.id,
                "Proposal failed validation: {}",
                report.errors.join("; ")
            );
            proposal.return_to_draft(report.errors.clone())?;
            self.pending.write().await.push(proposal.clone());
            self.notify(DirectorNotification::ValidationFailed {
                proposal_id: proposal.id,
                errors: report.errors,
            });
            return Ok(proposal);
        }

        let kind = proposal.kind();
        if kind == ContentKind::Location && guardrails.features.auto_snapshot_on_risk {
            self.auto_snapshot(format!("before expansion: {}", proposal.payload.name()))
                .await;
        }

        let location = match self.publisher.publish(&mut proposal).await {
            Ok(location) => location,
            Err(e) => {
                error!(proposal_id = %proposal.id, "Failed to publish proposal: {}", e);
                if let Err(transition) = proposal.mark_failed(e.to_string()) {
                    warn!("Could not mark proposal failed: {}", transition);
                }
                self.notify(DirectorNotification::ProposalFailed {
                    proposal_id: proposal.id,
                    error: e.to_string(),
                });
                return Err(e.into());
            }
        };

        self.reload_registry(kind).await;
        let anchor = self.roll_anchor().await;
        self.instantiate(&proposal.payload, anchor);
        if let ProposalPayload::Location(def) = &proposal.payload {
            self.chunks
                .mark_chunk_generated(chunk_coords(def.x as f64, def.y as f64))
                .await;
        }

        self.notify(DirectorNotification::ProposalPublished {
            proposal_id: proposal.id,
            kind,
            location: location.to_string(),
        });
        Ok(proposal)
    }

    async fn check_generation_rate(&self, guardrails: &GuardrailConfig) -> Result<(), DirectorError> {
        let limit = guardrails.throttles.generations_per_minute as usize;
        if limit == 0 {
            return Ok(());
        }
        let now = Instant::now();
        let mut recent = self.recent_generations.lock().await;
        while recent
            .front()
            .is_some_and(|at| now.duration_since(*at) >= THROTTLE_WINDOW)
        {
            recent.pop_front();
        }
        if recent.len() >= limit {
            return Err(DirectorError::Throttled(format!(
                "limit of {} generations per minute reached",
                limit
            )));
        }
        recent.push_back(now);
        Ok(())
    }

    async fn reload_registry(&self, kind: ContentKind) {
        let result = match kind {
            ContentKind::Character => self.characters.reload().await,
            ContentKind::Item => self.items.reload().await,
            ContentKind::Location => self.locations.reload().await,
            ContentKind::Quest | ContentKind::Event => return,
        };
        if let Err(e) = result {
            warn!("Failed to reload {} registry: {}", kind, e);
        }
    }

    /// Put published content into the world; locations sit at their own coordinates
    fn instantiate(&self, payload: &ProposalPayload, anchor: Position) -> Option<EntityId> {
        let mut entity = match payload {
            ProposalPayload::Character(def) => {
                let kind = if def.hostile { EntityKind::Mob } else { EntityKind::Npc };
                WorldEntity::new(def.name.clone(), kind).at(anchor)
            }
            ProposalPayload::Item(def) => WorldEntity::new(def.name.clone(), EntityKind::Item).at(anchor),
            ProposalPayload::Quest(def) => {
                WorldEntity::new(def.name.clone(), EntityKind::QuestMarker).at(anchor)
            }
            ProposalPayload::Location(def) => WorldEntity::new(def.name.clone(), EntityKind::Location)
                .at(Position::new(def.x as f64, def.y as f64))
                .stationary(),
            ProposalPayload::Event(_) => return None,
        };
        dress_entity(&mut entity, payload);

        let name = entity.name.clone();
        match self.world.add_entity(entity) {
            Ok(id) => {
                debug!(entity_id = %id, "Instantiated {}", name);
                Some(id)
            }
            Err(e) => {
                warn!("Failed to instantiate {}: {}", name, e);
                None
            }
        }
    }

    async fn instantiate_locations(&self) -> usize {
        let present: HashSet<String> = self
            .world
            .entities_with_tag(TAG_LOCATION)
            .into_iter()
            .filter_map(|entity| entity.definition_id)
            .collect();

        let mut placed = 0;
        for location in self.locations.all().await {
            if present.contains(&location.id) {
                continue;
            }
            let position = Position::new(location.x as f64, location.y as f64);
            if self.instantiate(&location.into_payload(), position).is_some() {
                placed += 1;
            }
        }
        placed
    }

    // ---- World events ----

    pub async fn trigger_world_event(
        &self,
        event_type: WorldEventType,
        force: bool,
        duration_override: Option<u64>,
    ) -> Result<TriggerOutcome, DirectorError> {
        self.trigger_world_event_by(Originator::Manual, event_type, force, duration_override, None)
            .await
    }

    /// Start an event now, or queue it when approval is required and not forced
    #[instrument(skip(self), fields(event_type = %event_type))]
    pub async fn trigger_world_event_by(
        &self,
        originator: Originator,
        event_type: WorldEventType,
        force: bool,
        duration_override: Option<u64>,
        anchor: Option<Position>,
    ) -> Result<TriggerOutcome, DirectorError> {
        let guardrails = self.guardrail_store.get_config().await;
        if !guardrails.features.enable_events {
            return Err(DirectorError::FeatureDisabled(ContentKind::Event));
        }
        if !self.event_config.read().await.settings(event_type).enabled {
            return Err(DirectorError::EventDisabled(event_type));
        }

        if guardrails.features.require_approval && !force {
            let payload = EventPayload {
                event_type,
                duration_secs: duration_override,
                note: Some(format!("{} requested by {:?}", event_type.label(), originator)),
                anchor,
            };
            let proposal = Proposal::new(
                ProposalPayload::Event(payload),
                self.next_seed().await,
                originator,
            );
            self.queue(proposal.clone()).await;
            return Ok(TriggerOutcome::Queued {
                proposal: Box::new(proposal),
            });
        }

        let event = self
            .spawn_event(event_type, duration_override, anchor, &guardrails)
            .await;
        Ok(TriggerOutcome::Started { event })
    }

    async fn spawn_event(
        &self,
        event_type: WorldEventType,
        duration_override: Option<u64>,
        anchor: Option<Position>,
        guardrails: &GuardrailConfig,
    ) -> ActiveEvent {
        if event_type.is_hostile() && guardrails.features.auto_snapshot_on_risk {
            self.auto_snapshot(format!("before {}", event_type.label())).await;
        }

        let config = self.event_config.read().await.clone();
        let plan = {
            let mut rng = self.rng.lock().await;
            let anchor = anchor.unwrap_or_else(|| choose_anchor(self.world.as_ref(), &mut rng));
            EventManager::plan_spawn(event_type, &config, anchor, duration_override, &mut rng)
        };

        let mut entity_ids = Vec::with_capacity(plan.spawns.len());
        for spawn in plan.spawns {
            let mut entity = spawn.entity;
            if let Some(content) = spawn.content {
                if let Some(payload) = self.generate_spawn_content(content, guardrails).await {
                    dress_entity(&mut entity, &payload);
                }
            }
            let name = entity.name.clone();
            match self.world.add_entity(entity) {
                Ok(id) => entity_ids.push(id),
                Err(e) => warn!("Failed to add {} for {} event: {}", name, event_type, e),
            }
        }

        let event = ActiveEvent::new(event_type, plan.label, plan.duration_secs, entity_ids);
        self.events.register(event.clone()).await;
        info!(
            event_id = %event.id,
            entities = event.entity_ids.len(),
            "{} started",
            event.label
        );
        self.notify(DirectorNotification::EventStarted {
            event_id: event.id,
            event_type,
            entity_count: event.entity_ids.len(),
            expires_at: event.expires_at(),
        });
        event
    }

    async fn generate_spawn_content(
        &self,
        content: SpawnContent,
        guardrails: &GuardrailConfig,
    ) -> Option<ProposalPayload> {
        let (kind, context) = match content {
            SpawnContent::Character(context) => (ContentKind::Character, context),
            SpawnContent::Item(context) => (ContentKind::Item, context),
            SpawnContent::Quest(context) => (ContentKind::Quest, context),
        };
        let generator = self.generators.get(&kind)?;
        // Spawn content shares the generation budget; once it is spent the curated fallback is used
        let backend = match self.check_generation_rate(guardrails).await {
            Ok(()) => self.backend.as_deref(),
            Err(e) => {
                debug!("{} spawn content uses the fallback: {}", kind, e);
                None
            }
        };
        let outcome = generator.generate(guardrails, backend, &context).await;
        Some(outcome.proposal.payload)
    }

    pub async fn active_events(&self) -> Vec<ActiveEvent> {
        self.events.active_events().await
    }

    /// End an event now; `false` for an unknown id
    #[instrument(skip(self), fields(event_id = %id))]
    pub async fn stop_event(&self, id: EventId) -> bool {
        match self.events.stop_event(id, self.world.as_ref()).await {
            Some(event) => {
                self.notify(DirectorNotification::EventEnded {
                    event_id: event.id,
                    event_type: event.event_type,
                    reason: EventEndReason::Stopped,
                });
                true
            }
            None => false,
        }
    }

    /// Tear down every event expired at `now`
    pub async fn sweep_events(&self, now: DateTime<Utc>) -> Vec<ActiveEvent> {
        let ended = self.events.check_active_events(now, self.world.as_ref()).await;
        for event in &ended {
            self.notify(DirectorNotification::EventEnded {
                event_id: event.id,
                event_type: event.event_type,
                reason: EventEndReason::Expired,
            });
        }
        ended
    }

    // ---- Chunks and expansion ----

    pub async fn chunk_status(&self, cx: i64, cy: i64) -> Result<ChunkStatusDto, DirectorError> {
        let coord = ChunkCoord::new(cx, cy);
        let locations = self
            .chunks
            .locations_in_chunk(coord, self.store.as_ref())
            .await?;
        Ok(ChunkStatusDto {
            cx,
            cy,
            generated: self.chunks.is_chunk_generated(coord).await,
            locations,
        })
    }

    /// Propose a location at the center of a chunk that has not been generated
    #[instrument(skip(self))]
    pub async fn generate_chunk(&self, cx: i64, cy: i64) -> Result<GenerationOutcome, DirectorError> {
        let context = self.chunk_context(cx, cy).await?;
        self.generate_content(ContentKind::Location, context).await
    }

    /// Generation context for a chunk's center location; fails if the chunk is already generated
    pub async fn chunk_context(&self, cx: i64, cy: i64) -> Result<GenerationContext, DirectorError> {
        let coord = ChunkCoord::new(cx, cy);
        if self.chunks.is_chunk_generated(coord).await {
            return Err(DirectorError::InvalidRequest(format!(
                "Chunk {} is already generated",
                coord
            )));
        }
        let center = chunk_center(coord);
        let (x, y) = (center.x.round() as i64, center.y.round() as i64);
        let neighbor = self.nearest_location(x, y).await;
        Ok(GenerationContext::new(Originator::Manual).with_location(location_context(x, y, neighbor)))
    }

    /// Delete a chunk's locations from the store and the world; returns the removed count
    #[instrument(skip(self))]
    pub async fn delete_chunk(&self, cx: i64, cy: i64) -> Result<usize, DirectorError> {
        let coord = ChunkCoord::new(cx, cy);
        let removed = self.chunks.delete_chunk(coord, self.store.as_ref()).await?;

        if !removed.is_empty() {
            let removed_ids: HashSet<&str> = removed.iter().map(String::as_str).collect();
            for entity in self.world.entities_with_tag(TAG_LOCATION) {
                let owned = entity
                    .definition_id
                    .as_deref()
                    .is_some_and(|id| removed_ids.contains(id));
                if owned {
                    if let Err(e) = self.world.remove_entity(entity.id) {
                        warn!("Failed to remove location entity {}: {}", entity.id, e);
                    }
                }
            }
            self.reload_registry(ContentKind::Location).await;
        }

        self.notify(DirectorNotification::ChunkDeleted {
            chunk: coord,
            removed_records: removed.len(),
        });
        Ok(removed.len())
    }

    /// Ungenerated chunks around actors
    pub async fn chunk_frontier(&self) -> Vec<ChunkCoord> {
        self.chunks.chunks_to_generate(self.world.as_ref()).await
    }

    /// Propose one location next to an existing one; `false` when throttled or nothing is free
    #[instrument(skip(self))]
    pub async fn expand_frontier(&self) -> Result<bool, DirectorError> {
        let guardrails = self.guardrail_store.get_config().await;
        if !guardrails.features.enable_locations {
            return Ok(false);
        }
        let max = guardrails.throttles.max_concurrent_expansions as usize;
        let Some(_slot) = ExpansionSlot::claim(&self.expansions_in_flight, max) else {
            debug!("Expansion skipped, {} already in flight", max);
            return Ok(false);
        };
        let Some((x, y, neighbor)) = self.pick_frontier_cell().await else {
            debug!("No free frontier cell");
            return Ok(false);
        };

        let context = GenerationContext::new(Originator::Automation)
            .with_location(location_context(x, y, neighbor));
        self.generate_content(ContentKind::Location, context).await?;
        Ok(true)
    }

    async fn pick_frontier_cell(&self) -> Option<(i64, i64, Option<LocationDefinition>)> {
        let locations = self.locations.all().await;
        let pending: HashSet<(i64, i64)> = self
            .pending
            .read()
            .await
            .iter()
            .filter_map(|proposal| match &proposal.payload {
                ProposalPayload::Location(def) => Some((def.x, def.y)),
                _ => None,
            })
            .collect();
        let occupied: HashSet<(i64, i64)> = locations.iter().map(|l| (l.x, l.y)).collect();
        let generated: BTreeSet<ChunkCoord> = self.chunks.generated_chunks().await.into_iter().collect();
        let is_free = |x: i64, y: i64| {
            !occupied.contains(&(x, y))
                && !pending.contains(&(x, y))
                && !generated.contains(&chunk_coords(x as f64, y as f64))
        };

        let mut candidates = Vec::new();
        if locations.is_empty() {
            let origin = chunk_center(ChunkCoord::new(0, 0));
            let (x, y) = (origin.x as i64, origin.y as i64);
            if is_free(x, y) {
                candidates.push((x, y, None));
            }
        }
        for location in &locations {
            for (dx, dy) in [(FRONTIER_STEP, 0), (-FRONTIER_STEP, 0), (0, FRONTIER_STEP), (0, -FRONTIER_STEP)] {
                let (x, y) = (location.x + dx, location.y + dy);
                if is_free(x, y) {
                    candidates.push((x, y, Some(location.clone())));
                }
            }
        }
        if candidates.is_empty() {
            return None;
        }

        let pick = self.rng.lock().await.gen_range(0..candidates.len());
        Some(candidates.swap_remove(pick))
    }

    async fn nearest_location(&self, x: i64, y: i64) -> Option<LocationDefinition> {
        self.locations
            .all()
            .await
            .into_iter()
            .min_by_key(|l| (l.x - x).pow(2) + (l.y - y).pow(2))
    }

    // ---- Registries ----

    pub async fn character(&self, id: &str) -> Option<CharacterDefinition> {
        self.characters.find(id).await
    }

    pub async fn characters(&self) -> Vec<CharacterDefinition> {
        self.characters.all().await
    }

    pub async fn update_character(
        &self,
        definition: CharacterDefinition,
    ) -> Result<RecordLocation, DirectorError> {
        self.save_definition(&self.characters, definition).await
    }

    pub async fn delete_character(&self, id: &str) -> Result<bool, DirectorError> {
        self.delete_definition(&self.characters, id).await
    }

    pub async fn item(&self, id: &str) -> Option<ItemDefinition> {
        self.items.find(id).await
    }

    pub async fn items(&self) -> Vec<ItemDefinition> {
        self.items.all().await
    }

    pub async fn update_item(&self, definition: ItemDefinition) -> Result<RecordLocation, DirectorError> {
        self.save_definition(&self.items, definition).await
    }

    pub async fn delete_item(&self, id: &str) -> Result<bool, DirectorError> {
        self.delete_definition(&self.items, id).await
    }

    pub async fn locations(&self) -> Vec<LocationDefinition> {
        self.locations.all().await
    }

    /// Write an operator edit straight to the store, keeping generation metadata
    async fn save_definition<D: Definition>(
        &self,
        registry: &Registry<D>,
        definition: D,
    ) -> Result<RecordLocation, DirectorError> {
        let id = definition.id().trim().to_string();
        if id.is_empty() {
            return Err(DirectorError::InvalidRequest("Definition id must not be empty".to_string()));
        }

        let metadata = match self.store.read_record(D::KIND, &id).await? {
            Some(existing) => RecordMetadata {
                published_at: Utc::now(),
                ..existing.metadata
            },
            None => RecordMetadata::manual(),
        };
        let record = ContentRecord {
            kind: D::KIND,
            id: id.clone(),
            payload: definition.into_payload(),
            metadata,
        };
        let location = self.store.write_record(&record).await?;

        if let Err(e) = registry.reload().await {
            warn!("Failed to reload {} registry: {}", D::KIND, e);
        }
        info!("Updated {}", location);
        self.notify(DirectorNotification::ContentUpdated { kind: D::KIND, id });
        Ok(location)
    }

    async fn delete_definition<D: Definition>(
        &self,
        registry: &Registry<D>,
        id: &str,
    ) -> Result<bool, DirectorError> {
        let removed = self.store.delete_record(D::KIND, id).await?;
        if removed {
            if let Err(e) = registry.reload().await {
                warn!("Failed to reload {} registry: {}", D::KIND, e);
            }
            info!("Deleted {}/{}", D::KIND, id);
            self.notify(DirectorNotification::ContentDeleted {
                kind: D::KIND,
                id: id.to_string(),
            });
        } else if registry.is_static(id) {
            debug!("{}/{} is static content and cannot be deleted", D::KIND, id);
        }
        Ok(removed)
    }

    // ---- Snapshots ----

    #[instrument(skip(self))]
    pub async fn create_snapshot(&self, label: Option<String>) -> Result<SnapshotSummary, DirectorError> {
        let label = label
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| format!("manual {}", Utc::now().format("%Y-%m-%d %H:%M:%S")));
        let pending = self.pending.read().await.clone();
        let snapshot = self
            .snapshots
            .capture(label, self.world.as_ref(), &self.events, &self.chunks, pending)
            .await?;

        self.notify(DirectorNotification::SnapshotCreated {
            snapshot_id: snapshot.id,
            label: snapshot.label.clone(),
        });
        Ok(snapshot.summary())
    }

    #[instrument(skip(self), fields(snapshot_id = %id))]
    pub async fn restore_snapshot(&self, id: SnapshotId) -> Result<SnapshotSummary, DirectorError> {
        let snapshot = self
            .snapshots
            .restore(id, self.world.as_ref(), &self.events, &self.chunks)
            .await?;
        *self.pending.write().await = snapshot.pending_proposals.clone();

        self.notify(DirectorNotification::SnapshotRestored { snapshot_id: id });
        Ok(snapshot.summary())
    }

    pub async fn list_snapshots(&self) -> Result<Vec<SnapshotSummary>, DirectorError> {
        Ok(self.snapshots.list().await?)
    }

    pub async fn delete_snapshot(&self, id: SnapshotId) -> Result<bool, DirectorError> {
        Ok(self.snapshots.delete(id).await?)
    }

    /// Snapshot before a risky action; failure never blocks the action
    async fn auto_snapshot(&self, label: String) {
        if let Err(e) = self.create_snapshot(Some(label)).await {
            warn!("Auto-snapshot failed, continuing: {}", e);
        }
    }

    // ---- Channels ----

    /// Report a movement or combat in the world
    pub fn record_activity(&self, event: DomainEvent) {
        // No subscriber simply means the tracker is not running
        let _ = self.domain_events.send(event);
    }

    pub fn subscribe_domain_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.domain_events.subscribe()
    }

    pub fn notifications(&self) -> broadcast::Receiver<DirectorNotification> {
        self.notifications.subscribe()
    }

    pub fn activity(&self) -> Arc<ActivityTracker> {
        self.activity.clone()
    }

    fn notify(&self, notification: DirectorNotification) {
        let _ = self.notifications.send(notification);
    }

    async fn next_seed(&self) -> u64 {
        self.rng.lock().await.gen()
    }

    async fn roll_anchor(&self) -> Position {
        let mut rng = self.rng.lock().await;
        choose_anchor(self.world.as_ref(), &mut rng)
    }
}

fn location_context(x: i64, y: i64, neighbor: Option<LocationDefinition>) -> LocationContext {
    LocationContext {
        x,
        y,
        neighbor_id: neighbor.as_ref().map(|n| n.id.clone()),
        neighbor_name: neighbor.map(|n| n.name),
    }
}

#[async_trait]
impl AutomationActions for Director {
    async fn is_paused(&self) -> bool {
        Director::is_paused(self)
    }

    async fn personality(&self) -> PersonalityConfig {
        Director::personality(self).await
    }

    async fn guardrails(&self) -> GuardrailConfig {
        Director::guardrails(self).await
    }

    async fn spawn_hostile_event(
        &self,
        event_type: WorldEventType,
        anchor: Option<Position>,
    ) -> anyhow::Result<()> {
        self.trigger_world_event_by(Originator::Automation, event_type, false, None, anchor)
            .await?;
        Ok(())
    }

    async fn expand_frontier(&self) -> anyhow::Result<bool> {
        Ok(Director::expand_frontier(self).await?)
    }

    async fn emit_chaos(&self, roll: f64) {
        info!(roll, "Chaos signal");
        self.notify(DirectorNotification::ChaosSignal { roll });
    }

    async fn quiet_zones(&self) -> Vec<Position> {
        let mut candidates: BTreeSet<_> = self
            .locations
            .all()
            .await
            .iter()
            .map(|l| bucket_for(Position::new(l.x as f64, l.y as f64)))
            .collect();
        candidates.extend(
            self.world
                .entities_with_tag(TAG_ACTOR)
                .iter()
                .filter_map(|entity| entity.position)
                .map(bucket_for),
        );
        let candidates: Vec<_> = candidates.into_iter().collect();

        self.activity
            .quiet_zones(&candidates, Utc::now())
            .await
            .into_iter()
            .map(|bucket| bucket.center(ACTIVITY_BUCKET_SIZE))
            .collect()
    }
}
