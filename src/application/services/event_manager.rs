//! Event lifecycle manager - active world events, spawn planning and teardown
//!
//! An event owns the entities spawned for it. They are removed only here, either
//! when a sweep finds the event expired or when it is stopped on demand. Events
//! leave the active list in one write before teardown starts, so two sweeps can
//! never remove the same entities twice.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::Rng;
use tokio::sync::RwLock;

use crate::application::ports::outbound::WorldModelPort;
use crate::application::services::generation::{GenerationContext, QuestContext};
use crate::domain::entities::{
    ActiveEvent, CombatStats, EntityKind, Originator, ProposalPayload, QuestType, Rarity,
    WorldEntity, WorldEventType, TAG_ACTOR, TAG_EVENT, TAG_HOSTILE, TAG_LOCATION, TAG_MERCHANT,
};
use crate::domain::value_objects::{
    EventId, EventSpawnConfig, Position, MAX_INVASION_SIZE, MAX_MERCHANT_INVENTORY,
};

/// Content the director must generate before an entity is added
#[derive(Debug, Clone)]
pub enum SpawnContent {
    Character(GenerationContext),
    Item(GenerationContext),
    Quest(GenerationContext),
}

#[derive(Debug, Clone)]
pub struct PlannedSpawn {
    pub entity: WorldEntity,
    pub content: Option<SpawnContent>,
}

impl PlannedSpawn {
    fn new(entity: WorldEntity, content: SpawnContent) -> Self {
        Self {
            entity,
            content: Some(content),
        }
    }
}

/// Everything needed to start one event
#[derive(Debug, Clone)]
pub struct SpawnPlan {
    pub event_type: WorldEventType,
    pub label: String,
    pub anchor: Position,
    pub duration_secs: u64,
    pub spawns: Vec<PlannedSpawn>,
}

fn event_context(rng: &mut StdRng) -> GenerationContext {
    GenerationContext::new(Originator::Event).with_seed(rng.gen())
}

fn scatter(rng: &mut StdRng, anchor: Position, radius: f64) -> Position {
    // The sampled span is 2 * radius and must stay finite
    if !radius.is_finite() || radius <= 0.0 || !(2.0 * radius).is_finite() {
        return anchor;
    }
    anchor.offset(rng.gen_range(-radius..=radius), rng.gen_range(-radius..=radius))
}

/// A random actor position, else a random location, else the origin
pub fn choose_anchor(world: &dyn WorldModelPort, rng: &mut StdRng) -> Position {
    for tag in [TAG_ACTOR, TAG_LOCATION] {
        let positions: Vec<Position> = world
            .entities_with_tag(tag)
            .into_iter()
            .filter_map(|entity| entity.position)
            .collect();
        if !positions.is_empty() {
            return positions[rng.gen_range(0..positions.len())];
        }
    }
    Position::default()
}

/// Copy generated content onto a planned entity
pub fn dress_entity(entity: &mut WorldEntity, payload: &ProposalPayload) {
    match payload {
        ProposalPayload::Character(def) => {
            entity.name = def.name.clone();
            entity.description = def.description.clone();
            entity.stats = Some(CombatStats {
                health: def.health,
                attack: def.attack,
                defense: def.defense,
                level: def.level,
            });
            if def.hostile {
                entity.tags.insert(TAG_HOSTILE.to_string());
            }
            entity.definition_id = Some(def.id.clone());
        }
        ProposalPayload::Item(def) => {
            entity.name = def.name.clone();
            entity.description = def.description.clone();
            entity.value = Some(def.value);
            entity.rarity = Some(def.rarity);
            entity.definition_id = Some(def.id.clone());
        }
        ProposalPayload::Quest(def) => {
            entity.name = def.name.clone();
            entity.description = def.objective.clone();
            entity.definition_id = Some(def.id.clone());
        }
        ProposalPayload::Location(def) => {
            entity.name = def.name.clone();
            entity.description = def.description.clone();
            entity.definition_id = Some(def.id.clone());
        }
        ProposalPayload::Event(_) => {}
    }
}

#[derive(Default)]
pub struct EventManager {
    active: RwLock<Vec<ActiveEvent>>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay out the entities an event needs around `anchor`
    pub fn plan_spawn(
        event_type: WorldEventType,
        config: &EventSpawnConfig,
        anchor: Position,
        duration_override: Option<u64>,
        rng: &mut StdRng,
    ) -> SpawnPlan {
        let radius = config.spawn_radius;
        let mut spawns = Vec::new();

        match event_type {
            WorldEventType::Invasion => {
                for _ in 0..config.invasion_size.clamp(1, MAX_INVASION_SIZE) {
                    let archetype = if rng.gen_bool(0.5) { "bandit" } else { "beast" };
                    let mob = WorldEntity::new("Invader", EntityKind::Mob)
                        .with_tag(TAG_EVENT)
                        .at(scatter(rng, anchor, radius));
                    let context = event_context(rng).with_archetype(archetype).with_hostile(true);
                    spawns.push(PlannedSpawn::new(mob, SpawnContent::Character(context)));
                }
            }
            WorldEventType::Boss => {
                let loot = WorldEntity::new("Legendary Loot", EntityKind::Item)
                    .with_tag(TAG_EVENT)
                    .at(anchor);
                let boss = WorldEntity::new("Boss", EntityKind::Boss)
                    .with_tag(TAG_EVENT)
                    .at(anchor)
                    .linked_to(loot.id);
                let boss_context = event_context(rng).with_archetype("warlord").with_hostile(true);
                let loot_context = event_context(rng).with_rarity(Rarity::Legendary);
                spawns.push(PlannedSpawn::new(boss, SpawnContent::Character(boss_context)));
                spawns.push(PlannedSpawn::new(loot, SpawnContent::Item(loot_context)));
            }
            WorldEventType::TravelingMerchant => {
                let mut merchant = WorldEntity::new("Traveling Merchant", EntityKind::Npc)
                    .with_tag(TAG_EVENT)
                    .with_tag(TAG_MERCHANT)
                    .at(scatter(rng, anchor, radius))
                    .stationary();
                let mut inventory = Vec::new();
                for _ in 0..config.merchant_inventory_size.min(MAX_MERCHANT_INVENTORY) {
                    let item = WorldEntity::new("Merchant Ware", EntityKind::Item).with_tag(TAG_EVENT);
                    merchant.linked_entities.push(item.id);
                    inventory.push(PlannedSpawn::new(item, SpawnContent::Item(event_context(rng))));
                }
                let context = event_context(rng).with_archetype("merchant").with_hostile(false);
                spawns.push(PlannedSpawn::new(merchant, SpawnContent::Character(context)));
                spawns.extend(inventory);
            }
            WorldEventType::TimedDelivery => {
                let parcel = WorldEntity::new("Parcel", EntityKind::Item).with_tag(TAG_EVENT);
                let courier = WorldEntity::new("Courier", EntityKind::Npc)
                    .with_tag(TAG_EVENT)
                    .at(scatter(rng, anchor, radius))
                    .stationary()
                    .linked_to(parcel.id);
                let marker = WorldEntity::new("Delivery", EntityKind::QuestMarker)
                    .with_tag(TAG_EVENT)
                    .at(courier.position.unwrap_or(anchor))
                    .linked_to(courier.id)
                    .linked_to(parcel.id);
                let quest_context = event_context(rng).with_quest(QuestContext {
                    quest_type: Some(QuestType::Delivery),
                    target: Some("the courier's parcel".to_string()),
                    giver_id: Some(courier.id.to_string()),
                    reward_item_id: None,
                });
                let courier_context = event_context(rng).with_archetype("courier").with_hostile(false);
                let parcel_context = event_context(rng).with_archetype("parcel");
                spawns.push(PlannedSpawn::new(courier, SpawnContent::Character(courier_context)));
                spawns.push(PlannedSpawn::new(parcel, SpawnContent::Item(parcel_context)));
                spawns.push(PlannedSpawn::new(marker, SpawnContent::Quest(quest_context)));
            }
            WorldEventType::TreasureHunt => {
                let treasure = WorldEntity::new("Hidden Treasure", EntityKind::Item)
                    .with_tag(TAG_EVENT)
                    .at(scatter(rng, anchor, radius * 2.0))
                    .hidden();
                let giver = WorldEntity::new("Quest Giver", EntityKind::Npc)
                    .with_tag(TAG_EVENT)
                    .at(anchor)
                    .stationary();
                let marker = WorldEntity::new("Treasure Hunt", EntityKind::QuestMarker)
                    .with_tag(TAG_EVENT)
                    .at(anchor)
                    .linked_to(giver.id)
                    .linked_to(treasure.id);
                let quest_context = event_context(rng).with_quest(QuestContext {
                    quest_type: Some(QuestType::Collection),
                    target: Some("the buried treasure".to_string()),
                    giver_id: Some(giver.id.to_string()),
                    reward_item_id: Some(treasure.id.to_string()),
                });
                let giver_context = event_context(rng).with_archetype("sage").with_hostile(false);
                let treasure_context = event_context(rng).with_archetype("treasure");
                spawns.push(PlannedSpawn::new(giver, SpawnContent::Character(giver_context)));
                spawns.push(PlannedSpawn::new(treasure, SpawnContent::Item(treasure_context)));
                spawns.push(PlannedSpawn::new(marker, SpawnContent::Quest(quest_context)));
            }
        }

        let duration_secs = duration_override.unwrap_or(config.settings(event_type).duration_secs);
        SpawnPlan {
            event_type,
            label: format!("{} near ({:.0}, {:.0})", event_type.label(), anchor.x, anchor.y),
            anchor,
            duration_secs,
            spawns,
        }
    }

    /// Track a started event; the only way events enter the active list
    pub async fn register(&self, event: ActiveEvent) {
        self.active.write().await.push(event);
    }

    pub async fn active_events(&self) -> Vec<ActiveEvent> {
        self.active.read().await.clone()
    }

    pub async fn active_count(&self) -> usize {
        self.active.read().await.len()
    }

    /// Remove and return every event expired at `now`, in one write
    pub async fn take_expired(&self, now: DateTime<Utc>) -> Vec<ActiveEvent> {
        let mut active = self.active.write().await;
        let (expired, remaining): (Vec<_>, Vec<_>) =
            active.drain(..).partition(|event| event.is_expired(now));
        *active = remaining;
        expired
    }

    /// Sweep expired events and tear down their entities; returns the ended events
    pub async fn check_active_events(
        &self,
        now: DateTime<Utc>,
        world: &dyn WorldModelPort,
    ) -> Vec<ActiveEvent> {
        let expired = self.take_expired(now).await;
        for event in &expired {
            let removed = Self::teardown(event, world);
            tracing::info!(
                "Event {} ({}) expired, {} entities removed",
                event.id,
                event.event_type,
                removed
            );
        }
        expired
    }

    /// End an event on demand; `None` for an unknown id
    pub async fn stop_event(&self, id: EventId, world: &dyn WorldModelPort) -> Option<ActiveEvent> {
        let event = {
            let mut active = self.active.write().await;
            let index = active.iter().position(|event| event.id == id)?;
            active.remove(index)
        };
        let removed = Self::teardown(&event, world);
        tracing::info!("Event {} stopped, {} entities removed", event.id, removed);
        Some(event)
    }

    /// Swap in a whole new active list, returning the previous one untouched
    pub async fn replace_all(&self, events: Vec<ActiveEvent>) -> Vec<ActiveEvent> {
        std::mem::replace(&mut *self.active.write().await, events)
    }

    fn teardown(event: &ActiveEvent, world: &dyn WorldModelPort) -> usize {
        let mut removed = 0;
        for entity_id in &event.entity_ids {
            match world.remove_entity(*entity_id) {
                Ok(Some(_)) => removed += 1,
                Ok(None) => {
                    tracing::debug!("Event {} entity {} already gone", event.id, entity_id)
                }
                Err(e) => tracing::warn!("Failed to remove event entity {}: {}", entity_id, e),
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::outbound::WorldError;
    use crate::domain::value_objects::EntityId;
    use crate::infrastructure::world::InMemoryWorld;
    use chrono::Duration;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts removal calls that actually removed something
    #[derive(Default)]
    struct CountingWorld {
        inner: InMemoryWorld,
        removals: AtomicUsize,
    }

    impl WorldModelPort for CountingWorld {
        fn add_entity(&self, entity: WorldEntity) -> Result<EntityId, WorldError> {
            self.inner.add_entity(entity)
        }

        fn remove_entity(&self, id: EntityId) -> Result<Option<WorldEntity>, WorldError> {
            let removed = self.inner.remove_entity(id)?;
            if removed.is_some() {
                self.removals.fetch_add(1, Ordering::SeqCst);
            }
            Ok(removed)
        }

        fn get_entity(&self, id: EntityId) -> Option<WorldEntity> {
            self.inner.get_entity(id)
        }

        fn entities_with_tag(&self, tag: &str) -> Vec<WorldEntity> {
            self.inner.entities_with_tag(tag)
        }

        fn all_entities(&self) -> Vec<WorldEntity> {
            self.inner.all_entities()
        }
    }

    fn spawn_entities(world: &dyn WorldModelPort, count: usize) -> Vec<EntityId> {
        (0..count)
            .map(|i| {
                world
                    .add_entity(WorldEntity::new(format!("mob {}", i), EntityKind::Mob))
                    .unwrap()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_expired_event_torn_down_exactly_once() {
        let world = CountingWorld::default();
        let manager = EventManager::new();
        let ids = spawn_entities(&world, 3);
        let mut event = ActiveEvent::new(WorldEventType::Invasion, "Raid", 60, ids);
        event.started_at = Utc::now() - Duration::seconds(120);
        manager.register(event).await;

        let ended = manager.check_active_events(Utc::now(), &world).await;
        assert_eq!(ended.len(), 1);
        assert!(world.all_entities().is_empty());
        assert!(manager.active_events().await.is_empty());

        let again = manager.check_active_events(Utc::now(), &world).await;
        assert!(again.is_empty());
        assert_eq!(world.removals.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unexpired_event_survives_sweep() {
        let world = InMemoryWorld::new();
        let manager = EventManager::new();
        let ids = spawn_entities(&world, 1);
        manager
            .register(ActiveEvent::new(WorldEventType::Boss, "Boss", 600, ids))
            .await;

        assert!(manager.check_active_events(Utc::now(), &world).await.is_empty());
        assert_eq!(world.all_entities().len(), 1);
    }

    #[tokio::test]
    async fn test_stop_unknown_event_is_none() {
        let world = InMemoryWorld::new();
        let manager = EventManager::new();
        assert!(manager.stop_event(EventId::new(), &world).await.is_none());
    }

    #[tokio::test]
    async fn test_stop_event_removes_entities() {
        let world = InMemoryWorld::new();
        let manager = EventManager::new();
        let ids = spawn_entities(&world, 2);
        let event = ActiveEvent::new(WorldEventType::TreasureHunt, "Hunt", 600, ids);
        let id = event.id;
        manager.register(event).await;

        assert!(manager.stop_event(id, &world).await.is_some());
        assert!(world.all_entities().is_empty());
        assert!(manager.stop_event(id, &world).await.is_none());
    }

    #[test]
    fn test_plans_match_event_shapes() {
        let config = EventSpawnConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let anchor = Position::new(10.0, 10.0);

        let invasion =
            EventManager::plan_spawn(WorldEventType::Invasion, &config, anchor, None, &mut rng);
        assert_eq!(invasion.spawns.len(), config.invasion_size as usize);
        assert!(invasion.spawns.iter().all(|s| s.entity.kind == EntityKind::Mob));
        assert_eq!(invasion.duration_secs, config.invasion.duration_secs);

        let boss = EventManager::plan_spawn(WorldEventType::Boss, &config, anchor, Some(30), &mut rng);
        assert_eq!(boss.duration_secs, 30);
        let loot_id = boss.spawns[1].entity.id;
        assert!(boss.spawns[0].entity.linked_entities.contains(&loot_id));
        assert!(matches!(
            &boss.spawns[1].content,
            Some(SpawnContent::Item(ctx)) if ctx.rarity == Some(Rarity::Legendary)
        ));

        let merchant =
            EventManager::plan_spawn(WorldEventType::TravelingMerchant, &config, anchor, None, &mut rng);
        assert!(merchant.spawns[0].entity.stationary);
        assert_eq!(
            merchant.spawns[0].entity.linked_entities.len(),
            config.merchant_inventory_size as usize
        );

        let hunt = EventManager::plan_spawn(WorldEventType::TreasureHunt, &config, anchor, None, &mut rng);
        assert!(hunt.spawns.iter().any(|s| s.entity.hidden));
        assert!(matches!(
            &hunt.spawns[2].content,
            Some(SpawnContent::Quest(ctx))
                if ctx.quest.as_ref().and_then(|q| q.quest_type) == Some(QuestType::Collection)
        ));
    }

    #[test]
    fn test_out_of_range_config_plans_safely() {
        let config = EventSpawnConfig {
            spawn_radius: 1e308,
            invasion_size: 200_000,
            merchant_inventory_size: 5_000,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let anchor = Position::new(4.0, -4.0);

        let invasion =
            EventManager::plan_spawn(WorldEventType::Invasion, &config, anchor, None, &mut rng);
        assert_eq!(invasion.spawns.len(), MAX_INVASION_SIZE as usize);
        assert!(invasion.spawns.iter().all(|s| s.entity.position == Some(anchor)));

        let merchant =
            EventManager::plan_spawn(WorldEventType::TravelingMerchant, &config, anchor, None, &mut rng);
        assert_eq!(merchant.spawns.len(), MAX_MERCHANT_INVENTORY as usize + 1);

        let hunt = EventManager::plan_spawn(WorldEventType::TreasureHunt, &config, anchor, None, &mut rng);
        assert!(hunt.spawns.iter().all(|s| s.entity.position.map_or(true, |p| p.x.is_finite())));
    }

    #[test]
    fn test_anchor_prefers_actors() {
        let world = InMemoryWorld::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(choose_anchor(&world, &mut rng), Position::default());

        world
            .add_entity(WorldEntity::new("Town", EntityKind::Location).at(Position::new(50.0, 50.0)))
            .unwrap();
        assert_eq!(choose_anchor(&world, &mut rng), Position::new(50.0, 50.0));

        world
            .add_entity(WorldEntity::new("Ada", EntityKind::Actor).at(Position::new(-4.0, 2.0)))
            .unwrap();
        assert_eq!(choose_anchor(&world, &mut rng), Position::new(-4.0, 2.0));
    }
}
