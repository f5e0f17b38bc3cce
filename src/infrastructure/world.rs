//! In-process world model
//!
//! A map of entities behind a std `RwLock`. Every call is a short critical
//! section with no awaits inside, so a blocking lock is fine from async code.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::application::ports::outbound::{WorldError, WorldModelPort};
use crate::domain::entities::WorldEntity;
use crate::domain::value_objects::EntityId;

#[derive(Default)]
pub struct InMemoryWorld {
    entities: RwLock<BTreeMap<EntityId, WorldEntity>>,
}

impl InMemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorldModelPort for InMemoryWorld {
    fn add_entity(&self, entity: WorldEntity) -> Result<EntityId, WorldError> {
        let mut entities = self.entities.write().unwrap_or_else(PoisonError::into_inner);
        let id = entity.id;
        if entities.contains_key(&id) {
            return Err(WorldError::Duplicate(id));
        }
        entities.insert(id, entity);
        Ok(id)
    }

    fn remove_entity(&self, id: EntityId) -> Result<Option<WorldEntity>, WorldError> {
        Ok(self
            .entities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id))
    }

    fn get_entity(&self, id: EntityId) -> Option<WorldEntity> {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    fn entities_with_tag(&self, tag: &str) -> Vec<WorldEntity> {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|e| e.has_tag(tag))
            .cloned()
            .collect()
    }

    fn all_entities(&self) -> Vec<WorldEntity> {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{EntityKind, TAG_HOSTILE};

    #[test]
    fn test_duplicate_ids_rejected() {
        let world = InMemoryWorld::new();
        let entity = WorldEntity::new("Wolf", EntityKind::Mob).with_tag(TAG_HOSTILE);
        let id = world.add_entity(entity.clone()).unwrap();

        assert!(matches!(world.add_entity(entity), Err(WorldError::Duplicate(d)) if d == id));
        assert_eq!(world.entities_with_tag(TAG_HOSTILE).len(), 1);
    }

    #[test]
    fn test_remove_returns_entity_once() {
        let world = InMemoryWorld::new();
        let id = world.add_entity(WorldEntity::new("Chest", EntityKind::Item)).unwrap();

        assert_eq!(world.remove_entity(id).unwrap().map(|e| e.name), Some("Chest".to_string()));
        assert!(world.remove_entity(id).unwrap().is_none());
        assert!(world.get_entity(id).is_none());
    }
}
