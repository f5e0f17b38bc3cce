//! World-model port - the entity/component world the director populates

use crate::domain::entities::WorldEntity;
use crate::domain::value_objects::EntityId;

#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("Entity already exists: {0}")]
    Duplicate(EntityId),
}

/// Synchronous handle onto the live world
///
/// Calls are short in-memory operations, so they are safe to make from async
/// code as long as no director lock is held across them.
pub trait WorldModelPort: Send + Sync {
    fn add_entity(&self, entity: WorldEntity) -> Result<EntityId, WorldError>;

    /// Remove an entity, returning it if it existed
    fn remove_entity(&self, id: EntityId) -> Result<Option<WorldEntity>, WorldError>;

    fn get_entity(&self, id: EntityId) -> Option<WorldEntity>;

    fn entities_with_tag(&self, tag: &str) -> Vec<WorldEntity>;

    fn all_entities(&self) -> Vec<WorldEntity>;
}
