//! Chunk tracker - which regions of the world have been generated
//!
//! A chunk is a `CHUNK_SIZE` square of world units. Marking is idempotent and
//! deleting a chunk is the only way to make it generatable again.

use std::collections::BTreeSet;

use tokio::sync::RwLock;

use crate::application::ports::outbound::{
    ContentRecord, ContentStoreError, ContentStorePort, WorldModelPort,
};
use crate::domain::entities::{ContentKind, ProposalPayload, TAG_ACTOR};
use crate::domain::value_objects::{ChunkCoord, Position};

pub const CHUNK_SIZE: f64 = 16.0;

pub fn chunk_coords(x: f64, y: f64) -> ChunkCoord {
    ChunkCoord::new(
        (x / CHUNK_SIZE).floor() as i64,
        (y / CHUNK_SIZE).floor() as i64,
    )
}

/// Center of a chunk in world units
pub fn chunk_center(coord: ChunkCoord) -> Position {
    coord.origin(CHUNK_SIZE).offset(CHUNK_SIZE / 2.0, CHUNK_SIZE / 2.0)
}

fn location_coords(record: &ContentRecord) -> Option<(i64, i64)> {
    match &record.payload {
        ProposalPayload::Location(def) => Some((def.x, def.y)),
        _ => None,
    }
}

#[derive(Default)]
pub struct ChunkTracker {
    generated: RwLock<BTreeSet<ChunkCoord>>,
}

impl ChunkTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_chunk_generated(&self, coord: ChunkCoord) -> bool {
        self.generated.read().await.contains(&coord)
    }

    /// Returns whether the chunk was newly marked
    pub async fn mark_chunk_generated(&self, coord: ChunkCoord) -> bool {
        self.generated.write().await.insert(coord)
    }

    pub async fn unmark(&self, coord: ChunkCoord) -> bool {
        self.generated.write().await.remove(&coord)
    }

    /// Ids of persisted locations whose coordinates fall inside the chunk
    pub async fn locations_in_chunk(
        &self,
        coord: ChunkCoord,
        store: &dyn ContentStorePort,
    ) -> Result<Vec<String>, ContentStoreError> {
        let records = store.list_records(ContentKind::Location).await?;
        Ok(records
            .iter()
            .filter(|record| {
                location_coords(record)
                    .map(|(x, y)| coord.contains(x as f64, y as f64, CHUNK_SIZE))
                    .unwrap_or(false)
            })
            .map(|record| record.id.clone())
            .collect())
    }

    /// Remove every location record inside the chunk, then unmark it
    ///
    /// A record that fails to delete is logged and skipped; the rest still go.
    /// Returns the ids that were removed.
    pub async fn delete_chunk(
        &self,
        coord: ChunkCoord,
        store: &dyn ContentStorePort,
    ) -> Result<Vec<String>, ContentStoreError> {
        let inside = self.locations_in_chunk(coord, store).await?;

        let mut removed = Vec::with_capacity(inside.len());
        for id in inside {
            match store.delete_record(ContentKind::Location, &id).await {
                Ok(true) => removed.push(id),
                Ok(false) => {}
                Err(e) => tracing::warn!("Failed to delete location {} in chunk {}: {}", id, coord, e),
            }
        }

        self.unmark(coord).await;
        tracing::info!("Deleted chunk {} ({} locations removed)", coord, removed.len());
        Ok(removed)
    }

    /// Chunks around actors that still need generating, sorted and deduplicated
    pub async fn chunks_to_generate(&self, world: &dyn WorldModelPort) -> Vec<ChunkCoord> {
        let candidates: BTreeSet<ChunkCoord> = world
            .entities_with_tag(TAG_ACTOR)
            .iter()
            .filter_map(|entity| entity.position)
            .flat_map(|position| chunk_coords(position.x, position.y).with_neighbors())
            .collect();

        let generated = self.generated.read().await;
        candidates
            .into_iter()
            .filter(|coord| !generated.contains(coord))
            .collect()
    }

    /// Mark the chunk of every persisted location; returns how many chunks are marked
    pub async fn rebuild_from_locations(
        &self,
        store: &dyn ContentStorePort,
    ) -> Result<usize, ContentStoreError> {
        let records = store.list_records(ContentKind::Location).await?;
        let chunks: BTreeSet<ChunkCoord> = records
            .iter()
            .filter_map(location_coords)
            .map(|(x, y)| chunk_coords(x as f64, y as f64))
            .collect();

        let mut generated = self.generated.write().await;
        generated.extend(chunks);
        Ok(generated.len())
    }

    pub async fn generated_chunks(&self) -> Vec<ChunkCoord> {
        self.generated.read().await.iter().copied().collect()
    }

    pub async fn restore(&self, chunks: Vec<ChunkCoord>) {
        *self.generated.write().await = chunks.into_iter().collect();
    }
}
