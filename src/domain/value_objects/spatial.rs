//! Spatial value objects: world positions, expansion chunks and activity buckets

use serde::{Deserialize, Serialize};

/// A point in continuous world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Integer coordinate of a fixed-size square region used for procedural expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i64,
    pub cy: i64,
}

impl ChunkCoord {
    pub fn new(cx: i64, cy: i64) -> Self {
        Self { cx, cy }
    }

    /// The chunk itself followed by its eight neighbors
    pub fn with_neighbors(self) -> impl Iterator<Item = ChunkCoord> {
        let Self { cx, cy } = self;
        (-1..=1).flat_map(move |dy| (-1..=1).map(move |dx| ChunkCoord::new(cx + dx, cy + dy)))
    }

    /// Orthogonal neighbors, used when growing the location grid
    pub fn orthogonal_neighbors(&self) -> [ChunkCoord; 4] {
        [
            ChunkCoord::new(self.cx + 1, self.cy),
            ChunkCoord::new(self.cx - 1, self.cy),
            ChunkCoord::new(self.cx, self.cy + 1),
            ChunkCoord::new(self.cx, self.cy - 1),
        ]
    }

    /// World-space origin (minimum corner) of this chunk
    pub fn origin(&self, size: f64) -> Position {
        Position::new(self.cx as f64 * size, self.cy as f64 * size)
    }

    /// Half-open bounds check: `[origin, origin + size)` on both axes
    pub fn contains(&self, x: f64, y: f64, size: f64) -> bool {
        let origin = self.origin(size);
        x >= origin.x && x < origin.x + size && y >= origin.y && y < origin.y + size
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.cx, self.cy)
    }
}

/// Coarse spatial bucket used by the activity tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketCoord {
    pub bx: i64,
    pub by: i64,
}

impl BucketCoord {
    pub fn new(bx: i64, by: i64) -> Self {
        Self { bx, by }
    }

    pub fn center(&self, size: f64) -> Position {
        Position::new(
            self.bx as f64 * size + size / 2.0,
            self.by as f64 * size + size / 2.0,
        )
    }
}

impl std::fmt::Display for BucketCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.bx, self.by)
    }
}
