//! Hand-authored definitions shipped with the director
//!
//! `characters.json`, `items.json` and `locations.json` each hold a JSON array.
//! A missing file counts as an empty list; a malformed one is an error.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::application::services::StaticContent;

pub async fn load_static_content(dir: impl AsRef<Path>) -> Result<StaticContent> {
    let dir = dir.as_ref();
    let content = StaticContent {
        characters: load_list(&dir.join("characters.json")).await?,
        items: load_list(&dir.join("items.json")).await?,
        locations: load_list(&dir.join("locations.json")).await?,
    };

    tracing::info!(
        "Loaded static content from {}: {} characters, {} items, {} locations",
        dir.display(),
        content.characters.len(),
        content.items.len(),
        content.locations.len()
    );
    Ok(content)
}

async fn load_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No static file at {}", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    serde_json::from_slice(&bytes).with_context(|| format!("Invalid JSON in {}", path.display()))
}
