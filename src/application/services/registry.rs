//! Content registries - lookup tables of characters, items and locations
//!
//! A registry merges the static content shipped with the world and the generated
//! records in the content store. Generated entries override static ones with the
//! same id. Every reload rebuilds the whole table and swaps it in one write.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::application::ports::outbound::{ContentStoreError, ContentStorePort};
use crate::domain::entities::{
    CharacterDefinition, Definition, ItemDefinition, LocationDefinition,
};

struct RegistryIndex<D> {
    by_id: BTreeMap<String, D>,
    /// Lower-cased name or alias to id
    by_name: HashMap<String, String>,
}

impl<D: Definition> RegistryIndex<D> {
    fn empty() -> Self {
        Self {
            by_id: BTreeMap::new(),
            by_name: HashMap::new(),
        }
    }

    fn build(entries: impl IntoIterator<Item = D>) -> Self {
        let mut by_id = BTreeMap::new();
        for entry in entries {
            by_id.insert(entry.id().to_string(), entry);
        }

        let mut by_name = HashMap::new();
        for (id, entry) in &by_id {
            let names = std::iter::once(entry.name()).chain(entry.aliases().iter().map(String::as_str));
            for name in names {
                let key = name.trim().to_lowercase();
                if !key.is_empty() {
                    by_name.entry(key).or_insert_with(|| id.clone());
                }
            }
        }

        Self { by_id, by_name }
    }
}

/// Content shipped with the world, loaded once at startup
#[derive(Debug, Clone, Default)]
pub struct StaticContent {
    pub characters: Vec<CharacterDefinition>,
    pub items: Vec<ItemDefinition>,
    pub locations: Vec<LocationDefinition>,
}

pub struct Registry<D: Definition> {
    static_entries: Vec<D>,
    store: Arc<dyn ContentStorePort>,
    index: RwLock<RegistryIndex<D>>,
}

pub type CharacterRegistry = Registry<CharacterDefinition>;
pub type ItemRegistry = Registry<ItemDefinition>;
pub type LocationRegistry = Registry<LocationDefinition>;

impl<D: Definition> Registry<D> {
    /// Empty until the first [`Registry::reload`]
    pub fn new(static_entries: Vec<D>, store: Arc<dyn ContentStorePort>) -> Self {
        Self {
            static_entries,
            store,
            index: RwLock::new(RegistryIndex::empty()),
        }
    }

    /// Rebuild from static content plus every stored record; returns the entry count
    pub async fn reload(&self) -> Result<usize, ContentStoreError> {
        let records = self.store.list_records(D::KIND).await?;

        let generated = records.into_iter().filter_map(|record| {
            let id = record.id.clone();
            let definition = D::from_payload(record.payload);
            if definition.is_none() {
                tracing::warn!("Skipping {} record {} with mismatched payload", D::KIND, id);
            }
            definition
        });
        let fresh = RegistryIndex::build(self.static_entries.iter().cloned().chain(generated));
        let count = fresh.by_id.len();

        *self.index.write().await = fresh;
        tracing::debug!("{} registry reloaded with {} entries", D::KIND, count);
        Ok(count)
    }

    pub async fn get(&self, id: &str) -> Option<D> {
        self.index.read().await.by_id.get(id).cloned()
    }

    /// Look up by id, then by case-insensitive name or alias
    pub async fn find(&self, query: &str) -> Option<D> {
        let index = self.index.read().await;
        if let Some(entry) = index.by_id.get(query) {
            return Some(entry.clone());
        }
        let id = index.by_name.get(&query.trim().to_lowercase())?;
        index.by_id.get(id).cloned()
    }

    /// All entries ordered by id
    pub async fn all(&self) -> Vec<D> {
        self.index.read().await.by_id.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.by_id.len()
    }

    /// Whether the id comes from shipped static content
    pub fn is_static(&self, id: &str) -> bool {
        self.static_entries.iter().any(|entry| entry.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::outbound::{ContentRecord, RecordMetadata};
    use crate::domain::entities::{ContentKind, Rarity};
    use crate::infrastructure::persistence::InMemoryContentStore;

    fn item(id: &str, name: &str, aliases: &[&str]) -> ItemDefinition {
        ItemDefinition {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            item_type: "weapon".to_string(),
            rarity: Rarity::Common,
            damage: 5,
            defense: 0,
            value: 10,
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            portrait_url: None,
        }
    }

    fn record(def: ItemDefinition) -> ContentRecord {
        ContentRecord {
            kind: ContentKind::Item,
            id: def.id.clone(),
            payload: def.into_payload(),
            metadata: RecordMetadata::manual(),
        }
    }

    #[tokio::test]
    async fn test_lookup_by_id_name_and_alias() {
        let store = Arc::new(InMemoryContentStore::default());
        let registry = ItemRegistry::new(vec![item("item_sword", "Iron Sword", &["blade"])], store);
        registry.reload().await.unwrap();

        assert!(registry.get("item_sword").await.is_some());
        assert_eq!(registry.find("iron SWORD").await.unwrap().id, "item_sword");
        assert_eq!(registry.find("Blade").await.unwrap().id, "item_sword");
        assert!(registry.find("axe").await.is_none());
    }

    #[tokio::test]
    async fn test_generated_overrides_static_and_reload_drops_removed() {
        let store = Arc::new(InMemoryContentStore::default());
        let registry = ItemRegistry::new(
            vec![item("item_sword", "Iron Sword", &[])],
            store.clone(),
        );
        store
            .write_record(&record(item("item_sword", "Tempered Sword", &[])))
            .await
            .unwrap();
        store
            .write_record(&record(item("item_bow", "Ash Bow", &[])))
            .await
            .unwrap();

        assert_eq!(registry.reload().await.unwrap(), 2);
        assert_eq!(registry.get("item_sword").await.unwrap().name, "Tempered Sword");
        assert!(registry.find("iron sword").await.is_none());

        store.delete_record(ContentKind::Item, "item_bow").await.unwrap();
        assert_eq!(registry.reload().await.unwrap(), 1);
        assert!(registry.find("ash bow").await.is_none());
        assert!(registry.is_static("item_sword"));
    }
}
