//! Single-file JSON store used by the `seating` binary.
//!
//! The whole dataset (guest collection and seating plan) lives in one JSON
//! file. Every write rewrites the file through a temporary sibling and a
//! rename, so a batch lands completely or not at all.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::TopologyStore;
use crate::error::StoreError;
use crate::model::{Guest, GuestId, GuestPatch, SeatingPlan};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreFile {
    #[serde(default)]
    guests: BTreeMap<GuestId, Guest>,
    #[serde(default)]
    seating_plan: Option<SeatingPlan>,
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace a guest document.
    ///
    /// Guests belong to the guest collaborator; this exists so the CLI can
    /// seed a store.
    pub async fn upsert_guest(&self, guest: Guest) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        file.guests.insert(guest.id.clone(), guest);
        self.save(&file).await
    }

    async fn load(&self) -> Result<StoreFile, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, file: &StoreFile) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(file)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "store file written");
        Ok(())
    }
}

#[async_trait]
impl TopologyStore for JsonFileStore {
    async fn get_guest(&self, id: &GuestId) -> Result<Option<Guest>, StoreError> {
        Ok(self.load().await?.guests.remove(id))
    }

    async fn list_guests(&self) -> Result<Vec<Guest>, StoreError> {
        Ok(self.load().await?.guests.into_values().collect())
    }

    async fn update_guest(&self, id: &GuestId, patch: GuestPatch) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        let guest = file
            .guests
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("guests/{}", id)))?;
        guest.apply(&patch);
        self.save(&file).await
    }

    async fn get_seating_plan(&self) -> Result<Option<SeatingPlan>, StoreError> {
        Ok(self.load().await?.seating_plan)
    }

    async fn set_seating_plan(&self, plan: SeatingPlan, merge: bool) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        match (file.seating_plan.as_mut(), merge) {
            (Some(stored), true) => stored.merge_from(plan),
            _ => file.seating_plan = Some(plan),
        }
        self.save(&file).await
    }

    async fn batch_update_guests(
        &self,
        updates: Vec<(GuestId, GuestPatch)>,
    ) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut file = self.load().await?;
        for (id, patch) in &updates {
            let guest = file
                .guests
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(format!("guests/{}", id)))?;
            guest.apply(patch);
        }
        self.save(&file).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SyncSource;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("seating-{}-{}.json", name, uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let store = JsonFileStore::new(scratch_path("empty"));
        assert!(store.list_guests().await.unwrap().is_empty());
        assert!(store.get_seating_plan().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_documents_persist_across_instances() {
        let path = scratch_path("persist");
        let store = JsonFileStore::new(&path);
        store.upsert_guest(Guest::new("g1", "Ana")).await.unwrap();
        let mut plan = SeatingPlan::empty();
        plan.touch(SyncSource::Seating);
        store.set_seating_plan(plan, true).await.unwrap();

        let reopened = JsonFileStore::new(&path);
        let guest = reopened.get_guest(&GuestId::from("g1")).await.unwrap();
        assert_eq!(guest.map(|g| g.name), Some("Ana".to_string()));
        let plan = reopened.get_seating_plan().await.unwrap().unwrap();
        assert_eq!(plan.last_synced_from, Some(SyncSource::Seating));

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_file_untouched() {
        let path = scratch_path("batch");
        let store = JsonFileStore::new(&path);
        store.upsert_guest(Guest::new("g1", "Ana")).await.unwrap();

        let patch = GuestPatch::seating(None, SyncSource::AutoSync);
        let result = store
            .batch_update_guests(vec![
                (GuestId::from("g1"), patch.clone()),
                (GuestId::from("nobody"), patch),
            ])
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));

        let guest = store.get_guest(&GuestId::from("g1")).await.unwrap().unwrap();
        assert!(guest.last_synced_from.is_none());

        let _ = tokio::fs::remove_file(&path).await;
    }
}
