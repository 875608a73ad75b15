use crate::errors::StorageError;
use crate::ledger::Ledger;
use crate::models::LargeParty;
use crate::storage::{Store, persist_store};
use crate::tips::PresetChange;
use chrono::Utc;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;
use tracing::info;

/// Everything the views share: the persisted store plus state that only
/// lives as long as the server (undo buffer, large parties, pending edits).
#[derive(Debug, Default)]
pub struct Workspace {
    pub store: Store,
    pub ledger: Ledger,
    pub parties: Vec<LargeParty>,
    pub pending_preset: Option<PresetChange>,
    pub stale_dismissed: bool,
}

impl Workspace {
    pub fn new(store: Store) -> Self {
        let ledger = store
            .session()
            .map(|session| Ledger::from_session(&session))
            .unwrap_or_default();
        Self {
            store,
            ledger,
            ..Self::default()
        }
    }

    /// Writes the ledger back into the store, keeping any stored start time.
    pub fn sync_session(&mut self) -> Result<(), StorageError> {
        let existing = self.store.session();
        let session = self
            .ledger
            .to_session(existing.as_ref(), Utc::now().timestamp_millis());
        self.store.set_session(&session)
    }

    /// Drops the ledger and its stored document.
    pub fn clear_session(&mut self) {
        self.ledger.clear();
        self.store.clear_session();
        info!("end of day data cleared");
    }
}

#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub workspace: Arc<Mutex<Workspace>>,
}

impl AppState {
    pub fn new(data_path: PathBuf, store: Store) -> Self {
        Self {
            data_path,
            workspace: Arc::new(Mutex::new(Workspace::new(store))),
        }
    }

    pub async fn persist(&self, workspace: &Workspace) -> Result<(), StorageError> {
        persist_store(&self.data_path, &workspace.store).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryKind;

    #[test]
    fn sync_stamps_start_time_once() {
        let mut workspace = Workspace::new(Store::default());
        workspace.ledger.add(EntryKind::Hours, 6.0).unwrap();
        workspace.sync_session().unwrap();
        let first = workspace.store.session().unwrap();
        assert!(first.session_start_time.is_some());

        workspace.ledger.add(EntryKind::Tips, 90.0).unwrap();
        workspace.sync_session().unwrap();
        let second = workspace.store.session().unwrap();
        assert_eq!(second.session_start_time, first.session_start_time);
        assert_eq!(second.total_tips, 90.0);

        let reopened = Workspace::new(workspace.store.clone());
        assert_eq!(reopened.ledger.row_count(), 1);

        workspace.clear_session();
        assert!(workspace.store.session().is_none());
        assert!(workspace.ledger.is_empty());
    }
}
