use crate::errors::StorageError;
use crate::models::{AppId, ShiftSession, TipPreset};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::{error, warn};

pub const SESSION_KEY: &str = "endOfDayData";
pub const PRESET_KEY: &str = "tipCalcPreset";
pub const LAST_APP_KEY: &str = "lastActiveApp";

/// Key-value document persisted wholesale on every write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Store {
    entries: BTreeMap<String, Value>,
}

impl Store {
    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.entries.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                error!("ignoring unreadable {key}: {err}");
                None
            }
        }
    }

    fn set<T: Serialize>(&mut self, key: &'static str, value: &T) -> Result<(), StorageError> {
        let value = serde_json::to_value(value).map_err(|source| StorageError::Encode { key, source })?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn session(&self) -> Option<ShiftSession> {
        self.get(SESSION_KEY)
    }

    pub fn set_session(&mut self, session: &ShiftSession) -> Result<(), StorageError> {
        self.set(SESSION_KEY, session)
    }

    pub fn clear_session(&mut self) -> bool {
        self.remove(SESSION_KEY)
    }

    pub fn preset(&self) -> TipPreset {
        self.get(PRESET_KEY).unwrap_or_default()
    }

    pub fn set_preset(&mut self, preset: TipPreset) -> Result<(), StorageError> {
        self.set(PRESET_KEY, &preset)
    }

    pub fn last_app(&self) -> Option<AppId> {
        let raw: String = self.get(LAST_APP_KEY)?;
        match raw.parse() {
            Ok(app) => Some(app),
            Err(err) => {
                warn!("ignoring stored last app: {err}");
                None
            }
        }
    }

    pub fn set_last_app(&mut self, app: AppId) -> Result<(), StorageError> {
        self.set(LAST_APP_KEY, &app)
    }

    pub fn clear_last_app(&mut self) -> bool {
        self.remove(LAST_APP_KEY)
    }
}

pub async fn load_store(path: &Path) -> Store {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(store) => store,
            Err(err) => {
                error!("failed to parse data file, starting empty: {err}");
                Store::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Store::default(),
        Err(err) => {
            error!("failed to read data file: {err}");
            Store::default()
        }
    }
}

pub async fn persist_store(path: &Path, store: &Store) -> Result<(), StorageError> {
    let payload = serde_json::to_vec_pretty(store)?;
    fs::write(path, payload).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Entry;
    use serde_json::json;

    #[test]
    fn typed_keys_round_trip() {
        let mut store = Store::default();
        assert_eq!(store.preset(), TipPreset::default());
        assert_eq!(store.last_app(), None);

        store.set_preset(TipPreset { boh: 6.0, foh: 2.5 }).unwrap();
        store.set_last_app(AppId::HoursCalc).unwrap();
        let session = ShiftSession {
            session_start_time: Some(1),
            total_tips: 12.0,
            tips_entries: vec![Entry::manual(12.0)],
            ..ShiftSession::default()
        };
        store.set_session(&session).unwrap();

        let encoded = serde_json::to_value(&store).unwrap();
        assert_eq!(encoded["lastActiveApp"], "hourscalc");
        assert_eq!(encoded["tipCalcPreset"], json!({ "boh": 6.0, "foh": 2.5 }));

        let decoded: Store = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded.preset(), TipPreset { boh: 6.0, foh: 2.5 });
        assert_eq!(decoded.last_app(), Some(AppId::HoursCalc));
        assert_eq!(decoded.session(), Some(session));

        store.clear_last_app();
        assert!(store.clear_session());
        assert!(!store.clear_session());
        assert_eq!(store.last_app(), None);
    }

    #[test]
    fn unreadable_values_are_ignored() {
        let store: Store = serde_json::from_value(json!({
            "endOfDayData": { "hoursEntries": ["eight"] },
            "tipCalcPreset": "five",
            "lastActiveApp": "settings",
        }))
        .unwrap();

        assert_eq!(store.session(), None);
        assert_eq!(store.preset(), TipPreset::default());
        assert_eq!(store.last_app(), None);
    }

    #[tokio::test]
    async fn corrupt_file_loads_as_empty_store() {
        let mut path = std::env::temp_dir();
        path.push(format!("calculator_hub_store_{}.json", std::process::id()));
        fs::write(&path, b"{ not json").await.unwrap();

        assert_eq!(load_store(&path).await, Store::default());

        let mut store = Store::default();
        store.set_last_app(AppId::TipCalc).unwrap();
        persist_store(&path, &store).await.unwrap();
        assert_eq!(load_store(&path).await, store);

        let _ = fs::remove_file(&path).await;
    }
}
