use std::fs;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::domain::settings::{VoiceSettings, SETTINGS_KEY};
use crate::domain::DomainError;
use crate::ports::SettingsStore;

/// File-backed settings store: one JSON blob per key in the app data
/// directory.
///
/// The voice settings live under the fixed [`SETTINGS_KEY`]; save is an
/// upsert of the whole blob.
pub struct JsonSettingsStore {
    data_dir: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(data_dir: PathBuf) -> Result<Self, DomainError> {
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    fn settings_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", SETTINGS_KEY))
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> VoiceSettings {
        let path = self.settings_path();
        if !path.exists() {
            info!(path = ?path, "No persisted voice settings, using defaults");
            return VoiceSettings::default();
        }

        let parsed = fs::read_to_string(&path)
            .map_err(DomainError::from)
            .and_then(|content| {
                serde_json::from_str::<VoiceSettings>(&content).map_err(DomainError::from)
            });

        match parsed {
            Ok(settings) => {
                debug!(path = ?path, "Voice settings loaded");
                settings.sanitized()
            }
            Err(e) => {
                warn!(path = ?path, error = %e, "Unreadable voice settings, using defaults");
                VoiceSettings::default()
            }
        }
    }

    fn save(&self, settings: &VoiceSettings) -> Result<(), DomainError> {
        let path = self.settings_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&settings.clone().sanitized())?;
        fs::write(&path, content)?;

        info!(path = ?path, "Voice settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::settings::VoiceModel;
    use std::env;

    fn temp_store(name: &str) -> (JsonSettingsStore, PathBuf) {
        let dir = env::temp_dir().join(format!("voicedesk_test_{}", name));
        let _ = fs::remove_dir_all(&dir);
        let store = JsonSettingsStore::new(dir.clone()).unwrap();
        (store, dir)
    }

    #[test]
    fn test_load_missing_falls_back_to_defaults() {
        let (store, dir) = temp_store("missing");
        let settings = store.load();
        assert!(!settings.enabled);
        assert_eq!(settings.voice_model, VoiceModel::Alloy);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_malformed_falls_back_to_defaults() {
        let (store, dir) = temp_store("malformed");
        fs::write(store.settings_path(), "{not json").unwrap();
        let settings = store.load();
        assert!(!settings.enabled);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let (store, dir) = temp_store("roundtrip");
        let settings = VoiceSettings {
            enabled: true,
            voice_model: VoiceModel::Ballad,
            volume: 0.3,
            ..Default::default()
        };
        store.save(&settings).unwrap();

        let loaded = store.load();
        assert!(loaded.enabled);
        assert_eq!(loaded.voice_model, VoiceModel::Ballad);
        assert!((loaded.volume - 0.3).abs() < f32::EPSILON);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_save_clamps_out_of_range_volume() {
        let (store, dir) = temp_store("clamp");
        let settings = VoiceSettings {
            volume: 4.2,
            ..Default::default()
        };
        store.save(&settings).unwrap();
        assert!((store.load().volume - 1.0).abs() < f32::EPSILON);
        let _ = fs::remove_dir_all(&dir);
    }
}
