use crate::domain::settings::VoiceSettings;
use crate::domain::DomainError;

/// Port for the external settings store.
pub trait SettingsStore: Send + Sync {
    /// Load the persisted settings blob.
    ///
    /// Missing or malformed data falls back to defaults; load never fails.
    fn load(&self) -> VoiceSettings;

    /// Persist the settings blob (upsert under the fixed settings key).
    fn save(&self, settings: &VoiceSettings) -> Result<(), DomainError>;
}
