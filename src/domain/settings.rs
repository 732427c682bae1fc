use serde::{Deserialize, Serialize};

/// Fixed key the settings blob is stored under in the settings store.
pub const SETTINGS_KEY: &str = "voice_settings";

/// Synthetic voice rendered by the remote conversational service.
///
/// The identifiers are opaque to the bridge; serde maps them to the
/// service's fixed lowercase voice names on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VoiceModel {
    #[default]
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Verse,
}

impl VoiceModel {
    /// All selectable voices, in the order the settings form lists them.
    pub fn all() -> [VoiceModel; 6] {
        [
            VoiceModel::Alloy,
            VoiceModel::Ash,
            VoiceModel::Ballad,
            VoiceModel::Coral,
            VoiceModel::Echo,
            VoiceModel::Verse,
        ]
    }
}

/// Persisted voice configuration.
///
/// Loaded once at startup, mutated in memory by the settings form, and
/// written back only on explicit save (upsert under [`SETTINGS_KEY`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    /// Master switch; `connect` refuses while this is off.
    pub enabled: bool,
    /// Synthetic voice used by the remote peer for audio responses.
    pub voice_model: VoiceModel,
    /// Whether inbound speech is transcribed and relayed to the chat log.
    pub auto_transcription: bool,
    /// Requested microphone constraint.
    pub noise_suppression: bool,
    /// Requested microphone constraint.
    pub echo_cancellation: bool,
    /// Output gain multiplier, clamped to [0, 1].
    pub volume: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            voice_model: VoiceModel::default(),
            auto_transcription: true,
            noise_suppression: true,
            echo_cancellation: true,
            volume: 0.8,
        }
    }
}

impl VoiceSettings {
    /// Return a copy with `volume` clamped to the valid range.
    ///
    /// Applied before persisting and before handing the value to playback,
    /// so an out-of-range value from an old or hand-edited blob cannot
    /// drive the gain node outside [0, 1].
    pub fn sanitized(mut self) -> Self {
        self.volume = self.volume.clamp(0.0, 1.0);
        self
    }
}
