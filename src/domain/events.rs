//! Wire protocol of the realtime voice channel.
//!
//! Both directions are JSON-framed events discriminated by a `type` field.
//! Inbound events the bridge does not consume map to [`ServerEvent::Unknown`]
//! and are ignored rather than treated as protocol errors.

use serde::{Deserialize, Serialize};

use crate::domain::settings::{VoiceModel, VoiceSettings};

/// Events sent from the bridge to the remote peer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// One-time session configuration, sent immediately after channel open.
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionConfig },

    /// One captured audio frame, base64 PCM16 mono 24 kHz.
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioAppend { audio: String },
}

/// Events received from the remote peer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// A chunk of synthesized response audio, base64 PCM16.
    #[serde(rename = "response.audio.delta")]
    AudioDelta { delta: String },

    /// The current response audio stream is complete.
    #[serde(rename = "response.audio.done")]
    AudioDone,

    /// A finalized transcription of local speech.
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    TranscriptionCompleted { transcript: String },

    /// Server-side VAD detected the start of local speech.
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted,

    /// Server-side VAD detected the end of local speech.
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped,

    /// Any event kind the bridge does not consume.
    #[serde(other)]
    Unknown,
}

/// Payload of the `session.update` event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionConfig {
    pub modalities: Vec<String>,
    pub voice: VoiceModel,
    pub input_audio_format: String,
    pub output_audio_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<TranscriptionConfig>,
    pub turn_detection: TurnDetection,
}

impl SessionConfig {
    /// Build the session configuration from the persisted settings.
    ///
    /// The transcription sub-config is present only when auto-transcription
    /// is enabled; the remote peer skips transcribing otherwise.
    pub fn from_settings(settings: &VoiceSettings, transcription_model: &str) -> Self {
        Self {
            modalities: vec!["text".to_string(), "audio".to_string()],
            voice: settings.voice_model,
            input_audio_format: "pcm16".to_string(),
            output_audio_format: "pcm16".to_string(),
            input_audio_transcription: settings.auto_transcription.then(|| TranscriptionConfig {
                model: transcription_model.to_string(),
            }),
            turn_detection: TurnDetection::default(),
        }
    }
}

/// Transcription sub-config of `session.update`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptionConfig {
    pub model: String,
}

/// Server-driven voice activity detection parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub mode: String,
    /// Activation threshold for speech onset detection.
    pub threshold: f32,
    /// Audio retained before the detected speech onset.
    pub prefix_padding_ms: u32,
    /// Trailing silence required to conclude an utterance.
    pub silence_duration_ms: u32,
}

impl Default for TurnDetection {
    fn default() -> Self {
        Self {
            mode: "server_vad".to_string(),
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 500,
        }
    }
}
