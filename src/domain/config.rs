use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// API key for the realtime voice service, zeroed on drop and redacted in
/// log output.
#[derive(Clone, Default, Serialize, Deserialize, Zeroize)]
#[zeroize(drop)]
#[serde(transparent)]
pub struct ApiKey(pub String);

impl ApiKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("ApiKey(<unset>)")
        } else {
            f.write_str("ApiKey(<redacted>)")
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Enable file logging with rotation.
    pub file_logging: bool,
    /// Maximum number of log files to keep.
    pub max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: true,
            max_files: 7,
        }
    }
}

/// Realtime voice service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// WebSocket endpoint of the conversational voice service.
    pub realtime_url: String,
    /// Bearer credential for the service.
    pub api_key: ApiKey,
    /// Transcription model requested in the session configuration.
    pub transcription_model: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            realtime_url: "wss://api.openai.com/v1/realtime?model=gpt-4o-realtime-preview"
                .to_string(),
            api_key: ApiKey::default(),
            transcription_model: "whisper-1".to_string(),
        }
    }
}

/// Chat backend configuration for the transcript relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Base URL of the chat message API.
    pub base_url: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
        }
    }
}

/// Audio capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AudioConfig {
    /// Pinned input device name; the system default when unset.
    pub input_device: Option<String>,
}

/// Main application configuration, distinct from the user-facing
/// [`VoiceSettings`](crate::domain::settings::VoiceSettings) blob: these are
/// deployment values, not per-agent preferences.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub service: ServiceConfig,
    pub chat: ChatConfig,
    pub audio: AudioConfig,
}

impl AppConfig {
    /// Create a new AppConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }
}
