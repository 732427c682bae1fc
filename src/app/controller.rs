use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use crate::adapters::{
    CpalAudioCapture, HttpChatLog, JsonSettingsStore, RodioAudioOutput, TomlConfigStore,
    WsRealtimeChannel,
};
use crate::app::session::SessionController;
use crate::domain::settings::VoiceSettings;
use crate::domain::{DomainError, SessionSnapshot};
use crate::infrastructure::init_logging;
use crate::ports::{ConfigStore, SettingsStore};

/// Application controller that orchestrates initialization and manages
/// global state.
///
/// Owns the lifecycle side of the voice bridge: configuration, logging,
/// the persisted settings blob, and the session controller.
pub struct AppController {
    config_store: Arc<TomlConfigStore>,
    settings_store: Arc<JsonSettingsStore>,
    settings: Arc<RwLock<VoiceSettings>>,
    session: Arc<SessionController>,
    _log_guard: Option<WorkerGuard>,
}

impl AppController {
    /// Initialize the application controller.
    /// This sets up configuration, logging, settings and the session stack.
    pub fn new() -> Result<Self, DomainError> {
        // Step 1: configuration
        let config_store = Arc::new(TomlConfigStore::new()?);
        let config = config_store.load()?;

        // Step 2: logging
        let log_guard = init_logging(
            &config_store.logs_dir(),
            &config.logging.level,
            config.logging.file_logging,
        )?;

        info!("VoiceDesk starting up");

        // Step 3: voice settings, fetched once; the in-memory copy is what
        // the UI mutates, persistence happens only on explicit save.
        let settings_store = Arc::new(JsonSettingsStore::new(config_store.data_dir())?);
        let settings = Arc::new(RwLock::new(settings_store.load()));

        // Step 4: session controller over the platform adapters
        let capture = Arc::new(CpalAudioCapture::new(config.audio.input_device.clone()));
        let output = Arc::new(RodioAudioOutput::new());
        let channel = Arc::new(WsRealtimeChannel::new(&config.service));
        let chat = Arc::new(HttpChatLog::new(&config.chat)?);
        let session = Arc::new(SessionController::new(
            capture,
            output,
            channel,
            chat,
            Arc::clone(&settings),
            config.service.transcription_model.clone(),
        ));

        info!(
            endpoint = %config.service.realtime_url,
            "AppController initialized"
        );

        Ok(Self {
            config_store,
            settings_store,
            settings,
            session,
            _log_guard: log_guard,
        })
    }

    /// Get the current voice settings.
    pub fn voice_settings(&self) -> VoiceSettings {
        self.settings.read().clone()
    }

    /// Adopt and persist edited voice settings.
    ///
    /// The in-memory copy is updated first: a failed save surfaces an error
    /// without losing the edits.
    pub fn save_voice_settings(
        &self,
        settings: VoiceSettings,
    ) -> Result<VoiceSettings, DomainError> {
        let sanitized = settings.sanitized();
        *self.settings.write() = sanitized.clone();
        self.settings_store.save(&sanitized)?;
        info!("Voice settings updated");
        Ok(sanitized)
    }

    /// Open a voice session bound to a support-chat session.
    pub async fn connect(&self, chat_session_id: String) -> Result<SessionSnapshot, DomainError> {
        self.session.connect(chat_session_id).await
    }

    /// Close the active voice session, if any.
    pub async fn disconnect(&self) {
        self.session.disconnect().await;
    }

    /// Toggle the mute flag of the active session.
    pub fn toggle_mute(&self) -> bool {
        self.session.toggle_mute()
    }

    /// Current session state for the UI.
    pub fn session_snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Shared handle to the session controller (teardown hooks).
    pub fn session(&self) -> Arc<SessionController> {
        Arc::clone(&self.session)
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> String {
        self.config_store.data_dir().to_string_lossy().to_string()
    }

    /// Get the logs directory path.
    pub fn logs_dir(&self) -> String {
        self.config_store.logs_dir().to_string_lossy().to_string()
    }

    /// Get the config file path.
    pub fn config_path(&self) -> String {
        self.config_store.config_path().to_string_lossy().to_string()
    }
}
