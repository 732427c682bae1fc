pub mod capture_cpal;
pub mod channel_ws;
pub mod chat_http;
pub mod config_store;
pub mod playback_rodio;
pub mod settings_store;

pub use capture_cpal::CpalAudioCapture;
pub use channel_ws::WsRealtimeChannel;
pub use chat_http::HttpChatLog;
pub use config_store::TomlConfigStore;
pub use playback_rodio::RodioAudioOutput;
pub use settings_store::JsonSettingsStore;
