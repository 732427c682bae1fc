pub mod capture;
pub mod channel;
pub mod chat;
pub mod config;
pub mod playback;
pub mod settings;

pub use capture::{AudioCapture, CaptureConstraints, CaptureHandle};
pub use channel::{ChannelHandle, RealtimeChannel};
pub use chat::ChatLog;
pub use config::ConfigStore;
pub use playback::{AudioOutput, PlaybackChunk, PlaybackHandle};
pub use settings::SettingsStore;
