pub mod config;
pub mod error;
pub mod events;
pub mod pcm;
pub mod session;
pub mod settings;

pub use config::AppConfig;
pub use error::DomainError;
pub use events::{ClientEvent, ServerEvent, SessionConfig};
pub use session::{
    Activity, ConnectionState, SessionEvent, SessionShared, SessionSnapshot,
};
pub use settings::{VoiceModel, VoiceSettings};
