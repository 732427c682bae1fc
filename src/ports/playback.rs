use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::DomainError;

/// One scheduled playback unit: a complete audio container plus the gain to
/// apply to it.
#[derive(Debug)]
pub struct PlaybackChunk {
    pub wav: Vec<u8>,
    pub gain: f32,
}

/// Handle to the output audio pipeline of the active session.
///
/// Playback is fire-and-forget per chunk; scheduling order is arrival
/// order. Dropping the handle releases the pipeline.
pub struct PlaybackHandle {
    tx: mpsc::UnboundedSender<PlaybackChunk>,
}

impl PlaybackHandle {
    pub fn new(tx: mpsc::UnboundedSender<PlaybackChunk>) -> Self {
        Self { tx }
    }

    /// Schedule one container for immediate playback.
    pub fn play(&self, wav: Vec<u8>, gain: f32) -> Result<(), DomainError> {
        self.tx
            .send(PlaybackChunk { wav, gain })
            .map_err(|_| DomainError::Playback("playback pipeline closed".to_string()))
    }
}

/// Port for speaker output.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Open the output pipeline for a session.
    ///
    /// Called once per `connect`; the returned handle is owned by the
    /// session and dropped during teardown.
    async fn open(&self) -> Result<PlaybackHandle, DomainError>;
}
