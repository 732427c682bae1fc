use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::settings::VoiceSettings;
use crate::domain::{pcm, DomainError};

/// Requested microphone constraints.
///
/// Noise suppression and echo cancellation are requests, not guarantees:
/// whether they take effect depends on the host audio stack.
#[derive(Debug, Clone)]
pub struct CaptureConstraints {
    /// Target sample rate the capture stream must deliver.
    pub sample_rate: u32,
    pub noise_suppression: bool,
    pub echo_cancellation: bool,
}

impl CaptureConstraints {
    pub fn from_settings(settings: &VoiceSettings) -> Self {
        Self {
            sample_rate: pcm::SAMPLE_RATE,
            noise_suppression: settings.noise_suppression,
            echo_cancellation: settings.echo_cancellation,
        }
    }
}

/// A live microphone stream.
///
/// Frames arrive continuously on `frames` (mono f32 at the requested rate,
/// [`pcm::FRAME_SAMPLES`] samples each) until the handle is stopped or
/// dropped. Exactly one handle exists per active session.
pub struct CaptureHandle {
    pub frames: mpsc::Receiver<Vec<f32>>,
    stop_tx: Option<mpsc::Sender<()>>,
}

impl CaptureHandle {
    pub fn new(frames: mpsc::Receiver<Vec<f32>>, stop_tx: mpsc::Sender<()>) -> Self {
        Self {
            frames,
            stop_tx: Some(stop_tx),
        }
    }

    /// Release the microphone. Dropping the stop sender signals the device
    /// thread; dropping the whole handle has the same effect.
    pub fn stop(&mut self) {
        self.stop_tx.take();
    }
}

/// Port for microphone capture.
#[async_trait]
pub trait AudioCapture: Send + Sync {
    /// Open a mono capture stream honoring `constraints`.
    ///
    /// Fails with [`DomainError::PermissionDenied`] or
    /// [`DomainError::DeviceUnavailable`] when the host refuses access; the
    /// session controller surfaces either as a connection failure.
    async fn start(&self, constraints: CaptureConstraints) -> Result<CaptureHandle, DomainError>;
}
