use std::io::Cursor;
use std::thread;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::domain::DomainError;
use crate::ports::{AudioOutput, PlaybackChunk, PlaybackHandle};

/// Playback thread runner - owns the non-Send output stream.
///
/// Chunks are decoded through the rodio decoder and scheduled immediately
/// on a detached sink; one undecodable chunk is logged and dropped without
/// affecting subsequent chunks.
fn playback_thread_main(
    mut chunks_rx: mpsc::UnboundedReceiver<PlaybackChunk>,
    init_tx: oneshot::Sender<Result<(), DomainError>>,
) {
    let stream = match rodio::OutputStreamBuilder::open_default_stream() {
        Ok(stream) => {
            let _ = init_tx.send(Ok(()));
            stream
        }
        Err(e) => {
            let _ = init_tx.send(Err(DomainError::Playback(format!(
                "failed to open output stream: {}",
                e
            ))));
            return;
        }
    };

    while let Some(chunk) = chunks_rx.blocking_recv() {
        match rodio::Decoder::new(Cursor::new(chunk.wav)) {
            Ok(source) => {
                let sink = rodio::Sink::connect_new(stream.mixer());
                sink.set_volume(chunk.gain);
                sink.append(source);
                // Fire and forget: the sink plays out on the mixer while the
                // loop moves on to the next chunk.
                sink.detach();
            }
            Err(e) => warn!(error = %e, "Dropped undecodable audio chunk"),
        }
    }

    debug!("Playback thread shutting down");
}

/// rodio-based speaker output.
///
/// Each `open` spawns a dedicated thread owning the output stream for one
/// session; dropping the returned handle ends the thread and releases the
/// device.
pub struct RodioAudioOutput;

impl RodioAudioOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RodioAudioOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioOutput for RodioAudioOutput {
    async fn open(&self) -> Result<PlaybackHandle, DomainError> {
        let (init_tx, init_rx) = oneshot::channel();
        let (chunks_tx, chunks_rx) = mpsc::unbounded_channel();

        thread::Builder::new()
            .name("voice-playback".to_string())
            .spawn(move || playback_thread_main(chunks_rx, init_tx))
            .map_err(|e| {
                DomainError::Playback(format!("failed to spawn playback thread: {}", e))
            })?;

        match init_rx.await {
            Ok(Ok(())) => Ok(PlaybackHandle::new(chunks_tx)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(DomainError::Playback(
                "playback thread exited during setup".to_string(),
            )),
        }
    }
}
