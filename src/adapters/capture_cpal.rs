use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::domain::{pcm, DomainError};
use crate::ports::{AudioCapture, CaptureConstraints, CaptureHandle};

/// Lock-free ring buffer between the realtime callback and the pump loop.
type RingProducer = ringbuf::HeapProd<f32>;
type RingConsumer = ringbuf::HeapCons<f32>;

/// Frames buffered towards the session before backpressure drops apply.
const FRAME_QUEUE: usize = 32;

/// Interval at which the pump loop drains the ring buffer.
const PUMP_INTERVAL: Duration = Duration::from_millis(10);

/// Audio processing utilities.
mod audio_processing {
    use super::*;

    pub fn resolve_device(selected: Option<&str>) -> Result<Device, DomainError> {
        let host = cpal::default_host();

        if let Some(name) = selected {
            let devices = host.input_devices().map_err(|e| {
                DomainError::DeviceUnavailable(format!("failed to enumerate devices: {}", e))
            })?;
            for device in devices {
                if let Ok(device_name) = device.name() {
                    if device_name == name {
                        return Ok(device);
                    }
                }
            }
            warn!(device = %name, "Pinned input device not found, falling back to default");
        }

        host.default_input_device()
            .ok_or_else(|| DomainError::DeviceUnavailable("no default input device".to_string()))
    }

    /// Map a stream setup failure onto the domain taxonomy. Permission
    /// refusals surface as such; everything else is a device problem.
    pub fn map_build_error(err: cpal::BuildStreamError) -> DomainError {
        match err {
            cpal::BuildStreamError::DeviceNotAvailable => {
                DomainError::DeviceUnavailable("device disappeared during setup".to_string())
            }
            cpal::BuildStreamError::BackendSpecific { err }
                if err.description.to_lowercase().contains("permission")
                    || err.description.to_lowercase().contains("denied") =>
            {
                DomainError::PermissionDenied
            }
            other => DomainError::DeviceUnavailable(other.to_string()),
        }
    }

    /// Average interleaved channels down to mono.
    pub fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
        if channels <= 1 {
            return data.to_vec();
        }
        data.chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }

    /// Linear-interpolation resample. The capture path owns rate conversion;
    /// the encoder downstream never resamples.
    pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
        if from_rate == to_rate || samples.is_empty() {
            return samples.to_vec();
        }

        let ratio = from_rate as f64 / to_rate as f64;
        let output_len = (samples.len() as f64 / ratio).ceil() as usize;
        let mut output = Vec::with_capacity(output_len);

        for i in 0..output_len {
            let src_pos = i as f64 * ratio;
            let src_idx = src_pos.floor() as usize;
            let frac = src_pos.fract() as f32;

            let sample = if src_idx + 1 < samples.len() {
                let s0 = samples[src_idx];
                let s1 = samples[src_idx + 1];
                s0 + (s1 - s0) * frac
            } else if src_idx < samples.len() {
                samples[src_idx]
            } else {
                0.0
            };
            output.push(sample);
        }
        output
    }

    pub fn build_stream(
        device: &Device,
        config: &StreamConfig,
        sample_format: SampleFormat,
        target_rate: u32,
        mut producer: RingProducer,
    ) -> Result<Stream, DomainError> {
        let channels = config.channels as usize;
        let device_rate = config.sample_rate.0;

        let stream = match sample_format {
            SampleFormat::F32 => device.build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mono = downmix(data, channels);
                    let resampled = resample(&mono, device_rate, target_rate);
                    let _ = producer.push_slice(&resampled);
                },
                |err| error!(?err, "Audio input stream error"),
                None,
            ),
            SampleFormat::I16 => device.build_input_stream(
                config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let floats: Vec<f32> = data.iter().map(|&s| s as f32 / 32768.0).collect();
                    let mono = downmix(&floats, channels);
                    let resampled = resample(&mono, device_rate, target_rate);
                    let _ = producer.push_slice(&resampled);
                },
                |err| error!(?err, "Audio input stream error"),
                None,
            ),
            other => {
                return Err(DomainError::DeviceUnavailable(format!(
                    "unsupported sample format: {:?}",
                    other
                )));
            }
        }
        .map_err(map_build_error)?;

        Ok(stream)
    }
}

/// Capture thread runner - creates the Stream on the capture thread.
fn capture_thread_main(
    device_name: Option<String>,
    constraints: CaptureConstraints,
    frames_tx: mpsc::Sender<Vec<f32>>,
    mut stop_rx: mpsc::Receiver<()>,
    init_tx: oneshot::Sender<Result<(), DomainError>>,
) {
    let setup = (|| -> Result<(Stream, RingConsumer), DomainError> {
        let device = audio_processing::resolve_device(device_name.as_deref())?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        let supported = device
            .default_input_config()
            .map_err(|e| DomainError::DeviceUnavailable(format!("no input config: {}", e)))?;
        let config = StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        // Noise suppression / echo cancellation are requests the host audio
        // stack may or may not honor; record what was asked for.
        info!(
            device = %device_name,
            device_rate = config.sample_rate.0,
            channels = config.channels,
            target_rate = constraints.sample_rate,
            noise_suppression = constraints.noise_suppression,
            echo_cancellation = constraints.echo_cancellation,
            "Capture stream opening"
        );

        // Two seconds of headroom between the realtime callback and the pump.
        let ring = HeapRb::<f32>::new(constraints.sample_rate as usize * 2);
        let (producer, consumer) = ring.split();

        let stream = audio_processing::build_stream(
            &device,
            &config,
            supported.sample_format(),
            constraints.sample_rate,
            producer,
        )?;
        stream.play().map_err(|e| match e {
            cpal::PlayStreamError::DeviceNotAvailable => {
                DomainError::DeviceUnavailable("device disappeared on play".to_string())
            }
            other => DomainError::DeviceUnavailable(other.to_string()),
        })?;

        Ok((stream, consumer))
    })();

    let (stream, mut consumer) = match setup {
        Ok(pair) => {
            let _ = init_tx.send(Ok(()));
            pair
        }
        Err(e) => {
            let _ = init_tx.send(Err(e));
            return;
        }
    };

    // Pump loop: drain the ring into fixed-size frames until stopped.
    let mut scratch = vec![0f32; pcm::FRAME_SAMPLES];
    let mut pending: Vec<f32> = Vec::with_capacity(pcm::FRAME_SAMPLES);
    'pump: loop {
        match stop_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        let read = consumer.pop_slice(&mut scratch);
        let mut data = &scratch[..read];
        while !data.is_empty() {
            let space = pcm::FRAME_SAMPLES - pending.len();
            let take = space.min(data.len());
            pending.extend_from_slice(&data[..take]);
            data = &data[take..];

            if pending.len() == pcm::FRAME_SAMPLES {
                match frames_tx.try_send(std::mem::take(&mut pending)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        // Live audio: a backlogged consumer loses frames
                        // rather than accumulating latency.
                        debug!("Frame queue full, dropping capture frame");
                    }
                    Err(TrySendError::Closed(_)) => break 'pump,
                }
                pending.reserve(pcm::FRAME_SAMPLES);
            }
        }

        thread::sleep(PUMP_INTERVAL);
    }

    drop(stream);
    debug!("Capture thread shutting down");
}

/// cpal-based microphone capture.
///
/// Each `start` spawns a dedicated thread owning the non-Send Stream; the
/// returned handle's drop is the stop signal.
pub struct CpalAudioCapture {
    input_device: Option<String>,
}

impl CpalAudioCapture {
    pub fn new(input_device: Option<String>) -> Self {
        Self { input_device }
    }
}

#[async_trait]
impl AudioCapture for CpalAudioCapture {
    async fn start(&self, constraints: CaptureConstraints) -> Result<CaptureHandle, DomainError> {
        let (init_tx, init_rx) = oneshot::channel();
        let (frames_tx, frames_rx) = mpsc::channel(FRAME_QUEUE);
        let (stop_tx, stop_rx) = mpsc::channel(1);

        let device_name = self.input_device.clone();
        thread::Builder::new()
            .name("voice-capture".to_string())
            .spawn(move || {
                capture_thread_main(device_name, constraints, frames_tx, stop_rx, init_tx)
            })
            .map_err(|e| {
                DomainError::DeviceUnavailable(format!("failed to spawn capture thread: {}", e))
            })?;

        match init_rx.await {
            Ok(Ok(())) => Ok(CaptureHandle::new(frames_rx, stop_tx)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(DomainError::DeviceUnavailable(
                "capture thread exited during setup".to_string(),
            )),
        }
    }
}
