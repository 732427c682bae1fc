//! PCM16 wire codec for the realtime voice channel.
//!
//! Both directions of the channel carry base64-encoded little-endian PCM16
//! mono at 24 kHz. Outbound, captured float samples are quantized and
//! base64-encoded here; inbound, base64 chunks are decoded and wrapped in a
//! minimal WAV container so the playback decoder accepts them.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::domain::DomainError;

/// Sample rate of the wire format, both directions.
pub const SAMPLE_RATE: u32 = 24_000;

/// Samples per outbound frame (100 ms at the wire rate).
pub const FRAME_SAMPLES: usize = 2_400;

/// Largest multiple of 3 under 32 KiB. Base64 chunk outputs only concatenate
/// into a valid whole when every chunk but the last is padding-free.
const WIRE_CHUNK_BYTES: usize = 32_766;

/// Quantize float samples to little-endian PCM16 bytes.
///
/// Each sample is clamped to [-1, 1], then scaled by 0x8000 on the negative
/// side and 0x7FFF on the non-negative side. Lossless-clip fixed-point
/// conversion: no dithering, no resampling.
pub fn encode_frame(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let value = if clamped < 0.0 {
            (clamped * 0x8000 as f32) as i16
        } else {
            (clamped * 0x7FFF as f32) as i16
        };
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Base64-encode a byte buffer in bounded chunks.
///
/// Large buffers are encoded [`WIRE_CHUNK_BYTES`] at a time and the chunk
/// outputs concatenated, bounding the working set of any single encoding
/// call. The result is identical to encoding the whole buffer at once.
pub fn to_wire(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(WIRE_CHUNK_BYTES) {
        encoded.push_str(&STANDARD.encode(chunk));
    }
    encoded
}

/// Decode one inbound base64 audio chunk to raw PCM16 bytes.
pub fn decode_chunk(encoded: &str) -> Result<Vec<u8>, DomainError> {
    STANDARD
        .decode(encoded)
        .map_err(|e| DomainError::Decode(e.to_string()))
}

/// Prepend the canonical 44-byte RIFF/WAVE header to raw PCM16 bytes.
///
/// The header is computed fresh per chunk: both declared sizes depend on the
/// payload length. Mono, 16-bit, [`SAMPLE_RATE`] Hz, PCM format tag.
pub fn wav_wrap(pcm: &[u8]) -> Vec<u8> {
    let data_len = pcm.len() as u32;
    let byte_rate = SAMPLE_RATE * 2;

    let mut out = Vec::with_capacity(44 + pcm.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM format tag
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes()); // block align
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(pcm);
    out
}
