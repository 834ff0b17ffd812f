//! RIFF/WAVE export of rendered frames.
//!
//! Writes a standard 44-byte header followed by little-endian signed 16-bit
//! PCM, so rendered output can be opened in ordinary audio tools.

use std::fs;
use std::path::Path;

use crate::models::error::RenderError;
use crate::models::format::RenderFormat;

pub const WAV_HEADER_SIZE: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;

/// 44-byte PCM header for `data_size` bytes of 16-bit audio.
///
/// ```text
/// [0-3]    "RIFF"        [4-7]    36 + data_size
/// [8-11]   "WAVE"        [12-15]  "fmt "
/// [16-19]  16            [20-21]  1 (PCM)
/// [22-23]  channels      [24-27]  sample_rate
/// [28-31]  byte_rate     [32-33]  block_align
/// [34-35]  16            [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn pcm16_header(sample_rate: u32, channels: u16, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let block_align = channels * BITS_PER_SAMPLE / 8;
    let byte_rate = sample_rate * u32::from(block_align);

    let mut header = [0u8; WAV_HEADER_SIZE];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&(36 + data_size).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());
    header
}

/// Encode interleaved samples of `format` as a complete WAV file image.
pub fn encode_wav(format: &RenderFormat, samples: &[i16]) -> Result<Vec<u8>, RenderError> {
    let data_size = u32::try_from(samples.len() * 2)
        .map_err(|_| RenderError::StorageError("too many samples for a WAV file".into()))?;
    let channels = format.channels.channel_count() as u16;

    let mut bytes = Vec::with_capacity(WAV_HEADER_SIZE + samples.len() * 2);
    bytes.extend_from_slice(&pcm16_header(format.sample_rate, channels, data_size));
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    Ok(bytes)
}

pub fn write_wav(path: &Path, format: &RenderFormat, samples: &[i16]) -> Result<(), RenderError> {
    let bytes = encode_wav(format, samples)?;
    fs::write(path, bytes)
        .map_err(|e| RenderError::StorageError(format!("{}: {}", path.display(), e)))?;
    log::info!("wrote {} samples to {}", samples.len(), path.display());
    Ok(())
}
