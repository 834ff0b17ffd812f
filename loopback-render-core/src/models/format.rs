use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::alc;

/// Output channel layout of a render context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub fn channel_count(self) -> usize {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }

    pub fn to_raw(self) -> i32 {
        match self {
            Self::Mono => alc::MONO_SOFT,
            Self::Stereo => alc::STEREO_SOFT,
        }
    }

    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            alc::MONO_SOFT => Some(Self::Mono),
            alc::STEREO_SOFT => Some(Self::Stereo),
            _ => None,
        }
    }
}

/// Sample encoding tag of a render context.
///
/// Only `Int16` can be pulled into a frame buffer; the other tags exist so
/// format negotiation can be asked about them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleEncoding {
    UInt8,
    Int16,
    Float32,
}

impl SampleEncoding {
    pub fn to_raw(self) -> i32 {
        match self {
            Self::UInt8 => alc::UNSIGNED_BYTE_SOFT,
            Self::Int16 => alc::SHORT_SOFT,
            Self::Float32 => alc::FLOAT_SOFT,
        }
    }

    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            alc::UNSIGNED_BYTE_SOFT => Some(Self::UInt8),
            alc::SHORT_SOFT => Some(Self::Int16),
            alc::FLOAT_SOFT => Some(Self::Float32),
            _ => None,
        }
    }

    fn short_name(self) -> &'static str {
        match self {
            Self::UInt8 => "u8",
            Self::Int16 => "s16",
            Self::Float32 => "f32",
        }
    }
}

/// Negotiated output shape of a loopback device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderFormat {
    pub channels: ChannelLayout,
    pub encoding: SampleEncoding,
    pub sample_rate: u32,
}

impl RenderFormat {
    pub fn new(channels: ChannelLayout, encoding: SampleEncoding, sample_rate: u32) -> Self {
        Self {
            channels,
            encoding,
            sample_rate,
        }
    }

    /// Stereo, signed 16-bit at `sample_rate`.
    pub fn stereo16(sample_rate: u32) -> Self {
        Self::new(ChannelLayout::Stereo, SampleEncoding::Int16, sample_rate)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        Ok(())
    }

    /// Samples that make up `frames` frames of this format, or `None` if the
    /// count does not fit in `usize`.
    pub fn samples_for(&self, frames: usize) -> Option<usize> {
        frames.checked_mul(self.channels.channel_count())
    }

    /// Zero-terminated context attribute list.
    ///
    /// ```text
    /// [FORMAT_CHANNELS_SOFT, channels, FORMAT_TYPE_SOFT, type, FREQUENCY, rate, 0]
    /// ```
    pub fn to_attributes(&self) -> Vec<i32> {
        vec![
            alc::FORMAT_CHANNELS_SOFT,
            self.channels.to_raw(),
            alc::FORMAT_TYPE_SOFT,
            self.encoding.to_raw(),
            alc::FREQUENCY,
            i32::try_from(self.sample_rate).unwrap_or(i32::MAX),
            0,
        ]
    }

    /// Parses an attribute list produced by [`RenderFormat::to_attributes`].
    ///
    /// Returns `None` if the list is not zero-terminated, has a dangling key,
    /// names an unknown channel or type token, or leaves out one of the three
    /// keys. Unknown keys are skipped.
    pub fn from_attributes(attributes: &[i32]) -> Option<Self> {
        let mut channels = None;
        let mut encoding = None;
        let mut sample_rate = None;

        let mut pairs = attributes.chunks(2);
        loop {
            match pairs.next()? {
                [0] | [0, _] => break,
                [key, value] => match *key {
                    alc::FORMAT_CHANNELS_SOFT => channels = Some(ChannelLayout::from_raw(*value)?),
                    alc::FORMAT_TYPE_SOFT => encoding = Some(SampleEncoding::from_raw(*value)?),
                    alc::FREQUENCY => sample_rate = Some(u32::try_from(*value).ok()?),
                    _ => {}
                },
                _ => return None,
            }
        }

        Some(Self::new(channels?, encoding?, sample_rate?))
    }
}

impl Default for RenderFormat {
    fn default() -> Self {
        Self::stereo16(44_100)
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layout = match self.channels {
            ChannelLayout::Mono => "mono",
            ChannelLayout::Stereo => "stereo",
        };
        write!(f, "{}/{} @ {} Hz", layout, self.encoding.short_name(), self.sample_rate)
    }
}
