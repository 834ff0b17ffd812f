use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::error::RenderError;
use super::format::RenderFormat;

/// Upper bound on `frame_count`: ten minutes at 192 kHz.
pub const MAX_FRAME_COUNT: usize = 192_000 * 600;

/// Upper bound on `source_samples`.
pub const MAX_SOURCE_SAMPLES: usize = 1 << 24;

/// What a session does with errors that do not end it on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the error, record it in the report and keep going.
    #[default]
    BestEffort,
    /// Abort the session on the first error.
    Strict,
}

/// Configuration for a single render session.
///
/// The defaults describe the standard run: a 64-sample sine tone at
/// 44.1 kHz played on a looping source and pulled as 64 stereo frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfiguration {
    /// Output format requested from the loopback device.
    pub format: RenderFormat,

    /// Length of the synthesized tone in samples (one sine cycle).
    pub source_samples: usize,

    /// Sample rate the tone is uploaded at.
    pub source_sample_rate: u32,

    /// Frames pulled from the device.
    pub frame_count: usize,

    pub looping: bool,
    pub gain: f32,
    pub pitch: f32,

    pub policy: FailurePolicy,

    /// Where to write the rendered frames as a WAV file, if anywhere.
    pub wav_output: Option<PathBuf>,
}

impl RenderConfiguration {
    pub fn validate(&self) -> Result<(), RenderError> {
        self.format.validate().map_err(RenderError::InvalidConfiguration)?;
        if self.source_samples == 0 || self.source_samples > MAX_SOURCE_SAMPLES {
            return Err(RenderError::InvalidConfiguration(format!(
                "source sample count must be within 1..={}",
                MAX_SOURCE_SAMPLES
            )));
        }
        if self.source_sample_rate == 0 {
            return Err(RenderError::InvalidConfiguration(
                "source sample rate must be positive".into(),
            ));
        }
        if self.frame_count == 0 || self.frame_count > MAX_FRAME_COUNT {
            return Err(RenderError::InvalidConfiguration(format!(
                "frame count must be within 1..={}",
                MAX_FRAME_COUNT
            )));
        }
        if !self.gain.is_finite() || self.gain < 0.0 {
            return Err(RenderError::InvalidConfiguration(format!("invalid gain: {}", self.gain)));
        }
        if !self.pitch.is_finite() || self.pitch <= 0.0 {
            return Err(RenderError::InvalidConfiguration(format!("invalid pitch: {}", self.pitch)));
        }
        Ok(())
    }

    /// Parses a JSON document. Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, RenderError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RenderError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for RenderConfiguration {
    fn default() -> Self {
        Self {
            format: RenderFormat::default(),
            source_samples: 64,
            source_sample_rate: 44_100,
            frame_count: 64,
            looping: true,
            gain: 1.0,
            pitch: 1.0,
            policy: FailurePolicy::BestEffort,
            wav_output: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format::ChannelLayout;

    #[test]
    fn default_validates() {
        assert!(RenderConfiguration::default().validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_values() {
        let cases = [
            RenderConfiguration { source_samples: 0, ..Default::default() },
            RenderConfiguration { source_sample_rate: 0, ..Default::default() },
            RenderConfiguration { frame_count: 0, ..Default::default() },
            RenderConfiguration { frame_count: MAX_FRAME_COUNT + 1, ..Default::default() },
            RenderConfiguration { frame_count: usize::MAX / 2 + 1, ..Default::default() },
            RenderConfiguration { source_samples: MAX_SOURCE_SAMPLES + 1, ..Default::default() },
            RenderConfiguration { gain: -0.5, ..Default::default() },
            RenderConfiguration { pitch: 0.0, ..Default::default() },
            RenderConfiguration { pitch: f32::NAN, ..Default::default() },
            RenderConfiguration { format: RenderFormat::stereo16(0), ..Default::default() },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(RenderError::InvalidConfiguration(_))),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn size_limits_are_inclusive() {
        let config = RenderConfiguration {
            frame_count: MAX_FRAME_COUNT,
            source_samples: MAX_SOURCE_SAMPLES,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_overrides_only_what_it_names() {
        let config = RenderConfiguration::from_json(
            r#"{ "frame_count": 128, "policy": "strict", "format": { "channels": "mono", "encoding": "int16", "sample_rate": 22050 } }"#,
        )
        .unwrap();

        assert_eq!(config.frame_count, 128);
        assert_eq!(config.policy, FailurePolicy::Strict);
        assert_eq!(config.format.channels, ChannelLayout::Mono);
        assert_eq!(config.format.sample_rate, 22_050);
        assert_eq!(config.source_samples, 64);
        assert!(config.looping);
    }

    #[test]
    fn json_errors_are_configuration_errors() {
        assert!(matches!(
            RenderConfiguration::from_json("{ not json"),
            Err(RenderError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            RenderConfiguration::from_json(r#"{ "frame_count": 0 }"#),
            Err(RenderError::InvalidConfiguration(_))
        ));
    }
}
