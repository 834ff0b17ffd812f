use crate::models::config::{FailurePolicy, RenderConfiguration};
use crate::models::error::RenderError;
use crate::models::format::RenderFormat;
use crate::processing::wav_format;
use crate::processing::waveform::synthesize_waveform;
use crate::traits::audio_platform::AudioPlatform;
use crate::traits::render_observer::{RenderObserver, SilentObserver};

use super::capabilities::{missing_error, LoopbackCapabilities};
use super::device::VirtualDevice;
use super::puller::{RenderPuller, RenderedFrames};
use super::signal::{AudioBuffer, PlaybackSource};

/// Outcome of a completed render session.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    pub backend: String,
    pub format: RenderFormat,
    pub source_samples: Vec<i16>,
    pub frames: RenderedFrames,
    /// Errors the best-effort policy logged and stepped over.
    pub diagnostics: Vec<RenderError>,
}

/// Applies the failure policy to non-fatal errors.
struct Diagnostics<'o> {
    policy: FailurePolicy,
    observer: &'o dyn RenderObserver,
    collected: Vec<RenderError>,
}

impl<'o> Diagnostics<'o> {
    fn new(policy: FailurePolicy, observer: &'o dyn RenderObserver) -> Self {
        Self {
            policy,
            observer,
            collected: Vec::new(),
        }
    }

    fn absorb<T>(&mut self, result: Result<T, RenderError>) -> Result<Option<T>, RenderError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_fatal() || self.policy == FailurePolicy::Strict => Err(e),
            Err(e) => {
                log::warn!("{}; continuing", e);
                self.observer.on_diagnostic(&e);
                self.collected.push(e);
                Ok(None)
            }
        }
    }
}

/// Run one loopback session end to end.
///
/// ```text
/// capabilities → device → format query → context → tone → buffer → source
///     → play → pull → stop → release (source, buffer, context, device)
/// ```
///
/// A missing loopback extension, an unavailable device, a refused context and
/// a failed pull always end the session. Everything else goes through the
/// configured [`FailurePolicy`].
pub fn render_once<P: AudioPlatform + ?Sized>(
    platform: &P,
    config: &RenderConfiguration,
) -> Result<RenderReport, RenderError> {
    render_with_observer(platform, config, &SilentObserver)
}

/// [`render_once`], reporting the synthesized tone and each stepped-over
/// error to `observer` as they happen.
///
/// The tone is reported even when the session aborts later on.
pub fn render_with_observer<P: AudioPlatform + ?Sized>(
    platform: &P,
    config: &RenderConfiguration,
    observer: &dyn RenderObserver,
) -> Result<RenderReport, RenderError> {
    config.validate()?;
    let mut diagnostics = Diagnostics::new(config.policy, observer);

    let capabilities = match config.policy {
        FailurePolicy::Strict => LoopbackCapabilities::load(platform)?,
        FailurePolicy::BestEffort => {
            let capabilities = LoopbackCapabilities::load_lenient(platform)?;
            let missing = capabilities.missing();
            if !missing.is_empty() {
                diagnostics.absorb::<()>(Err(missing_error(&missing)))?;
            }
            capabilities
        }
    };

    let device = VirtualDevice::open(platform, &capabilities)?;
    diagnostics.absorb(device.configure_format(config.format))?;
    let context = device.create_context(config.format)?;

    let source_samples = synthesize_waveform(config.source_samples);
    observer.on_source_synthesized(&source_samples);
    let mut buffer = AudioBuffer::generate(&context)?;
    diagnostics.absorb(buffer.upload(&source_samples, config.source_sample_rate))?;

    let mut source = PlaybackSource::generate(&context)?;
    diagnostics.absorb(source.bind_and_configure(&buffer, config.looping, config.gain, config.pitch))?;
    diagnostics.absorb(source.play())?;
    // the puller refuses to render over an error nobody has read yet
    diagnostics.absorb(context.check("session setup"))?;

    let frames = RenderPuller::new(&context).pull_frames(config.frame_count)?;
    diagnostics.absorb(source.stop())?;

    if let Some(path) = &config.wav_output {
        diagnostics.absorb(wav_format::write_wav(path, &frames.format(), frames.samples()))?;
    }

    Ok(RenderReport {
        backend: platform.name().to_string(),
        format: config.format,
        source_samples,
        frames,
        diagnostics: diagnostics.collected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::software::{SoftObjectCounts, SoftwarePlatform};
    use crate::traits::audio_platform::EntryPoint;
    use parking_lot::Mutex;

    #[test]
    fn reference_session_renders_64_matching_frames() {
        let platform = SoftwarePlatform::new();

        let report = render_once(&platform, &RenderConfiguration::default()).unwrap();

        assert_eq!(report.backend, "software");
        assert!(report.diagnostics.is_empty());
        assert_eq!(report.source_samples, synthesize_waveform(64));
        assert_eq!(report.frames.frame_count(), 64);
        assert!(report.frames.stereo_pairs().all(|(l, r)| l == r));
        assert_eq!(report.frames.to_string().split(' ').count(), 64);
        assert_eq!(platform.object_counts(), SoftObjectCounts::default());
        assert_eq!(platform.current_context(), None);
    }

    #[test]
    fn missing_extension_is_fatal() {
        let platform = SoftwarePlatform::new().without_loopback_extension();
        assert_eq!(
            render_once(&platform, &RenderConfiguration::default()),
            Err(RenderError::CapabilityMissing(vec!["ALC_SOFT_loopback".into()]))
        );
    }

    #[test]
    fn unavailable_device_is_fatal() {
        let platform = SoftwarePlatform::new().without_devices();
        assert_eq!(
            render_once(&platform, &RenderConfiguration::default()),
            Err(RenderError::DeviceUnavailable)
        );
    }

    #[test]
    fn unsupported_format_is_logged_and_rendering_goes_on() {
        let platform = SoftwarePlatform::new();
        let config = RenderConfiguration {
            format: RenderFormat::stereo16(4_000),
            ..Default::default()
        };

        let report = render_once(&platform, &config).unwrap();

        assert_eq!(
            report.diagnostics,
            vec![RenderError::FormatUnsupported(RenderFormat::stereo16(4_000))]
        );
        assert_eq!(report.frames.frame_count(), 64);
    }

    #[test]
    fn strict_policy_stops_at_unsupported_format() {
        let platform = SoftwarePlatform::new();
        let config = RenderConfiguration {
            format: RenderFormat::stereo16(4_000),
            policy: FailurePolicy::Strict,
            ..Default::default()
        };

        assert_eq!(
            render_once(&platform, &config),
            Err(RenderError::FormatUnsupported(RenderFormat::stereo16(4_000)))
        );
        assert_eq!(platform.object_counts(), SoftObjectCounts::default());
    }

    #[test]
    fn lenient_capability_miss_is_recorded() {
        let platform = SoftwarePlatform::new().without_entry_point(EntryPoint::IsRenderFormatSupported);

        let report = render_once(&platform, &RenderConfiguration::default()).unwrap();

        // once at load time, once when the format query is refused
        assert_eq!(report.diagnostics.len(), 2);
        assert!(report
            .diagnostics
            .iter()
            .all(|e| matches!(e, RenderError::CapabilityMissing(_))));
        assert_eq!(report.frames.frame_count(), 64);
    }

    #[test]
    fn strict_policy_refuses_partial_capabilities() {
        let platform = SoftwarePlatform::new().without_entry_point(EntryPoint::RenderSamples);
        let config = RenderConfiguration {
            policy: FailurePolicy::Strict,
            ..Default::default()
        };

        assert_eq!(
            render_once(&platform, &config),
            Err(RenderError::CapabilityMissing(vec!["alcRenderSamplesSOFT".into()]))
        );
    }

    #[test]
    fn pull_without_render_entry_fails_even_best_effort() {
        let platform = SoftwarePlatform::new().without_entry_point(EntryPoint::RenderSamples);

        let result = render_once(&platform, &RenderConfiguration::default());

        assert!(matches!(result, Err(RenderError::CapabilityMissing(_))));
        assert_eq!(platform.object_counts(), SoftObjectCounts::default());
    }

    #[test]
    fn non_looping_tone_runs_out() {
        let platform = SoftwarePlatform::new();
        let config = RenderConfiguration {
            looping: false,
            source_samples: 16,
            frame_count: 32,
            ..Default::default()
        };

        let report = render_once(&platform, &config).unwrap();

        let left: Vec<i16> = report.frames.stereo_pairs().map(|(l, _)| l).collect();
        assert_eq!(left[..16], synthesize_waveform(16)[..]);
        assert!(left[16..].iter().all(|&s| s == 0));
    }

    #[test]
    fn half_gain_halves_the_tone() {
        let platform = SoftwarePlatform::new();
        let config = RenderConfiguration {
            gain: 0.5,
            source_samples: 2,
            frame_count: 2,
            ..Default::default()
        };

        let report = render_once(&platform, &config).unwrap();

        assert_eq!(report.frames.samples(), &[16_384, 16_384, -16_384, -16_384]);
    }

    #[test]
    fn writes_wav_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let platform = SoftwarePlatform::new();
        let config = RenderConfiguration {
            wav_output: Some(path.clone()),
            ..Default::default()
        };

        render_once(&platform, &config).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), wav_format::WAV_HEADER_SIZE + 64 * 2 * 2);
    }

    #[test]
    fn unwritable_wav_is_a_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let platform = SoftwarePlatform::new();
        let config = RenderConfiguration {
            wav_output: Some(dir.path().join("no").join("such").join("tone.wav")),
            ..Default::default()
        };

        let report = render_once(&platform, &config).unwrap();

        assert!(matches!(report.diagnostics[..], [RenderError::StorageError(_)]));
    }

    #[test]
    fn invalid_configuration_is_rejected_up_front() {
        let platform = SoftwarePlatform::new();
        let config = RenderConfiguration {
            frame_count: 0,
            ..Default::default()
        };

        assert!(matches!(
            render_once(&platform, &config),
            Err(RenderError::InvalidConfiguration(_))
        ));
        assert_eq!(platform.object_counts(), SoftObjectCounts::default());
    }

    #[test]
    fn oversized_frame_count_is_rejected_not_rendered() {
        let platform = SoftwarePlatform::new();
        let config = RenderConfiguration {
            frame_count: usize::MAX / 2 + 1,
            ..Default::default()
        };

        assert!(matches!(
            render_once(&platform, &config),
            Err(RenderError::InvalidConfiguration(_))
        ));
    }

    #[derive(Default)]
    struct RecordingObserver {
        source: Mutex<Option<Vec<i16>>>,
        diagnostics: Mutex<Vec<RenderError>>,
    }

    impl RenderObserver for RecordingObserver {
        fn on_source_synthesized(&self, samples: &[i16]) {
            *self.source.lock() = Some(samples.to_vec());
        }

        fn on_diagnostic(&self, error: &RenderError) {
            self.diagnostics.lock().push(error.clone());
        }
    }

    #[test]
    fn observer_sees_diagnostics_as_they_happen() {
        let platform = SoftwarePlatform::new();
        let observer = RecordingObserver::default();
        let config = RenderConfiguration {
            format: RenderFormat::stereo16(4_000),
            ..Default::default()
        };

        let report = render_with_observer(&platform, &config, &observer).unwrap();

        assert_eq!(*observer.diagnostics.lock(), report.diagnostics);
        assert_eq!(observer.source.lock().as_deref(), Some(&report.source_samples[..]));
    }

    #[test]
    fn observer_gets_the_tone_even_when_the_pull_fails() {
        let platform = SoftwarePlatform::new().without_entry_point(EntryPoint::RenderSamples);
        let observer = RecordingObserver::default();

        let result = render_with_observer(&platform, &RenderConfiguration::default(), &observer);

        assert!(matches!(result, Err(RenderError::CapabilityMissing(_))));
        assert_eq!(observer.source.lock().clone(), Some(synthesize_waveform(64)));
        assert_eq!(observer.diagnostics.lock().len(), 1);
    }

    #[test]
    fn runs_through_a_trait_object() {
        let platform: Box<dyn AudioPlatform> = Box::new(SoftwarePlatform::new());
        let report = render_once(platform.as_ref(), &RenderConfiguration::default()).unwrap();
        assert_eq!(report.frames.frame_count(), 64);
    }
}
