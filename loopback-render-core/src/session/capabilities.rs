use crate::constants::LOOPBACK_EXTENSION;
use crate::models::error::RenderError;
use crate::traits::audio_platform::{AudioPlatform, EntryPoint};

/// Table of loopback entry points that resolved on a platform.
///
/// Built once before a device is opened and passed by reference to the
/// session. Calls through an unresolved entry point are refused with
/// `CapabilityMissing` instead of reaching the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopbackCapabilities {
    resolved: Vec<EntryPoint>,
}

impl LoopbackCapabilities {
    /// Resolve every entry point, failing with the full list of misses.
    pub fn load<P: AudioPlatform + ?Sized>(platform: &P) -> Result<Self, RenderError> {
        let capabilities = Self::load_lenient(platform)?;
        let missing = capabilities.missing();
        if missing.is_empty() {
            Ok(capabilities)
        } else {
            Err(missing_error(&missing))
        }
    }

    /// Resolve what can be resolved and log the rest.
    ///
    /// Only a missing loopback extension is an error here.
    pub fn load_lenient<P: AudioPlatform + ?Sized>(platform: &P) -> Result<Self, RenderError> {
        if !platform.is_extension_present(LOOPBACK_EXTENSION) {
            log::error!("{} not supported by {}", LOOPBACK_EXTENSION, platform.name());
            return Err(RenderError::CapabilityMissing(vec![LOOPBACK_EXTENSION.to_string()]));
        }

        let mut resolved = Vec::with_capacity(EntryPoint::ALL.len());
        for entry in EntryPoint::ALL {
            if platform.resolve_entry_point(entry) {
                resolved.push(entry);
            } else {
                log::warn!("could not load extension entry point {}", entry);
            }
        }
        log::debug!(
            "resolved {}/{} loopback entry points on {}",
            resolved.len(),
            EntryPoint::ALL.len(),
            platform.name()
        );
        Ok(Self { resolved })
    }

    pub fn is_resolved(&self, entry: EntryPoint) -> bool {
        self.resolved.contains(&entry)
    }

    /// Entry points that did not resolve, in declaration order.
    pub fn missing(&self) -> Vec<EntryPoint> {
        EntryPoint::ALL
            .into_iter()
            .filter(|entry| !self.is_resolved(*entry))
            .collect()
    }

    pub fn require(&self, entry: EntryPoint) -> Result<(), RenderError> {
        if self.is_resolved(entry) {
            Ok(())
        } else {
            Err(missing_error(&[entry]))
        }
    }
}

pub(crate) fn missing_error(entries: &[EntryPoint]) -> RenderError {
    RenderError::CapabilityMissing(entries.iter().map(|e| e.symbol().to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::software::SoftwarePlatform;

    #[test]
    fn full_platform_resolves_everything() {
        let caps = LoopbackCapabilities::load(&SoftwarePlatform::new()).unwrap();
        assert!(caps.missing().is_empty());
        assert!(caps.require(EntryPoint::RenderSamples).is_ok());
    }

    #[test]
    fn missing_extension_fails_both_loaders() {
        let platform = SoftwarePlatform::new().without_loopback_extension();
        let expected = RenderError::CapabilityMissing(vec!["ALC_SOFT_loopback".into()]);

        assert_eq!(LoopbackCapabilities::load(&platform), Err(expected.clone()));
        assert_eq!(LoopbackCapabilities::load_lenient(&platform), Err(expected));
    }

    #[test]
    fn strict_load_lists_every_missing_entry() {
        let platform = SoftwarePlatform::new()
            .without_entry_point(EntryPoint::RenderSamples)
            .without_entry_point(EntryPoint::IsRenderFormatSupported);

        assert_eq!(
            LoopbackCapabilities::load(&platform),
            Err(RenderError::CapabilityMissing(vec![
                "alcIsRenderFormatSupportedSOFT".into(),
                "alcRenderSamplesSOFT".into(),
            ]))
        );
    }

    #[test]
    fn lenient_load_keeps_what_resolved() {
        let platform = SoftwarePlatform::new().without_entry_point(EntryPoint::IsRenderFormatSupported);
        let caps = LoopbackCapabilities::load_lenient(&platform).unwrap();

        assert!(caps.is_resolved(EntryPoint::LoopbackOpenDevice));
        assert!(caps.is_resolved(EntryPoint::RenderSamples));
        assert_eq!(caps.missing(), vec![EntryPoint::IsRenderFormatSupported]);
        assert_eq!(
            caps.require(EntryPoint::IsRenderFormatSupported),
            Err(RenderError::CapabilityMissing(vec!["alcIsRenderFormatSupportedSOFT".into()]))
        );
    }

    #[test]
    fn loads_through_a_trait_object() {
        let platform: Box<dyn AudioPlatform> = Box::new(SoftwarePlatform::new());
        assert!(LoopbackCapabilities::load(platform.as_ref()).is_ok());
    }
}
