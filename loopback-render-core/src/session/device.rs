use crate::models::error::{PlatformErrorCode, RenderError};
use crate::models::format::RenderFormat;
use crate::models::handles::{ContextHandle, DeviceHandle};
use crate::traits::audio_platform::{AudioPlatform, EntryPoint};

use super::capabilities::LoopbackCapabilities;

/// A non-blocking loopback device. Closed on drop.
///
/// Contexts borrow the device, so the borrow checker keeps the device alive
/// until every context created on it has been destroyed.
pub struct VirtualDevice<'p, P: AudioPlatform + ?Sized> {
    platform: &'p P,
    capabilities: &'p LoopbackCapabilities,
    handle: DeviceHandle,
}

impl<'p, P: AudioPlatform + ?Sized> VirtualDevice<'p, P> {
    /// Open a loopback device.
    ///
    /// Fails with `DeviceUnavailable` if the open entry point did not resolve
    /// or the platform hands back no device.
    pub fn open(platform: &'p P, capabilities: &'p LoopbackCapabilities) -> Result<Self, RenderError> {
        if !capabilities.is_resolved(EntryPoint::LoopbackOpenDevice) {
            log::error!("cannot open a device: {} did not resolve", EntryPoint::LoopbackOpenDevice);
            return Err(RenderError::DeviceUnavailable);
        }
        let handle = platform.loopback_open_device().ok_or_else(|| {
            log::error!("could not open a loopback device on {}", platform.name());
            RenderError::DeviceUnavailable
        })?;
        log::debug!("opened loopback device {:?}", handle);

        Ok(Self {
            platform,
            capabilities,
            handle,
        })
    }

    /// Ask whether `format` can be rendered.
    ///
    /// Nothing changes on the device either way; an unsupported format may
    /// still be handed to [`VirtualDevice::create_context`].
    pub fn configure_format(&self, format: RenderFormat) -> Result<RenderFormat, RenderError> {
        self.capabilities.require(EntryPoint::IsRenderFormatSupported)?;
        if self.platform.is_render_format_supported(self.handle, &format) {
            Ok(format)
        } else {
            log::warn!("render format not supported: {}", format);
            Err(RenderError::FormatUnsupported(format))
        }
    }

    /// Create a render context for `format` and make it current.
    pub fn create_context(&self, format: RenderFormat) -> Result<RenderContext<'_, P>, RenderError> {
        RenderContext::create(self, format)
    }

    pub fn handle(&self) -> DeviceHandle {
        self.handle
    }

    pub fn platform(&self) -> &'p P {
        self.platform
    }

    pub fn capabilities(&self) -> &'p LoopbackCapabilities {
        self.capabilities
    }
}

impl<P: AudioPlatform + ?Sized> Drop for VirtualDevice<'_, P> {
    fn drop(&mut self) {
        if self.platform.close_device(self.handle) {
            log::debug!("closed loopback device {:?}", self.handle);
        } else {
            log::warn!("platform refused to close device {:?}", self.handle);
        }
    }
}

/// A render context bound to a [`VirtualDevice`].
///
/// Current from creation until drop; dropping it clears the current binding
/// and destroys the context before the device can go away.
pub struct RenderContext<'d, P: AudioPlatform + ?Sized> {
    device: &'d VirtualDevice<'d, P>,
    handle: ContextHandle,
    format: RenderFormat,
}

impl<'d, P: AudioPlatform + ?Sized> RenderContext<'d, P> {
    pub fn create(device: &'d VirtualDevice<'d, P>, format: RenderFormat) -> Result<Self, RenderError> {
        let platform = device.platform;
        let handle = platform
            .create_context(device.handle, &format.to_attributes())
            .ok_or_else(|| {
                log::error!("could not create a context for {}", format);
                RenderError::ContextCreationFailed(format!("platform refused {}", format))
            })?;

        if !platform.make_context_current(Some(handle)) {
            platform.destroy_context(handle);
            return Err(RenderError::ContextCreationFailed(
                "context could not be made current".into(),
            ));
        }
        log::debug!("context {:?} current for {}", handle, format);

        Ok(Self {
            device,
            handle,
            format,
        })
    }

    pub fn device(&self) -> &'d VirtualDevice<'d, P> {
        self.device
    }

    pub fn platform(&self) -> &'d P {
        self.device.platform
    }

    pub fn format(&self) -> RenderFormat {
        self.format
    }

    pub fn handle(&self) -> ContextHandle {
        self.handle
    }

    /// Read and clear the platform error register.
    pub fn take_error(&self) -> Option<PlatformErrorCode> {
        self.platform().take_error()
    }

    /// Turn a set error register into `PlatformOperationError`.
    pub fn check(&self, operation: &'static str) -> Result<(), RenderError> {
        match self.take_error() {
            None => Ok(()),
            Some(code) => {
                log::warn!("{}: {}", operation, code);
                Err(RenderError::PlatformOperationError { operation, code })
            }
        }
    }
}

impl<P: AudioPlatform + ?Sized> Drop for RenderContext<'_, P> {
    fn drop(&mut self) {
        let platform = self.platform();
        platform.make_context_current(None);
        platform.destroy_context(self.handle);
        log::debug!("destroyed context {:?}", self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format::{ChannelLayout, SampleEncoding};
    use crate::software::{SoftObjectCounts, SoftwarePlatform};

    #[test]
    fn open_configure_create_and_release() {
        let platform = SoftwarePlatform::new();
        let caps = LoopbackCapabilities::load(&platform).unwrap();
        {
            let device = VirtualDevice::open(&platform, &caps).unwrap();
            let format = device.configure_format(RenderFormat::default()).unwrap();
            let context = device.create_context(format).unwrap();

            assert_eq!(platform.current_context(), Some(context.handle()));
            assert_eq!(context.format(), RenderFormat::default());
            assert_eq!(platform.object_counts().contexts, 1);
        }
        assert_eq!(platform.current_context(), None);
        assert_eq!(platform.object_counts(), SoftObjectCounts::default());
    }

    #[test]
    fn unavailable_device() {
        let platform = SoftwarePlatform::new().without_devices();
        let caps = LoopbackCapabilities::load(&platform).unwrap();
        assert!(matches!(
            VirtualDevice::open(&platform, &caps),
            Err(RenderError::DeviceUnavailable)
        ));
    }

    #[test]
    fn unresolved_open_entry_is_device_unavailable() {
        let platform = SoftwarePlatform::new().without_entry_point(EntryPoint::LoopbackOpenDevice);
        let caps = LoopbackCapabilities::load_lenient(&platform).unwrap();
        assert!(matches!(
            VirtualDevice::open(&platform, &caps),
            Err(RenderError::DeviceUnavailable)
        ));
    }

    #[test]
    fn unsupported_format_still_allows_context_creation() {
        let platform = SoftwarePlatform::new();
        let caps = LoopbackCapabilities::load(&platform).unwrap();
        let device = VirtualDevice::open(&platform, &caps).unwrap();
        let odd = RenderFormat::stereo16(4_000);

        assert_eq!(device.configure_format(odd), Err(RenderError::FormatUnsupported(odd)));
        let context = device.create_context(odd).unwrap();
        assert_eq!(context.format(), odd);
    }

    #[test]
    fn format_query_needs_its_entry_point() {
        let platform = SoftwarePlatform::new().without_entry_point(EntryPoint::IsRenderFormatSupported);
        let caps = LoopbackCapabilities::load_lenient(&platform).unwrap();
        let device = VirtualDevice::open(&platform, &caps).unwrap();

        assert!(matches!(
            device.configure_format(RenderFormat::default()),
            Err(RenderError::CapabilityMissing(_))
        ));
    }

    #[test]
    fn refused_context_is_context_creation_failed() {
        let platform = SoftwarePlatform::new();
        let caps = LoopbackCapabilities::load(&platform).unwrap();
        let device = VirtualDevice::open(&platform, &caps).unwrap();

        let result = device.create_context(RenderFormat::new(ChannelLayout::Mono, SampleEncoding::Int16, 0));
        assert!(matches!(result, Err(RenderError::ContextCreationFailed(_))));
        assert_eq!(platform.object_counts().contexts, 0);
    }

    #[test]
    fn check_reports_and_clears_the_register() {
        let platform = SoftwarePlatform::new();
        let caps = LoopbackCapabilities::load(&platform).unwrap();
        let device = VirtualDevice::open(&platform, &caps).unwrap();
        let context = device.create_context(RenderFormat::default()).unwrap();

        platform.delete_source(crate::models::handles::SourceId(77));
        assert_eq!(
            context.check("source delete"),
            Err(RenderError::PlatformOperationError {
                operation: "source delete",
                code: PlatformErrorCode::InvalidName,
            })
        );
        assert_eq!(context.check("source delete"), Ok(()));
    }
}
