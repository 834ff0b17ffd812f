use std::fmt;

use crate::models::error::PlatformErrorCode;
use crate::models::format::RenderFormat;
use crate::models::handles::{BufferId, ContextHandle, DeviceHandle, SourceId};
use crate::models::state::PlayState;

/// Optional entry points of the loopback extension.
///
/// These are resolved at runtime by the capability loader; everything else
/// on [`AudioPlatform`] is part of the core API and always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    LoopbackOpenDevice,
    IsRenderFormatSupported,
    RenderSamples,
}

impl EntryPoint {
    pub const ALL: [EntryPoint; 3] = [
        EntryPoint::LoopbackOpenDevice,
        EntryPoint::IsRenderFormatSupported,
        EntryPoint::RenderSamples,
    ];

    /// Exported symbol name.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::LoopbackOpenDevice => "alcLoopbackOpenDeviceSOFT",
            Self::IsRenderFormatSupported => "alcIsRenderFormatSupportedSOFT",
            Self::RenderSamples => "alcRenderSamplesSOFT",
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The platform audio API a loopback session is driven through.
///
/// Implemented by:
/// - `SoftwarePlatform` (in-process mixer, this crate)
/// - `OpenAlPlatform` (`loopback-render-openal`)
///
/// The surface mirrors a handle-based C API: objects are created and
/// destroyed in explicit pairs, buffer and source calls act on the current
/// context, and failures of those calls land in a sticky error register read
/// by [`AudioPlatform::take_error`]. Session types in [`crate::session`] wrap
/// these calls in owning guards; nothing else should call them directly.
pub trait AudioPlatform: Send + Sync {
    /// Human-readable backend name for diagnostics.
    fn name(&self) -> &str;

    fn is_extension_present(&self, extension: &str) -> bool;

    /// Whether `entry` resolved on this platform.
    fn resolve_entry_point(&self, entry: EntryPoint) -> bool;

    // --- Loopback extension entry points ---

    fn loopback_open_device(&self) -> Option<DeviceHandle>;

    fn is_render_format_supported(&self, device: DeviceHandle, format: &RenderFormat) -> bool;

    /// Render `frames` frames of the device's current mix into `out`.
    ///
    /// `out` holds at least `frames * channels` samples.
    fn render_samples(&self, device: DeviceHandle, out: &mut [i16], frames: usize);

    // --- Device and context ---

    fn close_device(&self, device: DeviceHandle) -> bool;

    /// Create a context from a zero-terminated attribute list.
    fn create_context(&self, device: DeviceHandle, attributes: &[i32]) -> Option<ContextHandle>;

    fn make_context_current(&self, context: Option<ContextHandle>) -> bool;

    fn destroy_context(&self, context: ContextHandle);

    // --- Buffers ---

    fn gen_buffer(&self) -> Option<BufferId>;

    /// Fill `buffer` with mono signed 16-bit samples.
    fn buffer_data_mono16(&self, buffer: BufferId, samples: &[i16], sample_rate: u32);

    fn delete_buffer(&self, buffer: BufferId);

    // --- Sources ---

    fn gen_source(&self) -> Option<SourceId>;

    fn set_source_buffer(&self, source: SourceId, buffer: Option<BufferId>);

    fn set_source_looping(&self, source: SourceId, looping: bool);

    fn set_source_gain(&self, source: SourceId, gain: f32);

    fn set_source_pitch(&self, source: SourceId, pitch: f32);

    fn rewind_source(&self, source: SourceId);

    fn play_source(&self, source: SourceId);

    fn stop_source(&self, source: SourceId);

    fn source_state(&self, source: SourceId) -> PlayState;

    fn delete_source(&self, source: SourceId);

    // --- Error register ---

    /// Read and clear the last error.
    fn take_error(&self) -> Option<PlatformErrorCode>;
}
