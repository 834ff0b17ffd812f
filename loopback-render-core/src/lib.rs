//! # loopback-render-core
//!
//! Platform-agnostic loopback rendering.
//!
//! Opens a non-blocking virtual device, negotiates a render format, plays a
//! synthesized tone through a buffer → source → mix graph, and pulls the mixed
//! frames back into memory instead of sending them to an output device.
//! Platform backends implement the `AudioPlatform` trait; an in-process
//! `SoftwarePlatform` ships with this crate.
//!
//! ## Architecture
//!
//! ```text
//! loopback-render-core (this crate)
//! ├── traits/       ← AudioPlatform, EntryPoint, RenderObserver
//! ├── models/       ← RenderError, RenderFormat, RenderConfiguration, PlayState, handles
//! ├── processing/   ← tone synthesis, voice mixing, WAV export
//! ├── session/      ← LoopbackCapabilities, VirtualDevice, RenderContext,
//! │                   AudioBuffer, PlaybackSource, RenderPuller, render_once
//! └── software/     ← SoftwarePlatform
//! ```

pub mod constants;
pub mod models;
pub mod processing;
pub mod session;
pub mod software;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::{FailurePolicy, RenderConfiguration};
pub use models::error::{PlatformErrorCode, RenderError};
pub use models::format::{ChannelLayout, RenderFormat, SampleEncoding};
pub use models::handles::{BufferId, ContextHandle, DeviceHandle, SourceId};
pub use models::state::PlayState;
pub use processing::waveform::synthesize_waveform;
pub use session::capabilities::LoopbackCapabilities;
pub use session::device::{RenderContext, VirtualDevice};
pub use session::puller::{RenderPuller, RenderedFrames};
pub use session::runner::{render_once, render_with_observer, RenderReport};
pub use session::signal::{AudioBuffer, PlaybackSource};
pub use software::SoftwarePlatform;
pub use traits::audio_platform::{AudioPlatform, EntryPoint};
pub use traits::render_observer::{RenderObserver, SilentObserver};
