//! In-process loopback platform.
//!
//! Implements [`AudioPlatform`] without any native library: devices, contexts,
//! buffers and sources live in a table behind a `parking_lot::Mutex`, and
//! `render_samples` mixes the playing sources with [`Voice`]. Behaviour
//! follows the OpenAL conventions the session types rely on: buffer and
//! source calls act on the current context, failures land in a sticky error
//! register, and a buffer cannot be changed or deleted while a source holds it.

use std::collections::{BTreeMap, HashMap, HashSet};

use parking_lot::Mutex;

use crate::constants::LOOPBACK_EXTENSION;
use crate::models::error::PlatformErrorCode;
use crate::models::format::{RenderFormat, SampleEncoding};
use crate::models::handles::{BufferId, ContextHandle, DeviceHandle, SourceId};
use crate::models::state::PlayState;
use crate::processing::voice_mixer::{playback_step, quantize_to_i16, Voice};
use crate::traits::audio_platform::{AudioPlatform, EntryPoint};

/// Sample rates the software device can render at.
pub const SUPPORTED_RATES: std::ops::RangeInclusive<u32> = 8_000..=192_000;

#[derive(Debug)]
struct SoftBuffer {
    samples: Vec<i16>,
    sample_rate: u32,
}

#[derive(Debug)]
struct SoftSource {
    buffer: Option<BufferId>,
    looping: bool,
    gain: f32,
    pitch: f32,
    state: PlayState,
    position: f64,
}

impl SoftSource {
    fn new() -> Self {
        Self {
            buffer: None,
            looping: false,
            gain: 1.0,
            pitch: 1.0,
            state: PlayState::Stopped,
            position: 0.0,
        }
    }

    fn halt(&mut self) {
        self.state = PlayState::Stopped;
        self.position = 0.0;
    }
}

#[derive(Debug)]
struct SoftContext {
    device: DeviceHandle,
    format: RenderFormat,
    buffers: BTreeMap<BufferId, SoftBuffer>,
    sources: BTreeMap<SourceId, SoftSource>,
}

impl SoftContext {
    fn buffer_in_use(&self, buffer: BufferId) -> bool {
        self.sources.values().any(|s| s.buffer == Some(buffer))
    }
}

#[derive(Debug, Default)]
struct SoftState {
    devices: HashSet<DeviceHandle>,
    contexts: HashMap<ContextHandle, SoftContext>,
    current: Option<ContextHandle>,
    next_handle: usize,
    next_name: u32,
    error: Option<PlatformErrorCode>,
}

impl SoftState {
    /// First error wins until it is read.
    fn set_error(&mut self, code: PlatformErrorCode) {
        if self.error.is_none() {
            self.error = Some(code);
        }
    }

    fn next_handle(&mut self) -> usize {
        self.next_handle += 1;
        self.next_handle
    }

    fn next_name(&mut self) -> u32 {
        self.next_name += 1;
        self.next_name
    }

    fn current_context(&mut self) -> Result<&mut SoftContext, PlatformErrorCode> {
        let current = self.current.ok_or(PlatformErrorCode::InvalidOperation)?;
        self.contexts
            .get_mut(&current)
            .ok_or(PlatformErrorCode::InvalidOperation)
    }

    fn source_mut(&mut self, source: SourceId) -> Result<&mut SoftSource, PlatformErrorCode> {
        self.current_context()?
            .sources
            .get_mut(&source)
            .ok_or(PlatformErrorCode::InvalidName)
    }
}

/// Live object counts, for checking that a session released everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SoftObjectCounts {
    pub devices: usize,
    pub contexts: usize,
    pub buffers: usize,
    pub sources: usize,
}

/// Software implementation of the loopback platform.
pub struct SoftwarePlatform {
    loopback_extension: bool,
    unresolved: Vec<EntryPoint>,
    devices_available: bool,
    state: Mutex<SoftState>,
}

impl SoftwarePlatform {
    /// A platform exposing the loopback extension and all its entry points.
    pub fn new() -> Self {
        Self {
            loopback_extension: true,
            unresolved: Vec::new(),
            devices_available: true,
            state: Mutex::new(SoftState::default()),
        }
    }

    /// Hide the loopback extension from `is_extension_present`.
    pub fn without_loopback_extension(mut self) -> Self {
        self.loopback_extension = false;
        self
    }

    /// Make `entry` fail to resolve.
    pub fn without_entry_point(mut self, entry: EntryPoint) -> Self {
        if !self.unresolved.contains(&entry) {
            self.unresolved.push(entry);
        }
        self
    }

    /// Refuse every device open request.
    pub fn without_devices(mut self) -> Self {
        self.devices_available = false;
        self
    }

    pub fn object_counts(&self) -> SoftObjectCounts {
        let state = self.state.lock();
        SoftObjectCounts {
            devices: state.devices.len(),
            contexts: state.contexts.len(),
            buffers: state.contexts.values().map(|c| c.buffers.len()).sum(),
            sources: state.contexts.values().map(|c| c.sources.len()).sum(),
        }
    }

    pub fn current_context(&self) -> Option<ContextHandle> {
        self.state.lock().current
    }

    fn update_source(
        &self,
        source: SourceId,
        update: impl FnOnce(&mut SoftSource) -> Result<(), PlatformErrorCode>,
    ) {
        let mut state = self.state.lock();
        let result = state.source_mut(source).and_then(update);
        if let Err(code) = result {
            state.set_error(code);
        }
    }
}

impl Default for SoftwarePlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPlatform for SoftwarePlatform {
    fn name(&self) -> &str {
        "software"
    }

    fn is_extension_present(&self, extension: &str) -> bool {
        self.loopback_extension && extension == LOOPBACK_EXTENSION
    }

    fn resolve_entry_point(&self, entry: EntryPoint) -> bool {
        self.loopback_extension && !self.unresolved.contains(&entry)
    }

    fn loopback_open_device(&self) -> Option<DeviceHandle> {
        if !self.devices_available || !self.resolve_entry_point(EntryPoint::LoopbackOpenDevice) {
            return None;
        }
        let mut state = self.state.lock();
        let device = DeviceHandle(state.next_handle());
        state.devices.insert(device);
        Some(device)
    }

    fn is_render_format_supported(&self, device: DeviceHandle, format: &RenderFormat) -> bool {
        self.state.lock().devices.contains(&device)
            && format.encoding == SampleEncoding::Int16
            && SUPPORTED_RATES.contains(&format.sample_rate)
    }

    fn render_samples(&self, device: DeviceHandle, out: &mut [i16], frames: usize) {
        let mut state = self.state.lock();

        let found = state
            .contexts
            .iter()
            .find(|(_, c)| c.device == device)
            .map(|(handle, c)| (*handle, c.format));
        let Some((handle, format)) = found else {
            state.set_error(PlatformErrorCode::InvalidOperation);
            return;
        };
        let channels = format.channels.channel_count();
        let Some(needed) = format.samples_for(frames).filter(|&n| n <= out.len()) else {
            state.set_error(PlatformErrorCode::InvalidValue);
            return;
        };
        let Some(context) = state.contexts.get_mut(&handle) else {
            return;
        };
        let mut accumulator = vec![0.0f32; needed];

        let SoftContext {
            buffers, sources, ..
        } = context;
        for source in sources.values_mut().filter(|s| s.state.is_playing()) {
            let Some(buffer) = source.buffer.and_then(|id| buffers.get(&id)) else {
                source.halt();
                continue;
            };
            let voice = Voice {
                samples: &buffer.samples,
                step: playback_step(buffer.sample_rate, format.sample_rate, source.pitch),
                gain: source.gain,
                looping: source.looping,
            };
            if !voice.mix_into(&mut accumulator, channels, &mut source.position) {
                source.halt();
            }
        }

        quantize_to_i16(&accumulator, out);
    }

    fn close_device(&self, device: DeviceHandle) -> bool {
        let mut state = self.state.lock();
        if !state.devices.remove(&device) {
            return false;
        }
        let orphaned = state.contexts.values().filter(|c| c.device == device).count();
        if orphaned > 0 {
            log::warn!("closing device {:?} with {} live context(s)", device, orphaned);
            state.contexts.retain(|_, c| c.device != device);
        }
        true
    }

    fn create_context(&self, device: DeviceHandle, attributes: &[i32]) -> Option<ContextHandle> {
        let mut state = self.state.lock();
        if !state.devices.contains(&device) {
            return None;
        }
        let format = RenderFormat::from_attributes(attributes)?;
        if format.sample_rate == 0 {
            return None;
        }

        let context = ContextHandle(state.next_handle());
        state.contexts.insert(
            context,
            SoftContext {
                device,
                format,
                buffers: BTreeMap::new(),
                sources: BTreeMap::new(),
            },
        );
        Some(context)
    }

    fn make_context_current(&self, context: Option<ContextHandle>) -> bool {
        let mut state = self.state.lock();
        match context {
            Some(handle) if !state.contexts.contains_key(&handle) => false,
            _ => {
                state.current = context;
                true
            }
        }
    }

    fn destroy_context(&self, context: ContextHandle) {
        let mut state = self.state.lock();
        if state.contexts.remove(&context).is_some() && state.current == Some(context) {
            state.current = None;
        }
    }

    fn gen_buffer(&self) -> Option<BufferId> {
        let mut state = self.state.lock();
        let id = BufferId(state.next_name());
        match state.current_context() {
            Ok(context) => {
                context.buffers.insert(
                    id,
                    SoftBuffer {
                        samples: Vec::new(),
                        sample_rate: 0,
                    },
                );
                Some(id)
            }
            Err(code) => {
                state.set_error(code);
                None
            }
        }
    }

    fn buffer_data_mono16(&self, buffer: BufferId, samples: &[i16], sample_rate: u32) {
        let mut state = self.state.lock();
        let result = state.current_context().and_then(|context| {
            if !context.buffers.contains_key(&buffer) {
                return Err(PlatformErrorCode::InvalidName);
            }
            if sample_rate == 0 {
                return Err(PlatformErrorCode::InvalidValue);
            }
            if context.buffer_in_use(buffer) {
                return Err(PlatformErrorCode::InvalidOperation);
            }
            context.buffers.insert(
                buffer,
                SoftBuffer {
                    samples: samples.to_vec(),
                    sample_rate,
                },
            );
            Ok(())
        });
        if let Err(code) = result {
            state.set_error(code);
        }
    }

    fn delete_buffer(&self, buffer: BufferId) {
        let mut state = self.state.lock();
        let result = state.current_context().and_then(|context| {
            if context.buffer_in_use(buffer) {
                return Err(PlatformErrorCode::InvalidOperation);
            }
            context
                .buffers
                .remove(&buffer)
                .map(|_| ())
                .ok_or(PlatformErrorCode::InvalidName)
        });
        if let Err(code) = result {
            state.set_error(code);
        }
    }

    fn gen_source(&self) -> Option<SourceId> {
        let mut state = self.state.lock();
        let id = SourceId(state.next_name());
        match state.current_context() {
            Ok(context) => {
                context.sources.insert(id, SoftSource::new());
                Some(id)
            }
            Err(code) => {
                state.set_error(code);
                None
            }
        }
    }

    fn set_source_buffer(&self, source: SourceId, buffer: Option<BufferId>) {
        let mut state = self.state.lock();
        let result = state.current_context().and_then(|context| {
            if let Some(id) = buffer {
                if !context.buffers.contains_key(&id) {
                    return Err(PlatformErrorCode::InvalidName);
                }
            }
            let entry = context
                .sources
                .get_mut(&source)
                .ok_or(PlatformErrorCode::InvalidName)?;
            if entry.state.is_playing() {
                return Err(PlatformErrorCode::InvalidOperation);
            }
            entry.buffer = buffer;
            entry.position = 0.0;
            Ok(())
        });
        if let Err(code) = result {
            state.set_error(code);
        }
    }

    fn set_source_looping(&self, source: SourceId, looping: bool) {
        self.update_source(source, |s| {
            s.looping = looping;
            Ok(())
        });
    }

    fn set_source_gain(&self, source: SourceId, gain: f32) {
        self.update_source(source, |s| {
            if !gain.is_finite() || gain < 0.0 {
                return Err(PlatformErrorCode::InvalidValue);
            }
            s.gain = gain;
            Ok(())
        });
    }

    fn set_source_pitch(&self, source: SourceId, pitch: f32) {
        self.update_source(source, |s| {
            if !pitch.is_finite() || pitch <= 0.0 {
                return Err(PlatformErrorCode::InvalidValue);
            }
            s.pitch = pitch;
            Ok(())
        });
    }

    fn rewind_source(&self, source: SourceId) {
        self.update_source(source, |s| {
            s.halt();
            Ok(())
        });
    }

    fn play_source(&self, source: SourceId) {
        self.update_source(source, |s| {
            if s.state.is_playing() {
                return Ok(());
            }
            // a source with nothing to play stops straight away
            if s.buffer.is_some() {
                s.state = PlayState::Playing;
            }
            Ok(())
        });
    }

    fn stop_source(&self, source: SourceId) {
        self.update_source(source, |s| {
            s.halt();
            Ok(())
        });
    }

    fn source_state(&self, source: SourceId) -> PlayState {
        let mut state = self.state.lock();
        match state.source_mut(source) {
            Ok(s) => s.state,
            Err(code) => {
                state.set_error(code);
                PlayState::Stopped
            }
        }
    }

    fn delete_source(&self, source: SourceId) {
        let mut state = self.state.lock();
        let result = state.current_context().and_then(|context| {
            context
                .sources
                .remove(&source)
                .map(|_| ())
                .ok_or(PlatformErrorCode::InvalidName)
        });
        if let Err(code) = result {
            state.set_error(code);
        }
    }

    fn take_error(&self) -> Option<PlatformErrorCode> {
        self.state.lock().error.take()
    }
}
