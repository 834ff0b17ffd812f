//! OpenAL loopback backend.
//!
//! Binds the OpenAL core calls from a dynamically loaded library and resolves
//! the `ALC_SOFT_loopback` entry points through `alcGetProcAddress`, the same
//! way an application linking OpenAL would. Unresolved extension entries stay
//! `None` and are reported to the capability loader instead of being called.
//!
//! ## Platform Requirements
//! - OpenAL Soft (or another implementation exposing `ALC_SOFT_loopback`)
//!   installed under one of [`LIBRARY_CANDIDATES`], or an explicit path

use std::collections::HashMap;
use std::ffi::{c_char, CString, OsStr};
use std::ptr;

use libloading::{Library, Symbol};
use parking_lot::Mutex;

use loopback_render_core::constants::{al, alc, LOOPBACK_EXTENSION};
use loopback_render_core::models::error::{PlatformErrorCode, RenderError};
use loopback_render_core::models::format::RenderFormat;
use loopback_render_core::models::handles::{BufferId, ContextHandle, DeviceHandle, SourceId};
use loopback_render_core::models::state::PlayState;
use loopback_render_core::traits::audio_platform::{AudioPlatform, EntryPoint};

use crate::ffi::*;

/// Library names tried by [`OpenAlPlatform::load`], in order.
pub const LIBRARY_CANDIDATES: &[&str] = &[
    "libopenal.so.1",
    "libopenal.so",
    "libopenal.1.dylib",
    "libopenal.dylib",
    "OpenAL32.dll",
    "soft_oal.dll",
];

/// Core entry points. Valid for as long as the library stays loaded.
struct CoreApi {
    alc_is_extension_present: AlcIsExtensionPresentFn,
    alc_get_proc_address: AlcGetProcAddressFn,
    alc_close_device: AlcCloseDeviceFn,
    alc_create_context: AlcCreateContextFn,
    alc_make_context_current: AlcMakeContextCurrentFn,
    alc_destroy_context: AlcDestroyContextFn,
    al_gen_buffers: AlGenObjectsFn,
    al_delete_buffers: AlDeleteObjectsFn,
    al_buffer_data: AlBufferDataFn,
    al_gen_sources: AlGenObjectsFn,
    al_delete_sources: AlDeleteObjectsFn,
    al_sourcei: AlSourceiFn,
    al_sourcef: AlSourcefFn,
    al_get_sourcei: AlGetSourceiFn,
    al_source_play: AlSourceOpFn,
    al_source_stop: AlSourceOpFn,
    al_source_rewind: AlSourceOpFn,
    al_get_error: AlGetErrorFn,
}

impl CoreApi {
    /// # Safety
    /// Every symbol must have the C signature declared in [`crate::ffi`].
    unsafe fn bind(library: &Library) -> Result<Self, RenderError> {
        Ok(Self {
            alc_is_extension_present: symbol(library, b"alcIsExtensionPresent\0")?,
            alc_get_proc_address: symbol(library, b"alcGetProcAddress\0")?,
            alc_close_device: symbol(library, b"alcCloseDevice\0")?,
            alc_create_context: symbol(library, b"alcCreateContext\0")?,
            alc_make_context_current: symbol(library, b"alcMakeContextCurrent\0")?,
            alc_destroy_context: symbol(library, b"alcDestroyContext\0")?,
            al_gen_buffers: symbol(library, b"alGenBuffers\0")?,
            al_delete_buffers: symbol(library, b"alDeleteBuffers\0")?,
            al_buffer_data: symbol(library, b"alBufferData\0")?,
            al_gen_sources: symbol(library, b"alGenSources\0")?,
            al_delete_sources: symbol(library, b"alDeleteSources\0")?,
            al_sourcei: symbol(library, b"alSourcei\0")?,
            al_sourcef: symbol(library, b"alSourcef\0")?,
            al_get_sourcei: symbol(library, b"alGetSourcei\0")?,
            al_source_play: symbol(library, b"alSourcePlay\0")?,
            al_source_stop: symbol(library, b"alSourceStop\0")?,
            al_source_rewind: symbol(library, b"alSourceRewind\0")?,
            al_get_error: symbol(library, b"alGetError\0")?,
        })
    }
}

/// `ALC_SOFT_loopback` entry points; `None` when resolution failed.
#[derive(Default)]
struct LoopbackApi {
    open_device: Option<LoopbackOpenDeviceSoftFn>,
    is_render_format_supported: Option<IsRenderFormatSupportedSoftFn>,
    render_samples: Option<RenderSamplesSoftFn>,
}

impl LoopbackApi {
    /// # Safety
    /// `core` must come from a loaded OpenAL library.
    unsafe fn resolve(core: &CoreApi) -> Self {
        let extension = c_string(LOOPBACK_EXTENSION);
        if (core.alc_is_extension_present)(ptr::null_mut(), extension.as_ptr()) == alc::FALSE as c_char {
            return Self::default();
        }

        let lookup = |entry: EntryPoint| {
            let name = c_string(entry.symbol());
            let address = (core.alc_get_proc_address)(ptr::null_mut(), name.as_ptr());
            (!address.is_null()).then_some(address)
        };

        // SAFETY: addresses returned for these names have the ALC_SOFT_loopback signatures.
        Self {
            open_device: lookup(EntryPoint::LoopbackOpenDevice)
                .map(|a| std::mem::transmute::<_, LoopbackOpenDeviceSoftFn>(a)),
            is_render_format_supported: lookup(EntryPoint::IsRenderFormatSupported)
                .map(|a| std::mem::transmute::<_, IsRenderFormatSupportedSoftFn>(a)),
            render_samples: lookup(EntryPoint::RenderSamples)
                .map(|a| std::mem::transmute::<_, RenderSamplesSoftFn>(a)),
        }
    }
}

/// [`AudioPlatform`] over a dynamically loaded OpenAL library.
pub struct OpenAlPlatform {
    core: CoreApi,
    loopback: LoopbackApi,
    library_name: String,
    /// Render format of each device, recorded at context creation so renders
    /// can be checked against the caller's buffer.
    formats: Mutex<HashMap<DeviceHandle, RenderFormat>>,
    /// Errors raised on this side of the FFI boundary, reported before AL's own.
    pending_error: Mutex<Option<PlatformErrorCode>>,
    // Dropped last: every function pointer above points into it.
    _library: Library,
}

impl OpenAlPlatform {
    /// Load the first OpenAL library found under [`LIBRARY_CANDIDATES`].
    pub fn load() -> Result<Self, RenderError> {
        for name in LIBRARY_CANDIDATES {
            match Self::load_from(name) {
                Ok(platform) => return Ok(platform),
                Err(e) => log::debug!("{}: {}", name, e),
            }
        }
        log::error!("no OpenAL library found (tried {})", LIBRARY_CANDIDATES.join(", "));
        Err(RenderError::CapabilityMissing(vec!["OpenAL library".into()]))
    }

    /// Load OpenAL from an explicit library path or name.
    pub fn load_from(path: impl AsRef<OsStr>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let library_name = path.to_string_lossy().into_owned();

        // SAFETY: loading OpenAL runs only its own initialisers.
        let library = unsafe { Library::new(path) }.map_err(|e| {
            RenderError::CapabilityMissing(vec![format!("{} ({})", library_name, e)])
        })?;

        // SAFETY: signatures in `ffi` match the OpenAL 1.1 headers.
        let core = unsafe { CoreApi::bind(&library) }?;
        // SAFETY: `core` was just bound from this library.
        let loopback = unsafe { LoopbackApi::resolve(&core) };

        log::info!("loaded OpenAL from {}", library_name);
        Ok(Self {
            core,
            loopback,
            library_name,
            formats: Mutex::new(HashMap::new()),
            pending_error: Mutex::new(None),
            _library: library,
        })
    }

    pub fn library_name(&self) -> &str {
        &self.library_name
    }

    fn raise(&self, code: PlatformErrorCode) {
        let mut pending = self.pending_error.lock();
        if pending.is_none() {
            *pending = Some(code);
        }
    }

    fn source_i(&self, source: SourceId, param: i32, value: i32) {
        // SAFETY: plain value call on a name owned by the current context.
        unsafe { (self.core.al_sourcei)(source.0, param, value) }
    }

    fn source_f(&self, source: SourceId, param: i32, value: f32) {
        // SAFETY: as above.
        unsafe { (self.core.al_sourcef)(source.0, param, value) }
    }
}

impl AudioPlatform for OpenAlPlatform {
    fn name(&self) -> &str {
        "openal"
    }

    fn is_extension_present(&self, extension: &str) -> bool {
        let Ok(name) = CString::new(extension) else {
            return false;
        };
        // SAFETY: null device queries context-independent extensions.
        unsafe { (self.core.alc_is_extension_present)(ptr::null_mut(), name.as_ptr()) != alc::FALSE as c_char }
    }

    fn resolve_entry_point(&self, entry: EntryPoint) -> bool {
        match entry {
            EntryPoint::LoopbackOpenDevice => self.loopback.open_device.is_some(),
            EntryPoint::IsRenderFormatSupported => self.loopback.is_render_format_supported.is_some(),
            EntryPoint::RenderSamples => self.loopback.render_samples.is_some(),
        }
    }

    fn loopback_open_device(&self) -> Option<DeviceHandle> {
        let open = self.loopback.open_device?;
        // SAFETY: null name asks for the default loopback device.
        let device = unsafe { open(ptr::null()) };
        (!device.is_null()).then(|| DeviceHandle(device as usize))
    }

    fn is_render_format_supported(&self, device: DeviceHandle, format: &RenderFormat) -> bool {
        let Some(query) = self.loopback.is_render_format_supported else {
            return false;
        };
        let Ok(rate) = ALCsizei::try_from(format.sample_rate) else {
            return false;
        };
        // SAFETY: `device` came from `loopback_open_device` and is still open.
        unsafe {
            query(
                device.0 as *mut ALCdevice,
                rate,
                format.channels.to_raw(),
                format.encoding.to_raw(),
            ) != alc::FALSE as c_char
        }
    }

    fn render_samples(&self, device: DeviceHandle, out: &mut [i16], frames: usize) {
        let Some(render) = self.loopback.render_samples else {
            self.raise(PlatformErrorCode::InvalidOperation);
            return;
        };
        let Some(format) = self.formats.lock().get(&device).copied() else {
            self.raise(PlatformErrorCode::InvalidOperation);
            return;
        };
        let frame_count = match ALCsizei::try_from(frames) {
            Ok(n) if format.samples_for(frames).is_some_and(|needed| out.len() >= needed) => n,
            _ => {
                self.raise(PlatformErrorCode::InvalidValue);
                return;
            }
        };
        // SAFETY: `out` holds `frames` frames of the device's 16-bit format.
        unsafe { render(device.0 as *mut ALCdevice, out.as_mut_ptr().cast(), frame_count) }
    }

    fn close_device(&self, device: DeviceHandle) -> bool {
        self.formats.lock().remove(&device);
        // SAFETY: the device guard closes each device exactly once.
        unsafe { (self.core.alc_close_device)(device.0 as *mut ALCdevice) != alc::FALSE as c_char }
    }

    fn create_context(&self, device: DeviceHandle, attributes: &[i32]) -> Option<ContextHandle> {
        if attributes.last() != Some(&0) {
            return None;
        }
        // SAFETY: the attribute list is zero-terminated.
        let context = unsafe { (self.core.alc_create_context)(device.0 as *mut ALCdevice, attributes.as_ptr()) };
        if context.is_null() {
            return None;
        }
        if let Some(format) = RenderFormat::from_attributes(attributes) {
            self.formats.lock().insert(device, format);
        }
        Some(ContextHandle(context as usize))
    }

    fn make_context_current(&self, context: Option<ContextHandle>) -> bool {
        let raw = context.map_or(ptr::null_mut(), |c| c.0 as *mut ALCcontext);
        // SAFETY: null clears the binding; anything else came from `create_context`.
        unsafe { (self.core.alc_make_context_current)(raw) != alc::FALSE as c_char }
    }

    fn destroy_context(&self, context: ContextHandle) {
        // SAFETY: the context guard destroys each context exactly once.
        unsafe { (self.core.alc_destroy_context)(context.0 as *mut ALCcontext) }
    }

    fn gen_buffer(&self) -> Option<BufferId> {
        let mut id: ALuint = 0;
        // SAFETY: writes exactly one name.
        unsafe { (self.core.al_gen_buffers)(1, &mut id) };
        (id != 0).then_some(BufferId(id))
    }

    fn buffer_data_mono16(&self, buffer: BufferId, samples: &[i16], sample_rate: u32) {
        let (Ok(size), Ok(rate)) = (
            ALsizei::try_from(std::mem::size_of_val(samples)),
            ALsizei::try_from(sample_rate),
        ) else {
            self.raise(PlatformErrorCode::InvalidValue);
            return;
        };
        // SAFETY: OpenAL copies `size` bytes out of `samples` before returning.
        unsafe { (self.core.al_buffer_data)(buffer.0, al::FORMAT_MONO16, samples.as_ptr().cast(), size, rate) }
    }

    fn delete_buffer(&self, buffer: BufferId) {
        // SAFETY: reads exactly one name.
        unsafe { (self.core.al_delete_buffers)(1, &buffer.0) }
    }

    fn gen_source(&self) -> Option<SourceId> {
        let mut id: ALuint = 0;
        // SAFETY: writes exactly one name.
        unsafe { (self.core.al_gen_sources)(1, &mut id) };
        (id != 0).then_some(SourceId(id))
    }

    fn set_source_buffer(&self, source: SourceId, buffer: Option<BufferId>) {
        let name = buffer.map_or(0, |b| b.0 as i32);
        self.source_i(source, al::BUFFER, name);
    }

    fn set_source_looping(&self, source: SourceId, looping: bool) {
        self.source_i(source, al::LOOPING, if looping { al::TRUE } else { al::FALSE });
    }

    fn set_source_gain(&self, source: SourceId, gain: f32) {
        self.source_f(source, al::GAIN, gain);
    }

    fn set_source_pitch(&self, source: SourceId, pitch: f32) {
        self.source_f(source, al::PITCH, pitch);
    }

    fn rewind_source(&self, source: SourceId) {
        // SAFETY: plain value call.
        unsafe { (self.core.al_source_rewind)(source.0) }
    }

    fn play_source(&self, source: SourceId) {
        // SAFETY: plain value call.
        unsafe { (self.core.al_source_play)(source.0) }
    }

    fn stop_source(&self, source: SourceId) {
        // SAFETY: plain value call.
        unsafe { (self.core.al_source_stop)(source.0) }
    }

    fn source_state(&self, source: SourceId) -> PlayState {
        let mut state: ALint = al::INITIAL;
        // SAFETY: writes exactly one integer.
        unsafe { (self.core.al_get_sourcei)(source.0, al::SOURCE_STATE, &mut state) };
        PlayState::from_raw(state)
    }

    fn delete_source(&self, source: SourceId) {
        // SAFETY: reads exactly one name.
        unsafe { (self.core.al_delete_sources)(1, &source.0) }
    }

    fn take_error(&self) -> Option<PlatformErrorCode> {
        if let Some(code) = self.pending_error.lock().take() {
            return Some(code);
        }
        // SAFETY: no arguments; reads and clears AL's error register.
        PlatformErrorCode::from_raw(unsafe { (self.core.al_get_error)() })
    }
}

/// # Safety
/// `T` must be the function pointer type of the symbol `name`.
unsafe fn symbol<T: Copy>(library: &Library, name: &'static [u8]) -> Result<T, RenderError> {
    let symbol: Symbol<T> = library.get(name).map_err(|e| {
        let printable = String::from_utf8_lossy(name.strip_suffix(b"\0").unwrap_or(name)).into_owned();
        RenderError::CapabilityMissing(vec![format!("{} ({})", printable, e)])
    })?;
    Ok(*symbol)
}

fn c_string(name: &str) -> CString {
    // names are compile-time constants without interior NULs
    CString::new(name).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_library_is_capability_missing() {
        let result = OpenAlPlatform::load_from("/nonexistent/libopenal-loopback-test.so");
        match result {
            Err(RenderError::CapabilityMissing(missing)) => {
                assert_eq!(missing.len(), 1);
                assert!(missing[0].starts_with("/nonexistent/libopenal-loopback-test.so"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("loaded a library that does not exist"),
        }
    }

    #[test]
    fn candidates_cover_each_desktop_platform() {
        assert!(LIBRARY_CANDIDATES.iter().any(|n| n.ends_with(".so.1")));
        assert!(LIBRARY_CANDIDATES.iter().any(|n| n.ends_with(".dylib")));
        assert!(LIBRARY_CANDIDATES.iter().any(|n| n.ends_with(".dll")));
    }

    #[test]
    fn c_names_round_trip() {
        assert_eq!(c_string("alcRenderSamplesSOFT").as_bytes(), b"alcRenderSamplesSOFT");
    }

    #[test]
    fn platform_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OpenAlPlatform>();
    }
}
