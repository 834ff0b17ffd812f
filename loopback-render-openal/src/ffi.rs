//! C signatures of the OpenAL calls the backend binds.

use std::ffi::{c_char, c_void};

pub type ALCdevice = c_void;
pub type ALCcontext = c_void;
pub type ALCboolean = c_char;
pub type ALCint = i32;
pub type ALCenum = i32;
pub type ALCsizei = i32;
pub type ALenum = i32;
pub type ALint = i32;
pub type ALuint = u32;
pub type ALfloat = f32;
pub type ALsizei = i32;

// ALC core
pub type AlcIsExtensionPresentFn = unsafe extern "C" fn(*mut ALCdevice, *const c_char) -> ALCboolean;
pub type AlcGetProcAddressFn = unsafe extern "C" fn(*mut ALCdevice, *const c_char) -> *mut c_void;
pub type AlcCloseDeviceFn = unsafe extern "C" fn(*mut ALCdevice) -> ALCboolean;
pub type AlcCreateContextFn = unsafe extern "C" fn(*mut ALCdevice, *const ALCint) -> *mut ALCcontext;
pub type AlcMakeContextCurrentFn = unsafe extern "C" fn(*mut ALCcontext) -> ALCboolean;
pub type AlcDestroyContextFn = unsafe extern "C" fn(*mut ALCcontext);

// AL core
pub type AlGenObjectsFn = unsafe extern "C" fn(ALsizei, *mut ALuint);
pub type AlDeleteObjectsFn = unsafe extern "C" fn(ALsizei, *const ALuint);
pub type AlBufferDataFn = unsafe extern "C" fn(ALuint, ALenum, *const c_void, ALsizei, ALsizei);
pub type AlSourceiFn = unsafe extern "C" fn(ALuint, ALenum, ALint);
pub type AlSourcefFn = unsafe extern "C" fn(ALuint, ALenum, ALfloat);
pub type AlGetSourceiFn = unsafe extern "C" fn(ALuint, ALenum, *mut ALint);
pub type AlSourceOpFn = unsafe extern "C" fn(ALuint);
pub type AlGetErrorFn = unsafe extern "C" fn() -> ALenum;

// ALC_SOFT_loopback
pub type LoopbackOpenDeviceSoftFn = unsafe extern "C" fn(*const c_char) -> *mut ALCdevice;
pub type IsRenderFormatSupportedSoftFn =
    unsafe extern "C" fn(*mut ALCdevice, ALCsizei, ALCenum, ALCenum) -> ALCboolean;
pub type RenderSamplesSoftFn = unsafe extern "C" fn(*mut ALCdevice, *mut c_void, ALCsizei);
