//! Raw enum values of the OpenAL loopback surface.
//!
//! Shared by the attribute list a context is created from and by backends
//! that talk to a real OpenAL library.

/// The extension every loopback session depends on.
pub const LOOPBACK_EXTENSION: &str = "ALC_SOFT_loopback";

pub mod alc {
    pub const FALSE: i32 = 0;
    pub const TRUE: i32 = 1;

    pub const FREQUENCY: i32 = 0x1007;
    pub const FORMAT_CHANNELS_SOFT: i32 = 0x1990;
    pub const FORMAT_TYPE_SOFT: i32 = 0x1991;

    pub const BYTE_SOFT: i32 = 0x1400;
    pub const UNSIGNED_BYTE_SOFT: i32 = 0x1401;
    pub const SHORT_SOFT: i32 = 0x1402;
    pub const UNSIGNED_SHORT_SOFT: i32 = 0x1403;
    pub const INT_SOFT: i32 = 0x1404;
    pub const UNSIGNED_INT_SOFT: i32 = 0x1405;
    pub const FLOAT_SOFT: i32 = 0x1406;

    pub const MONO_SOFT: i32 = 0x1500;
    pub const STEREO_SOFT: i32 = 0x1501;
}

pub mod al {
    pub const FALSE: i32 = 0;
    pub const TRUE: i32 = 1;

    pub const NO_ERROR: i32 = 0;
    pub const INVALID_NAME: i32 = 0xA001;
    pub const INVALID_ENUM: i32 = 0xA002;
    pub const INVALID_VALUE: i32 = 0xA003;
    pub const INVALID_OPERATION: i32 = 0xA004;
    pub const OUT_OF_MEMORY: i32 = 0xA005;

    pub const PITCH: i32 = 0x1003;
    pub const LOOPING: i32 = 0x1007;
    pub const BUFFER: i32 = 0x1009;
    pub const GAIN: i32 = 0x100A;
    pub const SOURCE_STATE: i32 = 0x1010;

    pub const INITIAL: i32 = 0x1011;
    pub const PLAYING: i32 = 0x1012;
    pub const PAUSED: i32 = 0x1013;
    pub const STOPPED: i32 = 0x1014;

    pub const FORMAT_MONO16: i32 = 0x1101;
}
