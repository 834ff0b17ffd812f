//! OpenAL backend for `loopback-render-core`.
//!
//! Loads the system OpenAL library at runtime, so the crate builds and its
//! tests run on hosts without OpenAL installed.

mod ffi;
pub mod openal_platform;

pub use openal_platform::{OpenAlPlatform, LIBRARY_CANDIDATES};
