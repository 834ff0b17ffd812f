//! Buffer and source guards: the signal graph of a session.
//!
//! ```text
//! AudioBuffer ──bound to──▶ PlaybackSource ──mixed by──▶ VirtualDevice
//! ```
//!
//! A source borrows the buffer it is bound to, so a buffer can only be
//! released once every source referencing it is gone. Drop order inside a
//! session is therefore always source → buffer → context → device.

use crate::models::error::{PlatformErrorCode, RenderError};
use crate::models::format::SampleEncoding;
use crate::models::handles::{BufferId, SourceId};
use crate::models::state::PlayState;
use crate::traits::audio_platform::AudioPlatform;

use super::device::RenderContext;

/// Mono signed 16-bit sample storage in the current context.
pub struct AudioBuffer<'c, P: AudioPlatform + ?Sized> {
    context: &'c RenderContext<'c, P>,
    id: BufferId,
    sample_rate: Option<u32>,
    sample_count: usize,
}

impl<'c, P: AudioPlatform + ?Sized> AudioBuffer<'c, P> {
    /// Create an empty buffer.
    pub fn generate(context: &'c RenderContext<'c, P>) -> Result<Self, RenderError> {
        let id = context.platform().gen_buffer().ok_or_else(|| generation_error(context, "buffer generation"))?;
        Ok(Self {
            context,
            id,
            sample_rate: None,
            sample_count: 0,
        })
    }

    /// Create a buffer and upload `samples` into it.
    pub fn from_samples(
        context: &'c RenderContext<'c, P>,
        samples: &[i16],
        sample_rate: u32,
    ) -> Result<Self, RenderError> {
        let mut buffer = Self::generate(context)?;
        buffer.upload(samples, sample_rate)?;
        Ok(buffer)
    }

    /// Upload mono 16-bit `samples` at `sample_rate`.
    ///
    /// Fails with `PlatformOperationError` when the platform flags the upload;
    /// the buffer handle stays valid either way.
    pub fn upload(&mut self, samples: &[i16], sample_rate: u32) -> Result<(), RenderError> {
        self.context.platform().buffer_data_mono16(self.id, samples, sample_rate);
        self.context.check("buffer upload")?;
        self.sample_rate = Some(sample_rate);
        self.sample_count = samples.len();
        Ok(())
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn encoding(&self) -> SampleEncoding {
        SampleEncoding::Int16
    }

    /// Rate of the last successful upload.
    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }
}

impl<P: AudioPlatform + ?Sized> Drop for AudioBuffer<'_, P> {
    fn drop(&mut self) {
        self.context.platform().delete_buffer(self.id);
        if let Some(code) = self.context.take_error() {
            log::warn!("releasing buffer {:?}: {}", self.id, code);
        }
    }
}

/// A voice playing one [`AudioBuffer`].
pub struct PlaybackSource<'b, P: AudioPlatform + ?Sized> {
    context: &'b RenderContext<'b, P>,
    id: SourceId,
    buffer: Option<&'b AudioBuffer<'b, P>>,
    looping: bool,
    gain: f32,
    pitch: f32,
}

impl<'b, P: AudioPlatform + ?Sized> PlaybackSource<'b, P> {
    /// Create an unbound, stopped source.
    pub fn generate(context: &'b RenderContext<'b, P>) -> Result<Self, RenderError> {
        let id = context.platform().gen_source().ok_or_else(|| generation_error(context, "source generation"))?;
        Ok(Self {
            context,
            id,
            buffer: None,
            looping: false,
            gain: 1.0,
            pitch: 1.0,
        })
    }

    /// Bind `buffer`, set looping, gain and pitch, and rewind to the start.
    ///
    /// The source must not be playing.
    pub fn bind_and_configure(
        &mut self,
        buffer: &'b AudioBuffer<'b, P>,
        looping: bool,
        gain: f32,
        pitch: f32,
    ) -> Result<(), RenderError> {
        if self.state().is_playing() {
            return Err(RenderError::InvalidOperation(
                "cannot rebind a playing source".into(),
            ));
        }

        let platform = self.context.platform();
        platform.set_source_buffer(self.id, Some(buffer.id()));
        platform.set_source_looping(self.id, looping);
        platform.set_source_gain(self.id, gain);
        platform.set_source_pitch(self.id, pitch);
        platform.rewind_source(self.id);
        self.context.check("source configure")?;

        self.buffer = Some(buffer);
        self.looping = looping;
        self.gain = gain;
        self.pitch = pitch;
        Ok(())
    }

    /// Stopped → Playing. No-op when already playing.
    pub fn play(&mut self) -> Result<(), RenderError> {
        if self.state().is_playing() {
            return Ok(());
        }
        self.context.platform().play_source(self.id);
        self.context.check("source play")
    }

    /// Playing → Stopped. No-op when already stopped.
    pub fn stop(&mut self) -> Result<(), RenderError> {
        if !self.state().is_playing() {
            return Ok(());
        }
        self.context.platform().stop_source(self.id);
        self.context.check("source stop")
    }

    /// Current play state as reported by the platform.
    ///
    /// Non-looping sources fall back to `Stopped` on their own once rendering
    /// runs past the end of the buffer.
    pub fn state(&self) -> PlayState {
        self.context.platform().source_state(self.id)
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn buffer(&self) -> Option<&'b AudioBuffer<'b, P>> {
        self.buffer
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }
}

impl<P: AudioPlatform + ?Sized> Drop for PlaybackSource<'_, P> {
    fn drop(&mut self) {
        let platform = self.context.platform();
        if platform.source_state(self.id).is_playing() {
            platform.stop_source(self.id);
        }
        platform.delete_source(self.id);
        if let Some(code) = self.context.take_error() {
            log::warn!("releasing source {:?}: {}", self.id, code);
        }
    }
}

fn generation_error<P: AudioPlatform + ?Sized>(context: &RenderContext<'_, P>, operation: &'static str) -> RenderError {
    let code = context.take_error().unwrap_or(PlatformErrorCode::OutOfMemory);
    log::warn!("{}: {}", operation, code);
    RenderError::PlatformOperationError { operation, code }
}
