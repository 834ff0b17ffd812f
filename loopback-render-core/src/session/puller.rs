use std::fmt;

use crate::models::error::RenderError;
use crate::models::format::{ChannelLayout, RenderFormat, SampleEncoding};
use crate::traits::audio_platform::{AudioPlatform, EntryPoint};

use super::device::RenderContext;

/// Pulls mixed frames out of a loopback device on demand.
///
/// There is no playback clock: each pull renders exactly the frames asked
/// for and leaves the sources where the render stopped, so the next pull
/// carries on from there.
pub struct RenderPuller<'c, P: AudioPlatform + ?Sized> {
    context: &'c RenderContext<'c, P>,
}

impl<'c, P: AudioPlatform + ?Sized> RenderPuller<'c, P> {
    pub fn new(context: &'c RenderContext<'c, P>) -> Self {
        Self { context }
    }

    /// Render `frame_count` interleaved frames into `frame_buffer`.
    ///
    /// An error still pending on the platform from an earlier call is
    /// returned as `PlatformOperationError` and nothing is rendered; the
    /// register is clear afterwards, so the next pull goes ahead.
    pub fn pull(&self, frame_buffer: &mut [i16], frame_count: usize) -> Result<(), RenderError> {
        let device = self.context.device();
        device.capabilities().require(EntryPoint::RenderSamples)?;

        let format = self.context.format();
        if format.encoding != SampleEncoding::Int16 {
            return Err(RenderError::RenderFailed(format!(
                "cannot pull {} into a 16-bit frame buffer",
                format
            )));
        }
        let needed = frames_to_samples(&format, frame_count)?;
        if frame_buffer.len() < needed {
            return Err(RenderError::RenderFailed(format!(
                "frame buffer holds {} samples, {} frames need {}",
                frame_buffer.len(),
                frame_count,
                needed
            )));
        }

        // an unread error would be blamed on the render below
        self.context.check("pending before render")?;
        self.context
            .platform()
            .render_samples(device.handle(), &mut frame_buffer[..needed], frame_count);
        if let Some(code) = self.context.take_error() {
            return Err(RenderError::RenderFailed(format!("platform reported {}", code)));
        }

        log::debug!("pulled {} frames of {}", frame_count, format);
        Ok(())
    }

    /// Render `frame_count` frames into a fresh [`RenderedFrames`].
    pub fn pull_frames(&self, frame_count: usize) -> Result<RenderedFrames, RenderError> {
        let format = self.context.format();
        let mut samples = vec![0i16; frames_to_samples(&format, frame_count)?];
        self.pull(&mut samples, frame_count)?;
        Ok(RenderedFrames::new(format, samples))
    }
}

fn frames_to_samples(format: &RenderFormat, frame_count: usize) -> Result<usize, RenderError> {
    format.samples_for(frame_count).ok_or_else(|| {
        RenderError::RenderFailed(format!("{} frames of {} overflow a frame buffer", frame_count, format))
    })
}

/// Interleaved 16-bit frames pulled from a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFrames {
    format: RenderFormat,
    samples: Vec<i16>,
}

impl RenderedFrames {
    pub fn new(format: RenderFormat, samples: Vec<i16>) -> Self {
        Self { format, samples }
    }

    pub fn format(&self) -> RenderFormat {
        self.format
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.format.channels.channel_count()
    }

    /// Frames as `(left, right)`. Mono frames repeat their only sample.
    pub fn stereo_pairs(&self) -> impl Iterator<Item = (i16, i16)> + '_ {
        let channels = self.format.channels.channel_count();
        self.samples.chunks_exact(channels).map(|frame| match frame {
            [left, right, ..] => (*left, *right),
            [mono] => (*mono, *mono),
            _ => (0, 0),
        })
    }
}

impl fmt::Display for RenderedFrames {
    /// Space-separated frames: `left:right` for stereo, the bare sample for mono.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mono = self.format.channels == ChannelLayout::Mono;
        for (i, (left, right)) in self.stereo_pairs().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if mono {
                write!(f, "{}", left)?;
            } else {
                write!(f, "{}:{}", left, right)?;
            }
        }
        Ok(())
    }
}
