//! Pure-math voice mixing for the software loopback device.
//!
//! A voice is a mono 16-bit buffer read at a fractional position. Each output
//! frame takes the linearly interpolated sample at that position, scales it by
//! the voice gain, and adds it to every channel of the frame. The position then
//! advances by `step` (source rate / device rate × pitch).

/// One playing source as the mixer sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voice<'a> {
    pub samples: &'a [i16],
    pub step: f64,
    pub gain: f32,
    pub looping: bool,
}

impl Voice<'_> {
    /// Mix this voice into `accumulator` (interleaved, `channels` wide),
    /// starting at `position`.
    ///
    /// Returns `false` once a non-looping voice runs off the end of its buffer;
    /// frames after that point are left untouched.
    pub fn mix_into(&self, accumulator: &mut [f32], channels: usize, position: &mut f64) -> bool {
        let len = self.samples.len();
        if len == 0 || channels == 0 {
            return false;
        }
        let end = len as f64;

        for frame in accumulator.chunks_exact_mut(channels) {
            if *position >= end {
                if !self.looping {
                    return false;
                }
                *position %= end;
            }

            let value = self.sample_at(*position) * self.gain;
            for sample in frame.iter_mut() {
                *sample += value;
            }
            *position += self.step;
        }

        if *position >= end {
            if !self.looping {
                return false;
            }
            *position %= end;
        }
        true
    }

    fn sample_at(&self, position: f64) -> f32 {
        let index = position as usize;
        let fraction = (position - index as f64) as f32;
        let current = f32::from(self.samples[index]);
        let next = match self.samples.get(index + 1) {
            Some(&next) => f32::from(next),
            None if self.looping => f32::from(self.samples[0]),
            None => 0.0,
        };
        current + (next - current) * fraction
    }
}

/// Step through a buffer recorded at `source_rate` when rendering at
/// `device_rate` with the given pitch.
pub fn playback_step(source_rate: u32, device_rate: u32, pitch: f32) -> f64 {
    if device_rate == 0 {
        return 0.0;
    }
    f64::from(source_rate) / f64::from(device_rate) * f64::from(pitch)
}

/// Round and clamp mixed samples to signed 16-bit.
pub fn quantize_to_i16(accumulator: &[f32], out: &mut [i16]) {
    for (dst, &src) in out.iter_mut().zip(accumulator) {
        *dst = src.round().clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn voice(samples: &[i16], step: f64, gain: f32, looping: bool) -> Voice<'_> {
        Voice {
            samples,
            step,
            gain,
            looping,
        }
    }

    #[test]
    fn unity_step_copies_samples_to_every_channel() {
        let samples = [10, -20, 30];
        let mut acc = vec![0.0f32; 6];
        let mut position = 0.0;

        let playing = voice(&samples, 1.0, 1.0, true).mix_into(&mut acc, 2, &mut position);

        assert!(playing);
        assert_eq!(acc, vec![10.0, 10.0, -20.0, -20.0, 30.0, 30.0]);
        assert_eq!(position, 0.0);
    }

    #[test]
    fn looping_wraps_around() {
        let samples = [1, 2, 3];
        let mut acc = vec![0.0f32; 5];
        let mut position = 1.0;

        voice(&samples, 1.0, 1.0, true).mix_into(&mut acc, 1, &mut position);

        assert_eq!(acc, vec![2.0, 3.0, 1.0, 2.0, 3.0]);
        assert_eq!(position, 0.0);
    }

    #[test]
    fn one_shot_stops_at_the_end() {
        let samples = [5, 6];
        let mut acc = vec![0.0f32; 4];
        let mut position = 0.0;

        let playing = voice(&samples, 1.0, 1.0, false).mix_into(&mut acc, 1, &mut position);

        assert!(!playing);
        assert_eq!(acc, vec![5.0, 6.0, 0.0, 0.0]);
    }

    #[test]
    fn half_step_interpolates() {
        let samples = [0, 100];
        let mut acc = vec![0.0f32; 4];
        let mut position = 0.0;

        voice(&samples, 0.5, 1.0, true).mix_into(&mut acc, 1, &mut position);

        assert_relative_eq!(acc[0], 0.0);
        assert_relative_eq!(acc[1], 50.0);
        assert_relative_eq!(acc[2], 100.0);
        // wraps back toward samples[0]
        assert_relative_eq!(acc[3], 50.0);
    }

    #[test]
    fn gain_scales_and_voices_sum() {
        let a = [100, 100];
        let b = [50, -50];
        let mut acc = vec![0.0f32; 2];
        let (mut pa, mut pb) = (0.0, 0.0);

        voice(&a, 1.0, 0.5, true).mix_into(&mut acc, 1, &mut pa);
        voice(&b, 1.0, 1.0, true).mix_into(&mut acc, 1, &mut pb);

        assert_relative_eq!(acc[0], 100.0);
        assert_relative_eq!(acc[1], 0.0);
    }

    #[test]
    fn empty_voice_is_silent() {
        let mut acc = vec![0.0f32; 2];
        let mut position = 0.0;
        assert!(!voice(&[], 1.0, 1.0, true).mix_into(&mut acc, 2, &mut position));
        assert_eq!(acc, vec![0.0, 0.0]);
    }

    #[test]
    fn step_follows_rates_and_pitch() {
        assert_relative_eq!(playback_step(44_100, 44_100, 1.0), 1.0);
        assert_relative_eq!(playback_step(22_050, 44_100, 1.0), 0.5);
        assert_relative_eq!(playback_step(44_100, 44_100, 2.0), 2.0);
        assert_eq!(playback_step(44_100, 0, 1.0), 0.0);
    }

    #[test]
    fn quantize_rounds_and_clamps() {
        let mut out = [0i16; 4];
        quantize_to_i16(&[1.4, -1.6, 40_000.0, -40_000.0], &mut out);
        assert_eq!(out, [1, -2, i16::MAX, i16::MIN]);
    }
}
