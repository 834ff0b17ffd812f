//! Test-tone synthesis.

use std::f64::consts::PI;

/// One sample of a single sine cycle spread over `sample_count` samples.
///
/// `index` wraps modulo `sample_count`, so the tone is periodic with period
/// `sample_count`. Samples are taken at the centre of each slot and scaled
/// to the full signed 16-bit range.
pub fn sine_sample(index: usize, sample_count: usize) -> i16 {
    if sample_count == 0 {
        return 0;
    }
    let phase = (index % sample_count) as f64 + 0.5;
    let x = 2.0 * PI * phase / sample_count as f64;
    (x.sin() * f64::from(i16::MAX)).round() as i16
}

/// Synthesize a mono sine tone of `sample_count` samples.
pub fn synthesize_waveform(sample_count: usize) -> Vec<i16> {
    (0..sample_count).map(|i| sine_sample(i, sample_count)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_of_64() {
        let samples = synthesize_waveform(64);
        let expected = ((2.0 * PI * 0.5 / 64.0).sin() * 32767.0).round() as i16;
        assert_eq!(samples[0], expected);
        assert_eq!(samples[0], 1608);
    }

    #[test]
    fn stays_within_symmetric_range() {
        for count in [1usize, 2, 3, 7, 64, 100, 441, 4096] {
            let samples = synthesize_waveform(count);
            assert_eq!(samples.len(), count);
            assert!(
                samples.iter().all(|&s| (-i16::MAX..=i16::MAX).contains(&s)),
                "out of range for {count} samples"
            );
        }
    }

    #[test]
    fn periodic_in_sample_count() {
        for count in [1usize, 5, 64, 441] {
            for i in 0..count {
                assert_eq!(sine_sample(i, count), sine_sample(i + count, count));
                assert_eq!(sine_sample(i, count), sine_sample(i + 3 * count, count));
            }
        }
    }

    #[test]
    fn two_samples_hit_the_peaks() {
        assert_eq!(synthesize_waveform(2), vec![i16::MAX, -i16::MAX]);
    }

    #[test]
    fn second_half_mirrors_first_half() {
        let samples = synthesize_waveform(64);
        for i in 0..32 {
            assert_eq!(samples[i], -samples[63 - i]);
        }
    }

    #[test]
    fn empty_tone() {
        assert!(synthesize_waveform(0).is_empty());
        assert_eq!(sine_sample(3, 0), 0);
    }
}
