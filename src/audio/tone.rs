use std::f32::consts::TAU;
use std::time::Duration;

use super::decode::Clip;

/// Envelope of a cue tone: a sine that starts at `gain` and decays
/// exponentially to `release_gain` over `duration`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToneShape {
    pub sample_rate: u32,
    pub duration: Duration,
    pub gain: f32,
    pub release_gain: f32,
}

impl Default for ToneShape {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            duration: Duration::from_millis(1000),
            gain: 0.3,
            release_gain: 0.01,
        }
    }
}

pub fn synthesize(frequency_hz: f32, shape: &ToneShape) -> Clip {
    let sr = shape.sample_rate as f32;
    let len = (shape.duration.as_secs_f32() * sr).round() as usize;
    if len == 0 || shape.gain <= 0.0 {
        return Clip::silent(shape.sample_rate);
    }

    // Exponential ramps cannot reach zero.
    let release = shape.release_gain.clamp(1e-4, shape.gain);
    let ratio = release / shape.gain;

    let samples = (0..len)
        .map(|i| {
            let t = i as f32 / sr;
            let progress = i as f32 / len as f32;
            let envelope = shape.gain * ratio.powf(progress);
            envelope * (TAU * frequency_hz * t).sin()
        })
        .collect();

    Clip::new(samples, shape.sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_has_requested_length() {
        let clip = synthesize(261.63, &ToneShape::default());
        assert_eq!(clip.len(), 44_100);
        assert!((clip.duration_secs() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn envelope_decays() {
        let clip = synthesize(440.0, &ToneShape::default());
        let peak = |s: &[f32]| s.iter().fold(0.0f32, |m, x| m.max(x.abs()));
        let head = peak(&clip.samples[..2_000]);
        let tail = peak(&clip.samples[clip.len() - 2_000..]);
        assert!(head > 0.25 && head <= 0.3 + 1e-6);
        assert!(tail < 0.02);
    }

    #[test]
    fn zero_duration_is_silent() {
        let shape = ToneShape {
            duration: Duration::ZERO,
            ..ToneShape::default()
        };
        assert!(synthesize(440.0, &shape).is_empty());
    }
}
