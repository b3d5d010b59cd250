//! Audio collaborators: decoding, cue synthesis, playback and analysis.

pub mod analysis;
pub mod decode;
#[cfg(feature = "playback")]
pub mod output;
pub mod player;
pub mod tone;

use std::time::Instant;

use crate::error::Result;
use crate::game::playlist::AudioRef;

pub use analysis::{AudioAnalyzer, VisualizationFrame, BANDS};
pub use decode::Clip;
pub use player::Player;
pub use tone::ToneShape;

/// Read access to the samples around a playhead, for analysis.
pub trait SampleTap {
    fn sample_rate(&self) -> u32;

    /// Fill `out` with the samples ending at the playhead (zeros when not
    /// playing). Returns `false` once the underlying device is gone.
    fn read_window(&self, out: &mut [f32]) -> bool;
}

/// The sound device a session plays through.
pub trait AudioDevice {
    /// Load a track's audio, paused at the start.
    fn load(&mut self, source: &AudioRef) -> Result<()>;

    /// Replace the loaded audio with a synthesized tone and play it.
    fn play_tone(&mut self, frequency_hz: f32) -> Result<()>;

    fn seek_to_start(&mut self) -> Result<()>;

    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    /// Bind an analyzer to this device's output.
    fn tap(&mut self) -> Result<Box<dyn SampleTap>>;

    /// Advance any clock-driven state; called once per event-loop tick.
    fn tick(&mut self, _now: Instant) {}
}
