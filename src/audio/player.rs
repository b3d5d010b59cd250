use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;

use super::decode::{decode_clip, Clip};
use super::tone::{synthesize, ToneShape};
use super::{AudioDevice, SampleTap};
use crate::error::{GameError, Result};
use crate::game::playlist::AudioRef;

/// Loaded clip plus play position, shared with the analyzer tap and the
/// output callback.
pub(crate) struct Playhead {
    pub(crate) clip: Mutex<Arc<Clip>>,
    pub(crate) position: AtomicUsize,
    pub(crate) playing: AtomicBool,
}

impl Playhead {
    fn new(sample_rate: u32) -> Self {
        Self {
            clip: Mutex::new(Arc::new(Clip::silent(sample_rate))),
            position: AtomicUsize::new(0),
            playing: AtomicBool::new(false),
        }
    }

    fn current_clip(&self) -> Option<Arc<Clip>> {
        self.clip.lock().ok().map(|clip| Arc::clone(&*clip))
    }

    /// Move the playhead from `from` to `to`, stopping at `len`. Does nothing
    /// when the position changed since `from` was read, so a seek or a new
    /// clip made in the meantime wins. Returns whether the move happened.
    pub(crate) fn commit(&self, from: usize, to: usize, len: usize) -> bool {
        let to = to.min(len);
        let moved = self
            .position
            .compare_exchange(from, to, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok();
        if moved && to >= len {
            self.playing.store(false, Ordering::Relaxed);
        }
        moved
    }

    fn swap(&self, clip: Clip) -> Result<()> {
        let mut slot = self
            .clip
            .lock()
            .map_err(|_| GameError::AudioPlaybackFailed("playhead lock poisoned".into()))?;
        *slot = Arc::new(clip);
        self.position.store(0, Ordering::Relaxed);
        Ok(())
    }
}

/// Plays clips against a playhead. Without an output stream the playhead
/// follows the wall clock, so rounds and visualization behave the same with
/// or without sound.
pub struct Player {
    playhead: Arc<Playhead>,
    tone: ToneShape,
    last_tick: Option<Instant>,
    #[cfg(feature = "playback")]
    output: Option<super::output::OutputStream>,
}

impl Player {
    pub fn new(tone: ToneShape) -> Self {
        Self {
            playhead: Arc::new(Playhead::new(tone.sample_rate)),
            tone,
            last_tick: None,
            #[cfg(feature = "playback")]
            output: None,
        }
    }

    /// Player with a real output stream; falls back to a silent clock if the
    /// default device cannot be opened.
    #[cfg(feature = "playback")]
    pub fn with_output(tone: ToneShape) -> Self {
        let mut player = Self::new(tone);
        match super::output::open(Arc::clone(&player.playhead)) {
            Ok(stream) => player.output = Some(stream),
            Err(e) => log::warn!("No audio output, continuing silently: {:#}", e),
        }
        player
    }

    pub fn is_playing(&self) -> bool {
        self.playhead.playing.load(Ordering::Relaxed)
    }

    pub fn position(&self) -> usize {
        self.playhead.position.load(Ordering::Relaxed)
    }

    fn has_output(&self) -> bool {
        #[cfg(feature = "playback")]
        {
            self.output.is_some()
        }
        #[cfg(not(feature = "playback"))]
        {
            false
        }
    }
}

impl AudioDevice for Player {
    fn load(&mut self, source: &AudioRef) -> Result<()> {
        self.pause();
        let clip = match source {
            AudioRef::File(path) => decode_clip(path)
                .map_err(|e| GameError::AudioPlaybackFailed(format!("{:#}", e)))?,
            AudioRef::NoteTone => Clip::silent(self.tone.sample_rate),
        };
        self.playhead.swap(clip)
    }

    fn play_tone(&mut self, frequency_hz: f32) -> Result<()> {
        log::debug!("Cue tone {:.2} Hz", frequency_hz);
        self.playhead.swap(synthesize(frequency_hz, &self.tone))?;
        self.play()
    }

    fn seek_to_start(&mut self) -> Result<()> {
        self.playhead.position.store(0, Ordering::Relaxed);
        self.last_tick = None;
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        let empty = self.playhead.current_clip().map_or(true, |c| c.is_empty());
        if empty {
            return Err(GameError::AudioPlaybackFailed("nothing loaded".into()));
        }
        self.last_tick = None;
        self.playhead.playing.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn pause(&mut self) {
        self.playhead.playing.store(false, Ordering::Relaxed);
        self.last_tick = None;
    }

    fn tap(&mut self) -> Result<Box<dyn SampleTap>> {
        Ok(Box::new(PlayheadTap {
            playhead: Arc::downgrade(&self.playhead),
        }))
    }

    fn tick(&mut self, now: Instant) {
        if self.has_output() || !self.is_playing() {
            return;
        }
        let Some(last) = self.last_tick.replace(now) else {
            return;
        };
        let Some(clip) = self.playhead.current_clip() else {
            return;
        };

        let elapsed = now.saturating_duration_since(last).as_secs_f64();
        let step = (elapsed * clip.sample_rate as f64).round() as usize;
        let from = self.position();
        self.playhead.commit(from, from + step, clip.len());
    }
}

struct PlayheadTap {
    playhead: Weak<Playhead>,
}

impl SampleTap for PlayheadTap {
    fn sample_rate(&self) -> u32 {
        self.playhead
            .upgrade()
            .and_then(|p| p.current_clip())
            .map_or(0, |c| c.sample_rate)
    }

    fn read_window(&self, out: &mut [f32]) -> bool {
        let Some(playhead) = self.playhead.upgrade() else {
            return false;
        };
        out.fill(0.0);
        if !playhead.playing.load(Ordering::Relaxed) {
            return true;
        }
        let Some(clip) = playhead.current_clip() else {
            return true;
        };

        let end = playhead.position.load(Ordering::Relaxed).min(clip.len());
        let start = end.saturating_sub(out.len());
        let available = &clip.samples[start..end];
        let offset = out.len() - available.len();
        out[offset..].copy_from_slice(available);
        true
    }
}
