use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::answers::AnswerSet;
use super::playlist::{AudioRef, Playlist, Track};
use super::round::{Cue, Phase, RoundEngine, RoundEvent, RoundState, RoundTimings, Verdict};
use super::votes::{KeyValueStore, VoteStore};
use crate::audio::{AudioAnalyzer, AudioDevice, VisualizationFrame, BANDS};
use crate::error::Result;

pub struct SessionOptions {
    pub answers: AnswerSet,
    pub timings: RoundTimings,
    pub smoothing: f32,
    /// Fixed seed for reproducible shuffles and answers.
    pub seed: Option<u64>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            answers: AnswerSet::notes(),
            timings: RoundTimings::default(),
            smoothing: 0.6,
            seed: None,
        }
    }
}

/// Everything the render surface needs for one frame. Indices are only
/// present in phases where they may be shown.
#[derive(Debug)]
pub struct RenderFrame<'a> {
    pub phase: Phase,
    pub title: &'a str,
    pub answers: &'a AnswerSet,
    /// The correct slot, shown as the cue color while priming and in the result.
    pub cue_index: Option<usize>,
    pub chosen_index: Option<usize>,
    /// Swatch slots in display order once revealed.
    pub choices: &'a [usize],
    pub verdict: Option<Verdict>,
    pub votes: &'a [u32],
    pub visualization: VisualizationFrame,
    pub audio_ready: bool,
}

/// One player's game: owns the playlist, vote history, round engine,
/// analyzer and audio device, and drives them from a single event loop.
pub struct GameSession {
    answers: AnswerSet,
    playlist: Playlist,
    votes: VoteStore,
    engine: RoundEngine,
    analyzer: AudioAnalyzer,
    device: Box<dyn AudioDevice>,
    track_votes: Vec<u32>,
    last_verdict: Option<Verdict>,
    visualization: VisualizationFrame,
    audio_ready: bool,
}

impl GameSession {
    pub fn new(
        options: SessionOptions,
        tracks: Vec<Track>,
        device: Box<dyn AudioDevice>,
        store: Box<dyn KeyValueStore>,
    ) -> Result<Self> {
        let (playlist_rng, round_rng) = match options.seed {
            Some(seed) => (
                StdRng::seed_from_u64(seed),
                StdRng::seed_from_u64(seed.wrapping_add(1)),
            ),
            None => (StdRng::from_os_rng(), StdRng::from_os_rng()),
        };

        let playlist = Playlist::new(tracks, playlist_rng)?;
        let answers = options.answers;
        let engine = RoundEngine::new(answers.len(), options.timings, round_rng)?;
        let votes = VoteStore::open(store, answers.len());

        log::info!(
            "Session ready: {} tracks, {} answers",
            playlist.len(),
            answers.len()
        );

        Ok(Self {
            track_votes: vec![0; answers.len()],
            answers,
            playlist,
            votes,
            engine,
            analyzer: AudioAnalyzer::new(options.smoothing),
            device,
            last_verdict: None,
            visualization: [0.0; BANDS],
            audio_ready: false,
        })
    }

    /// Shuffle the playlist and start the first round. Audio problems are
    /// logged; the round cycle runs regardless.
    pub fn start(&mut self, now: Instant) {
        self.playlist.shuffle();
        self.enter_track(now);
    }

    /// Score a choice and record it as a vote for the current track.
    pub fn submit(&mut self, choice: usize, now: Instant) -> Result<Verdict> {
        let verdict = self.engine.submit(choice, now)?;
        let title = self.playlist.current().title.clone();
        self.track_votes = self.votes.record(&title, choice)?;
        self.last_verdict = Some(verdict);

        if verdict.correct {
            log::info!("'{}': picked {} (correct)", title, choice);
        } else {
            log::info!(
                "'{}': picked {}, answer was {}",
                title,
                choice,
                verdict.correct_index
            );
        }
        Ok(verdict)
    }

    /// Replay the current round after a wrong answer.
    pub fn retry(&mut self, now: Instant) -> Result<()> {
        let cue = self.engine.retry(now)?;
        self.last_verdict = None;
        self.play_cue(cue);
        Ok(())
    }

    /// Move to the next track and start a fresh round on it.
    pub fn advance(&mut self, now: Instant) -> &Track {
        self.device.pause();
        self.playlist.advance();
        self.enter_track(now);
        self.playlist.current()
    }

    /// Per-frame pump: advances the audio clock, samples the analyzer and
    /// fires due round timers.
    pub fn tick(&mut self, now: Instant) -> Option<RoundEvent> {
        self.device.tick(now);
        self.visualization = self.analyzer.sample();

        let event = self.engine.poll(now);
        if let Some(RoundEvent::Started(cue)) = &event {
            self.last_verdict = None;
            self.play_cue(*cue);
        }
        event
    }

    pub fn frame(&self) -> RenderFrame<'_> {
        let round = self.engine.round();
        let phase = self.engine.phase();
        let disclosed = matches!(phase, Phase::Priming | Phase::Scoring);

        RenderFrame {
            phase,
            title: &self.playlist.current().title,
            answers: &self.answers,
            cue_index: round.filter(|_| disclosed).map(|r| r.correct_index),
            chosen_index: round
                .filter(|_| phase == Phase::Scoring)
                .and_then(|r| r.chosen_index),
            choices: round.map_or(&[][..], |r| r.revealed_order.as_slice()),
            verdict: self.last_verdict,
            votes: &self.track_votes,
            visualization: self.visualization,
            audio_ready: self.audio_ready,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.engine.next_deadline()
    }

    pub fn phase(&self) -> Phase {
        self.engine.phase()
    }

    pub fn round(&self) -> Option<&RoundState> {
        self.engine.round()
    }

    pub fn current_track(&self) -> &Track {
        self.playlist.current()
    }

    pub fn votes(&self) -> &VoteStore {
        &self.votes
    }

    /// Stop timers, sampling and sound. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.engine.reset();
        self.analyzer.detach();
        self.device.pause();
    }

    fn enter_track(&mut self, now: Instant) {
        let track = self.playlist.current().clone();
        log::info!("Now playing '{}'", track.title);

        self.audio_ready = match self.device.load(&track.source) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Could not load '{}': {}", track.title, e);
                false
            }
        };
        if !self.analyzer.is_attached() {
            if let Err(e) = self.analyzer.attach(self.device.as_mut()) {
                log::warn!("Visualization disabled: {}", e);
            }
        }

        self.track_votes = self.votes.load(&track.title);
        self.last_verdict = None;

        let cue = self.engine.start_round(now);
        self.play_cue(cue);
    }

    fn play_cue(&mut self, cue: Cue) {
        let result = match &self.playlist.current().source {
            AudioRef::NoteTone => self
                .device
                .play_tone(self.answers.cue_frequency(cue.correct_index)),
            AudioRef::File(_) if self.audio_ready => {
                self.device.seek_to_start().and_then(|()| self.device.play())
            }
            AudioRef::File(_) => return,
        };
        if let Err(e) = result {
            log::warn!("Cue playback failed: {}", e);
        }
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
