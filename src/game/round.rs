//! Round state machine
//!
//! `Idle → Priming → AwaitingChoice → Scoring`, then back to `Priming` on a
//! timer after a correct answer. A wrong answer parks the round in `Scoring`
//! until the caller retries or moves on.
//!
//! The engine never reads a clock: every operation takes `now`, and the owner
//! calls [`RoundEngine::poll`] from its event loop to fire due timers.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{GameError, Result};

/// Priming time before the choices are revealed.
pub const REVEAL_DELAY: Duration = Duration::from_millis(1000);
/// Time the result of a correct answer stays up before the next round.
pub const NEXT_ROUND_DELAY: Duration = Duration::from_millis(2000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Priming,
    AwaitingChoice,
    Scoring,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundState {
    pub correct_index: usize,
    /// Swatch slots in display order; empty until revealed.
    pub revealed_order: Vec<usize>,
    pub phase: Phase,
    pub chosen_index: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundTimings {
    pub reveal: Duration,
    pub next_round: Duration,
}

impl Default for RoundTimings {
    fn default() -> Self {
        Self {
            reveal: REVEAL_DELAY,
            next_round: NEXT_ROUND_DELAY,
        }
    }
}

/// Audio cue requested at the start of a (re)primed round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cue {
    pub correct_index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub choice: usize,
    pub correct_index: usize,
    pub correct: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoundEvent {
    /// Choices became visible in this order.
    Revealed(Vec<usize>),
    /// A new round started after a correct answer.
    Started(Cue),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimerAction {
    Reveal,
    NextRound,
}

#[derive(Debug)]
struct Timer {
    id: u64,
    due: Instant,
    action: TimerAction,
}

pub struct RoundEngine {
    answers: usize,
    timings: RoundTimings,
    round: Option<RoundState>,
    // Single slot: scheduling a timer drops whatever was pending.
    timer: Option<Timer>,
    timer_seq: u64,
    rng: StdRng,
}

impl RoundEngine {
    pub fn new(answers: usize, timings: RoundTimings, rng: StdRng) -> Result<Self> {
        if answers == 0 {
            return Err(GameError::NoAnswers);
        }
        Ok(Self {
            answers,
            timings,
            round: None,
            timer: None,
            timer_seq: 0,
            rng,
        })
    }

    pub fn phase(&self) -> Phase {
        self.round.as_ref().map_or(Phase::Idle, |r| r.phase)
    }

    pub fn round(&self) -> Option<&RoundState> {
        self.round.as_ref()
    }

    /// Pick a fresh correct answer and prime it. Calling this mid-round
    /// discards the live round and its pending timer.
    pub fn start_round(&mut self, now: Instant) -> Cue {
        let correct_index = self.rng.random_range(0..self.answers);
        log::debug!("Starting round, correct answer {}", correct_index);
        self.prime(correct_index, now)
    }

    /// Replay the current round with the same correct answer.
    pub fn retry(&mut self, now: Instant) -> Result<Cue> {
        let round = self.require(Phase::Scoring)?;
        let correct_index = round.correct_index;
        log::debug!("Retrying round, correct answer {}", correct_index);
        Ok(self.prime(correct_index, now))
    }

    pub fn submit(&mut self, choice: usize, now: Instant) -> Result<Verdict> {
        self.require(Phase::AwaitingChoice)?;
        if choice >= self.answers {
            return Err(GameError::InvalidChoice {
                choice,
                answers: self.answers,
            });
        }

        let Some(round) = self.round.as_mut() else {
            return Err(GameError::InvalidPhase {
                expected: Phase::AwaitingChoice,
                actual: Phase::Idle,
            });
        };
        round.chosen_index = Some(choice);
        round.phase = Phase::Scoring;

        let verdict = Verdict {
            choice,
            correct_index: round.correct_index,
            correct: choice == round.correct_index,
        };

        if verdict.correct {
            self.schedule(TimerAction::NextRound, now + self.timings.next_round);
        } else {
            self.timer = None;
        }
        Ok(verdict)
    }

    /// Fire the pending timer if it is due.
    pub fn poll(&mut self, now: Instant) -> Option<RoundEvent> {
        if self.timer.as_ref()?.due > now {
            return None;
        }
        let timer = self.timer.take()?;
        log::trace!("Timer {} fired: {:?}", timer.id, timer.action);

        match timer.action {
            TimerAction::Reveal => {
                let order = self.reveal();
                Some(RoundEvent::Revealed(order))
            }
            TimerAction::NextRound => Some(RoundEvent::Started(self.start_round(timer.due))),
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.as_ref().map(|t| t.due)
    }

    /// Drop any pending timer; the round itself is left as is.
    pub fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            log::debug!("Cancelled timer {} ({:?})", timer.id, timer.action);
        }
    }

    /// Cancel timers and return to `Idle`.
    pub fn reset(&mut self) {
        self.cancel();
        self.round = None;
    }

    fn prime(&mut self, correct_index: usize, now: Instant) -> Cue {
        self.round = Some(RoundState {
            correct_index,
            revealed_order: Vec::new(),
            phase: Phase::Priming,
            chosen_index: None,
        });
        self.schedule(TimerAction::Reveal, now + self.timings.reveal);
        Cue { correct_index }
    }

    fn reveal(&mut self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.answers).collect();
        order.shuffle(&mut self.rng);
        if let Some(round) = self.round.as_mut() {
            round.revealed_order = order.clone();
            round.phase = Phase::AwaitingChoice;
        }
        order
    }

    fn schedule(&mut self, action: TimerAction, due: Instant) {
        self.timer_seq += 1;
        let timer = Timer {
            id: self.timer_seq,
            due,
            action,
        };
        if let Some(old) = self.timer.replace(timer) {
            log::debug!("Replaced pending timer {} ({:?})", old.id, old.action);
        }
    }

    fn require(&self, expected: Phase) -> Result<&RoundState> {
        match self.round.as_ref() {
            Some(round) if round.phase == expected => Ok(round),
            _ => Err(GameError::InvalidPhase {
                expected,
                actual: self.phase(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn engine(answers: usize, seed: u64) -> RoundEngine {
        RoundEngine::new(answers, RoundTimings::default(), StdRng::seed_from_u64(seed)).unwrap()
    }

    fn is_permutation(order: &[usize], n: usize) -> bool {
        let mut sorted = order.to_vec();
        sorted.sort_unstable();
        sorted == (0..n).collect::<Vec<_>>()
    }

    /// Start a round and run it to `AwaitingChoice`; returns the reveal time.
    fn reveal(engine: &mut RoundEngine, t0: Instant) -> Instant {
        engine.start_round(t0);
        let at = t0 + REVEAL_DELAY;
        assert!(matches!(engine.poll(at), Some(RoundEvent::Revealed(_))));
        at
    }

    #[test]
    fn correct_index_is_uniform() {
        let mut engine = engine(6, 42);
        let now = Instant::now();
        let trials = 60_000;
        let mut counts = [0usize; 6];
        for _ in 0..trials {
            counts[engine.start_round(now).correct_index] += 1;
        }
        let expected = trials as f64 / 6.0;
        for count in counts {
            let deviation = (count as f64 - expected).abs() / expected;
            assert!(deviation < 0.05, "counts {:?} not uniform", counts);
        }
    }

    #[test]
    fn priming_reveals_after_delay() {
        let mut engine = engine(6, 1);
        let t0 = Instant::now();
        let cue = engine.start_round(t0);
        assert_eq!(engine.phase(), Phase::Priming);
        assert!(engine.round().unwrap().revealed_order.is_empty());
        assert_eq!(engine.next_deadline(), Some(t0 + REVEAL_DELAY));

        assert_eq!(engine.poll(t0 + Duration::from_millis(999)), None);
        assert_eq!(engine.phase(), Phase::Priming);

        match engine.poll(t0 + REVEAL_DELAY) {
            Some(RoundEvent::Revealed(order)) => assert!(is_permutation(&order, 6)),
            other => panic!("expected reveal, got {:?}", other),
        }
        let round = engine.round().unwrap();
        assert_eq!(round.phase, Phase::AwaitingChoice);
        assert_eq!(round.correct_index, cue.correct_index);
        assert_eq!(engine.next_deadline(), None);
    }

    #[test]
    fn correct_answer_auto_starts_next_round() {
        let mut engine = engine(6, 5);
        let t0 = Instant::now();
        let revealed = reveal(&mut engine, t0);
        let correct = engine.round().unwrap().correct_index;

        let verdict = engine.submit(correct, revealed).unwrap();
        assert!(verdict.correct);
        assert_eq!(engine.phase(), Phase::Scoring);
        assert_eq!(engine.round().unwrap().chosen_index, Some(correct));

        assert_eq!(engine.poll(revealed + Duration::from_millis(1999)), None);
        let next = revealed + NEXT_ROUND_DELAY;
        assert!(matches!(engine.poll(next), Some(RoundEvent::Started(_))));
        assert_eq!(engine.phase(), Phase::Priming);
        assert_eq!(engine.round().unwrap().chosen_index, None);
        assert_eq!(engine.next_deadline(), Some(next + REVEAL_DELAY));
    }

    #[test]
    fn wrong_answer_waits_in_scoring() {
        let mut engine = engine(5, 9);
        let t0 = Instant::now();
        let revealed = reveal(&mut engine, t0);
        let correct = engine.round().unwrap().correct_index;
        let wrong = (correct + 1) % 5;

        let verdict = engine.submit(wrong, revealed).unwrap();
        assert!(!verdict.correct);
        assert_eq!(verdict.correct_index, correct);
        assert_eq!(engine.next_deadline(), None);
        assert_eq!(engine.poll(revealed + Duration::from_secs(60)), None);
        assert_eq!(engine.phase(), Phase::Scoring);
    }

    #[test]
    fn retry_keeps_correct_answer() {
        let mut engine = engine(5, 11);
        let t0 = Instant::now();
        let revealed = reveal(&mut engine, t0);
        let correct = engine.round().unwrap().correct_index;
        engine.submit((correct + 2) % 5, revealed).unwrap();

        let cue = engine.retry(revealed).unwrap();
        assert_eq!(cue.correct_index, correct);
        assert_eq!(engine.phase(), Phase::Priming);
        assert!(engine.round().unwrap().revealed_order.is_empty());
    }

    #[test]
    fn retry_outside_scoring_is_rejected() {
        let mut engine = engine(5, 2);
        assert!(matches!(
            engine.retry(Instant::now()),
            Err(GameError::InvalidPhase { expected: Phase::Scoring, actual: Phase::Idle })
        ));
    }

    #[test]
    fn submit_outside_awaiting_choice_does_not_mutate() {
        let mut engine = engine(6, 3);
        let t0 = Instant::now();
        assert!(matches!(
            engine.submit(0, t0),
            Err(GameError::InvalidPhase { actual: Phase::Idle, .. })
        ));
        assert!(engine.round().is_none());

        engine.start_round(t0);
        let before = engine.round().cloned();
        let deadline = engine.next_deadline();
        assert!(matches!(
            engine.submit(0, t0),
            Err(GameError::InvalidPhase { expected: Phase::AwaitingChoice, actual: Phase::Priming })
        ));
        assert_eq!(engine.round().cloned(), before);
        assert_eq!(engine.next_deadline(), deadline);
    }

    #[test]
    fn out_of_range_choice_does_not_mutate() {
        let mut engine = engine(6, 4);
        let revealed = reveal(&mut engine, Instant::now());
        let before = engine.round().cloned();
        assert!(matches!(
            engine.submit(6, revealed),
            Err(GameError::InvalidChoice { choice: 6, answers: 6 })
        ));
        assert_eq!(engine.round().cloned(), before);
    }

    #[test]
    fn restart_while_priming_replaces_timer() {
        let mut engine = engine(6, 8);
        let t0 = Instant::now();
        engine.start_round(t0);
        let t1 = t0 + Duration::from_millis(600);
        engine.start_round(t1);

        // The first round's reveal time passes without firing.
        assert_eq!(engine.poll(t0 + REVEAL_DELAY), None);
        assert_eq!(engine.phase(), Phase::Priming);
        assert!(matches!(engine.poll(t1 + REVEAL_DELAY), Some(RoundEvent::Revealed(_))));
        assert_eq!(engine.poll(t1 + Duration::from_secs(10)), None);
    }

    #[test]
    fn reset_cancels_pending_timer() {
        let mut engine = engine(6, 6);
        let t0 = Instant::now();
        engine.start_round(t0);
        engine.reset();
        assert_eq!(engine.phase(), Phase::Idle);
        assert_eq!(engine.next_deadline(), None);
        assert_eq!(engine.poll(t0 + Duration::from_secs(5)), None);
    }

    #[test]
    fn duplicate_answer_values_still_select_by_position() {
        // Only the count of slots matters to the engine.
        let mut engine = engine(2, 13);
        let now = Instant::now();
        let mut seen = [false; 2];
        for _ in 0..100 {
            seen[engine.start_round(now).correct_index] = true;
        }
        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn engine_without_answers_is_an_error() {
        let result = RoundEngine::new(0, RoundTimings::default(), StdRng::seed_from_u64(1));
        assert!(matches!(result, Err(GameError::NoAnswers)));
    }
}
