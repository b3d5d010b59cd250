use thiserror::Error;

use crate::game::round::Phase;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Playlist has no tracks")]
    EmptyPlaylist,

    #[error("Answer set is empty")]
    NoAnswers,

    #[error("Audio analyzer unavailable: {0}")]
    AnalyzerUnavailable(String),

    #[error("Audio playback failed: {0}")]
    AudioPlaybackFailed(String),

    #[error("Persisted vote history is corrupt: {0}")]
    PersistedStateCorrupt(String),

    #[error("Operation requires phase {expected:?}, but the round is in {actual:?}")]
    InvalidPhase { expected: Phase, actual: Phase },

    #[error("Choice {choice} is out of range for {answers} answers")]
    InvalidChoice { choice: usize, answers: usize },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl GameError {
    /// Whether the session can keep running after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, GameError::EmptyPlaylist | GameError::NoAnswers)
    }
}

pub type Result<T> = std::result::Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_construction_errors_are_fatal() {
        assert!(!GameError::EmptyPlaylist.is_recoverable());
        assert!(!GameError::NoAnswers.is_recoverable());
        assert!(GameError::AudioPlaybackFailed("gone".into()).is_recoverable());
        let e = GameError::InvalidPhase {
            expected: Phase::AwaitingChoice,
            actual: Phase::Priming,
        };
        assert!(e.is_recoverable());
        assert!(e.to_string().contains("AwaitingChoice"));
    }
}
