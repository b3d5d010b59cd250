//! Color Chords: hear a cue, pick the matching color.
//!
//! The core is [`game::GameSession`], which drives a [`game::RoundEngine`]
//! through priming, reveal and scoring, records every pick in a
//! [`game::VoteStore`], and walks a reshuffling [`game::Playlist`]. Audio comes
//! in through the [`audio::AudioDevice`] trait and feeds an
//! [`audio::AudioAnalyzer`] for the visualizer bars.

pub mod audio;
pub mod error;
pub mod game;

pub use error::{GameError, Result};
