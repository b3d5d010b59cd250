//! Game core: answers, playlist, vote history, round engine and the session
//! that ties them to an audio device.

pub mod answers;
pub mod playlist;
pub mod round;
pub mod session;
pub mod votes;

pub use answers::{Answer, AnswerPreset, AnswerSet, Rgb};
pub use playlist::{AudioRef, Playlist, Track};
pub use round::{Cue, Phase, RoundEngine, RoundEvent, RoundState, RoundTimings, Verdict};
pub use session::{GameSession, RenderFrame, SessionOptions};
pub use votes::{JsonFileStore, KeyValueStore, MemoryStore, VoteStore};
