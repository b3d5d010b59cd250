use std::collections::HashSet;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{GameError, Result};

/// Where a track's audio comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioRef {
    /// A song decoded from disk
    File(PathBuf),
    /// Each round cues a synthesized tone at the correct answer's pitch
    NoteTone,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub source: AudioRef,
}

impl Track {
    pub fn new(title: impl Into<String>, source: AudioRef) -> Self {
        Self {
            title: title.into(),
            source,
        }
    }

    /// A track titled after the file stem.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(String::from)
            .unwrap_or_else(|| path.display().to_string());
        Self::new(title, AudioRef::File(path))
    }
}

/// Shuffled track sequence that reshuffles itself when exhausted.
///
/// Reshuffles are independent Fisher-Yates draws, so the new order may
/// happen to start with the track that just finished.
pub struct Playlist {
    tracks: Vec<Track>,
    cursor: usize,
    rng: StdRng,
}

impl Playlist {
    pub fn new(tracks: Vec<Track>, rng: StdRng) -> Result<Self> {
        let mut seen = HashSet::new();
        let tracks: Vec<Track> = tracks
            .into_iter()
            .filter(|t| {
                let fresh = seen.insert(t.title.clone());
                if !fresh {
                    log::warn!("Dropping duplicate track title '{}'", t.title);
                }
                fresh
            })
            .collect();

        if tracks.is_empty() {
            return Err(GameError::EmptyPlaylist);
        }

        Ok(Self {
            tracks,
            cursor: 0,
            rng,
        })
    }

    pub fn current(&self) -> &Track {
        &self.tracks[self.cursor]
    }

    pub fn advance(&mut self) -> &Track {
        self.cursor += 1;
        if self.cursor == self.tracks.len() {
            log::debug!("Playlist exhausted, reshuffling {} tracks", self.tracks.len());
            self.shuffle();
        }
        self.current()
    }

    pub fn shuffle(&mut self) {
        self.tracks.shuffle(&mut self.rng);
        self.cursor = 0;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn tone(title: &str) -> Track {
        Track::new(title, AudioRef::NoteTone)
    }

    fn titles(playlist: &Playlist) -> Vec<String> {
        let mut t: Vec<String> = playlist.tracks().iter().map(|t| t.title.clone()).collect();
        t.sort();
        t
    }

    #[test]
    fn empty_playlist_is_rejected() {
        let result = Playlist::new(vec![], StdRng::seed_from_u64(1));
        assert!(matches!(result, Err(GameError::EmptyPlaylist)));
    }

    #[test]
    fn duplicate_titles_are_dropped() {
        let playlist = Playlist::new(
            vec![tone("Roar"), tone("Believer"), tone("Roar")],
            StdRng::seed_from_u64(1),
        )
        .unwrap();
        assert_eq!(playlist.len(), 2);
    }

    #[test]
    fn advance_through_whole_set_wraps_to_permutation() {
        let mut playlist = Playlist::new(
            vec![tone("a"), tone("b"), tone("c"), tone("d")],
            StdRng::seed_from_u64(7),
        )
        .unwrap();
        let before = titles(&playlist);

        let mut visited = vec![playlist.current().title.clone()];
        for _ in 0..playlist.len() - 1 {
            visited.push(playlist.advance().title.clone());
        }
        visited.sort();
        assert_eq!(visited, before);

        playlist.advance();
        assert_eq!(playlist.cursor(), 0);
        assert_eq!(titles(&playlist), before);

        playlist.advance();
        assert_eq!(playlist.cursor(), 1);
    }

    #[test]
    fn reshuffle_at_end_resets_cursor() {
        let mut playlist = Playlist::new(
            vec![tone("Roar"), tone("Believer"), tone("Shake It Off")],
            StdRng::seed_from_u64(3),
        )
        .unwrap();
        playlist.advance();
        playlist.advance();
        assert_eq!(playlist.cursor(), 2);

        let next = playlist.advance().title.clone();
        assert_eq!(playlist.cursor(), 0);
        assert!(["Roar", "Believer", "Shake It Off"].contains(&next.as_str()));
    }

    #[test]
    fn single_track_always_current() {
        let mut playlist = Playlist::new(vec![tone("only")], StdRng::seed_from_u64(0)).unwrap();
        for _ in 0..5 {
            assert_eq!(playlist.advance().title, "only");
            assert_eq!(playlist.cursor(), 0);
        }
    }

    #[test]
    fn title_from_path_uses_file_stem() {
        let track = Track::from_path("/music/Believer.mp3");
        assert_eq!(track.title, "Believer");
        assert_eq!(track.source, AudioRef::File(PathBuf::from("/music/Believer.mp3")));
    }
}
