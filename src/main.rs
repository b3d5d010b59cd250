mod cli;
mod config;
mod tui;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

use cli::Cli;
use colorchords::audio::{AudioDevice, Player};
use colorchords::game::{
    AnswerPreset, AnswerSet, AudioRef, GameSession, JsonFileStore, SessionOptions, Track, VoteStore,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect colorchords.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("colorchords.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("colorchords").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("colorchords").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });

    let mut cfg = config::Config::default();
    if let Some(ref path) = config_path {
        if let Some(loaded) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            cfg = loaded;
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    // Merge: config values apply only when CLI is at its default
    if cli.reveal_ms == 1000 { cli.reveal_ms = cfg.game.reveal_ms; }
    if cli.next_round_ms == 2000 { cli.next_round_ms = cfg.game.next_round_ms; }
    if cli.fps == 30 { cli.fps = cfg.game.fps; }
    if cli.smoothing == 0.6 { cli.smoothing = cfg.audio.smoothing; }
    cli.seed = cli.seed.or(cfg.game.seed);
    cli.store = cli.store.or(cfg.storage.path.clone());

    let preset = cli.answers.or(cfg.game.answers).unwrap_or(if cli.tracks.is_empty() {
        AnswerPreset::Notes
    } else {
        AnswerPreset::Swatches
    });
    let answers = AnswerSet::preset(preset);
    let store = JsonFileStore::open(cli.store.clone().unwrap_or_else(JsonFileStore::default_path));

    if cli.show_votes {
        let mut stdout = std::io::stdout().lock();
        for preset in [AnswerPreset::Notes, AnswerPreset::Swatches] {
            let answers = AnswerSet::preset(preset);
            let votes = VoteStore::open(Box::new(store.clone()), answers.len());
            writeln!(stdout, "{:?}:", preset)?;
            print_votes(&mut stdout, &votes, &answers)?;
        }
        return Ok(());
    }

    let tracks = if cli.tracks.is_empty() {
        vec![Track::new("Color Chords", AudioRef::NoteTone)]
    } else {
        let found: Vec<Track> = cli
            .tracks
            .iter()
            .filter(|path| {
                let exists = path.exists();
                if !exists {
                    log::warn!("Skipping missing track: {}", path.display());
                }
                exists
            })
            .map(Track::from_path)
            .collect();
        if found.is_empty() {
            anyhow::bail!("None of the given tracks exist");
        }
        found
    };

    log::info!("colorchords - guess the color of the sound");
    log::info!("Tracks: {}, answers: {:?}", tracks.len(), preset);
    log::info!("Votes: {}", store.path().display());

    let mut timings = cfg.game.timings();
    timings.reveal = std::time::Duration::from_millis(cli.reveal_ms);
    timings.next_round = std::time::Duration::from_millis(cli.next_round_ms);

    let tone = cfg.audio.tone_shape();
    #[cfg(feature = "playback")]
    let device: Box<dyn AudioDevice> = Box::new(Player::with_output(tone));
    #[cfg(not(feature = "playback"))]
    let device: Box<dyn AudioDevice> = Box::new(Player::new(tone));

    let options = SessionOptions {
        answers,
        timings,
        smoothing: cli.smoothing.clamp(0.0, 1.0),
        seed: cli.seed,
    };
    let session = GameSession::new(options, tracks, device, Box::new(store))
        .context("Failed to set up game")?;

    tui::run(session, cli.fps)
}

fn print_votes(out: &mut impl Write, votes: &VoteStore, answers: &AnswerSet) -> std::io::Result<()> {
    let labels: Vec<&str> = answers.iter().map(|a| a.label.as_str()).collect();
    if votes.history().is_empty() {
        writeln!(out, "  No votes recorded yet.")?;
    } else {
        writeln!(out, "  {:<32} {}", "Track", labels.join("  "))?;
    }
    for (title, counts) in votes.history() {
        let row: Vec<String> = counts
            .iter()
            .enumerate()
            .map(|(i, count)| {
                let width = labels.get(i).map_or(1, |l| l.len());
                format!("{:>width$}", count, width = width)
            })
            .collect();
        writeln!(out, "  {:<32} {}", title, row.join("  "))?;
    }
    for title in votes.unreadable() {
        writeln!(out, "  {:<32} (unreadable, kept as is)", title)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use colorchords::game::votes::{votes_key, MemoryStore};

    fn printed(raw: &str, answers: AnswerSet) -> String {
        let store = MemoryStore::with_entry(&votes_key(answers.len()), raw);
        let votes = VoteStore::open(Box::new(store), answers.len());
        let mut out = Vec::new();
        print_votes(&mut out, &votes, &answers).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn every_count_is_printed() {
        let text = printed(r#"{"Roar":[2,0,1,0,0,3]}"#, AnswerSet::swatches());
        let row = text.lines().find(|l| l.trim_start().starts_with("Roar")).unwrap();
        let counts: Vec<&str> = row.split_whitespace().skip(1).collect();
        assert_eq!(counts, vec!["2", "0", "1", "0", "0", "3"]);
        assert!(text.contains("Violet"));
    }

    #[test]
    fn unreadable_titles_are_listed() {
        let text = printed(r#"{"Roar":[2,0,1,0,0,3],"Bad":"x"}"#, AnswerSet::swatches());
        assert!(text.contains("Bad"));
        assert!(text.contains("unreadable"));
    }

    #[test]
    fn empty_history_says_so() {
        let text = printed("{}", AnswerSet::notes());
        assert!(text.contains("No votes recorded yet."));
    }
}
