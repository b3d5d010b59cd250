use clap::Parser;
use std::path::PathBuf;

use colorchords::game::AnswerPreset;

#[derive(Parser, Debug)]
#[command(name = "colorchords", about = "Hear a note, pick its color")]
pub struct Cli {
    /// Song files to guess along to (WAV, MP3, FLAC, OGG). Without any,
    /// each round cues a synthesized note.
    pub tracks: Vec<PathBuf>,

    /// Config file (default: colorchords.toml, then the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Answer set (default: notes for tones, swatches for songs)
    #[arg(short, long, value_enum)]
    pub answers: Option<AnswerPreset>,

    /// Milliseconds the cue plays before choices appear
    #[arg(long, default_value_t = 1000)]
    pub reveal_ms: u64,

    /// Milliseconds a correct result stays up before the next round
    #[arg(long, default_value_t = 2000)]
    pub next_round_ms: u64,

    /// Screen refresh rate
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Smoothing factor for the visualizer bars (0.0-1.0)
    #[arg(long, default_value_t = 0.6)]
    pub smoothing: f32,

    /// Seed for reproducible shuffles
    #[arg(long)]
    pub seed: Option<u64>,

    /// Vote history file
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Print recorded votes and exit
    #[arg(long)]
    pub show_votes: bool,
}
