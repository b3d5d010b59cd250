use anyhow::Result;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{self, Write};
use std::time::{Duration, Instant};

use colorchords::audio::VisualizationFrame;
use colorchords::GameError;
use colorchords::game::{GameSession, Phase, RenderFrame, Rgb};

const BAR_HEIGHT: usize = 6;
const SWATCH: &str = "██████";

enum Action {
    Continue,
    Quit,
}

/// Run the game in the terminal until the player quits.
pub fn run(mut session: GameSession, fps: u32) -> Result<()> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, Hide)?;

    let result = event_loop(&mut session, &mut stdout, fps);

    session.shutdown();
    execute!(stdout, Show, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    result
}

fn event_loop(session: &mut GameSession, out: &mut impl Write, fps: u32) -> Result<()> {
    let frame_time = Duration::from_millis(1000 / u64::from(fps.max(1)));
    let mut started = false;

    loop {
        if started {
            session.tick(Instant::now());
        }
        draw(out, &session.frame(), started)?;

        // Wake for whichever comes first: the next frame or a round timer.
        let timeout = session
            .next_deadline()
            .map(|due| due.saturating_duration_since(Instant::now()).min(frame_time))
            .unwrap_or(frame_time);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let Action::Quit = handle_key(session, key, &mut started) {
                    return Ok(());
                }
            }
        }
    }
}

fn handle_key(session: &mut GameSession, key: KeyEvent, started: &mut bool) -> Action {
    let now = Instant::now();
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Action::Quit,
        KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
        KeyCode::Enter | KeyCode::Char(' ') if !*started => {
            session.start(now);
            *started = true;
        }
        KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('r') if *started => {
            if let Err(e) = session.retry(now) {
                report(&e, "Retry ignored");
            }
        }
        KeyCode::Char('n') if *started => {
            session.advance(now);
        }
        KeyCode::Char(c) if *started => {
            let Some(position) = c.to_digit(10).and_then(|d| (d as usize).checked_sub(1)) else {
                return Action::Continue;
            };
            let Some(&slot) = session.frame().choices.get(position) else {
                return Action::Continue;
            };
            if let Err(e) = session.submit(slot, now) {
                report(&e, "Choice ignored");
            }
        }
        _ => {}
    }
    Action::Continue
}

fn report(e: &GameError, what: &str) {
    if e.is_recoverable() {
        log::debug!("{}: {}", what, e);
    } else {
        log::error!("{}: {}", what, e);
    }
}

/// Writes one line per call, top to bottom. Raw mode does not return the
/// cursor to column 0, so every line is positioned explicitly.
struct Screen<'a, W: Write> {
    out: &'a mut W,
    row: u16,
}

impl<W: Write> Screen<'_, W> {
    fn line(&mut self, text: &str, color: Option<Rgb>) -> io::Result<()> {
        queue!(self.out, MoveTo(0, self.row))?;
        if let Some(c) = color {
            queue!(self.out, SetForegroundColor(to_color(c)))?;
        }
        queue!(self.out, Print(text), ResetColor)?;
        self.row += 1;
        Ok(())
    }

    fn blank(&mut self) -> io::Result<()> {
        self.line("", None)
    }
}

fn draw(out: &mut impl Write, frame: &RenderFrame<'_>, started: bool) -> Result<()> {
    queue!(out, Clear(ClearType::All))?;
    let mut screen = Screen { out, row: 0 };

    screen.line(&format!("Color Chords  ·  {}", frame.title), None)?;
    screen.blank()?;

    if !started {
        screen.line("Press Enter to start", None)?;
        screen.blank()?;
        screen.line("Listen to the cue, then pick its color.", None)?;
        screen.line("[1-9] choose  [r] replay  [n] next track  [q] quit", None)?;
        screen.out.flush()?;
        return Ok(());
    }

    match frame.phase {
        Phase::Idle => screen.line("...", None)?,
        Phase::Priming => {
            let cue = frame.cue_index.and_then(|i| frame.answers.get(i));
            screen.line("Listen...", None)?;
            screen.line(SWATCH, cue.map(|a| a.color))?;
        }
        Phase::AwaitingChoice => {
            screen.line("Which color was it?", None)?;
            for (position, &slot) in frame.choices.iter().enumerate() {
                let Some(answer) = frame.answers.get(slot) else { continue };
                screen.line(&format!("[{}] {}", position + 1, SWATCH), Some(answer.color))?;
            }
        }
        Phase::Scoring => {
            let correct = frame.cue_index.and_then(|i| frame.answers.get(i));
            let chosen = frame.chosen_index.and_then(|i| frame.answers.get(i));
            match (frame.verdict, correct, chosen) {
                (Some(v), Some(answer), _) if v.correct => {
                    screen.line(&format!("Correct! {}", answer.label), Some(answer.color))?;
                    screen.line("Next round coming up...", None)?;
                }
                (_, Some(answer), Some(picked)) => {
                    screen.line(&format!("You picked {}", picked.label), Some(picked.color))?;
                    screen.line(&format!("It was {}", answer.label), Some(answer.color))?;
                    screen.line("[r] replay  [n] next track", None)?;
                }
                _ => screen.blank()?,
            }
        }
    }

    screen.blank()?;
    for bar_row in bar_rows(&frame.visualization, BAR_HEIGHT) {
        screen.line(&bar_row, None)?;
    }

    screen.blank()?;
    let tally: Vec<String> = frame
        .answers
        .iter()
        .zip(frame.votes)
        .map(|(answer, count)| format!("{} {}", answer.label, count))
        .collect();
    screen.line(&format!("Votes: {}", tally.join("  ")), None)?;
    if !frame.audio_ready {
        screen.line("(no audio for this track)", None)?;
    }

    screen.out.flush()?;
    Ok(())
}

/// Render levels as rows of block characters, top row first.
fn bar_rows(levels: &VisualizationFrame, height: usize) -> Vec<String> {
    let h = height.max(1);
    (0..h)
        .map(|row| {
            let threshold = (h - row) as f32 / h as f32;
            levels
                .iter()
                .map(|&v| if v.clamp(0.0, 1.0) >= threshold - 0.5 / h as f32 { "██ " } else { "   " })
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect()
}

fn to_color(rgb: Rgb) -> Color {
    Color::Rgb {
        r: rgb.0,
        g: rgb.1,
        b: rgb.2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colorchords::game::AnswerSet;

    #[test]
    fn choosing_screen_lists_numbered_swatches_and_votes() {
        let answers = AnswerSet::swatches();
        let frame = RenderFrame {
            phase: Phase::AwaitingChoice,
            title: "Roar",
            answers: &answers,
            cue_index: None,
            chosen_index: None,
            choices: &[2, 0, 1, 3, 5, 4],
            verdict: None,
            votes: &[2, 0, 1, 0, 0, 3],
            visualization: [0.0; 8],
            audio_ready: false,
        };
        let mut out = Vec::new();
        draw(&mut out, &frame, true).unwrap();

        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("Roar"));
        assert!(text.contains("Which color was it?"));
        assert!(text.contains("[6]"));
        assert!(!text.contains("[7]"));
        assert!(text.contains("Violet 3"));
        assert!(text.contains("(no audio for this track)"));
    }

    #[test]
    fn bars_fill_from_the_bottom() {
        let levels = [1.0, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let rows = bar_rows(&levels, 4);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], "██");
        assert_eq!(rows[2], "██ ██");
        assert_eq!(rows[3], "██ ██");
    }

    #[test]
    fn silent_bars_are_blank() {
        let rows = bar_rows(&[0.0; 8], 3);
        assert!(rows.iter().all(|r| r.is_empty()));
    }
}
