use serde::Deserialize;

/// Fallback cue frequency (middle C) for answers without a pitch.
pub const DEFAULT_CUE_HZ: f32 = 261.63;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Clone, Debug, PartialEq)]
pub struct Answer {
    pub label: String,
    pub color: Rgb,
    pub frequency_hz: Option<f32>,
}

/// Which built-in answer set a game uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AnswerPreset {
    /// Five pitched notes, C through G
    Notes,
    /// Six unpitched color slots for song tracks
    Swatches,
}

/// Fixed, ordered answers; slot `i` is both the answer index and its swatch.
#[derive(Clone, Debug)]
pub struct AnswerSet {
    answers: Vec<Answer>,
}

impl AnswerSet {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self { answers }
    }

    pub fn preset(preset: AnswerPreset) -> Self {
        match preset {
            AnswerPreset::Notes => Self::notes(),
            AnswerPreset::Swatches => Self::swatches(),
        }
    }

    pub fn notes() -> Self {
        const NOTES: [(&str, f32, Rgb); 5] = [
            ("C", 261.63, Rgb(0xFF, 0x6B, 0x6B)),
            ("D", 293.66, Rgb(0xFF, 0xB3, 0x47)),
            ("E", 329.63, Rgb(0xFF, 0xFF, 0x66)),
            ("F", 349.23, Rgb(0x90, 0xEE, 0x90)),
            ("G", 392.00, Rgb(0x87, 0xCE, 0xEB)),
        ];
        Self::new(
            NOTES
                .iter()
                .map(|&(label, hz, color)| Answer {
                    label: label.to_string(),
                    color,
                    frequency_hz: Some(hz),
                })
                .collect(),
        )
    }

    pub fn swatches() -> Self {
        const SWATCHES: [(&str, Rgb); 6] = [
            ("Red", Rgb(0xFF, 0x6B, 0x6B)),
            ("Orange", Rgb(0xFF, 0xB3, 0x47)),
            ("Yellow", Rgb(0xFF, 0xFF, 0x66)),
            ("Green", Rgb(0x90, 0xEE, 0x90)),
            ("Blue", Rgb(0x87, 0xCE, 0xEB)),
            ("Violet", Rgb(0xC3, 0x9B, 0xD3)),
        ];
        Self::new(
            SWATCHES
                .iter()
                .map(|&(label, color)| Answer {
                    label: label.to_string(),
                    color,
                    frequency_hz: None,
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Answer> {
        self.answers.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Answer> {
        self.answers.iter()
    }

    /// Frequency to synthesize when `index` is the correct answer.
    pub fn cue_frequency(&self, index: usize) -> f32 {
        self.get(index)
            .and_then(|a| a.frequency_hz)
            .unwrap_or(DEFAULT_CUE_HZ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_sizes() {
        assert_eq!(AnswerSet::notes().len(), 5);
        assert_eq!(AnswerSet::swatches().len(), 6);
    }

    #[test]
    fn cue_frequency_falls_back_to_middle_c() {
        let notes = AnswerSet::notes();
        assert_eq!(notes.cue_frequency(4), 392.0);
        assert_eq!(notes.cue_frequency(99), DEFAULT_CUE_HZ);
        assert_eq!(AnswerSet::swatches().cue_frequency(0), DEFAULT_CUE_HZ);
    }
}
