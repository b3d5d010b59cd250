use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::{AudioDevice, SampleTap};
use crate::error::Result;

/// Number of bars in a visualization frame.
pub const BANDS: usize = 8;

const FFT_SIZE: usize = 1024;

/// Sub-bass, bass, low-mid, mid, upper-mid, presence, brilliance, air
const BAND_EDGES: [f32; BANDS + 1] = [
    20.0, 60.0, 250.0, 500.0, 2000.0, 4000.0, 6000.0, 12000.0, 20000.0,
];

/// The running peak decays by this factor per sample so quiet passages
/// still fill the bars.
const PEAK_DECAY: f32 = 0.995;

/// The peak never drops below this magnitude; keeps silence and hiss flat.
const PEAK_FLOOR: f32 = 1.0;

/// Normalized band levels, each in `[0, 1]`.
pub type VisualizationFrame = [f32; BANDS];

pub struct AudioAnalyzer {
    tap: Option<Box<dyn SampleTap>>,
    fft: Arc<dyn Fft<f32>>,
    hann: Vec<f32>,
    window: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    smoothing: f32,
    smoothed: VisualizationFrame,
    peak: f32,
}

impl AudioAnalyzer {
    /// `smoothing` in `[0, 1)`: 0 shows raw levels, higher values lag more.
    pub fn new(smoothing: f32) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        Self {
            tap: None,
            fft: planner.plan_fft_forward(FFT_SIZE),
            hann: hann_window(FFT_SIZE),
            window: vec![0.0; FFT_SIZE],
            spectrum: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            smoothing: smoothing.clamp(0.0, 0.99),
            smoothed: [0.0; BANDS],
            peak: PEAK_FLOOR,
        }
    }

    pub fn attach(&mut self, device: &mut dyn AudioDevice) -> Result<()> {
        let tap = device.tap()?;
        self.reset_levels();
        self.tap = Some(tap);
        log::debug!("Analyzer attached");
        Ok(())
    }

    pub fn detach(&mut self) {
        if self.tap.take().is_some() {
            log::debug!("Analyzer detached");
        }
        self.reset_levels();
    }

    pub fn is_attached(&self) -> bool {
        self.tap.is_some()
    }

    /// Latest levels; all zeros while detached.
    pub fn sample(&mut self) -> VisualizationFrame {
        self.next_frame().unwrap_or([0.0; BANDS])
    }

    /// One frame per `next()`, for as long as the analyzer stays attached.
    pub fn frames(&mut self) -> Frames<'_> {
        Frames { analyzer: self }
    }

    fn next_frame(&mut self) -> Option<VisualizationFrame> {
        let tap = self.tap.as_ref()?;
        if !tap.read_window(&mut self.window) {
            log::debug!("Sample tap closed");
            self.detach();
            return None;
        }
        let sample_rate = tap.sample_rate();

        for (i, slot) in self.spectrum.iter_mut().enumerate() {
            *slot = Complex::new(self.window[i] * self.hann[i], 0.0);
        }
        self.fft.process(&mut self.spectrum);

        let half = FFT_SIZE / 2;
        let raw = band_levels(&self.spectrum[..half], sample_rate);

        // Bars are relative to the loudest band seen recently.
        let loudest = raw.iter().copied().fold(0.0f32, f32::max);
        self.peak = (self.peak * PEAK_DECAY).max(loudest).max(PEAK_FLOOR);

        let alpha = 1.0 - self.smoothing;
        for (smoothed, level) in self.smoothed.iter_mut().zip(raw) {
            let level = (level / self.peak).min(1.0);
            *smoothed = alpha * level + (1.0 - alpha) * *smoothed;
        }
        Some(self.smoothed)
    }

    fn reset_levels(&mut self) {
        self.smoothed = [0.0; BANDS];
        self.peak = PEAK_FLOOR;
    }
}

pub struct Frames<'a> {
    analyzer: &'a mut AudioAnalyzer,
}

impl Iterator for Frames<'_> {
    type Item = VisualizationFrame;

    fn next(&mut self) -> Option<Self::Item> {
        self.analyzer.next_frame()
    }
}

/// RMS magnitude of the bins inside each band.
fn band_levels(bins: &[Complex<f32>], sample_rate: u32) -> VisualizationFrame {
    let mut levels = [0.0; BANDS];
    if sample_rate == 0 || bins.is_empty() {
        return levels;
    }
    let freq_resolution = sample_rate as f32 / FFT_SIZE as f32;

    for (band, level) in levels.iter_mut().enumerate() {
        let low_bin = ((BAND_EDGES[band] / freq_resolution) as usize).max(1);
        let high_bin = ((BAND_EDGES[band + 1] / freq_resolution) as usize).min(bins.len());
        if low_bin >= high_bin {
            continue;
        }
        let sum: f32 = bins[low_bin..high_bin].iter().map(|c| c.norm_sqr()).sum();
        *level = (sum / (high_bin - low_bin) as f32).sqrt();
    }
    levels
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}
