//! Acoustic quality metrics for separated stems.
//!
//! Two measurements are provided: a reconstruction loss that checks how much
//! of the original mixture is left unexplained by the sum of its stems, and
//! a per-stem HNR/HPR pair that characterizes how harmonic the separated
//! material is.

use crate::{gate, harmonicity, hpss, io};
use std::collections::BTreeMap;
use std::path::Path;

/// Stem files produced by a separation run, in analysis order.
pub const STEM_FILES: [&str; 4] = ["drums.wav", "bass.wav", "other.wav", "vocals.wav"];

/// Analysis frame length for the energy gate, in samples.
const GATE_FRAME_LENGTH: usize = 2048;
/// Hop for the energy gate and the HPSS spectrogram, in samples.
const GATE_HOP_LENGTH: usize = 512;
/// Mask margin for the HPSS decomposition feeding the HPR measurement.
const HPSS_MARGIN: f32 = 3.0;
/// Per-frame HNR values below this are treated as numerical-error outliers
/// and clipped to 0 before averaging.
const HNR_CLIP_DB: f32 = -50.0;

/// Mean squared residual after subtracting every stem from the mixture.
///
/// The mixture is loaded at its native rate and each stem in [`STEM_FILES`]
/// at that same rate. The subtraction is cumulative: each stem is removed
/// from the running residual, and on a length mismatch both the residual and
/// the stem are truncated to the shorter length (with a warning) before the
/// subtraction.
///
/// # Errors
/// Propagates audio-loading errors for the mixture or any stem, and returns
/// `Error::EmptyAudio` if truncation leaves no samples to compare.
pub fn reconstruction_loss<P: AsRef<Path>, Q: AsRef<Path>>(
    separated_dir: P,
    mixture_path: Q,
) -> crate::Result<f64> {
    let (mut residual, sr) = io::load(mixture_path.as_ref(), None)?;

    for name in STEM_FILES {
        let stem_path = separated_dir.as_ref().join(name);
        let (stem, _) = io::load(&stem_path, Some(sr))?;

        if residual.len() != stem.len() {
            let min_len = residual.len().min(stem.len());
            log::warn!(
                "length mismatch for {name}: mixture {} != stem {}, truncating both to {min_len}",
                residual.len(),
                stem.len(),
            );
            residual.truncate(min_len);
        }
        for (r, s) in residual.iter_mut().zip(&stem) {
            *r -= s;
        }
    }

    if residual.is_empty() {
        return Err(crate::Error::EmptyAudio);
    }
    let sum: f64 = residual.iter().map(|&v| (v as f64) * (v as f64)).sum();
    Ok(sum / residual.len() as f64)
}

/// Configuration for per-stem HNR/HPR analysis.
///
/// # Example
/// ```
/// use stemscope::metrics::HnrConfig;
///
/// let config = HnrConfig::new()
///     .with_energy_threshold(0.01)
///     .with_percussive(true);
/// ```
#[derive(Debug, Clone)]
pub struct HnrConfig {
    /// Hop between harmonicity frames, in seconds.
    pub time_step: f32,
    /// Lowest fundamental considered by the harmonicity analysis, in Hz.
    pub minimum_pitch: f32,
    /// Energy-gate threshold; gating runs only for values in (0, 1). The
    /// same value is forwarded to the harmonicity analysis as its unvoiced
    /// silence cutoff.
    pub energy_threshold: f32,
    /// Whether the stem is percussive (e.g. drums). Informational for now:
    /// both paths analyze the full gated signal.
    /// TODO: optionally restrict harmonicity to the matching HPSS component.
    pub percussive: bool,
}

impl HnrConfig {
    pub fn new() -> Self {
        Self {
            time_step: 0.01,
            minimum_pitch: 75.0,
            energy_threshold: 0.0,
            percussive: false,
        }
    }

    /// Set the harmonicity hop, in seconds.
    pub fn with_time_step(mut self, time_step: f32) -> Self {
        self.time_step = time_step;
        self
    }

    /// Set the lowest fundamental considered, in Hz.
    pub fn with_minimum_pitch(mut self, minimum_pitch: f32) -> Self {
        self.minimum_pitch = minimum_pitch;
        self
    }

    /// Set the energy-gate threshold.
    pub fn with_energy_threshold(mut self, energy_threshold: f32) -> Self {
        self.energy_threshold = energy_threshold;
        self
    }

    /// Mark the stem as percussive.
    pub fn with_percussive(mut self, percussive: bool) -> Self {
        self.percussive = percussive;
        self
    }
}

impl Default for HnrConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// HNR and HPR of one analyzed stem, both in dB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StemMetrics {
    /// Time-mean Harmonics-to-Noise Ratio.
    pub hnr: f32,
    /// Harmonic-to-Percussive energy ratio.
    pub hpr_db: f32,
}

/// Compute the mean HNR and the HPR of an audio file.
///
/// The signal is downmixed to mono and peak-normalized; when the configured
/// energy threshold lies in (0, 1), low-energy samples are gated out first
/// and the same threshold marks residual quiet frames as unvoiced during
/// the harmonicity analysis. Per-frame HNR values below -50 dB are clipped
/// to 0 before averaging.
///
/// # Errors
/// Propagates audio-loading errors, and returns `Error::EmptyAudio` when the
/// gate removes the entire signal.
pub fn compute_hnr<P: AsRef<Path>>(path: P, config: &HnrConfig) -> crate::Result<StemMetrics> {
    let (y, sr) = io::load(path.as_ref(), None)?;
    let y = gate::peak_normalize(&y);

    let gating = config.energy_threshold > 0.0 && config.energy_threshold < 1.0;
    let y = if gating {
        gate::energy_gate(&y, GATE_FRAME_LENGTH, GATE_HOP_LENGTH, config.energy_threshold)
    } else {
        y
    };
    if y.is_empty() {
        return Err(crate::Error::EmptyAudio);
    }

    let hpr_db = hpss::harmonic_percussive_ratio(&y, GATE_FRAME_LENGTH, GATE_HOP_LENGTH, HPSS_MARGIN)?;

    // The gate threshold doubles as the unvoiced cutoff for frames the gate
    // left partially intact.
    let silence_threshold = if gating { config.energy_threshold } else { 0.0 };
    let frames =
        harmonicity::harmonicity(&y, sr, config.time_step, config.minimum_pitch, silence_threshold)?;
    let hnr = mean_clipped(&frames);

    Ok(StemMetrics { hnr, hpr_db })
}

/// Time-mean of frame HNRs with sub-clip outliers zeroed.
fn mean_clipped(frames: &[f32]) -> f32 {
    if frames.is_empty() {
        log::warn!("no harmonicity frames available, reporting HNR of 0 dB");
        return 0.0;
    }
    let sum: f32 = frames
        .iter()
        .map(|&v| if v < HNR_CLIP_DB { 0.0 } else { v })
        .sum();
    sum / frames.len() as f32
}

/// Flat metric-name to value mapping for one analyzed test case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricRecord {
    values: BTreeMap<String, f64>,
}

impl MetricRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a scalar under a metric name like `HNR_drums`.
    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Record both stem metrics under `HNR_{stem}` / `HPR_{stem}` keys.
    pub fn set_stem(&mut self, stem: &str, metrics: StemMetrics) {
        self.set(format!("HNR_{stem}"), metrics.hnr as f64);
        self.set(format!("HPR_{stem}"), metrics.hpr_db as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{save_wav, tone};
    use std::path::PathBuf;

    /// Write a mixture and four stems that sum exactly to it.
    fn write_exact_case(dir: &PathBuf, sr: u32, len: usize) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let quarter: Vec<f32> = tone(440.0, sr, len as f32 / sr as f32)
            .into_iter()
            .take(len)
            .map(|v| v * 0.2)
            .collect();

        for name in STEM_FILES {
            save_wav(dir.join(name), &quarter, sr).unwrap();
        }

        let mixture: Vec<f32> = quarter.iter().map(|v| v * 4.0).collect();
        let mixture_path = dir.join("mixture.wav");
        save_wav(&mixture_path, &mixture, sr).unwrap();
        mixture_path
    }

    #[test]
    fn test_exact_stems_give_near_zero_loss() {
        let dir = std::env::temp_dir().join("stemscope_exact_case");
        let mixture = write_exact_case(&dir, 22050, 22050);

        let loss = reconstruction_loss(&dir, &mixture).unwrap();
        // 16-bit quantization keeps this from being exactly zero.
        assert!(loss >= 0.0);
        assert!(loss < 1e-6, "expected near-zero loss, got {loss}");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_cumulative_truncation() {
        let dir = std::env::temp_dir().join("stemscope_truncation_case");
        std::fs::create_dir_all(&dir).unwrap();
        let sr = 22050;

        // 998-sample bass against 1000-sample mixture and other stems.
        for name in STEM_FILES {
            let len = if name == "bass.wav" { 998 } else { 1000 };
            let stem: Vec<f32> = vec![0.01; len];
            save_wav(dir.join(name), &stem, sr).unwrap();
        }
        let mixture: Vec<f32> = vec![0.04; 1000];
        let mixture_path = dir.join("mixture.wav");
        save_wav(&mixture_path, &mixture, sr).unwrap();

        let loss = reconstruction_loss(&dir, &mixture_path).unwrap();
        assert!(loss.is_finite());
        assert!(loss >= 0.0);
        assert!(loss < 1e-6);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_loss_invariant_to_stem_order() {
        let sr = 22050;
        let stems: Vec<Vec<f32>> = (0..4)
            .map(|i| {
                tone(220.0 * (i + 1) as f32, sr, 0.1)
                    .into_iter()
                    .map(|v| v * 0.1)
                    .collect()
            })
            .collect();
        let mixture: Vec<f32> = (0..stems[0].len())
            .map(|j| stems.iter().map(|s| s[j]).sum::<f32>() + 0.01)
            .collect();

        let mut losses = Vec::new();
        for (case, order) in [[0usize, 1, 2, 3], [3, 1, 0, 2]].iter().enumerate() {
            let dir = std::env::temp_dir().join(format!("stemscope_order_case_{case}"));
            std::fs::create_dir_all(&dir).unwrap();
            for (name, &idx) in STEM_FILES.iter().zip(order) {
                save_wav(dir.join(name), &stems[idx], sr).unwrap();
            }
            let mixture_path = dir.join("mixture.wav");
            save_wav(&mixture_path, &mixture, sr).unwrap();
            losses.push(reconstruction_loss(&dir, &mixture_path).unwrap());
            let _ = std::fs::remove_dir_all(dir);
        }

        assert!((losses[0] - losses[1]).abs() < 1e-8);
        assert!(losses[0] > 0.0);
    }

    #[test]
    fn test_loss_near_zero_across_sample_rates() {
        let dir = std::env::temp_dir().join("stemscope_cross_rate_case");
        std::fs::create_dir_all(&dir).unwrap();

        // Hann-enveloped tone so the stems fade to silence at both edges.
        let windowed = |sr: u32| -> Vec<f32> {
            (0..sr as usize)
                .map(|i| {
                    let t = i as f32 / sr as f32;
                    let w = 0.5 - 0.5 * (2.0 * std::f32::consts::PI * t).cos();
                    w * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
                })
                .collect()
        };

        // Stems at 22050 Hz against a 44100 Hz mixture: the stems get
        // resampled on load and must still line up with the mixture.
        let quarter: Vec<f32> = windowed(22050).into_iter().map(|v| v * 0.2).collect();
        for name in STEM_FILES {
            save_wav(dir.join(name), &quarter, 22050).unwrap();
        }
        let mixture: Vec<f32> = windowed(44100).into_iter().map(|v| v * 0.8).collect();
        let mixture_path = dir.join("mixture.wav");
        save_wav(&mixture_path, &mixture, 44100).unwrap();

        let loss = reconstruction_loss(&dir, &mixture_path).unwrap();
        assert!(loss < 1e-5, "expected near-zero cross-rate loss, got {loss}");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_missing_stem_propagates_error() {
        let dir = std::env::temp_dir().join("stemscope_missing_stem");
        std::fs::create_dir_all(&dir).unwrap();
        let sr = 22050;
        let mixture_path = dir.join("mixture.wav");
        save_wav(&mixture_path, &vec![0.1f32; 1000], sr).unwrap();
        // No stems written at all.
        assert!(reconstruction_loss(&dir, &mixture_path).is_err());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_compute_hnr_on_tone() {
        let path = std::env::temp_dir().join("stemscope_hnr_tone.wav");
        let signal = tone(440.0, 22050, 1.0);
        save_wav(&path, &signal, 22050).unwrap();

        let metrics = compute_hnr(&path, &HnrConfig::new()).unwrap();
        assert!(metrics.hnr > 0.0, "tone HNR should be positive: {}", metrics.hnr);
        assert!(metrics.hpr_db > 0.0, "tone HPR should be positive: {}", metrics.hpr_db);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_compute_hnr_with_gate() {
        let path = std::env::temp_dir().join("stemscope_hnr_gated.wav");
        let sr = 22050;
        let mut signal = tone(440.0, sr, 0.5);
        signal.extend(std::iter::repeat(0.0f32).take(signal.len()));
        save_wav(&path, &signal, sr).unwrap();

        let gated = compute_hnr(&path, &HnrConfig::new().with_energy_threshold(0.1)).unwrap();
        let ungated = compute_hnr(&path, &HnrConfig::new()).unwrap();
        // Gating out the silent half should not lower the mean HNR.
        assert!(gated.hnr >= ungated.hnr - 1.0);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_mean_clipped_zeroes_outliers() {
        let frames = vec![-200.0, 10.0, -60.0, 20.0];
        let mean = mean_clipped(&frames);
        assert!((mean - 7.5).abs() < 1e-5);
    }

    #[test]
    fn test_mean_clipped_empty() {
        assert_eq!(mean_clipped(&[]), 0.0);
    }

    #[test]
    fn test_metric_record_keys() {
        let mut record = MetricRecord::new();
        record.set_stem("drums", StemMetrics { hnr: 3.0, hpr_db: -1.5 });
        record.set("reconstruction_loss", 0.25);

        assert_eq!(record.get("HNR_drums"), Some(3.0));
        assert_eq!(record.get("HPR_drums"), Some(-1.5));
        assert_eq!(record.get("reconstruction_loss"), Some(0.25));
        assert_eq!(record.get("HNR_bass"), None);
        assert_eq!(record.iter().count(), 3);
    }
}
