//! Short-Time Fourier Transform support for the HPSS decomposition.
//!
//! Only the forward transform is provided: harmonic/percussive energies are
//! measured directly on the masked spectrograms, so no resynthesis path is
//! needed.

use ndarray::Array2;
use num_complex::Complex32;
use realfft::{RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// Cached real-to-complex FFT plan for one transform size.
pub struct FftPlan {
    r2c: Arc<dyn RealToComplex<f32>>,
}

impl FftPlan {
    /// Create a plan for a given size (powers of two are fastest).
    pub fn new(len: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        Self {
            r2c: planner.plan_fft_forward(len),
        }
    }

    /// Transform a real frame into its half spectrum (len/2 + 1 bins).
    pub fn forward(&self, frame: &mut [f32], spectrum: &mut [Complex32]) {
        // realfft only fails on length mismatch, which the STFT loop
        // guarantees cannot happen.
        let _ = self.r2c.process(frame, spectrum);
    }

    /// Length of the half spectrum produced by `forward`.
    pub fn output_len(&self) -> usize {
        self.r2c.complex_len()
    }
}

/// Periodic Hann window of length `n`.
pub fn hann(n: usize) -> Vec<f32> {
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![1.0];
    }
    let m = n as f32;
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / m).cos())
        .collect()
}

fn reflect_index(mut idx: isize, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let last = len as isize - 1;
    while idx < 0 || idx > last {
        if idx < 0 {
            idx = -idx;
        }
        if idx > last {
            idx = 2 * last - idx;
        }
    }
    idx as usize
}

/// Center-pad by reflection so frames are centered on their timestamps.
fn pad_reflect(y: &[f32], pad: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(y.len() + 2 * pad);
    for i in 0..(y.len() + 2 * pad) {
        let src = i as isize - pad as isize;
        out.push(y[reflect_index(src, y.len())]);
    }
    out
}

/// Compute a centered, Hann-windowed STFT.
///
/// # Arguments
/// * `y` - Input mono signal
/// * `n_fft` - FFT size
/// * `hop_length` - Samples between consecutive frames
///
/// # Returns
/// Complex STFT matrix of shape (n_fft/2 + 1, n_frames)
///
/// # Errors
/// Returns `Error::EmptyAudio` for an empty signal and `Error::InvalidSize`
/// for zero-sized `n_fft` or `hop_length`.
pub fn stft(y: &[f32], n_fft: usize, hop_length: usize) -> crate::Result<Array2<Complex32>> {
    if y.is_empty() {
        return Err(crate::Error::EmptyAudio);
    }
    if n_fft == 0 {
        return Err(crate::Error::InvalidSize {
            name: "n_fft",
            value: 0,
            reason: "must be > 0",
        });
    }
    if hop_length == 0 {
        return Err(crate::Error::InvalidSize {
            name: "hop_length",
            value: 0,
            reason: "must be > 0",
        });
    }

    let window = hann(n_fft);
    let padded = pad_reflect(y, n_fft / 2);
    let n_frames = (padded.len() - n_fft) / hop_length + 1;

    let fft = FftPlan::new(n_fft);
    let n_freq = fft.output_len();
    let mut out = Array2::<Complex32>::zeros((n_freq, n_frames));
    let mut frame_buf = vec![0.0f32; n_fft];
    let mut spec_buf = vec![Complex32::new(0.0, 0.0); n_freq];

    for frame in 0..n_frames {
        let start = frame * hop_length;
        for i in 0..n_fft {
            frame_buf[i] = padded[start + i] * window[i];
        }
        fft.forward(&mut frame_buf, &mut spec_buf);
        for (f, &bin) in spec_buf.iter().enumerate() {
            out[(f, frame)] = bin;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hann_endpoints() {
        let w = hann(8);
        assert_eq!(w.len(), 8);
        assert_relative_eq!(w[0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(w[4], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_stft_shape() {
        let signal = crate::io::tone(440.0, 22050, 0.5);
        let s = stft(&signal, 2048, 512).unwrap();
        assert_eq!(s.shape()[0], 1025);
        assert_eq!(s.shape()[1], signal.len() / 512 + 1);
    }

    #[test]
    fn test_stft_tone_peak_bin() {
        let sr = 22050u32;
        let signal = crate::io::tone(440.0, sr, 1.0);
        let s = stft(&signal, 2048, 512).unwrap();

        // Magnitude summed over time should peak near 440 Hz.
        let n_freq = s.shape()[0];
        let mut totals = vec![0.0f32; n_freq];
        for ((f, _), bin) in s.indexed_iter() {
            totals[f] += bin.norm();
        }
        let peak_bin = totals
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        let peak_freq = peak_bin as f32 * sr as f32 / 2048.0;
        assert!((peak_freq - 440.0).abs() < 22.0);
    }

    #[test]
    fn test_stft_empty_signal() {
        assert!(matches!(
            stft(&[], 2048, 512),
            Err(crate::Error::EmptyAudio)
        ));
    }

    #[test]
    fn test_stft_zero_hop() {
        let signal = vec![0.0f32; 128];
        assert!(stft(&signal, 64, 0).is_err());
    }

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 5), 1);
        assert_eq!(reflect_index(0, 5), 0);
        assert_eq!(reflect_index(5, 5), 3);
        assert_eq!(reflect_index(-2, 1), 0);
    }
}
