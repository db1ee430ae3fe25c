//! Frame-wise harmonicity (Harmonics-to-Noise Ratio) estimation.
//!
//! Uses the normalized autocorrelation of each analysis frame: if `r` is the
//! height of the strongest autocorrelation peak in the candidate lag range,
//! the frame's periodic energy fraction is `r` and its noise fraction is
//! `1 - r`, giving `HNR = 10·log10(r / (1 - r))` in dB.

/// Value reported for frames with no detectable periodicity (silent frames
/// or frames whose best correlation is non-positive).
pub const UNVOICED_DB: f32 = -200.0;

/// Compute per-frame HNR values for a mono signal.
///
/// # Arguments
/// * `y` - Input mono signal
/// * `sr` - Sample rate
/// * `time_step` - Hop between analysis frames, in seconds
/// * `minimum_pitch` - Lowest fundamental considered, in Hz; sets both the
///   maximum candidate lag and the frame length (two periods)
/// * `silence_threshold` - Frames whose peak amplitude, relative to the
///   signal peak, is at or below this are reported unvoiced; 0 disables the
///   cutoff apart from true silence
///
/// # Returns
/// One HNR value in dB per frame. Signals shorter than a single frame yield
/// an empty vector.
///
/// # Errors
/// Returns `Error::EmptyAudio` for an empty signal and
/// `Error::InvalidParameter` for non-positive `time_step`, a
/// `minimum_pitch` outside (0, sr/4), or a `silence_threshold` outside
/// [0, 1).
pub fn harmonicity(
    y: &[f32],
    sr: u32,
    time_step: f32,
    minimum_pitch: f32,
    silence_threshold: f32,
) -> crate::Result<Vec<f32>> {
    if y.is_empty() {
        return Err(crate::Error::EmptyAudio);
    }
    if !(time_step > 0.0) {
        return Err(crate::Error::InvalidParameter {
            name: "time_step",
            value: time_step.to_string(),
            reason: "must be positive",
        });
    }
    if !(minimum_pitch > 0.0) || minimum_pitch > sr as f32 / 4.0 {
        return Err(crate::Error::InvalidParameter {
            name: "minimum_pitch",
            value: minimum_pitch.to_string(),
            reason: "must lie in (0, sr/4]",
        });
    }
    if !(silence_threshold >= 0.0 && silence_threshold < 1.0) {
        return Err(crate::Error::InvalidParameter {
            name: "silence_threshold",
            value: silence_threshold.to_string(),
            reason: "must lie in [0, 1)",
        });
    }

    let tau_max = (sr as f32 / minimum_pitch).ceil() as usize;
    let frame_length = 2 * tau_max;
    let hop_length = ((time_step * sr as f32).round() as usize).max(1);

    if y.len() < frame_length {
        return Ok(Vec::new());
    }

    let global_peak = y.iter().map(|v| v.abs()).fold(0.0f32, f32::max);
    let silence_floor = silence_threshold * global_peak;

    let n_frames = (y.len() - frame_length) / hop_length + 1;
    let mut hnr = Vec::with_capacity(n_frames);

    for frame_idx in 0..n_frames {
        let start = frame_idx * hop_length;
        let frame = &y[start..start + frame_length];

        let energy: f32 = frame.iter().map(|v| v * v).sum();
        let local_peak = frame.iter().map(|v| v.abs()).fold(0.0f32, f32::max);
        if energy < 1e-12 || local_peak <= silence_floor {
            hnr.push(UNVOICED_DB);
            continue;
        }

        let r = peak_autocorrelation(frame, 2, tau_max);
        if r <= 0.0 {
            hnr.push(UNVOICED_DB);
            continue;
        }
        let r = r.min(1.0 - 1e-6);
        hnr.push(10.0 * (r / (1.0 - r)).log10());
    }

    Ok(hnr)
}

/// Height of the strongest normalized autocorrelation peak in
/// `[tau_min, tau_max)`, refined by parabolic interpolation.
fn peak_autocorrelation(frame: &[f32], tau_min: usize, tau_max: usize) -> f32 {
    let n = frame.len();
    let tau_max = tau_max.min(n.saturating_sub(1));
    if tau_min >= tau_max {
        return 0.0;
    }

    let mut corr = vec![0.0f32; tau_max];
    for (tau, c) in corr.iter_mut().enumerate().take(tau_max).skip(tau_min) {
        let overlap = n - tau;
        let mut num = 0.0f32;
        let mut e_head = 0.0f32;
        let mut e_tail = 0.0f32;
        for j in 0..overlap {
            num += frame[j] * frame[j + tau];
            e_head += frame[j] * frame[j];
            e_tail += frame[j + tau] * frame[j + tau];
        }
        let denom = (e_head * e_tail).sqrt();
        if denom > 1e-12 {
            *c = num / denom;
        }
    }

    let mut best_tau = tau_min;
    for tau in tau_min..tau_max {
        if corr[tau] > corr[best_tau] {
            best_tau = tau;
        }
    }

    // Parabolic refinement of the peak height.
    if best_tau > tau_min && best_tau + 1 < tau_max {
        let s0 = corr[best_tau - 1];
        let s1 = corr[best_tau];
        let s2 = corr[best_tau + 1];
        let curvature = s0 - 2.0 * s1 + s2;
        if curvature.abs() > 1e-12 {
            let refined = s1 - (s0 - s2) * (s0 - s2) / (8.0 * curvature);
            return refined.max(s1);
        }
    }
    corr[best_tau]
}
