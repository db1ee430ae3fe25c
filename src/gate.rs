//! RMS-energy gating used to drop silence and bleed before analysis.

/// Scale a signal so its peak magnitude is 1.0.
///
/// Signals that are all-zero (or denormally small) are returned unchanged.
pub fn peak_normalize(y: &[f32]) -> Vec<f32> {
    let peak = y.iter().map(|v| v.abs()).fold(0.0f32, f32::max);
    if peak > 1e-10 {
        y.iter().map(|v| v / peak).collect()
    } else {
        y.to_vec()
    }
}

/// Frame-wise RMS energy with centered frames.
///
/// Frame `i` covers the samples around `i * hop_length`, clipped at the
/// signal edges, giving `len / hop_length + 1` values.
pub fn frame_rms(y: &[f32], frame_length: usize, hop_length: usize) -> Vec<f32> {
    if y.is_empty() || frame_length == 0 || hop_length == 0 {
        return Vec::new();
    }

    let n_frames = y.len() / hop_length + 1;
    let half = frame_length / 2;
    let mut out = Vec::with_capacity(n_frames);

    for i in 0..n_frames {
        let center = i * hop_length;
        let start = center.saturating_sub(half);
        let end = (center + half).min(y.len());
        let frame = &y[start..end.max(start)];

        if frame.is_empty() {
            out.push(0.0);
            continue;
        }
        let sum: f32 = frame.iter().map(|v| v * v).sum();
        out.push((sum / frame.len() as f32).sqrt());
    }

    out
}

/// Remove samples whose local energy falls below `threshold`.
///
/// Frame-wise RMS energy is max-normalized, upsampled to sample resolution
/// by repeating each value `hop_length` times, and truncated to the signal
/// length; samples whose expanded energy is at or below the threshold are
/// dropped. The threshold is expected to lie in (0, 1) -- callers gate only
/// in that range.
pub fn energy_gate(y: &[f32], frame_length: usize, hop_length: usize, threshold: f32) -> Vec<f32> {
    let energy = frame_rms(y, frame_length, hop_length);
    if energy.is_empty() {
        return y.to_vec();
    }

    let peak = energy.iter().fold(0.0f32, |m, &v| m.max(v));
    if peak <= 1e-10 {
        return Vec::new();
    }

    y.iter()
        .enumerate()
        .filter(|&(i, _)| energy[(i / hop_length).min(energy.len() - 1)] / peak > threshold)
        .map(|(_, &v)| v)
        .collect()
}
