//! Audio loading for analysis.
//!
//! All analysis in this crate runs on mono signals, so the loader decodes
//! whatever symphonia understands (WAV stems, MP3 mixtures, ...), averages
//! the channels down to one, and optionally resamples to a caller-supplied
//! rate so stems can be compared against a mixture decoded at its native
//! rate.

use hound::{SampleFormat, WavSpec, WavWriter};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("hound error: {0}")]
    Hound(#[from] hound::Error),
    #[error("symphonia error: {0}")]
    Symphonia(SymphoniaError),
    #[error("no audio track found")]
    NoAudioTrack,
    #[error("decoded stream reported zero channels")]
    NoChannels,
    #[error("resampling error: {0}")]
    Resample(String),
}

impl From<SymphoniaError> for AudioError {
    fn from(err: SymphoniaError) -> Self {
        Self::Symphonia(err)
    }
}

/// Load an audio file as a mono signal.
///
/// Multi-channel audio is downmixed by averaging. When `target_sr` is given
/// and differs from the file's native rate, the signal is sinc-resampled.
///
/// # Arguments
/// * `path` - Path to the audio file (any format symphonia can probe)
/// * `target_sr` - Resample to this rate (None keeps the native rate)
///
/// # Returns
/// Tuple of (samples, sample_rate)
///
/// # Errors
/// Returns `AudioError` if the file cannot be opened, probed, or decoded.
pub fn load<P: AsRef<Path>>(
    path: P,
    target_sr: Option<u32>,
) -> Result<(Vec<f32>, u32), AudioError> {
    let path_ref = path.as_ref();
    let mut hint = Hint::new();
    if let Some(ext) = path_ref.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let file = std::fs::File::open(path_ref).map_err(SymphoniaError::IoError)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.sample_rate.is_some())
        .ok_or(AudioError::NoAudioTrack)?
        .clone();

    let sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(0);
    if channels == 0 {
        return Err(AudioError::NoChannels);
    }

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut interleaved: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(SymphoniaError::IoError(_)) => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track.id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(audio) => audio,
            Err(SymphoniaError::IoError(_)) => break,
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        let mut sb = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        sb.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(sb.samples());
    }

    let frames = interleaved.len() / channels;
    let mut mono = Vec::with_capacity(frames);
    for frame in interleaved.chunks_exact(channels) {
        mono.push(frame.iter().sum::<f32>() / channels as f32);
    }

    if let Some(target) = target_sr {
        if target != sample_rate && sample_rate > 0 {
            let resampled = resample(&mono, sample_rate, target)?;
            return Ok((resampled, target));
        }
    }

    Ok((mono, sample_rate))
}

/// Sinc-resample a mono signal from `src_sr` to `dst_sr`.
///
/// The resampler's filter delay is compensated and the tail is flushed, so
/// the output stays sample-aligned with the input signal.
pub fn resample(samples: &[f32], src_sr: u32, dst_sr: u32) -> Result<Vec<f32>, AudioError> {
    if src_sr == dst_sr || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let ratio = dst_sr as f64 / src_sr as f64;
    let chunk_size = 1024usize;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1)
        .map_err(|e| AudioError::Resample(e.to_string()))?;

    let delay = resampler.output_delay();
    let expected = ((samples.len() as f64) * ratio).round() as usize;

    let resample_err = |e: rubato::ResampleError| AudioError::Resample(e.to_string());
    let mut output: Vec<f32> = Vec::with_capacity(expected + delay);
    let mut offset = 0usize;
    while samples.len() - offset >= chunk_size {
        let chunk_out = resampler
            .process(&[&samples[offset..offset + chunk_size]], None)
            .map_err(resample_err)?;
        output.extend_from_slice(&chunk_out[0]);
        offset += chunk_size;
    }
    if offset < samples.len() {
        let chunk_out = resampler
            .process_partial(Some(&[&samples[offset..]]), None)
            .map_err(resample_err)?;
        output.extend_from_slice(&chunk_out[0]);
    }
    // Flush until the delayed tail has come through.
    while output.len() < expected + delay {
        let chunk_out = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(resample_err)?;
        output.extend_from_slice(&chunk_out[0]);
    }

    output.drain(..delay);
    output.truncate(expected);
    Ok(output)
}

/// Save a mono signal to a 16-bit PCM WAV file.
///
/// Samples are clipped to [-1.0, 1.0] before quantization. Used for test
/// fixtures and for exporting gated signals.
pub fn save_wav<P: AsRef<Path>>(path: P, samples: &[f32], sample_rate: u32) -> crate::Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec).map_err(AudioError::Hound)?;
    for &sample in samples {
        let s = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(s).map_err(AudioError::Hound)?;
    }
    writer.finalize().map_err(AudioError::Hound)?;
    Ok(())
}

/// Generate a pure tone, handy for synthetic fixtures.
pub fn tone(frequency: f32, sr: u32, duration: f32) -> Vec<f32> {
    let n_samples = (duration * sr as f32) as usize;
    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sr as f32;
    (0..n_samples)
        .map(|i| (angular_freq * i as f32).sin())
        .collect()
}
