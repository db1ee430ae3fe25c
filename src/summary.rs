//! Training-summary log parsing.
//!
//! Training runs emit plain-text lines like
//!
//! ```text
//! Train Summary | Epoch 3 | Loss=0.512 Reco=0.204 Rrepo=0.011
//! Valid Summary | Epoch 3 | Loss=0.498 Reco=0.199 Nsdr=4.21
//! ```
//!
//! Lines that don't match the expected patterns are skipped without
//! comment; `Reco` and `Rrepo` are optional per line and recorded as `None`
//! when absent.

use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{BufRead, BufReader};
use std::path::Path;

static TRAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Train Summary \| Epoch (\d+) \| Loss=([\d.]+)").expect("valid regex"));
static VALID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Valid Summary \| Epoch (\d+) \| Loss=([\d.]+).*Nsdr=([\d.]+)")
        .expect("valid regex")
});
static RECO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Reco=([\d.]+)").expect("valid regex"));
static RREPO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Rrepo=([\d.]+)").expect("valid regex"));

/// Per-epoch training and validation series extracted from a summary log.
///
/// The train and valid vectors are parallel within each phase: entry `i` of
/// `train_loss`, `train_reco` and `train_rrepo` all belong to
/// `train_epochs[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSeries {
    pub train_epochs: Vec<u32>,
    pub train_loss: Vec<f32>,
    pub train_reco: Vec<Option<f32>>,
    pub train_rrepo: Vec<Option<f32>>,
    pub valid_epochs: Vec<u32>,
    pub valid_loss: Vec<f32>,
    pub valid_reco: Vec<Option<f32>>,
    pub valid_nsdr: Vec<f32>,
}

impl TrainingSeries {
    /// True when no summary line of either phase was found.
    pub fn is_empty(&self) -> bool {
        self.train_epochs.is_empty() && self.valid_epochs.is_empty()
    }
}

fn capture_f32(re: &Regex, line: &str) -> Option<f32> {
    re.captures(line)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse summary lines from any reader.
///
/// # Errors
/// Propagates I/O errors from the underlying reader; malformed lines are
/// not errors.
pub fn parse_summary<R: BufRead>(reader: R) -> crate::Result<TrainingSeries> {
    let mut series = TrainingSeries::default();

    for line in reader.lines() {
        let line = line?;
        if line.contains("Train Summary") {
            let Some(caps) = TRAIN_RE.captures(&line) else {
                continue;
            };
            let (Ok(epoch), Ok(loss)) = (caps[1].parse::<u32>(), caps[2].parse::<f32>()) else {
                continue;
            };
            series.train_epochs.push(epoch);
            series.train_loss.push(loss);
            series.train_reco.push(capture_f32(&RECO_RE, &line));
            series.train_rrepo.push(capture_f32(&RREPO_RE, &line));
        } else if line.contains("Valid Summary") {
            let Some(caps) = VALID_RE.captures(&line) else {
                continue;
            };
            let (Ok(epoch), Ok(loss), Ok(nsdr)) = (
                caps[1].parse::<u32>(),
                caps[2].parse::<f32>(),
                caps[3].parse::<f32>(),
            ) else {
                continue;
            };
            series.valid_epochs.push(epoch);
            series.valid_loss.push(loss);
            series.valid_nsdr.push(nsdr);
            series.valid_reco.push(capture_f32(&RECO_RE, &line));
        }
    }

    Ok(series)
}

/// Parse a training-summary log file.
///
/// # Errors
/// Returns `Error::Io` if the file cannot be opened or read.
pub fn parse_summary_file<P: AsRef<Path>>(path: P) -> crate::Result<TrainingSeries> {
    let file = std::fs::File::open(path)?;
    parse_summary(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> TrainingSeries {
        parse_summary(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_train_line_with_reco() {
        let series = parse("Train Summary | Epoch 3 | Loss=0.5 Reco=0.2\n");
        assert_eq!(series.train_epochs, vec![3]);
        assert_eq!(series.train_loss, vec![0.5]);
        assert_eq!(series.train_reco, vec![Some(0.2)]);
        assert_eq!(series.train_rrepo, vec![None]);
    }

    #[test]
    fn test_train_line_with_rrepo() {
        let series = parse("Train Summary | Epoch 7 | Loss=0.41 Reco=0.18 Rrepo=0.03\n");
        assert_eq!(series.train_reco, vec![Some(0.18)]);
        assert_eq!(series.train_rrepo, vec![Some(0.03)]);
    }

    #[test]
    fn test_valid_line() {
        let series = parse("Valid Summary | Epoch 3 | Loss=0.4 Reco=0.21 Nsdr=1.2\n");
        assert_eq!(series.valid_epochs, vec![3]);
        assert_eq!(series.valid_loss, vec![0.4]);
        assert_eq!(series.valid_nsdr, vec![1.2]);
        assert_eq!(series.valid_reco, vec![Some(0.21)]);
    }

    #[test]
    fn test_valid_line_without_nsdr_is_skipped() {
        let series = parse("Valid Summary | Epoch 3 | Loss=0.4\n");
        assert!(series.valid_epochs.is_empty());
    }

    #[test]
    fn test_malformed_lines_skipped_silently() {
        let log = "starting run\n\
                   Train Summary | Epoch x | Loss=bad\n\
                   Train Summary | Epoch 1 | Loss=0.9\n\
                   some unrelated noise\n";
        let series = parse(log);
        assert_eq!(series.train_epochs, vec![1]);
        assert_eq!(series.train_loss, vec![0.9]);
    }

    #[test]
    fn test_interleaved_phases() {
        let log = "Train Summary | Epoch 1 | Loss=1.0\n\
                   Valid Summary | Epoch 1 | Loss=1.1 Nsdr=0.5\n\
                   Train Summary | Epoch 2 | Loss=0.8 Reco=0.3\n\
                   Valid Summary | Epoch 2 | Loss=0.9 Nsdr=0.7\n";
        let series = parse(log);
        assert_eq!(series.train_epochs, vec![1, 2]);
        assert_eq!(series.valid_epochs, vec![1, 2]);
        assert_eq!(series.train_reco, vec![None, Some(0.3)]);
        assert_eq!(series.valid_nsdr, vec![0.5, 0.7]);
        assert!(!series.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let series = parse("");
        assert!(series.is_empty());
    }

    #[test]
    fn test_parse_summary_file_missing() {
        assert!(parse_summary_file("/no/such/summary.log").is_err());
    }
}
