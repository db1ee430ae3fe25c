//! Offline quality analysis for music source separation.
//!
//! Stemscope evaluates separation runs from two angles: acoustic metrics
//! computed on the separated stem files themselves, and charts rendered
//! from the plain-text logs a training run leaves behind.
//!
//! # Acoustic metrics
//!
//! [`metrics::reconstruction_loss`] measures how much of the original
//! mixture is left unexplained after subtracting every stem, and
//! [`metrics::compute_hnr`] reports a per-stem Harmonics-to-Noise Ratio and
//! Harmonic-to-Percussive Ratio, optionally after gating out low-energy
//! samples.
//!
//! # Log-to-chart pipeline
//!
//! [`summary::parse_summary_file`] extracts per-epoch loss/Reco/Rrepo/NSDR
//! series from a training log, [`testlog::parse_test_file`] reads the
//! metrics map a test checkpoint dumps, and [`chart`] renders both as PNG
//! line charts.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`io`] | Mono audio loading, resampling, WAV export |
//! | [`spectrum`] | Hann-windowed STFT |
//! | [`hpss`] | Harmonic/percussive separation and HPR |
//! | [`gate`] | RMS energy gating |
//! | [`harmonicity`] | Frame-wise HNR estimation |
//! | [`metrics`] | Reconstruction loss and per-stem HNR/HPR |
//! | [`summary`] | Training-summary log parsing |
//! | [`testlog`] | Test-result metrics-map parsing |
//! | [`chart`] | PNG chart rendering |
//!
//! # Error Handling
//!
//! Fallible operations return [`Result<T>`], an alias for
//! `std::result::Result<T, Error>`. Audio and file errors propagate;
//! malformed log lines are skipped and unparsable test files degrade to
//! empty maps.

#![forbid(unsafe_code)]

pub mod error;
pub use error::{Error, Result};

pub mod chart;
pub mod gate;
pub mod harmonicity;
pub mod hpss;
pub mod io;
pub mod metrics;
pub mod spectrum;
pub mod summary;
pub mod testlog;
