use clap::Parser;
use std::path::PathBuf;
use stemscope::metrics::{compute_hnr, reconstruction_loss, HnrConfig};

/// Compute HNR/HPR and reconstruction loss for one separation run.
#[derive(Parser)]
#[command(name = "stem_metrics")]
#[command(about = "Acoustic quality metrics for separated stems")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Directory with separated stems (drums.wav, bass.wav, other.wav, vocals.wav)
    separated_dir: PathBuf,

    /// Original mixture file
    mixture_file: PathBuf,

    /// Energy-gate threshold in (0, 1); 0 disables gating
    #[arg(long, default_value_t = 0.0)]
    calc_energy: f32,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let base = HnrConfig::new().with_energy_threshold(cli.calc_energy);

    let drums = compute_hnr(
        cli.separated_dir.join("drums.wav"),
        &base.clone().with_percussive(true),
    )?;
    let bass = compute_hnr(cli.separated_dir.join("bass.wav"), &base)?;
    let vocals = compute_hnr(cli.separated_dir.join("vocals.wav"), &base)?;

    let loss = reconstruction_loss(&cli.separated_dir, &cli.mixture_file)?;

    println!("average HNR for drums: {}, HPR: {}", drums.hnr, drums.hpr_db);
    println!("average HNR for bass: {}, HPR: {}", bass.hnr, bass.hpr_db);
    println!("average HNR for vocals: {}, HPR: {}", vocals.hnr, vocals.hpr_db);
    println!("Reconstruction loss: {loss}");

    Ok(())
}
