use clap::Parser;
use std::path::PathBuf;
use stemscope::metrics::{compute_hnr, reconstruction_loss, HnrConfig, MetricRecord};
use stemscope::chart;

/// Batch driver: run the acoustic metrics over a list of test cases and
/// render multi-run comparison charts.
#[derive(Parser)]
#[command(name = "stem_survey")]
#[command(about = "Survey acoustic metrics across separation test cases")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Root directory holding one `test{N}` stem directory per case
    #[arg(long)]
    separated_root: PathBuf,

    /// Root directory holding one `test{N}.{ext}` mixture file per case
    #[arg(long)]
    mixture_root: PathBuf,

    /// Test identifiers to analyze, e.g. `1,2,3`
    #[arg(long, value_delimiter = ',', required = true)]
    tests: Vec<u32>,

    /// Mixture file extension
    #[arg(long, default_value = "mp3")]
    mixture_ext: String,

    /// Energy-gate threshold in (0, 1); 0 disables gating
    #[arg(long, default_value_t = 0.01)]
    energy_threshold: f32,

    /// Output directory for the comparison charts
    #[arg(long, default_value = "results")]
    results_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let base = HnrConfig::new().with_energy_threshold(cli.energy_threshold);
    let mut records = Vec::with_capacity(cli.tests.len());

    for &id in &cli.tests {
        log::info!("processing test {id}...");
        let separated_dir = cli.separated_root.join(format!("test{id}"));
        let mixture_file = cli
            .mixture_root
            .join(format!("test{id}.{}", cli.mixture_ext));

        let mut record = MetricRecord::new();
        record.set_stem(
            "drums",
            compute_hnr(
                separated_dir.join("drums.wav"),
                &base.clone().with_percussive(true),
            )?,
        );
        record.set_stem("bass", compute_hnr(separated_dir.join("bass.wav"), &base)?);
        record.set_stem(
            "vocals",
            compute_hnr(separated_dir.join("vocals.wav"), &base)?,
        );
        record.set(
            "reconstruction_loss",
            reconstruction_loss(&separated_dir, &mixture_file)?,
        );
        records.push(record);
    }

    log::info!("done testing, plotting results...");
    chart::plot_survey(&cli.tests, &records, &cli.results_dir)?;

    Ok(())
}
