use clap::Parser;
use std::path::PathBuf;
use stemscope::{chart, summary};

/// Render training curves and test-metric charts from run logs.
#[derive(Parser)]
#[command(name = "plot_results")]
#[command(about = "Plot training curves and test metrics from separation logs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Training summary log
    #[arg(long)]
    summary: PathBuf,

    /// Test-result file with its checkpoint epoch, as `path:epoch` (repeatable)
    #[arg(long = "test", value_parser = parse_test_spec)]
    tests: Vec<(PathBuf, u32)>,

    /// Output directory for the rendered charts
    #[arg(long, default_value = "results")]
    results_dir: PathBuf,
}

fn parse_test_spec(s: &str) -> Result<(PathBuf, u32), String> {
    let (path, epoch) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected `path:epoch`, got `{s}`"))?;
    let epoch = epoch
        .parse::<u32>()
        .map_err(|e| format!("bad epoch in `{s}`: {e}"))?;
    Ok((PathBuf::from(path), epoch))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let series = summary::parse_summary_file(&cli.summary)?;
    if series.is_empty() {
        log::warn!("no summary lines found in {}", cli.summary.display());
    }
    chart::plot_training_curves(&series, &cli.results_dir)?;

    if !cli.tests.is_empty() {
        chart::plot_test_metrics(&cli.tests, &cli.results_dir)?;
    }

    Ok(())
}
