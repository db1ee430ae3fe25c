//! PNG chart rendering for training curves, test metrics, and survey runs.

use crate::metrics::MetricRecord;
use crate::summary::TrainingSeries;
use crate::testlog;
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const CHART_SIZE: (u32, u32) = (1000, 600);

const ORANGE: RGBColor = RGBColor(255, 165, 0);
const PURPLE: RGBColor = RGBColor(128, 0, 128);
const BROWN: RGBColor = RGBColor(165, 42, 42);

const INSTRUMENTS: [&str; 4] = ["drums", "bass", "other", "vocals"];
const METRIC_TYPES: [&str; 5] = ["nsdr", "sdr", "sir", "isr", "sar"];

fn chart_err<E: std::fmt::Display>(e: E) -> crate::Error {
    crate::Error::Chart(e.to_string())
}

/// Point-marker shape; medians get crosses so they stand apart from the
/// overall series sharing their color.
#[derive(Clone, Copy)]
enum Marker {
    Dot,
    Cross,
}

struct ChartSeries {
    label: String,
    color: RGBColor,
    marker: Marker,
    points: Vec<(f64, f64)>,
}

impl ChartSeries {
    fn new(label: impl Into<String>, color: RGBColor, points: Vec<(f64, f64)>) -> Self {
        Self {
            label: label.into(),
            color,
            marker: Marker::Dot,
            points,
        }
    }

    fn with_marker(mut self, marker: Marker) -> Self {
        self.marker = marker;
        self
    }
}

/// Render one line chart with legend to `path`.
///
/// Series with no points are skipped; a chart with no points at all is not
/// written (with a warning) rather than producing an empty canvas.
fn line_chart(
    path: &Path,
    caption: &str,
    x_desc: &str,
    y_desc: &str,
    series: &[ChartSeries],
) -> crate::Result<()> {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for &(x, y) in series.iter().flat_map(|s| &s.points) {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if x_min > x_max {
        log::warn!("no data for chart {}, skipping", path.display());
        return Ok(());
    }

    // Degenerate and near-degenerate ranges still need visible extent.
    let x_pad = ((x_max - x_min) * 0.05).max(0.5);
    let y_pad = ((y_max - y_min) * 0.05).max(0.05);

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min - x_pad..x_max + x_pad, y_min - y_pad..y_max + y_pad)
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()
        .map_err(chart_err)?;

    for s in series {
        if s.points.is_empty() {
            continue;
        }
        let color = s.color;
        chart
            .draw_series(LineSeries::new(
                s.points.iter().copied(),
                color.stroke_width(2),
            ))
            .map_err(chart_err)?
            .label(s.label.clone())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 14, y)], color.stroke_width(2))
            });

        match s.marker {
            Marker::Dot => {
                chart
                    .draw_series(
                        s.points
                            .iter()
                            .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
                    )
                    .map_err(chart_err)?;
            }
            Marker::Cross => {
                chart
                    .draw_series(
                        s.points
                            .iter()
                            .map(|&(x, y)| Cross::new((x, y), 4, color.stroke_width(2))),
                    )
                    .map_err(chart_err)?;
            }
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(chart_err)?;
    root.present().map_err(chart_err)?;
    Ok(())
}

fn paired(epochs: &[u32], values: &[f32]) -> Vec<(f64, f64)> {
    epochs
        .iter()
        .zip(values)
        .map(|(&e, &v)| (e as f64, v as f64))
        .collect()
}

fn paired_present(epochs: &[u32], values: &[Option<f32>]) -> Vec<(f64, f64)> {
    epochs
        .iter()
        .zip(values)
        .filter_map(|(&e, v)| v.map(|v| (e as f64, v as f64)))
        .collect()
}

/// Render the training-curve charts into `results_dir` (created if absent).
///
/// Always writes `loss.png` and `nsdr.png`; writes `reco.png` and
/// `rrepo.png` only when the corresponding training series contains at
/// least one value.
pub fn plot_training_curves(series: &TrainingSeries, results_dir: &Path) -> crate::Result<()> {
    std::fs::create_dir_all(results_dir)?;

    line_chart(
        &results_dir.join("loss.png"),
        "Loss vs. Epoch (Training/Validation)",
        "Epoch",
        "Loss",
        &[
            ChartSeries::new(
                "Train Loss",
                BLUE,
                paired(&series.train_epochs, &series.train_loss),
            ),
            ChartSeries::new(
                "Validation Loss",
                ORANGE,
                paired(&series.valid_epochs, &series.valid_loss),
            ),
        ],
    )?;

    line_chart(
        &results_dir.join("nsdr.png"),
        "Validation NSDR vs. Epoch",
        "Epoch",
        "NSDR",
        &[ChartSeries::new(
            "Validation NSDR",
            PURPLE,
            paired(&series.valid_epochs, &series.valid_nsdr),
        )],
    )?;

    if series.train_reco.iter().any(Option::is_some) {
        let mut reco = vec![ChartSeries::new(
            "Train Reco",
            GREEN,
            paired_present(&series.train_epochs, &series.train_reco),
        )];
        if series.valid_reco.iter().any(Option::is_some) {
            reco.push(ChartSeries::new(
                "Validation Reco",
                RED,
                paired_present(&series.valid_epochs, &series.valid_reco),
            ));
        }
        line_chart(
            &results_dir.join("reco.png"),
            "Reco vs. Epoch (Training/Validation)",
            "Epoch",
            "Reco",
            &reco,
        )?;
    }

    if series.train_rrepo.iter().any(Option::is_some) {
        line_chart(
            &results_dir.join("rrepo.png"),
            "Rrepo vs. Epoch (Training)",
            "Epoch",
            "Rrepo",
            &[ChartSeries::new(
                "Rrepo (Train)",
                BROWN,
                paired_present(&series.train_epochs, &series.train_rrepo),
            )],
        )?;
    }

    Ok(())
}

fn metric_color(metric: &str) -> RGBColor {
    match metric {
        "nsdr" => RED,
        "sdr" => BLUE,
        "sir" => GREEN,
        "isr" => PURPLE,
        _ => ORANGE,
    }
}

/// Render one `test_metrics_{instrument}.png` per instrument from a set of
/// test-result files tagged with their checkpoint epoch.
///
/// Files that parse to an empty map are skipped; if nothing parses, no
/// charts are written.
pub fn plot_test_metrics(test_files: &[(PathBuf, u32)], results_dir: &Path) -> crate::Result<()> {
    std::fs::create_dir_all(results_dir)?;

    let mut test_data: Vec<(u32, BTreeMap<String, f64>)> = test_files
        .iter()
        .map(|(path, epoch)| (*epoch, testlog::parse_test_file(path)))
        .filter(|(_, metrics)| !metrics.is_empty())
        .collect();
    test_data.sort_by_key(|&(epoch, _)| epoch);

    if test_data.is_empty() {
        log::warn!("no test data found, skipping test-metric charts");
        return Ok(());
    }

    for inst in INSTRUMENTS {
        let mut series = Vec::new();
        for metric in METRIC_TYPES {
            let color = metric_color(metric);

            let overall_key = format!("{metric}_{inst}");
            let overall: Vec<(f64, f64)> = test_data
                .iter()
                .filter_map(|(epoch, m)| m.get(&overall_key).map(|&v| (*epoch as f64, v)))
                .collect();
            if !overall.is_empty() {
                series.push(ChartSeries::new(format!("{metric} (overall)"), color, overall));
            }

            let med_key = format!("{metric}_med_{inst}");
            let med: Vec<(f64, f64)> = test_data
                .iter()
                .filter_map(|(epoch, m)| m.get(&med_key).map(|&v| (*epoch as f64, v)))
                .collect();
            if !med.is_empty() {
                series.push(
                    ChartSeries::new(format!("{metric} (med)"), color, med)
                        .with_marker(Marker::Cross),
                );
            }
        }

        line_chart(
            &results_dir.join(format!("test_metrics_{inst}.png")),
            &format!("Test Metrics for {inst}"),
            "Epoch (Test Checkpoint)",
            "Metric Value",
            &series,
        )?;
    }

    Ok(())
}

/// Render the multi-run comparison charts for the batch survey driver:
/// `hnr.png`, `hpr.png`, and `reconstruction_loss.png`, one point per test
/// identifier.
pub fn plot_survey(
    test_ids: &[u32],
    records: &[MetricRecord],
    results_dir: &Path,
) -> crate::Result<()> {
    std::fs::create_dir_all(results_dir)?;

    let collect = |key: &str| -> Vec<(f64, f64)> {
        test_ids
            .iter()
            .zip(records)
            .filter_map(|(&id, record)| record.get(key).map(|v| (id as f64, v)))
            .collect()
    };

    line_chart(
        &results_dir.join("hnr.png"),
        "HNR Values",
        "Test Number",
        "HNR (dB)",
        &[
            ChartSeries::new("Drums HNR", BLUE, collect("HNR_drums")),
            ChartSeries::new("Bass HNR", ORANGE, collect("HNR_bass")),
            ChartSeries::new("Vocals HNR", GREEN, collect("HNR_vocals")),
        ],
    )?;

    line_chart(
        &results_dir.join("hpr.png"),
        "HPR Values",
        "Test Number",
        "HPR (dB)",
        &[
            ChartSeries::new("Drums HPR", BLUE, collect("HPR_drums")),
            ChartSeries::new("Bass HPR", ORANGE, collect("HPR_bass")),
            ChartSeries::new("Vocals HPR", GREEN, collect("HPR_vocals")),
        ],
    )?;

    line_chart(
        &results_dir.join("reconstruction_loss.png"),
        "Reconstruction Loss",
        "Test Number",
        "Loss",
        &[ChartSeries::new(
            "Reconstruction Loss",
            RED,
            collect("reconstruction_loss"),
        )],
    )?;

    Ok(())
}
