use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use oleander_align::{
    BandConstraint, DistanceMetric, NoiseRobustAligner, RobustConfig, SeriesAligner,
};
use oleander_io::{
    CrossingSummary, ExperimentName, ExposureReader, ResultWriter, SeriesReader,
    SimulatedSubstance,
};
use oleander_kinetics::{
    AccumulationProfile, CrossingEvent, CrossingKind, CumulativeEffectEngine, ThresholdSpec,
};

#[derive(Parser)]
#[command(name = "oleander")]
#[command(about = "Exposure time-series alignment and cumulative kinetics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Kinetic profile and threshold parameters shared by simulate and predict.
///
/// All times are in hours.
#[derive(Args, Debug, Clone)]
struct KineticsArgs {
    /// Substance ID to simulate (rows for other substances are ignored)
    #[arg(long)]
    substance: String,

    /// Elimination half-life in hours
    #[arg(long)]
    half_life: f64,

    /// Intake per unit concentration-hour of exposure
    #[arg(long, default_value_t = 1.0)]
    accumulation_rate: f64,

    /// Saturation level (switches to the saturable model when set)
    #[arg(long)]
    saturation_level: Option<f64>,

    /// Threshold level for crossing detection (no threshold if not set)
    #[arg(long)]
    threshold: Option<f64>,

    /// Delay in hours between a crossing and expected effect onset
    #[arg(long, default_value_t = 0.0)]
    onset_delay: f64,

    /// Width of the measurement-noise band as a fraction of the threshold
    #[arg(long, default_value_t = 0.1)]
    uncertainty: f64,
}

#[derive(Subcommand)]
enum Command {
    /// Align two sensor series with dynamic time warping
    Align {
        /// Path to the series CSV file (sensor_id,t0,t1,...)
        #[arg(long)]
        data: PathBuf,

        /// Sensor ID of the reference series
        #[arg(long)]
        reference: String,

        /// Sensor ID of the target series
        #[arg(long)]
        target: String,

        /// Sakoe-Chiba warping window radius (unconstrained if not set)
        #[arg(long)]
        window: Option<usize>,

        /// Point distance metric: "squared" or "absolute"
        #[arg(long, default_value = "squared")]
        metric: String,

        /// Use the noise-robust aligner (outlier suppression + smoothing)
        #[arg(long, default_value_t = false)]
        robust: bool,

        /// Outlier-detection window size for the robust aligner
        #[arg(long, default_value_t = 5)]
        window_size: usize,

        /// Z-score above which a sample counts as an outlier
        #[arg(long, default_value_t = 2.5)]
        outlier_z: f64,

        /// Smoothing window scale for the robust aligner (0 disables smoothing)
        #[arg(long, default_value_t = 3.0)]
        smoothing: f64,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Replay an exposure log through the kinetics engine
    Simulate {
        /// Path to the exposure CSV file (substance_id,timestamp,concentration,duration)
        #[arg(long)]
        exposures: PathBuf,

        #[command(flatten)]
        kinetics: KineticsArgs,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Replay an exposure log, then predict forward levels and crossings
    Predict {
        /// Path to the exposure CSV file (substance_id,timestamp,concentration,duration)
        #[arg(long)]
        exposures: PathBuf,

        #[command(flatten)]
        kinetics: KineticsArgs,

        /// Prediction horizon in hours from the last exposure
        #[arg(long)]
        horizon: f64,

        /// Comma-separated offsets (hours after the last exposure) to report levels at
        #[arg(long, value_delimiter = ',')]
        at: Vec<f64>,

        /// Simulation grid step in hours (defaults to horizon / 100)
        #[arg(long)]
        step: Option<f64>,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct AlignOutput {
    experiment: String,
    reference: String,
    target: String,
    total_distance: f64,
    path_len: usize,
    compression_ratio: f64,
    quality: f64,
    outliers_reference: usize,
    outliers_target: usize,
}

#[derive(Serialize)]
struct SimulateOutput {
    experiment: String,
    substance: String,
    exposures_replayed: usize,
    final_level: f64,
    final_timestamp: f64,
    crossings: usize,
    threshold_active: bool,
}

#[derive(Serialize)]
struct PredictOutput {
    experiment: String,
    substance: String,
    horizon: f64,
    current_level: f64,
    levels: Vec<(f64, f64)>,
    predicted_crossings: usize,
}

fn parse_metric(s: &str) -> Result<DistanceMetric> {
    match s {
        "squared" => Ok(DistanceMetric::SquaredDifference),
        "absolute" => Ok(DistanceMetric::AbsoluteDifference),
        other => anyhow::bail!("unknown metric: {other} (expected squared or absolute)"),
    }
}

fn build_profile(kinetics: &KineticsArgs) -> Result<AccumulationProfile> {
    let profile = match kinetics.saturation_level {
        Some(_) => AccumulationProfile::saturable(
            kinetics.half_life,
            kinetics.accumulation_rate,
            kinetics.saturation_level,
        )?,
        None => AccumulationProfile::first_order(kinetics.half_life, kinetics.accumulation_rate)?,
    };
    Ok(profile)
}

fn build_threshold(kinetics: &KineticsArgs) -> Result<Option<ThresholdSpec>> {
    let Some(threshold) = kinetics.threshold else {
        return Ok(None);
    };
    let spec = ThresholdSpec::new(threshold)?
        .with_onset_delay(kinetics.onset_delay)
        .with_uncertainty_fraction(kinetics.uncertainty);
    Ok(Some(spec))
}

/// Replay the exposure log rows for one substance through a fresh engine.
///
/// Returns the engine, the crossing events observed during replay, and the
/// number of rows replayed.
fn replay_exposures(
    path: &PathBuf,
    kinetics: &KineticsArgs,
) -> Result<(CumulativeEffectEngine, Vec<CrossingEvent>, usize)> {
    let records = ExposureReader::new(path)
        .read()
        .context("failed to read exposure CSV")?;

    let mut engine = CumulativeEffectEngine::new();
    engine.register_substance(
        &kinetics.substance,
        build_profile(kinetics)?,
        build_threshold(kinetics)?,
    )?;

    let mut crossings = Vec::new();
    let mut replayed = 0;
    for record in &records {
        if record.substance_id.as_str() != kinetics.substance {
            continue;
        }
        let (_, crossing) = engine.record_exposure(
            &kinetics.substance,
            record.concentration,
            record.duration,
            record.timestamp,
            BTreeMap::new(),
        )?;
        crossings.extend(crossing);
        replayed += 1;
    }
    anyhow::ensure!(
        replayed > 0,
        "no exposures for substance {} in {}",
        kinetics.substance,
        path.display()
    );
    info!(replayed, crossings = crossings.len(), "exposure log replayed");
    Ok((engine, crossings, replayed))
}

fn summarize(event: &CrossingEvent) -> CrossingSummary {
    CrossingSummary {
        substance_id: event.substance_id.clone(),
        kind: match event.kind {
            CrossingKind::Exceedance => "exceedance".to_string(),
            CrossingKind::Recovery => "recovery".to_string(),
        },
        timestamp: event.timestamp,
        level: event.level,
        threshold_value: event.threshold_value,
        expected_onset: event.expected_onset,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Align {
            data,
            reference,
            target,
            window,
            metric,
            robust,
            window_size,
            outlier_z,
            smoothing,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            let dataset = SeriesReader::new(&data)
                .read()
                .context("failed to read series CSV")?;
            let reference_series = dataset
                .find(&reference)
                .with_context(|| format!("sensor {reference} not found in {}", data.display()))?;
            let target_series = dataset
                .find(&target)
                .with_context(|| format!("sensor {target} not found in {}", data.display()))?;
            info!(
                reference = %reference,
                target = %target,
                len_reference = reference_series.len(),
                len_target = target_series.len(),
                "series loaded"
            );

            let (path, report) = if robust {
                let config = RobustConfig::new(window_size, outlier_z, smoothing)?;
                let aligner = match window {
                    Some(w) => {
                        NoiseRobustAligner::new(config).with_constraint(BandConstraint::Window(w))
                    }
                    None => NoiseRobustAligner::new(config),
                };
                let result = aligner
                    .align(reference_series.as_view(), target_series.as_view())
                    .context("robust alignment failed")?;
                (result.path, result.report)
            } else {
                let aligner = match window {
                    Some(w) => SeriesAligner::with_window(w),
                    None => SeriesAligner::unconstrained(),
                }
                .with_metric(parse_metric(&metric)?);
                let alignment = aligner
                    .align(reference_series.as_view(), target_series.as_view())
                    .context("alignment failed")?;
                let report = alignment.report(reference_series.len(), target_series.len());
                (alignment.path, report)
            };

            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            writer.write_alignment(&reference, &target, &report, &path)?;

            let output = AlignOutput {
                experiment,
                reference,
                target,
                total_distance: report.total_distance,
                path_len: report.path_len,
                compression_ratio: report.compression_ratio,
                quality: report.quality,
                outliers_reference: report.outliers_reference,
                outliers_target: report.outliers_target,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Simulate {
            exposures,
            kinetics,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;
            let (mut engine, crossings, replayed) = replay_exposures(&exposures, &kinetics)?;

            let final_level = engine.get_level(&kinetics.substance)?;
            let final_timestamp = engine
                .exposure_history(&kinetics.substance)?
                .last()
                .map_or(0.0, |e| e.timestamp);
            let threshold_active = !engine.get_active_thresholds(final_timestamp)?.is_empty();

            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            let substances = [SimulatedSubstance {
                substance_id: kinetics.substance.clone(),
                final_level,
                exposures: replayed,
            }];
            let summaries: Vec<CrossingSummary> = crossings.iter().map(summarize).collect();
            writer.write_simulation(&substances, &summaries)?;

            let output = SimulateOutput {
                experiment,
                substance: kinetics.substance,
                exposures_replayed: replayed,
                final_level,
                final_timestamp,
                crossings: crossings.len(),
                threshold_active,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            exposures,
            kinetics,
            horizon,
            at,
            step,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;
            let (engine, _, _) = replay_exposures(&exposures, &kinetics)?;

            let current_level = engine.get_level(&kinetics.substance)?;
            let last_timestamp = engine
                .exposure_history(&kinetics.substance)?
                .last()
                .map_or(0.0, |e| e.timestamp);

            // Default readout grid: ten evenly spaced points across the horizon.
            let offsets: Vec<f64> = if at.is_empty() {
                (1..=10).map(|i| horizon * f64::from(i) / 10.0).collect()
            } else {
                at
            };
            let time_points: Vec<f64> = offsets.iter().map(|o| last_timestamp + o).collect();
            let levels = engine.predict_future_levels(&kinetics.substance, &time_points, &[])?;

            let predicted =
                engine.predict_threshold_crossings(&kinetics.substance, horizon, &[], step)?;
            info!(
                current_level,
                predicted = predicted.len(),
                "forward prediction complete"
            );

            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            let summaries: Vec<CrossingSummary> = predicted.iter().map(summarize).collect();
            writer.write_prediction(&kinetics.substance, horizon, &levels, &summaries)?;

            let output = PredictOutput {
                experiment,
                substance: kinetics.substance,
                horizon,
                current_level,
                levels,
                predicted_crossings: predicted.len(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
