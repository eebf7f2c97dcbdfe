//! JSON result writer for alignment and simulation outputs.

use std::fs;
use std::path::{Path, PathBuf};

use oleander_align::{AlignmentReport, WarpingPath};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::ExperimentName;
use crate::IoError;

/// One simulated substance for the simulation artifact.
///
/// Plain-data input struct so the writer has no dependency on
/// `oleander-kinetics`.
#[derive(Debug, Clone, Serialize)]
pub struct SimulatedSubstance {
    /// The simulated substance.
    pub substance_id: String,
    /// Level at the end of the replay.
    pub final_level: f64,
    /// Number of exposures replayed.
    pub exposures: usize,
}

/// One threshold crossing for the simulation or prediction artifact.
#[derive(Debug, Clone, Serialize)]
pub struct CrossingSummary {
    /// The substance whose level crossed.
    pub substance_id: String,
    /// "exceedance" or "recovery".
    pub kind: String,
    /// When the crossing happened (or is predicted).
    pub timestamp: f64,
    /// Level at the crossing.
    pub level: f64,
    /// The configured threshold.
    pub threshold_value: f64,
    /// Expected effect onset, for exceedances.
    pub expected_onset: Option<f64>,
}

/// Writes alignment and simulation results to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_alignment.json`,
/// `{experiment}_simulation.json`, and `{experiment}_prediction.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    fn write_json<T: Serialize>(&self, suffix: &str, artifact: &T) -> Result<PathBuf, IoError> {
        let path = self
            .output_dir
            .join(format!("{}_{suffix}.json", self.experiment.as_str()));
        let json = serde_json::to_string_pretty(artifact).expect("serialization cannot fail");
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    /// Write an alignment result to `{experiment}_alignment.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_alignment(
        &self,
        reference: &str,
        target: &str,
        report: &AlignmentReport,
        path: &WarpingPath,
    ) -> Result<(), IoError> {
        let steps: Vec<(usize, usize)> =
            path.steps().iter().map(|s| (s.reference, s.target)).collect();

        let artifact = AlignmentArtifact {
            experiment: self.experiment.as_str(),
            reference,
            target,
            total_distance: report.total_distance,
            path_len: report.path_len,
            compression_ratio: report.compression_ratio,
            quality: report.quality,
            outliers_reference: report.outliers_reference,
            outliers_target: report.outliers_target,
            path: steps,
        };

        let path = self.write_json("alignment", &artifact)?;
        info!(path = %path.display(), "alignment result written");
        Ok(())
    }

    /// Write a simulation result to `{experiment}_simulation.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_simulation(
        &self,
        substances: &[SimulatedSubstance],
        crossings: &[CrossingSummary],
    ) -> Result<(), IoError> {
        let artifact = SimulationArtifact {
            experiment: self.experiment.as_str(),
            substances,
            crossings,
        };
        let path = self.write_json("simulation", &artifact)?;
        info!(path = %path.display(), "simulation result written");
        Ok(())
    }

    /// Write a prediction result to `{experiment}_prediction.json`.
    ///
    /// `levels` holds `(time, level)` pairs from the forward simulation.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_prediction(
        &self,
        substance_id: &str,
        horizon: f64,
        levels: &[(f64, f64)],
        crossings: &[CrossingSummary],
    ) -> Result<(), IoError> {
        let artifact = PredictionArtifact {
            experiment: self.experiment.as_str(),
            substance_id,
            horizon,
            levels,
            crossings,
        };
        let path = self.write_json("prediction", &artifact)?;
        info!(path = %path.display(), "prediction result written");
        Ok(())
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct AlignmentArtifact<'a> {
    experiment: &'a str,
    reference: &'a str,
    target: &'a str,
    total_distance: f64,
    path_len: usize,
    compression_ratio: f64,
    quality: f64,
    outliers_reference: usize,
    outliers_target: usize,
    path: Vec<(usize, usize)>,
}

#[derive(Serialize)]
struct SimulationArtifact<'a> {
    experiment: &'a str,
    substances: &'a [SimulatedSubstance],
    crossings: &'a [CrossingSummary],
}

#[derive(Serialize)]
struct PredictionArtifact<'a> {
    experiment: &'a str,
    substance_id: &'a str,
    horizon: f64,
    levels: &'a [(f64, f64)],
    crossings: &'a [CrossingSummary],
}

#[cfg(test)]
mod tests {
    use super::*;
    use oleander_align::{SeriesAligner, TimeSeries};
    use tempfile::TempDir;

    fn aligned() -> (AlignmentReport, WarpingPath) {
        let a = TimeSeries::new(vec![1.0, 2.0, 3.0]).unwrap();
        let b = TimeSeries::new(vec![1.0, 2.0, 3.0]).unwrap();
        let alignment = SeriesAligner::unconstrained()
            .align(a.as_view(), b.as_view())
            .unwrap();
        let report = alignment.report(3, 3);
        (report, alignment.path)
    }

    #[test]
    fn write_alignment_json_structure() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("test_run".into()).unwrap();
        let writer = ResultWriter::new(dir.path(), experiment).unwrap();

        let (report, path) = aligned();
        writer.write_alignment("badge-a", "badge-b", &report, &path).unwrap();

        let out = dir.path().join("test_run_alignment.json");
        assert!(out.exists());

        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(content["experiment"], "test_run");
        assert_eq!(content["reference"], "badge-a");
        assert_eq!(content["total_distance"], 0.0);
        assert_eq!(content["path_len"], 3);
        assert_eq!(content["path"].as_array().unwrap().len(), 3);
        assert_eq!(content["quality"], 1.0);
    }

    #[test]
    fn write_simulation_json_structure() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("sim_run".into()).unwrap();
        let writer = ResultWriter::new(dir.path(), experiment).unwrap();

        let substances = [SimulatedSubstance {
            substance_id: "toluene".into(),
            final_level: 2.5,
            exposures: 3,
        }];
        let crossings = [CrossingSummary {
            substance_id: "toluene".into(),
            kind: "exceedance".into(),
            timestamp: 8.0,
            level: 10.75,
            threshold_value: 10.0,
            expected_onset: Some(9.0),
        }];
        writer.write_simulation(&substances, &crossings).unwrap();

        let out = dir.path().join("sim_run_simulation.json");
        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(content["substances"][0]["substance_id"], "toluene");
        assert_eq!(content["crossings"][0]["kind"], "exceedance");
        assert_eq!(content["crossings"][0]["expected_onset"], 9.0);
    }

    #[test]
    fn write_prediction_creates_nested_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("deep");
        let experiment = ExperimentName::new("pred".into()).unwrap();
        let writer = ResultWriter::new(&nested, experiment).unwrap();

        writer
            .write_prediction("toluene", 24.0, &[(1.0, 5.0), (2.0, 2.5)], &[])
            .unwrap();
        let out = nested.join("pred_prediction.json");
        assert!(out.exists());

        let content: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(content["horizon"], 24.0);
        assert_eq!(content["levels"].as_array().unwrap().len(), 2);
        assert!(content["crossings"].as_array().unwrap().is_empty());
    }
}
