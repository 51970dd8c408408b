//! The run summary: status, errors, and headline analysis results.

use crate::error::{SimulationError, ValidationError};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Outcome of a simulation run.
///
/// `ValidationError` is sticky: once set it is never downgraded by a
/// later simulation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The run completed and produced results.
    Success,
    /// The configuration or scene was rejected before tracing.
    ValidationError,
    /// Tracing failed part-way.
    SimulationError,
    /// Nothing has been recorded yet.
    Unknown,
}

/// Headline figures of a run. Zero-valued fields are omitted from the
/// JSON so partial summaries stay compact.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AnalysisResults {
    /// Initial time-delay gap, milliseconds.
    #[serde(rename = "ITD", skip_serializing_if = "is_zero")]
    pub itd_ms: f64,
    /// Early-reflection energy over the analysis window, averaged over
    /// all shots.
    #[serde(rename = "avg_energy_over_window", skip_serializing_if = "is_zero")]
    pub avg_energy_over_window: f64,
    /// X coordinate of the listening position, meters.
    #[serde(rename = "listen_pos_x", skip_serializing_if = "is_zero")]
    pub listen_pos_x: f64,
    /// Room volume, cubic meters.
    #[serde(rename = "volume", skip_serializing_if = "is_zero")]
    pub volume: f64,
    /// Sabine reverberation time, seconds.
    #[serde(rename = "T60_sabine", skip_serializing_if = "is_zero")]
    pub t60_sabine: f64,
    /// Eyring reverberation time, seconds.
    #[serde(rename = "T60_eyering", skip_serializing_if = "is_zero")]
    pub t60_eyring: f64,
    /// Schroeder frequency, Hz.
    #[serde(rename = "schroeder_freq", skip_serializing_if = "is_zero")]
    pub schroeder_freq: f64,
}

fn is_zero(value: &f64) -> bool { *value == 0.0 }

/// The summary record written alongside the annotations.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    /// Run status.
    pub status: Status,
    /// Accumulated error strings, machine tag first.
    pub errors: Vec<String>,
    /// Analysis results; zero fields are omitted.
    pub results: AnalysisResults,
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            status: Status::Unknown,
            errors: Vec::new(),
            results: AnalysisResults::default(),
        }
    }
}

impl Summary {
    /// A fresh summary with `unknown` status.
    pub fn new() -> Self { Self::default() }

    /// Marks the run successful, unless an error status was recorded.
    pub fn mark_success(&mut self) {
        if self.status == Status::Unknown {
            self.status = Status::Success;
        }
    }

    /// Records a validation error. Validation always takes precedence.
    pub fn add_validation_error(&mut self, err: &ValidationError) {
        self.status = Status::ValidationError;
        self.errors.push(err.tag().to_string());
        self.errors.push(err.to_string());
    }

    /// Records a simulation error; does not overwrite a validation
    /// status.
    pub fn add_simulation_error(&mut self, err: &SimulationError) {
        if self.status != Status::ValidationError {
            self.status = Status::SimulationError;
        }
        self.errors.push(err.tag().to_string());
        self.errors.push(err.to_string());
    }

    /// Serializes the summary to pretty-printed JSON at `path`.
    pub fn save(&self, path: &Path) -> Result<(), crate::Error> {
        let mut file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(&mut file, self)?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomtrace_core::math::Vec3;

    fn validation() -> ValidationError {
        ValidationError::SpeakerOutsideRoom {
            speaker: "left".into(),
            vertex: Vec3::ZERO,
            obstruction: None,
        }
    }

    fn simulation() -> SimulationError {
        SimulationError::NonTerminatingRay {
            origin: Vec3::ZERO,
            direction: Vec3::X,
        }
    }

    #[test]
    fn validation_error_is_sticky() {
        let mut summary = Summary::new();
        summary.add_simulation_error(&simulation());
        summary.add_validation_error(&validation());
        assert_eq!(summary.status, Status::ValidationError);

        let mut summary = Summary::new();
        summary.add_validation_error(&validation());
        summary.add_simulation_error(&simulation());
        assert_eq!(summary.status, Status::ValidationError);
        assert!(summary.errors.contains(&"speaker_outside_room".to_string()));
    }

    #[test]
    fn success_does_not_mask_errors() {
        let mut summary = Summary::new();
        summary.add_simulation_error(&simulation());
        summary.mark_success();
        assert_eq!(summary.status, Status::SimulationError);

        let mut summary = Summary::new();
        summary.mark_success();
        assert_eq!(summary.status, Status::Success);
    }

    #[test]
    fn zero_results_are_omitted() {
        let summary = Summary {
            status: Status::Success,
            errors: vec![],
            results: AnalysisResults {
                itd_ms: 1.25,
                volume: 62.0,
                ..Default::default()
            },
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["results"]["ITD"], 1.25);
        assert_eq!(value["results"]["volume"], 62.0);
        assert!(value["results"].get("T60_sabine").is_none());
        assert!(value["results"].get("schroeder_freq").is_none());
    }
}
