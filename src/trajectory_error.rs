//! Error handling for trajectory requests and problem files

use std::io;

/// Unified error for configuration problems detected before any numeric work,
/// reference path failures and problem file processing.
///
/// Note that an infeasible or non-converging quadratic program is not an error,
/// it is reported through `TrajectoryResult::success`.
#[derive(Debug)]
pub enum TrajectoryError {
    IoError(io::Error),
    ParseError(String),
    InvalidLength { expected: usize, found: usize },
    InvalidWeight(f64),
    InvalidDuration(f64),
    InconsistentConstraints(String),
    InvalidConfiguration(String),
    PathEvaluation(anyhow::Error),
}

impl std::fmt::Display for TrajectoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            TrajectoryError::IoError(ref err) =>
                write!(f, "IO Error: {}", err),
            TrajectoryError::ParseError(ref msg) =>
                write!(f, "Parse Error: {}", msg),
            TrajectoryError::InvalidLength { expected, found } =>
                write!(f, "Invalid Length: expected {}, found {}", expected, found),
            TrajectoryError::InvalidWeight(w) =>
                write!(f, "Distance weight must be between 0 and 1, got {}", w),
            TrajectoryError::InvalidDuration(t) =>
                write!(f, "Trajectory duration must be positive and finite, got {}", t),
            TrajectoryError::InconsistentConstraints(ref msg) =>
                write!(f, "Inconsistent boundary constraints: {}", msg),
            TrajectoryError::InvalidConfiguration(ref msg) =>
                write!(f, "Invalid configuration: {}", msg),
            TrajectoryError::PathEvaluation(ref err) =>
                write!(f, "Reference path evaluation failed: {:#}", err),
        }
    }
}

impl std::error::Error for TrajectoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrajectoryError::IoError(err) => Some(err),
            TrajectoryError::PathEvaluation(err) => Some(&**err),
            _ => None,
        }
    }
}

impl From<io::Error> for TrajectoryError {
    fn from(err: io::Error) -> Self {
        TrajectoryError::IoError(err)
    }
}
