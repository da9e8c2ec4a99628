//! Error types for the steady-state solver.

use bf_plant::{PfdError, PlantError};
use thiserror::Error;

/// Errors that stop a solver run.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("topology is not ready: {}", format_errors(.errors))]
    Topology { errors: Vec<PfdError> },

    #[error("plant has no influent")]
    NoInfluent,

    #[error("plant has no effluent")]
    NoEffluent,

    #[error("{unit}: {count} upstream dischargers still have undetermined flows")]
    AmbiguousInflow { unit: String, count: usize },

    #[error("units unreachable from the influent: {}", .units.join(", "))]
    Unreachable { units: Vec<String> },

    #[error(transparent)]
    Plant(#[from] PlantError),
}

fn format_errors(errors: &[PfdError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type SolverResult<T> = Result<T, SolverError>;
