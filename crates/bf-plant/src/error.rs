//! Error types for plant construction and operation.

use bf_asm::AsmError;
use bf_core::Real;
use thiserror::Error;

/// Errors raised while building or updating a plant.
///
/// Setter errors follow a reject-and-report policy: the call fails and the
/// unit's prior state is left unchanged.
#[derive(Error, Debug)]
pub enum PlantError {
    #[error("{unit}: inlet is not a connectable branch")]
    InvalidBranch { unit: String },

    #[error("{unit}: influent units cannot receive flow")]
    InfluentCannotReceive { unit: String },

    #[error("{unit}: cannot discharge into itself")]
    SelfConnection { unit: String },

    #[error("{unit}: has no sidestream")]
    NoSidestream { unit: String },

    #[error("{unit}: discharger {discharger} not found in inlet")]
    UnknownDischarger { unit: String, discharger: String },

    #[error("{unit}: flow {value} m3/d must not be negative")]
    NegativeFlow { unit: String, value: Real },

    #[error("{unit}: design flow {value} m3/d must be positive")]
    NonPositiveDesignFlow { unit: String, value: Real },

    #[error("{unit}: active volume {value} m3 must be positive")]
    NonPositiveVolume { unit: String, value: Real },

    #[error("{unit}: capture rate {value} must lie strictly between 0 and 1")]
    CaptureRateOutOfRange { unit: String, value: Real },

    #[error("{unit}: operation requires a splitter")]
    NotASplitter { unit: String },

    #[error("{unit}: operation requires a reactor")]
    NotAReactor { unit: String },

    #[error("{unit}: operation requires a final clarifier")]
    NotAClarifier { unit: String },

    #[error("{unit}: operation requires an influent")]
    NotAnInfluent { unit: String },

    #[error("{unit}: main outlet is not connected")]
    MainOutletMissing { unit: String },

    #[error("{unit}: side outlet is not connected")]
    SideOutletMissing { unit: String },

    #[error("{unit}: cannot integrate a reactor with no inflow")]
    NoFlow { unit: String },

    #[error("model error: {0}")]
    Model(#[from] AsmError),
}

pub type PlantResult<T> = Result<T, PlantError>;
