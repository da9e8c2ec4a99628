//! Error types for the biokinetic model.

use bf_core::Real;
use thiserror::Error;

/// Errors raised by model configuration and integration.
#[derive(Error, Debug, Clone)]
pub enum AsmError {
    #[error("Temperature {value} degC is below the model floor of {floor} degC")]
    TemperatureTooLow { value: Real, floor: Real },

    #[error("Dissolved oxygen {value} mg/L is negative")]
    NegativeOxygen { value: Real },

    #[error("Non-physical value: {what}")]
    NonPhysical { what: &'static str },
}

pub type AsmResult<T> = Result<T, AsmError>;
