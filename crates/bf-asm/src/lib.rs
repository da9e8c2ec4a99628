//! bf-asm: the IWA Activated Sludge Model No. 1 for bioflow reactors.
//!
//! Provides:
//! - Temperature-corrected kinetic parameter set
//! - Stoichiometric matrix parameterized by yields and nitrogen contents
//! - The eight ASM1 process rates and the reactor mass-balance derivative
//! - An injected integrator interface plus an adaptive RKF45 implementation
//!   that drives a reactor to its local steady state

pub mod error;
pub mod integrator;
pub mod model;
pub mod params;
pub mod stoich;

// Re-exports for public API
pub use error::{AsmError, AsmResult};
pub use integrator::{Integration, ReactorIntegrator, Rkf45, Rkf45Config};
pub use model::{Asm1, ProcessRates, monod};
pub use params::KineticParams;
pub use stoich::{
    NUM_PROCESSES, R_AER_GROWTH_A, R_AER_GROWTH_H, R_AMMONIFICATION, R_ANX_GROWTH_H, R_DECAY_A,
    R_DECAY_H, R_HYDROLYSIS_X, R_HYDROLYSIS_XN, Stoichiometry,
};
