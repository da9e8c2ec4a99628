//! bf-solver: steady-state driver for the plant flow network.
//!
//! Given a validated plant, the solver assigns a flow data source to every
//! branch of every unit (forward and backward propagation), seeds the plant
//! from a single hypothetical-CSTR approximation, then iterates waste-flow
//! control, backward flow resolution and a breadth-first traversal until the
//! whole network reaches a fixed point.

pub mod error;
pub mod resolve;
pub mod seed;
pub mod steady;

// Re-exports for public API
pub use error::{SolverError, SolverResult};
pub use resolve::{BackwardReport, backward_set_flow, forward_set_flow};
pub use seed::{initial_guess, min_oxic_srt_autotrophs, min_oxic_srt_heterotrophs};
pub use steady::{SteadyConfig, SteadyState, UnitState, get_steady_state};
