//! bf-plant: the process flow diagram of a treatment plant.
//!
//! Provides:
//! - Process unit state (kinds, branches, flow-data-source tags)
//! - The arena-style `Plant` graph with connection, setter, flow-balance and
//!   discharge operations
//! - Clarifier solids split and influent quality fractionation
//! - Topology validation with an evaluation schedule for the solver

pub mod error;
pub mod influent;
pub mod plant;
pub mod unit;
pub mod validate;

pub(crate) mod settle;

// Re-exports for public API
pub use error::{PlantError, PlantResult};
pub use influent::InfluentQuality;
pub use plant::Plant;
pub use unit::{Branch, FlowDataSource, Unit, UnitKind};
pub use validate::{PfdError, PfdReport, check};
