//! bf-core: stable foundation for bioflow.
//!
//! Contains:
//! - comps (the ASM1 component vector + composite measures)
//! - numeric (Real + tolerances + float helpers)
//! - ids (stable compact IDs for process units)
//! - error (shared error types)

pub mod comps;
pub mod error;
pub mod ids;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use comps::*;
pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
