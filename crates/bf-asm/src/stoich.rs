//! The ASM1 stoichiometric matrix.

use crate::params::KineticParams;
use bf_core::comps::{
    CompVec, NUM_COMPONENTS, S_ALK, S_DO, S_NH, S_NO, S_NS, S_S, X_BA, X_BH, X_D, X_NS, X_S,
};
use bf_core::Real;
use nalgebra::{SMatrix, SVector};

/// Number of ASM1 process rates.
pub const NUM_PROCESSES: usize = 8;

/// Aerobic growth of heterotrophs.
pub const R_AER_GROWTH_H: usize = 0;
/// Anoxic growth of heterotrophs.
pub const R_ANX_GROWTH_H: usize = 1;
/// Aerobic growth of autotrophs.
pub const R_AER_GROWTH_A: usize = 2;
/// Death and lysis of heterotrophs.
pub const R_DECAY_H: usize = 3;
/// Death and lysis of autotrophs.
pub const R_DECAY_A: usize = 4;
/// Ammonification of soluble organic nitrogen.
pub const R_AMMONIFICATION: usize = 5;
/// Hydrolysis of slowly biodegradable COD.
pub const R_HYDROLYSIS_X: usize = 6;
/// Hydrolysis of particulate organic nitrogen.
pub const R_HYDROLYSIS_XN: usize = 7;

/// Oxygen equivalent of nitrate nitrogen, gO2/gN.
const NOX_O2_EQUIV: Real = 2.86;

/// Oxygen demand of full nitrification, gO2/gN.
const NIT_O2_DEMAND: Real = 4.57;

/// Stoichiometric coefficients relating process rates to component
/// production/consumption.
///
/// Row = process, column = component. Mostly zero; rebuilt whenever the
/// kinetic parameter set changes (yields and nitrogen contents enter the
/// coefficients).
#[derive(Clone, Debug, PartialEq)]
pub struct Stoichiometry {
    coeffs: SMatrix<Real, NUM_PROCESSES, NUM_COMPONENTS>,
}

impl Stoichiometry {
    /// Build the matrix from a kinetic parameter set.
    pub fn from_params(p: &KineticParams) -> Self {
        let mut m = SMatrix::<Real, NUM_PROCESSES, NUM_COMPONENTS>::zeros();

        // Dissolved oxygen, as O2
        m[(R_AER_GROWTH_H, S_DO)] = (p.y_h - 1.0) / p.y_h;
        m[(R_AER_GROWTH_A, S_DO)] = (p.y_a - NIT_O2_DEMAND) / p.y_a;

        // Readily biodegradable COD
        m[(R_AER_GROWTH_H, S_S)] = -1.0 / p.y_h;
        m[(R_ANX_GROWTH_H, S_S)] = -1.0 / p.y_h;
        m[(R_HYDROLYSIS_X, S_S)] = 1.0;

        // Ammonia nitrogen
        m[(R_AER_GROWTH_H, S_NH)] = -p.i_n_xb;
        m[(R_ANX_GROWTH_H, S_NH)] = -p.i_n_xb;
        m[(R_AER_GROWTH_A, S_NH)] = -p.i_n_xb - 1.0 / p.y_a;
        m[(R_AMMONIFICATION, S_NH)] = 1.0;

        // Soluble organic nitrogen
        m[(R_AMMONIFICATION, S_NS)] = -1.0;
        m[(R_HYDROLYSIS_XN, S_NS)] = 1.0;

        // Nitrite/nitrate nitrogen
        m[(R_ANX_GROWTH_H, S_NO)] = (p.y_h - 1.0) / (NOX_O2_EQUIV * p.y_h);
        m[(R_AER_GROWTH_A, S_NO)] = 1.0 / p.y_a;

        // Alkalinity, mM as CaCO3
        m[(R_AER_GROWTH_H, S_ALK)] = -p.i_n_xb / 14.0;
        m[(R_ANX_GROWTH_H, S_ALK)] =
            (1.0 - p.y_h) / (14.0 * NOX_O2_EQUIV * p.y_h) - p.i_n_xb / 14.0;
        m[(R_AER_GROWTH_A, S_ALK)] = -p.i_n_xb / 14.0 - 1.0 / (7.0 * p.y_a);
        m[(R_AMMONIFICATION, S_ALK)] = 1.0 / 14.0;

        // Slowly biodegradable COD
        m[(R_DECAY_H, X_S)] = 1.0 - p.f_d;
        m[(R_DECAY_A, X_S)] = 1.0 - p.f_d;
        m[(R_HYDROLYSIS_X, X_S)] = -1.0;

        // Heterotrophic biomass
        m[(R_AER_GROWTH_H, X_BH)] = 1.0;
        m[(R_ANX_GROWTH_H, X_BH)] = 1.0;
        m[(R_DECAY_H, X_BH)] = -1.0;

        // Autotrophic biomass
        m[(R_AER_GROWTH_A, X_BA)] = 1.0;
        m[(R_DECAY_A, X_BA)] = -1.0;

        // Biomass debris
        m[(R_DECAY_H, X_D)] = p.f_d;
        m[(R_DECAY_A, X_D)] = p.f_d;

        // Particulate organic nitrogen
        m[(R_DECAY_H, X_NS)] = p.i_n_xb - p.f_d * p.i_n_xd;
        m[(R_DECAY_A, X_NS)] = p.i_n_xb - p.f_d * p.i_n_xd;
        m[(R_HYDROLYSIS_XN, X_NS)] = -1.0;

        Self { coeffs: m }
    }

    /// Coefficient for one (process, component) pair.
    pub fn coeff(&self, process: usize, component: usize) -> Real {
        self.coeffs[(process, component)]
    }

    /// Fold a vector of process rates into per-component production rates.
    pub fn production(&self, rates: &SVector<Real, NUM_PROCESSES>) -> CompVec {
        self.coeffs.transpose() * rates
    }
}
