//! The ASM1 model component vector and its composite measures.
//!
//! Every stream in the plant carries the same ordered 13-slot vector of
//! concentrations. All crates index it with the constants below; changing the
//! slot order is a breaking change for the whole workspace.
//!
//! Units are mg/L except alkalinity (mM as CaCO3). Flows are m3/d.

use crate::numeric::Real;
use nalgebra::SVector;

/// Number of ASM1 model components.
pub const NUM_COMPONENTS: usize = 13;

/// Dissolved oxygen (held at an external setpoint in reactors).
pub const S_DO: usize = 0;
/// Soluble inert COD.
pub const S_I: usize = 1;
/// Readily biodegradable (soluble) substrate COD.
pub const S_S: usize = 2;
/// Ammonia nitrogen.
pub const S_NH: usize = 3;
/// Soluble biodegradable organic nitrogen.
pub const S_NS: usize = 4;
/// Nitrite + nitrate nitrogen.
pub const S_NO: usize = 5;
/// Alkalinity, mM as CaCO3.
pub const S_ALK: usize = 6;
/// Particulate inert COD.
pub const X_I: usize = 7;
/// Slowly biodegradable (particulate) substrate COD.
pub const X_S: usize = 8;
/// Active heterotrophic biomass COD.
pub const X_BH: usize = 9;
/// Active autotrophic biomass COD.
pub const X_BA: usize = 10;
/// Biomass debris COD.
pub const X_D: usize = 11;
/// Particulate biodegradable organic nitrogen.
pub const X_NS: usize = 12;

/// A stream's model component concentrations.
///
/// `Copy` on purpose: crossing a unit boundary always copies, so a later
/// mutation of one unit's outlet can never corrupt a neighbour's inlet.
pub type CompVec = SVector<Real, NUM_COMPONENTS>;

/// Particulate COD slots counted as suspended solids.
pub const PARTICULATE_COD: [usize; 5] = [X_I, X_S, X_BH, X_BA, X_D];

/// Slots that settle in a clarifier (particulate COD plus particulate org-N).
pub const SETTLEABLE: [usize; 6] = [X_I, X_S, X_BH, X_BA, X_D, X_NS];

/// COD-to-TSS ratio for mixed-liquor solids.
pub const COD_TO_TSS: Real = 1.2;

/// COD-to-VSS ratio for mixed-liquor solids.
pub const COD_TO_VSS: Real = 1.42;

fn sum_slots(comps: &CompVec, slots: &[usize]) -> Real {
    slots.iter().map(|&i| comps[i]).sum()
}

/// Total suspended solids, mg/L.
pub fn tss(comps: &CompVec) -> Real {
    sum_slots(comps, &PARTICULATE_COD) / COD_TO_TSS
}

/// Volatile suspended solids, mg/L.
pub fn vss(comps: &CompVec) -> Real {
    sum_slots(comps, &PARTICULATE_COD) / COD_TO_VSS
}

/// Total chemical oxygen demand, mg/L.
pub fn cod(comps: &CompVec) -> Real {
    sum_slots(comps, &[S_I, S_S, X_I, X_S, X_BH, X_BA, X_D])
}

/// Soluble COD, mg/L.
pub fn soluble_cod(comps: &CompVec) -> Real {
    sum_slots(comps, &[S_I, S_S])
}

/// Particulate COD, mg/L.
pub fn particulate_cod(comps: &CompVec) -> Real {
    cod(comps) - soluble_cod(comps)
}

/// Total nitrogen (TKN + NOx-N), mg/L.
pub fn total_n(comps: &CompVec) -> Real {
    sum_slots(comps, &[S_NH, S_NS, S_NO, X_NS])
}

/// Organic nitrogen, mg/L.
pub fn organic_n(comps: &CompVec) -> Real {
    sum_slots(comps, &[S_NS, X_NS])
}

/// Inorganic nitrogen, mg/L.
pub fn inorganic_n(comps: &CompVec) -> Real {
    total_n(comps) - organic_n(comps)
}

/// Particulate nitrogen, mg/L.
pub fn particulate_n(comps: &CompVec) -> Real {
    comps[X_NS]
}

/// Soluble nitrogen, mg/L.
pub fn soluble_n(comps: &CompVec) -> Real {
    total_n(comps) - particulate_n(comps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CompVec {
        let mut c = CompVec::zeros();
        c[S_DO] = 2.0;
        c[S_I] = 30.0;
        c[S_S] = 60.0;
        c[S_NH] = 25.0;
        c[S_NS] = 6.0;
        c[S_NO] = 0.5;
        c[S_ALK] = 6.0;
        c[X_I] = 48.0;
        c[X_S] = 120.0;
        c[X_BH] = 600.0;
        c[X_BA] = 30.0;
        c[X_D] = 90.0;
        c[X_NS] = 8.0;
        c
    }

    #[test]
    fn tss_is_particulate_cod_over_ratio() {
        let c = sample();
        let x_cod = 48.0 + 120.0 + 600.0 + 30.0 + 90.0;
        assert!((tss(&c) - x_cod / COD_TO_TSS).abs() < 1e-12);
        assert!((vss(&c) - x_cod / COD_TO_VSS).abs() < 1e-12);
    }

    #[test]
    fn cod_splits_add_up() {
        let c = sample();
        assert!((soluble_cod(&c) + particulate_cod(&c) - cod(&c)).abs() < 1e-12);
    }

    #[test]
    fn nitrogen_splits_add_up() {
        let c = sample();
        assert!((organic_n(&c) + inorganic_n(&c) - total_n(&c)).abs() < 1e-12);
        assert!((soluble_n(&c) + particulate_n(&c) - total_n(&c)).abs() < 1e-12);
    }
}
