//! Ideal solids-liquid separation for the final clarifier.

use bf_core::comps::{self, S_DO, SETTLEABLE};
use tracing::warn;

use crate::unit::Unit;

/// Clarifier HRT above which the outlet DO is considered depleted, d.
const DO_DEPLETION_HRT: f64 = 15.0 / 1440.0;

/// Split the inlet solids between the overflow (main) and underflow (side).
///
/// Inlet TSS is partitioned by the capture rate, then each particulate
/// component is back-computed so it keeps its fractional share of inlet TSS
/// on both outlets. Soluble components pass through unchanged. Flows must
/// already be balanced by the branch-flow helper.
pub(crate) fn settle_solids(unit: &mut Unit) {
    let data = unit.clarifier.expect("clarifier data");
    let in_tss = comps::tss(&unit.in_comps);

    let solids_in = unit.total_inflow * in_tss;
    let mut captured = solids_in * data.capture_rate;
    let mut overflow = solids_in * (1.0 - data.capture_rate);
    if unit.side_outflow <= 0.0 && captured > 0.0 {
        // nothing drains the underflow: keep the mass balance by routing
        // everything over the weir
        warn!(unit = %unit.name, "clarifier underflow has no flow; solids leave via overflow");
        overflow += captured;
        captured = 0.0;
    }

    let under_tss = if unit.side_outflow > 0.0 {
        captured / unit.side_outflow
    } else {
        0.0
    };
    let over_tss = if unit.main_outflow > 0.0 {
        overflow / unit.main_outflow
    } else {
        0.0
    };

    // solubles are identical on all three branches
    unit.mo_comps = unit.in_comps;
    unit.so_comps = unit.in_comps;

    for i in SETTLEABLE {
        let share = if in_tss > 0.0 {
            unit.in_comps[i] / in_tss
        } else {
            0.0
        };
        unit.mo_comps[i] = over_tss * share;
        unit.so_comps[i] = under_tss * share;
    }

    // a long-retention clarifier strips the remaining dissolved oxygen
    if unit.total_inflow > 0.0 {
        let hrt = data.active_vol / unit.total_inflow;
        if hrt > DO_DEPLETION_HRT {
            unit.mo_comps[S_DO] = 0.0;
            unit.so_comps[S_DO] = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{ClarifierData, UnitKind};
    use bf_core::UnitId;
    use bf_core::comps::{CompVec, S_I, S_S, X_BH, X_I, X_NS, X_S};

    fn clarifier(capture_rate: f64) -> Unit {
        let mut u = Unit::new(
            UnitId::from_index(0),
            "FinalClarifier_1".into(),
            UnitKind::FinalClarifier,
        );
        u.clarifier = Some(ClarifierData {
            active_vol: 9500.0,
            capture_rate,
        });
        u.total_inflow = 1000.0;
        u.main_outflow = 900.0;
        u.side_outflow = 100.0;

        let mut c = CompVec::zeros();
        c[S_I] = 30.0;
        c[S_S] = 5.0;
        c[X_I] = 100.0;
        c[X_S] = 50.0;
        c[X_BH] = 800.0;
        c[X_NS] = 6.0;
        u.in_comps = c;
        u
    }

    #[test]
    fn solubles_pass_through_unchanged() {
        let mut u = clarifier(0.95);
        settle_solids(&mut u);
        assert_eq!(u.mo_comps[S_I], 30.0);
        assert_eq!(u.so_comps[S_I], 30.0);
        assert_eq!(u.mo_comps[S_S], 5.0);
        assert_eq!(u.so_comps[S_S], 5.0);
    }

    #[test]
    fn underflow_concentrates_and_overflow_clears() {
        let mut u = clarifier(0.95);
        settle_solids(&mut u);
        assert!(u.so_comps[X_BH] > u.in_comps[X_BH]);
        assert!(u.mo_comps[X_BH] < u.in_comps[X_BH]);
    }

    #[test]
    fn particulate_mass_is_conserved() {
        let mut u = clarifier(0.6);
        settle_solids(&mut u);
        for i in SETTLEABLE {
            let inflow = u.total_inflow * u.in_comps[i];
            let outflow = u.main_outflow * u.mo_comps[i] + u.side_outflow * u.so_comps[i];
            assert!(
                (inflow - outflow).abs() < 1e-6,
                "component {i} not conserved"
            );
        }
    }

    #[test]
    fn long_retention_strips_oxygen() {
        let mut u = clarifier(0.95);
        u.in_comps[S_DO] = 2.0;
        // 9500 m3 at 1000 m3/d is far beyond a 15-minute HRT
        settle_solids(&mut u);
        assert_eq!(u.mo_comps[S_DO], 0.0);
        assert_eq!(u.so_comps[S_DO], 0.0);
    }

    #[test]
    fn zero_underflow_routes_solids_over_the_weir() {
        let mut u = clarifier(0.95);
        u.main_outflow = 1000.0;
        u.side_outflow = 0.0;
        settle_solids(&mut u);
        for i in SETTLEABLE {
            let inflow = u.total_inflow * u.in_comps[i];
            let outflow = u.main_outflow * u.mo_comps[i];
            assert!((inflow - outflow).abs() < 1e-6);
        }
    }

    proptest::proptest! {
        #[test]
        fn mass_conserved_for_any_capture_rate(rate in 0.01..0.99_f64) {
            let mut u = clarifier(rate);
            settle_solids(&mut u);
            for i in SETTLEABLE {
                let inflow = u.total_inflow * u.in_comps[i];
                let outflow = u.main_outflow * u.mo_comps[i]
                    + u.side_outflow * u.so_comps[i];
                proptest::prop_assert!((inflow - outflow).abs() < 1e-6);
            }
        }
    }
}
