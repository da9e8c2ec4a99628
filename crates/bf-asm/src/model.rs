//! ASM1 process rates and the reactor mass-balance derivative.

use crate::error::{AsmError, AsmResult};
use crate::params::KineticParams;
use crate::stoich::{
    NUM_PROCESSES, R_AER_GROWTH_A, R_AER_GROWTH_H, R_AMMONIFICATION, R_ANX_GROWTH_H, R_DECAY_A,
    R_DECAY_H, R_HYDROLYSIS_X, R_HYDROLYSIS_XN, Stoichiometry,
};
use bf_core::comps::{CompVec, S_DO, S_NH, S_NO, S_NS, S_S, X_BA, X_BH, X_NS, X_S};
use bf_core::Real;
use nalgebra::SVector;

/// Lowest wastewater temperature the model accepts, degC.
pub const MIN_TEMPERATURE: Real = 4.0;

/// Active-biomass concentration below which the hydrolysis ratio terms are
/// treated as zero instead of dividing, mgCOD/L.
const BIOMASS_FLOOR: Real = 1e-8;

/// The eight ASM1 process rates, mg/L/d.
pub type ProcessRates = SVector<Real, NUM_PROCESSES>;

/// Monod saturation/switching term `a / (a + b)`.
pub fn monod(term_in_num_and_denom: Real, term_only_in_denom: Real) -> Real {
    term_in_num_and_denom / (term_in_num_and_denom + term_only_in_denom)
}

/// Kinetics and stoichiometry of ASM1 at a fixed operating point.
///
/// Dissolved oxygen is an operating setpoint, not a state variable: the rate
/// expressions read `bulk_do` and the mass balance pins the DO slot's
/// derivative to zero.
#[derive(Clone, Debug)]
pub struct Asm1 {
    temperature: Real,
    bulk_do: Real,
    params: KineticParams,
    stoich: Stoichiometry,
}

impl Asm1 {
    /// Create a model for the given wastewater temperature (degC) and
    /// dissolved oxygen setpoint (mg/L).
    pub fn new(temperature: Real, bulk_do: Real) -> AsmResult<Self> {
        check_condition(temperature, bulk_do)?;
        let params = KineticParams::at_temperature(temperature);
        let stoich = Stoichiometry::from_params(&params);
        Ok(Self {
            temperature,
            bulk_do,
            params,
            stoich,
        })
    }

    /// Move the model to a new operating point.
    ///
    /// Rejects sub-floor temperatures and negative DO; on rejection the
    /// previous parameter set and matrix remain in place. On success both are
    /// replaced together.
    pub fn update(&mut self, temperature: Real, bulk_do: Real) -> AsmResult<()> {
        check_condition(temperature, bulk_do)?;
        let params = KineticParams::at_temperature(temperature);
        let stoich = Stoichiometry::from_params(&params);
        self.temperature = temperature;
        self.bulk_do = bulk_do;
        self.params = params;
        self.stoich = stoich;
        Ok(())
    }

    pub fn temperature(&self) -> Real {
        self.temperature
    }

    pub fn bulk_do(&self) -> Real {
        self.bulk_do
    }

    pub fn params(&self) -> &KineticParams {
        &self.params
    }

    pub fn stoich(&self) -> &Stoichiometry {
        &self.stoich
    }

    /// Evaluate the eight process rates at the given concentrations.
    ///
    /// Hydrolysis divides by active heterotroph and particulate-substrate
    /// concentrations; at or below zero biomass those rates are zero rather
    /// than undefined.
    pub fn process_rates(&self, c: &CompVec) -> ProcessRates {
        let p = &self.params;
        let do_sw = monod(self.bulk_do, p.k_oh);
        let anx_sw = monod(p.k_oh, self.bulk_do);

        let mut r = ProcessRates::zeros();

        r[R_AER_GROWTH_H] = p.mu_max_h * monod(c[S_S], p.k_s) * do_sw * c[X_BH];

        r[R_ANX_GROWTH_H] =
            p.mu_max_h * monod(c[S_S], p.k_s) * anx_sw * monod(c[S_NO], p.k_no) * p.cf_g * c[X_BH];

        r[R_AER_GROWTH_A] =
            p.mu_max_a * monod(c[S_NH], p.k_nh) * monod(self.bulk_do, p.k_oa) * c[X_BA];

        r[R_DECAY_H] = p.b_lh * c[X_BH];

        r[R_DECAY_A] = p.b_la * c[X_BA];

        r[R_AMMONIFICATION] = p.k_a * c[S_NS] * c[X_BH];

        r[R_HYDROLYSIS_X] = if c[X_BH] > BIOMASS_FLOOR {
            p.k_h
                * monod(c[X_S] / c[X_BH], p.k_x)
                * (do_sw + p.cf_h * anx_sw * monod(c[S_NO], p.k_no))
                * c[X_BH]
        } else {
            0.0
        };

        r[R_HYDROLYSIS_XN] = if c[X_S] > BIOMASS_FLOOR {
            r[R_HYDROLYSIS_X] * c[X_NS] / c[X_S]
        } else {
            0.0
        };

        r
    }

    /// Mass-balance derivative for a completely mixed reactor, mg/L/d.
    ///
    /// `dC/dt = (inlet - outlet) / HRT + S^T r`, HRT = volume / flow.
    /// The DO slot is pinned to zero because DO is held at the setpoint.
    pub fn derivative(
        &self,
        outlet: &CompVec,
        volume: Real,
        flow: Real,
        inlet: &CompVec,
    ) -> CompVec {
        debug_assert!(volume > 0.0 && flow > 0.0);
        let hrt = volume / flow;
        let rates = self.process_rates(outlet);
        let mut dcdt = (inlet - outlet) / hrt + self.stoich.production(&rates);
        dcdt[S_DO] = 0.0;
        dcdt
    }
}

fn check_condition(temperature: Real, bulk_do: Real) -> AsmResult<()> {
    if temperature < MIN_TEMPERATURE {
        return Err(AsmError::TemperatureTooLow {
            value: temperature,
            floor: MIN_TEMPERATURE,
        });
    }
    if bulk_do < 0.0 {
        return Err(AsmError::NegativeOxygen { value: bulk_do });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_core::comps::{S_ALK, S_I, X_D, X_I};

    fn mixed_liquor() -> CompVec {
        let mut c = CompVec::zeros();
        c[S_DO] = 2.0;
        c[S_I] = 30.0;
        c[S_S] = 5.0;
        c[S_NH] = 4.0;
        c[S_NS] = 1.0;
        c[S_NO] = 12.0;
        c[S_ALK] = 4.0;
        c[X_I] = 800.0;
        c[X_S] = 60.0;
        c[X_BH] = 1500.0;
        c[X_BA] = 90.0;
        c[X_D] = 300.0;
        c[X_NS] = 4.0;
        c
    }

    #[test]
    fn monod_saturates() {
        assert!((monod(1.0, 1.0) - 0.5).abs() < 1e-12);
        assert!(monod(1000.0, 1.0) > 0.99);
        assert!(monod(0.0, 1.0) == 0.0);
    }

    proptest::proptest! {
        #[test]
        fn monod_stays_in_unit_interval(s in 0.0..1e6_f64, k in 1e-3..1e3_f64) {
            let m = monod(s, k);
            proptest::prop_assert!((0.0..=1.0).contains(&m));
        }
    }

    #[test]
    fn update_rejects_and_keeps_state() {
        let mut model = Asm1::new(20.0, 2.0).unwrap();
        let before = *model.params();

        assert!(matches!(
            model.update(2.0, 2.0),
            Err(AsmError::TemperatureTooLow { .. })
        ));
        assert!(matches!(
            model.update(20.0, -0.1),
            Err(AsmError::NegativeOxygen { .. })
        ));
        assert_eq!(model.temperature(), 20.0);
        assert_eq!(model.bulk_do(), 2.0);
        assert_eq!(*model.params(), before);

        model.update(12.0, 1.0).unwrap();
        assert_eq!(model.temperature(), 12.0);
        assert!(model.params().mu_max_h < before.mu_max_h);
    }

    #[test]
    fn aerobic_rates_dominate_at_high_do() {
        let model = Asm1::new(20.0, 4.0).unwrap();
        let r = model.process_rates(&mixed_liquor());
        assert!(r[R_AER_GROWTH_H] > r[R_ANX_GROWTH_H]);
        assert!(r[R_AER_GROWTH_A] > 0.0);
    }

    #[test]
    fn anoxic_growth_takes_over_without_oxygen() {
        let model = Asm1::new(20.0, 0.0).unwrap();
        let r = model.process_rates(&mixed_liquor());
        assert_eq!(r[R_AER_GROWTH_H], 0.0);
        assert!(r[R_ANX_GROWTH_H] > 0.0);
        assert_eq!(r[R_AER_GROWTH_A], 0.0);
    }

    #[test]
    fn zero_biomass_does_not_blow_up_hydrolysis() {
        let model = Asm1::new(20.0, 2.0).unwrap();
        let mut c = mixed_liquor();
        c[X_BH] = 0.0;
        let r = model.process_rates(&c);
        assert_eq!(r[R_HYDROLYSIS_X], 0.0);
        assert!(r.iter().all(|v| v.is_finite()));

        c[X_S] = 0.0;
        let r = model.process_rates(&c);
        assert_eq!(r[R_HYDROLYSIS_XN], 0.0);
    }

    #[test]
    fn derivative_pins_do_and_transports_inerts() {
        let model = Asm1::new(20.0, 2.0).unwrap();
        let outlet = mixed_liquor();
        let mut inlet = CompVec::zeros();
        inlet[S_I] = 45.0;
        // 2-day HRT
        let dcdt = model.derivative(&outlet, 2000.0, 1000.0, &inlet);

        assert_eq!(dcdt[S_DO], 0.0);
        // inerts have no reaction term: pure dilution toward the inlet value
        assert!((dcdt[S_I] - (45.0 - 30.0) / 2.0).abs() < 1e-9);
        assert!((dcdt[X_I] - (0.0 - 800.0) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn derivative_vanishes_for_inert_equilibrium() {
        // no biomass, inlet equal to outlet: every term must be zero
        let model = Asm1::new(20.0, 2.0).unwrap();
        let mut c = CompVec::zeros();
        c[S_I] = 25.0;
        c[X_I] = 100.0;
        c[S_ALK] = 6.0;
        let dcdt = model.derivative(&c, 500.0, 250.0, &c);
        assert!(dcdt.iter().all(|v| v.abs() < 1e-12));
    }
}
