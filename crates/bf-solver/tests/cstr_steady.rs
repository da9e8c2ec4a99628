//! End-to-end scenario: a single completely mixed reactor with no recycle.
//!
//! One influent (37 800 m3/d of default municipal wastewater) feeds one
//! reactor (75 600 m3, a 2-day HRT, 20 degC, DO 2 mg/L) feeding one
//! effluent. With no sludge recycle the SRT equals the HRT.

use bf_core::comps::{S_NH, S_NO, S_S};
use bf_plant::{InfluentQuality, Plant, UnitKind};
use bf_solver::{SteadyConfig, get_steady_state, min_oxic_srt_autotrophs};

const DESIGN_FLOW: f64 = 37_800.0;
const REACTOR_VOLUME: f64 = 75_600.0;
const HRT_DAYS: f64 = REACTOR_VOLUME / DESIGN_FLOW;

fn cstr_plant() -> Plant {
    let mut plant = Plant::new();
    let influent = plant.add_influent();
    let p1 = plant.add_pipe();
    let reactor = plant.add_reactor();
    let p2 = plant.add_pipe();
    let effluent = plant.add_effluent();

    plant.set_downstream_main(influent, p1).unwrap();
    plant.set_downstream_main(p1, reactor).unwrap();
    plant.set_downstream_main(reactor, p2).unwrap();
    plant.set_downstream_main(p2, effluent).unwrap();

    plant.set_design_flow(influent, DESIGN_FLOW).unwrap();
    plant
        .set_influent_quality(influent, InfluentQuality::default())
        .unwrap();
    plant.set_active_volume(reactor, REACTOR_VOLUME).unwrap();
    plant.set_model_condition(reactor, 20.0, 2.0).unwrap();
    plant
}

#[test]
fn single_cstr_reaches_steady_state() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut plant = cstr_plant();
    let result = get_steady_state(&mut plant, HRT_DAYS, &SteadyConfig::default()).unwrap();

    assert!(result.converged, "no fixed point in {} rounds", result.rounds);
    assert!(result.reactors_converged);

    // flow conservation everywhere
    for unit in &result.units {
        assert!(
            (unit.total_inflow - unit.main_outflow - unit.side_outflow).abs() < 1e-3,
            "{} does not conserve flow",
            unit.name
        );
    }

    let effluent = result.unit("Effluent_1").unwrap();
    assert!((effluent.main_outflow - DESIGN_FLOW).abs() < 1e-3);

    // readily biodegradable substrate is largely consumed
    let influent_s_s = InfluentQuality::default().to_model_components()[S_S];
    assert!(
        effluent.main_concs[S_S] < 15.0,
        "effluent substrate {} mg/L",
        effluent.main_concs[S_S]
    );
    assert!(effluent.main_concs[S_S] < 0.2 * influent_s_s);

    // the 2-day SRT sits above nitrifier washout at the achieved effluent
    // ammonia, so the plant nitrifies: ammonia drops and nitrate appears
    let reactor_id = plant.units_of_kind(UnitKind::Reactor)[0];
    let params = plant[reactor_id].asm_model().unwrap().params();
    let washout = min_oxic_srt_autotrophs(params, effluent.main_concs[S_NH]);
    assert!(
        HRT_DAYS > washout,
        "SRT {HRT_DAYS} d vs washout {washout} d"
    );
    assert!(effluent.main_concs[S_NH] < InfluentQuality::default().nh3_n);
    assert!(
        effluent.main_concs[S_NO] > 1.0,
        "no nitrate formed: {} mg/L",
        effluent.main_concs[S_NO]
    );
}

#[test]
fn pipes_pass_the_reactor_outlet_through_unchanged() {
    let mut plant = cstr_plant();
    let result = get_steady_state(&mut plant, HRT_DAYS, &SteadyConfig::default()).unwrap();
    assert!(result.converged);

    let reactor = result.unit("Reactor_1").unwrap();
    let p2 = result.unit("Pipe_2").unwrap();
    let effluent = result.unit("Effluent_1").unwrap();

    for i in 0..reactor.main_concs.len() {
        assert!(
            (reactor.main_concs[i] - p2.main_concs[i]).abs() < 1e-9,
            "pipe altered component {i}"
        );
        assert!((p2.main_concs[i] - effluent.main_concs[i]).abs() < 1e-9);
    }
}

#[test]
fn colder_water_nitrifies_less() {
    let mut warm = cstr_plant();
    let warm_result = get_steady_state(&mut warm, HRT_DAYS, &SteadyConfig::default()).unwrap();

    let mut cold = cstr_plant();
    let cold_reactor = cold.units_of_kind(UnitKind::Reactor)[0];
    cold.set_model_condition(cold_reactor, 8.0, 2.0).unwrap();
    let cold_result = get_steady_state(&mut cold, HRT_DAYS, &SteadyConfig::default()).unwrap();

    let warm_nh = warm_result.unit("Effluent_1").unwrap().main_concs[S_NH];
    let cold_nh = cold_result.unit("Effluent_1").unwrap().main_concs[S_NH];
    assert!(
        cold_nh > warm_nh,
        "cold effluent ammonia {cold_nh} should exceed warm {warm_nh}"
    );
}

#[test]
fn steady_state_snapshot_serializes() {
    let mut plant = cstr_plant();
    let result = get_steady_state(&mut plant, HRT_DAYS, &SteadyConfig::default()).unwrap();

    let text = serde_json::to_string(&result).unwrap();
    let back: bf_solver::SteadyState = serde_json::from_str(&text).unwrap();
    assert_eq!(back.units.len(), result.units.len());
    assert_eq!(back.converged, result.converged);
}
