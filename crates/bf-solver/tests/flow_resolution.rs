//! Integration tests for the forward/backward flow-source resolution passes
//! on a plant with return sludge and a waste draw.

use bf_core::UnitId;
use bf_plant::Plant;
use bf_solver::{SolverError, backward_set_flow, forward_set_flow};

const DESIGN_FLOW: f64 = 37_800.0;
const RAS_FLOW: f64 = 18_900.0;
const WASTE_FLOW: f64 = 378.0;

struct Cmas {
    plant: Plant,
    clarifier: UnitId,
    p3: UnitId,
    p4: UnitId,
    splitter: UnitId,
    p5: UnitId,
    was: UnitId,
    effluent: UnitId,
}

/// influent -> p1 -> reactor -> p2 -> clarifier -> p3 -> effluent, with the
/// clarifier underflow returning through a splitter (RAS to the reactor,
/// waste through p5).
fn cmas() -> Cmas {
    let mut plant = Plant::new();
    let influent = plant.add_influent();
    let p1 = plant.add_pipe();
    let reactor = plant.add_reactor();
    let p2 = plant.add_pipe();
    let clarifier = plant.add_final_clarifier();
    let p3 = plant.add_pipe();
    let effluent = plant.add_effluent();
    let p4 = plant.add_pipe();
    let splitter = plant.add_splitter();
    let ras = plant.add_pipe();
    let p5 = plant.add_pipe();
    let was = plant.add_was();

    plant.set_downstream_main(influent, p1).unwrap();
    plant.set_downstream_main(p1, reactor).unwrap();
    plant.set_downstream_main(reactor, p2).unwrap();
    plant.set_downstream_main(p2, clarifier).unwrap();
    plant.set_downstream_main(clarifier, p3).unwrap();
    plant.set_downstream_side(clarifier, p4).unwrap();
    plant.set_downstream_main(p3, effluent).unwrap();
    plant.set_downstream_main(p4, splitter).unwrap();
    plant.set_downstream_main(splitter, ras).unwrap();
    plant.set_downstream_side(splitter, p5).unwrap();
    plant.set_downstream_main(ras, reactor).unwrap();
    plant.set_downstream_main(p5, was).unwrap();

    plant.set_as_srt_controller(splitter, true).unwrap();
    plant.set_mainstream_flow(splitter, RAS_FLOW).unwrap();
    plant.set_design_flow(influent, DESIGN_FLOW).unwrap();

    Cmas {
        plant,
        clarifier,
        p3,
        p4,
        splitter,
        p5,
        was,
        effluent,
    }
}

#[test]
fn backward_pass_fills_the_recycle_flows() {
    let mut fixture = cmas();
    let plant = &mut fixture.plant;

    forward_set_flow(plant);

    // the driver fixes these two flows each round
    plant.set_mainstream_flow(fixture.was, WASTE_FLOW).unwrap();
    plant
        .set_mainstream_flow(fixture.effluent, DESIGN_FLOW - WASTE_FLOW)
        .unwrap();

    let report = backward_set_flow(plant, &[fixture.was, fixture.effluent]).unwrap();
    assert!(report.resolved >= 4, "resolved = {}", report.resolved);

    // waste chain: WAS total inflow walks back through p5 onto the
    // SRT-controlling splitter's sidestream
    assert_eq!(plant[fixture.p5].main_outflow(), WASTE_FLOW);
    assert_eq!(plant[fixture.splitter].side_outflow(), WASTE_FLOW);

    // the splitter's inlet (RAS + waste) walks back onto the clarifier
    // underflow
    assert_eq!(plant[fixture.p4].main_outflow(), RAS_FLOW + WASTE_FLOW);
    assert_eq!(plant[fixture.clarifier].side_outflow(), RAS_FLOW + WASTE_FLOW);

    // the effluent side walks back onto the clarifier overflow pipe
    assert_eq!(plant[fixture.p3].main_outflow(), DESIGN_FLOW - WASTE_FLOW);
}

#[test]
fn backward_pass_runs_twice_without_drift() {
    let mut fixture = cmas();
    let plant = &mut fixture.plant;

    forward_set_flow(plant);
    plant.set_mainstream_flow(fixture.was, WASTE_FLOW).unwrap();
    plant
        .set_mainstream_flow(fixture.effluent, DESIGN_FLOW - WASTE_FLOW)
        .unwrap();

    backward_set_flow(plant, &[fixture.was, fixture.effluent]).unwrap();
    let first = (
        plant[fixture.splitter].side_outflow(),
        plant[fixture.p4].main_outflow(),
        plant[fixture.p3].main_outflow(),
    );

    // a second round with the same fixed points resolves to the same flows
    backward_set_flow(plant, &[fixture.was, fixture.effluent]).unwrap();
    let second = (
        plant[fixture.splitter].side_outflow(),
        plant[fixture.p4].main_outflow(),
        plant[fixture.p3].main_outflow(),
    );
    assert_eq!(first, second);
}

#[test]
fn two_undetermined_feeders_are_an_error() {
    let mut plant = Plant::new();
    let influent = plant.add_influent();
    let splitter = plant.add_splitter();
    let p1 = plant.add_pipe();
    let p2 = plant.add_pipe();
    let junction = plant.add_pipe();
    let effluent = plant.add_effluent();

    plant.set_downstream_main(influent, splitter).unwrap();
    plant.set_downstream_main(splitter, p1).unwrap();
    plant.set_downstream_side(splitter, p2).unwrap();
    plant.set_downstream_main(p1, junction).unwrap();
    plant.set_downstream_main(p2, junction).unwrap();
    plant.set_downstream_main(junction, effluent).unwrap();
    plant.set_sidestream_flow(splitter, 100.0).unwrap();

    // without a forward pass neither feeder of the junction is determined,
    // so the backward walk cannot apportion the inflow
    plant.set_mainstream_flow(effluent, 1000.0).unwrap();
    let err = backward_set_flow(&mut plant, &[effluent]).unwrap_err();
    match err {
        SolverError::AmbiguousInflow { unit, count } => {
            assert_eq!(count, 2);
            assert!(unit.starts_with("Pipe"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn settled_inlets_are_reported_not_skipped() {
    let mut plant = Plant::new();
    let influent = plant.add_influent();
    let pipe = plant.add_pipe();
    let effluent = plant.add_effluent();
    plant.set_downstream_main(influent, pipe).unwrap();
    plant.set_downstream_main(pipe, effluent).unwrap();

    forward_set_flow(&mut plant);

    // everything is upstream-determined: the backward pass finds nothing to
    // resolve and says so
    let report = backward_set_flow(&mut plant, &[effluent]).unwrap();
    assert_eq!(report.resolved, 0);
}
