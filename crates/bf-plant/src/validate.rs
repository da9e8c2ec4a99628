//! Topology validation for the process flow diagram.
//!
//! The solver refuses to run until `check` reports a clean plant: all
//! inlets/outlets connected, a legal waste-draw chain with exactly one SRT
//! controller (when the plant wastes sludge at all), every plain splitter's
//! sidestream flow defined, and no recycle loop that runs on mainstream
//! edges alone.

use bf_core::UnitId;
use thiserror::Error;
use tracing::debug;

use crate::plant::Plant;
use crate::unit::UnitKind;

/// Configuration errors detected at validation time. Fatal to proceeding;
/// each carries enough unit identity to fix the topology.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PfdError {
    #[error("{unit}: upstream is not connected")]
    UpstreamNotConnected { unit: String },

    #[error("{unit}: sidestream is not connected")]
    SideOutletNotConnected { unit: String },

    #[error("{unit}: main outlet is not connected")]
    MainOutletNotConnected { unit: String },

    #[error("{unit}: waste draw must be fed as [splitter side -> one pipe -> WAS]")]
    BadWasteChain { unit: String },

    #[error("no SRT-controlling splitter feeds a waste draw")]
    NoSrtController,

    #[error("{count} splitters are marked as SRT controller; exactly one is allowed")]
    MultipleSrtControllers { count: usize },

    #[error("{unit}: marked as SRT controller but the plant has no waste draw")]
    SrtControllerWithoutWaste { unit: String },

    #[error("{unit}: sidestream flow is undefined")]
    UndefinedSidestreamFlow { unit: String },

    #[error("mainstream-only recycle loop: {}", .path.join(" -> "))]
    MainstreamOnlyLoop { path: Vec<String> },
}

/// Outcome of validating a plant.
#[derive(Debug, Clone)]
pub struct PfdReport {
    /// Everything wrong with the topology; empty means ready.
    pub errors: Vec<PfdError>,
    /// Number of missing connections found.
    pub loose_ends: usize,
    /// Evaluation order for the solver, with the SRT controller moved to
    /// the end (it resolves only after the waste flow is known).
    pub schedule: Vec<UnitId>,
    /// The single SRT-controlling splitter, when the plant has one.
    pub srt_controller: Option<UnitId>,
}

impl PfdReport {
    /// Whether the plant is ready to simulate.
    pub fn ready(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Count units missing an upstream discharger or a required outlet.
pub fn check_connections(plant: &Plant) -> Vec<PfdError> {
    let mut errors = Vec::new();
    for u in plant.units() {
        if !u.has_discharger() {
            errors.push(PfdError::UpstreamNotConnected {
                unit: u.name().into(),
            });
        }
        if u.has_sidestream() {
            if !u.side_outlet_connected() {
                errors.push(PfdError::SideOutletNotConnected {
                    unit: u.name().into(),
                });
            }
        } else if !u.main_outlet_connected() {
            errors.push(PfdError::MainOutletNotConnected {
                unit: u.name().into(),
            });
        }
    }
    errors
}

/// Check the waste-draw chains and the SRT-controller invariant.
///
/// Every WAS unit must be fed through exactly one pipe whose single upstream
/// is a splitter's side outlet. Across the plant, exactly one splitter may
/// be marked as SRT controller when any waste draw exists, and none
/// otherwise.
pub fn check_waste_draw(plant: &Plant) -> (Option<UnitId>, Vec<PfdError>) {
    let mut errors = Vec::new();
    let was_units = plant.units_of_kind(UnitKind::Was);
    let marked: Vec<UnitId> = plant
        .units()
        .iter()
        .filter(|u| u.is_srt_controller())
        .map(|u| u.id())
        .collect();

    let mut chain_controllers: Vec<UnitId> = Vec::new();
    for &w in &was_units {
        let feeders: Vec<UnitId> = plant.unit(w).upstream().keys().copied().collect();
        for &p in &feeders {
            let pipe = plant.unit(p);
            let head = if pipe.kind() == UnitKind::Pipe && pipe.upstream().len() == 1 {
                pipe.upstream().keys().next().copied()
            } else {
                None
            };
            match head {
                Some(h) if plant.unit(h).side_outlet() == Some(p) => {
                    if plant.unit(h).is_srt_controller() {
                        chain_controllers.push(h);
                    }
                }
                _ => {
                    errors.push(PfdError::BadWasteChain {
                        unit: plant.unit(w).name().into(),
                    });
                    break;
                }
            }
        }
    }

    if marked.len() > 1 {
        errors.push(PfdError::MultipleSrtControllers {
            count: marked.len(),
        });
    }

    if was_units.is_empty() {
        for &m in &marked {
            errors.push(PfdError::SrtControllerWithoutWaste {
                unit: plant.unit(m).name().into(),
            });
        }
        (None, errors)
    } else {
        if chain_controllers.is_empty() && marked.len() <= 1 {
            errors.push(PfdError::NoSrtController);
        }
        (chain_controllers.first().copied(), errors)
    }
}

/// Every plain splitter must have its sidestream flow defined before the
/// run. SRT controllers and final clarifiers are runtime-determined.
pub fn check_sidestream_flows(plant: &Plant) -> Vec<PfdError> {
    plant
        .units()
        .iter()
        .filter(|u| u.kind() == UnitKind::Splitter && !u.sidestream_flow_defined())
        .map(|u| PfdError::UndefinedSidestreamFlow {
            unit: u.name().into(),
        })
        .collect()
}

/// Walk main-outlet edges from every unit; a cycle that never leaves the
/// mainstream is forbidden (legal recycle must hop through a side outlet).
pub fn check_mainstream_loops(plant: &Plant) -> Vec<PfdError> {
    for start in plant.unit_ids() {
        let mut on_path: Vec<UnitId> = Vec::new();
        let mut cursor = Some(start);
        while let Some(u) = cursor {
            if plant.unit(u).kind().is_terminal() {
                break;
            }
            if let Some(pos) = on_path.iter().position(|&x| x == u) {
                let path = on_path[pos..]
                    .iter()
                    .map(|&x| plant.unit(x).name().to_owned())
                    .collect();
                return vec![PfdError::MainstreamOnlyLoop { path }];
            }
            on_path.push(u);
            cursor = plant.unit(u).main_outlet();
        }
    }
    Vec::new()
}

/// Validate the whole plant and build the evaluation schedule.
pub fn check(plant: &Plant) -> PfdReport {
    let connection_errors = check_connections(plant);
    let loose_ends = connection_errors.len();

    let mut errors = connection_errors;
    let (srt_controller, waste_errors) = check_waste_draw(plant);
    errors.extend(waste_errors);
    errors.extend(check_sidestream_flows(plant));
    errors.extend(check_mainstream_loops(plant));

    let mut schedule = plant.unit_ids();
    if errors.is_empty() {
        if let Some(ctrl) = srt_controller {
            schedule.retain(|&u| u != ctrl);
            schedule.push(ctrl);
            debug!(
                controller = %plant.unit(ctrl).name(),
                "SRT controller moved to the end of the schedule"
            );
        }
    }

    PfdReport {
        errors,
        loose_ends,
        schedule,
        srt_controller,
    }
}
