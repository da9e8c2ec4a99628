//! Flow-source resolution: decide, for every branch of every unit, which
//! neighbor determines its flow, before any flow values are computed.
//!
//! Both passes are monotonic (a branch never reverts to undetermined) and
//! use explicit work lists rather than recursion, so deep plants cannot
//! overflow the stack.

use bf_core::UnitId;
use bf_plant::{Branch, FlowDataSource, Plant};
use tracing::{debug, warn};

use crate::error::{SolverError, SolverResult};

/// Forward pass: starting from units with at least one already-known branch
/// (influent mainstream, waste-draw inlets, program-set splitters),
/// propagate along the successor edges until no branch can be newly
/// assigned.
pub fn forward_set_flow(plant: &mut Plant) {
    let mut visited: Vec<bool> = vec![false; plant.units().len()];
    let mut stack: Vec<UnitId> = plant
        .units()
        .iter()
        .filter(|u| {
            let (i, m, s) = u.flow_data_src();
            let fixed = |src: FlowDataSource| {
                matches!(src, FlowDataSource::Upstream | FlowDataSource::Program)
            };
            fixed(i) || fixed(m) || fixed(s)
        })
        .map(|u| u.id())
        .collect();

    while let Some(u) = stack.pop() {
        let slot = u.index() as usize;
        if visited[slot] {
            continue;
        }
        visited[slot] = true;

        // may run twice: once to settle the inlet, once for the outlets
        loop {
            let unit = &plant[u];
            let (in_src, mo_src, so_src) = unit.flow_data_src();
            let main = unit.main_outlet();
            let side = unit.side_outlet();

            if in_src.known() {
                if side.is_none() {
                    if !mo_src.known() {
                        plant.set_flow_data_src(u, Branch::Main, FlowDataSource::Upstream);
                        if let Some(m) = main {
                            stack.push(m);
                        }
                    }
                } else if !mo_src.known() {
                    if so_src.known() {
                        plant.set_flow_data_src(u, Branch::Main, FlowDataSource::Upstream);
                    }
                } else if !so_src.known() {
                    plant.set_flow_data_src(u, Branch::Side, FlowDataSource::Upstream);
                    if let Some(s) = side {
                        stack.push(s);
                    }
                }
                break;
            }

            // the inlet is undetermined; it becomes upstream-fed once every
            // discharger's feeding branch is known
            let feeders: Vec<UnitId> = unit.upstream().keys().copied().collect();
            let all_known = !feeders.is_empty()
                && feeders.iter().all(|&f| {
                    let fu = &plant[f];
                    if fu.main_outlet() == Some(u) {
                        fu.flow_data_src().1.known()
                    } else {
                        fu.flow_data_src().2.known()
                    }
                });
            if !all_known {
                break;
            }
            plant.set_flow_data_src(u, Branch::Inlet, FlowDataSource::Upstream);
        }
    }
}

/// Outcome counters of a backward pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BackwardReport {
    /// Upstream branch flows computed from a downstream balance.
    pub resolved: usize,
    /// Units whose inlets were already fully determined.
    pub settled: usize,
}

/// Backward pass: starting from units whose outlet flows are both known
/// (their sum fixes the inlet), walk upstream and compute the one
/// still-undetermined contribution per unit.
///
/// Exactly one undetermined contributor is resolvable; zero is an explicit
/// settled outcome; more than one is an error, never a silent skip.
pub fn backward_set_flow(plant: &mut Plant, starts: &[UnitId]) -> SolverResult<BackwardReport> {
    let mut report = BackwardReport::default();
    for &start in starts {
        backward_from(plant, start, &mut report)?;
    }
    debug!(?report, "backward flow resolution finished");
    Ok(report)
}

fn backward_from(
    plant: &mut Plant,
    start: UnitId,
    report: &mut BackwardReport,
) -> SolverResult<()> {
    let mut stack = vec![start];

    while let Some(u) = stack.pop() {
        let (in_src, mo_src, so_src) = plant[u].flow_data_src();

        let proceed = if so_src.known() {
            if mo_src.known() {
                if in_src.known() {
                    // an upstream-fed inlet leaves nothing to back-compute
                    in_src != FlowDataSource::Upstream
                } else {
                    plant.set_flow_data_src(u, Branch::Inlet, FlowDataSource::Downstream);
                    true
                }
            } else if in_src.known() {
                plant.set_flow_data_src(u, Branch::Main, FlowDataSource::Upstream);
                plant.set_mainstream_flow_by_upstream(u, true);
                true
            } else {
                false
            }
        } else if mo_src.known() && in_src.known() {
            plant.set_flow_data_src(u, Branch::Side, FlowDataSource::Upstream);
            true
        } else {
            false
        };
        if !proceed {
            continue;
        }

        let feeders: Vec<UnitId> = plant[u].upstream().keys().copied().collect();
        let undetermined: Vec<(UnitId, Branch)> = feeders
            .iter()
            .filter_map(|&f| {
                let fu = &plant[f];
                let (_, fm, fs) = fu.flow_data_src();
                let open =
                    |src: FlowDataSource| matches!(src, FlowDataSource::Tbd | FlowDataSource::Downstream);
                if fu.main_outlet() == Some(u) && open(fm) {
                    Some((f, Branch::Main))
                } else if fu.side_outlet() == Some(u) && open(fs) {
                    Some((f, Branch::Side))
                } else {
                    None
                }
            })
            .collect();

        match undetermined.len() {
            0 => {
                report.settled += 1;
            }
            1 => {
                let (target, branch) = undetermined[0];
                let mut known_sum = 0.0;
                for &f in feeders.iter().filter(|&&f| f != target) {
                    known_sum += if plant[f].main_outlet() == Some(u) {
                        plant.current_main_outflow(f)
                    } else {
                        plant.current_side_outflow(f)
                    };
                }
                let residual = plant.totalize_inflow(u) - known_sum;
                let flow = if residual < 0.0 {
                    warn!(
                        unit = %plant[u].name(),
                        residual,
                        "negative residual inflow; clamping the upstream flow to zero"
                    );
                    0.0
                } else {
                    residual
                };

                match branch {
                    Branch::Main => {
                        plant.set_flow_data_src(target, Branch::Main, FlowDataSource::Downstream);
                        plant.set_mainstream_flow(target, flow)?;
                    }
                    Branch::Side => {
                        plant.set_flow_data_src(target, Branch::Side, FlowDataSource::Downstream);
                        plant.set_sidestream_flow(target, flow)?;
                    }
                    Branch::Inlet => unreachable!("inlet is never a feeder branch"),
                }
                report.resolved += 1;

                // keep tracing upstream while the chain stays
                // downstream-determined
                if plant[target].flow_data_src().0 == FlowDataSource::Downstream {
                    stack.push(target);
                }
            }
            count => {
                return Err(SolverError::AmbiguousInflow {
                    unit: plant[u].name().to_owned(),
                    count,
                });
            }
        }
    }
    Ok(())
}
