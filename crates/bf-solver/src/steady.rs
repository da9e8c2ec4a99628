//! The steady-state driver: iterate the plant to a global fixed point.

use std::collections::{HashSet, VecDeque};

use bf_asm::{Rkf45, Rkf45Config};
use bf_core::comps::CompVec;
use bf_core::{Real, Tolerances, UnitId};
use bf_plant::{Plant, UnitKind, validate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{SolverError, SolverResult};
use crate::resolve;
use crate::seed;

/// Configuration of the steady-state run.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SteadyConfig {
    /// Cap on global iterations; exceeding it reports non-convergence
    /// instead of looping forever.
    pub max_rounds: usize,
    /// Flow-conservation tolerance per unit, m3/d.
    pub flow_tol: Real,
    /// Concentration-change tolerance between rounds.
    pub conc_tol: Tolerances,
    /// Reactor integrator settings.
    pub integrator: Rkf45Config,
    /// When set, overrides the capture rate of every final clarifier.
    pub capture_rate: Option<Real>,
}

impl Default for SteadyConfig {
    fn default() -> Self {
        Self {
            max_rounds: 500,
            flow_tol: 1e-6,
            conc_tol: Tolerances {
                abs: 1e-4,
                rel: 1e-4,
            },
            integrator: Rkf45Config::default(),
            capture_rate: None,
        }
    }
}

/// Converged (or last-iterate) state of one unit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnitState {
    pub name: String,
    pub kind: String,
    pub total_inflow: Real,
    pub main_outflow: Real,
    pub side_outflow: Real,
    pub main_concs: Vec<Real>,
    pub side_concs: Vec<Real>,
}

/// Result of a steady-state run.
///
/// Non-convergence within the round budget is a reported outcome, with the
/// last iterate retained, rather than an error or an endless loop.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SteadyState {
    /// Whether the global fixed point was reached.
    pub converged: bool,
    /// Whether every reactor's own integration converged in the final round.
    pub reactors_converged: bool,
    /// Global iterations performed.
    pub rounds: usize,
    /// Per-unit flows and concentrations, in plant order.
    pub units: Vec<UnitState>,
}

impl SteadyState {
    /// Look up a unit's state by name.
    pub fn unit(&self, name: &str) -> Option<&UnitState> {
        self.units.iter().find(|u| u.name == name)
    }
}

/// Iterate the plant to steady state at the target SRT (days).
///
/// The loop per round: compute the waste flow from the solids inventory and
/// target SRT, balance the effluent flow, back-resolve upstream flows from
/// those two fixed points, traverse the graph breadth-first from the
/// influent, then test global convergence.
pub fn get_steady_state(
    plant: &mut Plant,
    target_srt: Real,
    config: &SteadyConfig,
) -> SolverResult<SteadyState> {
    let report = validate::check(plant);
    if !report.ready() {
        return Err(SolverError::Topology {
            errors: report.errors,
        });
    }

    let influents = plant.units_of_kind(UnitKind::Influent);
    let reactors = plant.units_of_kind(UnitKind::Reactor);
    let was_units = plant.units_of_kind(UnitKind::Was);
    let effluents = plant.units_of_kind(UnitKind::Effluent);
    let clarifiers = plant.units_of_kind(UnitKind::FinalClarifier);
    if influents.is_empty() {
        return Err(SolverError::NoInfluent);
    }
    if effluents.is_empty() {
        return Err(SolverError::NoEffluent);
    }

    let integrator = Rkf45::new(config.integrator);

    // prime the influents so their loads are available for seeding
    for &i in &influents {
        plant.update_combined_input(i);
        plant.discharge(i, &integrator)?;
    }
    let plant_inflow: Real = influents
        .iter()
        .map(|&i| plant.current_main_outflow(i))
        .sum();

    let guess = build_seed(plant, &reactors, &influents, plant_inflow);
    for id in plant.unit_ids() {
        plant.assign_initial_guess(id, &guess);
    }

    if let Some(rate) = config.capture_rate {
        for &c in &clarifiers {
            plant.set_capture_rate(c, rate)?;
        }
    }

    resolve::forward_set_flow(plant);
    let backward_starts: Vec<UnitId> = was_units
        .iter()
        .chain(effluents.iter())
        .copied()
        .collect();

    let mut rounds = 0;
    let mut converged = false;
    while rounds < config.max_rounds {
        rounds += 1;

        let waste_flow = match was_units.first() {
            Some(&w) => {
                let flow = plant.waste_flow_for_srt(w, target_srt, &reactors, &effluents);
                plant.set_mainstream_flow(w, flow)?;
                flow
            }
            None => 0.0,
        };

        let effluent_flow = plant_inflow - waste_flow;
        if effluent_flow < 0.0 {
            warn!(waste_flow, plant_inflow, "waste flow exceeds the plant inflow");
        }
        plant.set_mainstream_flow(effluents[0], effluent_flow.max(0.0))?;

        resolve::backward_set_flow(plant, &backward_starts)?;
        traverse(plant, &influents, &integrator)?;

        if report
            .schedule
            .iter()
            .all(|&u| plant[u].is_converged(config.flow_tol, config.conc_tol))
        {
            converged = true;
            break;
        }
        debug!(round = rounds, "not yet converged");
    }

    let reactors_converged = reactors
        .iter()
        .all(|&r| plant[r].reactor_converged().unwrap_or(true));

    if converged {
        info!(rounds, "plant reached steady state");
    } else {
        warn!(
            rounds,
            "round budget exhausted before global convergence; returning the last iterate"
        );
    }

    Ok(snapshot(plant, converged, reactors_converged, rounds))
}

fn build_seed(
    plant: &Plant,
    reactors: &[UnitId],
    influents: &[UnitId],
    plant_inflow: Real,
) -> CompVec {
    let influent_concs = plant[influents[0]].main_outlet_concs();
    match reactors.first() {
        Some(&r0) => {
            let params = plant[r0]
                .asm_model()
                .map(|m| *m.params())
                .unwrap_or_default();
            let total_volume: Real = reactors
                .iter()
                .map(|&r| plant[r].active_volume().unwrap_or(0.0))
                .sum();
            seed::initial_guess(&params, total_volume, plant_inflow, &influent_concs)
        }
        // nothing reacts: the influent composition is the fixed point
        None => influent_concs,
    }
}

/// Breadth-first traversal from the influents: refresh each unit's combined
/// input, discharge it, then enqueue its side and main successors.
fn traverse(plant: &mut Plant, influents: &[UnitId], integrator: &Rkf45) -> SolverResult<()> {
    let mut visited: HashSet<UnitId> = HashSet::new();
    let mut queue: VecDeque<UnitId> = influents.iter().copied().collect();

    while let Some(u) = queue.pop_front() {
        if !visited.insert(u) {
            continue;
        }
        plant.update_combined_input(u);
        plant.discharge(u, integrator)?;

        if let Some(s) = plant[u].side_outlet() {
            if !visited.contains(&s) {
                queue.push_back(s);
            }
        }
        if let Some(m) = plant[u].main_outlet() {
            if !visited.contains(&m) {
                queue.push_back(m);
            }
        }
    }

    if visited.len() < plant.units().len() {
        let missing = plant
            .units()
            .iter()
            .filter(|u| !visited.contains(&u.id()))
            .map(|u| u.name().to_owned())
            .collect();
        return Err(SolverError::Unreachable { units: missing });
    }
    Ok(())
}

fn snapshot(
    plant: &Plant,
    converged: bool,
    reactors_converged: bool,
    rounds: usize,
) -> SteadyState {
    let units = plant
        .units()
        .iter()
        .map(|u| UnitState {
            name: u.name().to_owned(),
            kind: u.kind().label().to_owned(),
            total_inflow: u.total_inflow(),
            main_outflow: u.main_outflow(),
            side_outflow: u.side_outflow(),
            main_concs: u.main_outlet_concs().iter().copied().collect(),
            side_concs: u.side_outlet_concs().iter().copied().collect(),
        })
        .collect();
    SteadyState {
        converged,
        reactors_converged,
        rounds,
        units,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_through_json() {
        let config = SteadyConfig::default();
        let text = serde_json::to_string(&config).unwrap();
        let back: SteadyConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back.max_rounds, config.max_rounds);
        assert_eq!(back.flow_tol, config.flow_tol);
        assert_eq!(back.conc_tol.abs, config.conc_tol.abs);
        assert_eq!(back.capture_rate, config.capture_rate);
    }

    #[test]
    fn empty_plant_is_rejected() {
        let mut plant = Plant::new();
        let err = get_steady_state(&mut plant, 5.0, &SteadyConfig::default()).unwrap_err();
        assert!(matches!(err, SolverError::NoInfluent));
    }
}
