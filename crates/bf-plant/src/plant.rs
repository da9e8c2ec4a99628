//! The plant graph: an arena of process units and the operations that keep
//! their flows and concentrations balanced.

use bf_asm::{Asm1, ReactorIntegrator};
use bf_core::comps::CompVec;
use bf_core::{Real, UnitId};
use tracing::warn;

use crate::error::{PlantError, PlantResult};
use crate::influent::InfluentQuality;
use crate::settle;
use crate::unit::{
    Branch, ClarifierData, FlowDataSource, InfluentData, NUM_KINDS, ReactorData, Unit, UnitKind,
};

/// Default influent design flow, m3/d (10 MGD).
pub const DEFAULT_DESIGN_FLOW: Real = 37_800.0;

/// Default reactor active volume, m3.
pub const DEFAULT_REACTOR_VOLUME: Real = 38_000.0;

/// Default clarifier active volume, m3.
pub const DEFAULT_CLARIFIER_VOLUME: Real = 9_500.0;

/// Default clarifier solids capture rate.
pub const DEFAULT_CAPTURE_RATE: Real = 0.95;

/// A wastewater treatment plant as a directed graph of process units.
///
/// Units are stored in an arena and addressed by `UnitId`; all mutation goes
/// through `&mut self` methods, so the graph is single-threaded by
/// construction. Default names are allocated from per-kind counters owned by
/// the plant (`Pipe_1`, `Reactor_2`, ...), which restart for each new plant.
#[derive(Clone, Debug, Default)]
pub struct Plant {
    units: Vec<Unit>,
    name_counters: [u32; NUM_KINDS],
}

impl Plant {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_unit(&mut self, kind: UnitKind) -> UnitId {
        let id = UnitId::from_index(self.units.len() as u32);
        let n = &mut self.name_counters[kind.slot()];
        *n += 1;
        let name = format!("{}_{}", kind.label(), n);
        let mut unit = Unit::new(id, name, kind);
        match kind {
            UnitKind::Influent => {
                unit.influent = Some(InfluentData {
                    design_flow: DEFAULT_DESIGN_FLOW,
                    quality: InfluentQuality::default(),
                });
            }
            UnitKind::Reactor => {
                unit.reactor = Some(ReactorData {
                    active_vol: DEFAULT_REACTOR_VOLUME,
                    // default operating point: 20 degC, 2 mg/L DO
                    model: Asm1::new(20.0, 2.0).expect("default condition is valid"),
                    last_converged: false,
                });
            }
            UnitKind::FinalClarifier => {
                unit.clarifier = Some(ClarifierData {
                    active_vol: DEFAULT_CLARIFIER_VOLUME,
                    capture_rate: DEFAULT_CAPTURE_RATE,
                });
            }
            _ => {}
        }
        self.units.push(unit);
        id
    }

    pub fn add_influent(&mut self) -> UnitId {
        self.add_unit(UnitKind::Influent)
    }

    pub fn add_pipe(&mut self) -> UnitId {
        self.add_unit(UnitKind::Pipe)
    }

    pub fn add_splitter(&mut self) -> UnitId {
        self.add_unit(UnitKind::Splitter)
    }

    pub fn add_reactor(&mut self) -> UnitId {
        self.add_unit(UnitKind::Reactor)
    }

    pub fn add_final_clarifier(&mut self) -> UnitId {
        self.add_unit(UnitKind::FinalClarifier)
    }

    pub fn add_was(&mut self) -> UnitId {
        self.add_unit(UnitKind::Was)
    }

    pub fn add_effluent(&mut self) -> UnitId {
        self.add_unit(UnitKind::Effluent)
    }

    /// All units in creation order.
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Get a unit by id (None if the id is out of bounds).
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.index() as usize)
    }

    /// All unit ids in creation order.
    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.units.iter().map(|u| u.id).collect()
    }

    /// Ids of all units of one kind.
    pub fn units_of_kind(&self, kind: UnitKind) -> Vec<UnitId> {
        self.units
            .iter()
            .filter(|u| u.kind == kind)
            .map(|u| u.id)
            .collect()
    }

    pub(crate) fn unit(&self, id: UnitId) -> &Unit {
        &self.units[id.index() as usize]
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> &mut Unit {
        &mut self.units[id.index() as usize]
    }

    fn two_mut(&mut self, a: UnitId, b: UnitId) -> (&mut Unit, &mut Unit) {
        let (a, b) = (a.index() as usize, b.index() as usize);
        debug_assert_ne!(a, b);
        if a < b {
            let (lo, hi) = self.units.split_at_mut(b);
            (&mut lo[a], &mut hi[0])
        } else {
            let (lo, hi) = self.units.split_at_mut(a);
            (&mut hi[0], &mut lo[b])
        }
    }

    // ------------------------------------------------------------------
    // connections

    /// Connect `discharger`'s main outlet to `receiver`'s inlet.
    ///
    /// The connection is reciprocal: the receiver records the discharger in
    /// its inlet map with a zero placeholder flow.
    pub fn set_downstream_main(&mut self, discharger: UnitId, receiver: UnitId) -> PlantResult<()> {
        self.connect(discharger, receiver, Branch::Main)
    }

    /// Connect `discharger`'s side outlet to `receiver`'s inlet.
    pub fn set_downstream_side(&mut self, discharger: UnitId, receiver: UnitId) -> PlantResult<()> {
        if !self.unit(discharger).kind.has_sidestream() {
            return Err(PlantError::NoSidestream {
                unit: self.unit(discharger).name.clone(),
            });
        }
        self.connect(discharger, receiver, Branch::Side)
    }

    /// Attach `discharger`'s given outlet branch to `receiver`'s inlet.
    pub fn add_upstream(
        &mut self,
        receiver: UnitId,
        discharger: UnitId,
        branch: Branch,
    ) -> PlantResult<()> {
        match branch {
            Branch::Main => self.set_downstream_main(discharger, receiver),
            Branch::Side => self.set_downstream_side(discharger, receiver),
            Branch::Inlet => Err(PlantError::InvalidBranch {
                unit: self.unit(receiver).name.clone(),
            }),
        }
    }

    fn connect(&mut self, discharger: UnitId, receiver: UnitId, branch: Branch) -> PlantResult<()> {
        if discharger == receiver {
            return Err(PlantError::SelfConnection {
                unit: self.unit(discharger).name.clone(),
            });
        }
        if self.unit(receiver).kind == UnitKind::Influent {
            return Err(PlantError::InfluentCannotReceive {
                unit: self.unit(receiver).name.clone(),
            });
        }

        let current = match branch {
            Branch::Main => self.unit(discharger).main_outlet,
            _ => self.unit(discharger).side_outlet,
        };
        if current == Some(receiver) {
            return Ok(());
        }
        // re-pointing an outlet detaches the old receiver first
        if let Some(old) = current {
            self.unit_mut(old).inlet.remove(&discharger);
        }

        let (d, r) = self.two_mut(discharger, receiver);
        match branch {
            Branch::Main => d.main_outlet = Some(receiver),
            _ => d.side_outlet = Some(receiver),
        }
        r.inlet.entry(discharger).or_insert(0.0);
        Ok(())
    }

    /// Detach an existing discharger from `receiver`'s inlet.
    pub fn remove_upstream(&mut self, receiver: UnitId, discharger: UnitId) -> PlantResult<()> {
        if self.unit_mut(receiver).inlet.remove(&discharger).is_none() {
            return Err(PlantError::UnknownDischarger {
                unit: self.unit(receiver).name.clone(),
                discharger: self.unit(discharger).name.clone(),
            });
        }
        self.unit_mut(receiver).upstream_sets_main_flow = false;
        let d = self.unit_mut(discharger);
        if d.main_outlet == Some(receiver) {
            d.main_outlet = None;
        } else if d.side_outlet == Some(receiver) {
            d.side_outlet = None;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // flow data sources

    /// Set the flow data source of one branch, then re-evaluate what that
    /// implies for the other two branches.
    ///
    /// Only a branch still at `Tbd` is overwritten by the explicit set;
    /// resolution is monotonic.
    pub fn set_flow_data_src(&mut self, id: UnitId, branch: Branch, src: FlowDataSource) {
        let u = self.unit_mut(id);

        let mut changed = false;
        match branch {
            Branch::Main if !u.mo_flow_src.known() => {
                u.mo_flow_src = src;
                changed = true;
            }
            Branch::Side if !u.so_flow_src.known() => {
                u.so_flow_src = src;
                changed = true;
            }
            Branch::Inlet if !u.in_flow_src.known() => {
                u.in_flow_src = src;
                changed = true;
            }
            _ => {}
        }
        if !changed {
            return;
        }

        let in_known = u.in_flow_src.known();
        let so_known = u.so_flow_src.known();
        let mo_known = u.mo_flow_src.known();
        let mo_by_ext = u.mo_flow_src.external();
        let so_by_ext = u.so_flow_src.external();

        if so_known {
            if so_by_ext {
                if mo_by_ext {
                    u.upstream_sets_main_flow = false;
                    if !in_known {
                        u.in_flow_src = FlowDataSource::Downstream;
                    }
                } else if mo_known {
                    // main outlet is driven by the upstream side
                    u.upstream_sets_main_flow = true;
                    if !in_known {
                        u.in_flow_src = FlowDataSource::Upstream;
                    }
                } else if in_known {
                    u.upstream_sets_main_flow = true;
                    u.mo_flow_src = FlowDataSource::Upstream;
                }
            } else {
                // side flow arrives from upstream: both the inlet and main
                // outlet must be fixed elsewhere
                u.upstream_sets_main_flow = false;
            }
        } else if in_known && mo_known {
            u.upstream_sets_main_flow = false;
            u.mo_flow_src = FlowDataSource::Upstream;
        }
    }

    // ------------------------------------------------------------------
    // setters (reject-and-report)

    /// Define the main outlet flow, m3/d.
    ///
    /// For influents this sets the design flow (must be positive); for every
    /// other kind a non-negative program-set flow.
    pub fn set_mainstream_flow(&mut self, id: UnitId, flow: Real) -> PlantResult<()> {
        if self.unit(id).kind == UnitKind::Influent {
            return self.set_design_flow(id, flow);
        }
        if flow < 0.0 {
            return Err(PlantError::NegativeFlow {
                unit: self.unit(id).name.clone(),
                value: flow,
            });
        }
        let u = self.unit_mut(id);
        u.main_outflow = flow;
        u.upstream_sets_main_flow = false;
        self.set_flow_data_src(id, Branch::Main, FlowDataSource::Program);
        Ok(())
    }

    /// Define the sidestream flow, m3/d. Rejected for kinds without a
    /// sidestream and for negative values.
    pub fn set_sidestream_flow(&mut self, id: UnitId, flow: Real) -> PlantResult<()> {
        if !self.unit(id).kind.has_sidestream() {
            return Err(PlantError::NoSidestream {
                unit: self.unit(id).name.clone(),
            });
        }
        if flow < 0.0 {
            return Err(PlantError::NegativeFlow {
                unit: self.unit(id).name.clone(),
                value: flow,
            });
        }
        let u = self.unit_mut(id);
        u.side_outflow = flow;
        u.side_flow_defined = true;
        self.set_flow_data_src(id, Branch::Side, FlowDataSource::Program);
        Ok(())
    }

    /// Set whether the main outlet flow derives from the total inflow.
    pub fn set_mainstream_flow_by_upstream(&mut self, id: UnitId, flag: bool) {
        if self.unit(id).kind == UnitKind::Influent {
            // design flow drives an influent regardless
            return;
        }
        self.unit_mut(id).upstream_sets_main_flow = flag;
    }

    /// Mark or unmark a splitter as the plant's SRT controller.
    ///
    /// Once marked, the sidestream flow is supplied at run time by the
    /// downstream waste draw instead of the user.
    pub fn set_as_srt_controller(&mut self, id: UnitId, setting: bool) -> PlantResult<()> {
        if self.unit(id).kind != UnitKind::Splitter {
            return Err(PlantError::NotASplitter {
                unit: self.unit(id).name.clone(),
            });
        }
        let u = self.unit_mut(id);
        u.srt_controller = setting;
        u.side_flow_defined = setting;
        Ok(())
    }

    /// Set the active volume of a reactor or final clarifier, m3.
    pub fn set_active_volume(&mut self, id: UnitId, volume: Real) -> PlantResult<()> {
        let name = self.unit(id).name.clone();
        if volume <= 0.0 {
            return Err(PlantError::NonPositiveVolume {
                unit: name,
                value: volume,
            });
        }
        let u = self.unit_mut(id);
        if let Some(r) = u.reactor.as_mut() {
            r.active_vol = volume;
            Ok(())
        } else if let Some(c) = u.clarifier.as_mut() {
            c.active_vol = volume;
            Ok(())
        } else {
            Err(PlantError::NotAReactor { unit: name })
        }
    }

    /// Set a reactor's wastewater temperature (degC) and DO setpoint (mg/L).
    ///
    /// Rejected values leave the kinetic parameters and the stoichiometric
    /// matrix unchanged.
    pub fn set_model_condition(
        &mut self,
        id: UnitId,
        temperature: Real,
        dissolved_o2: Real,
    ) -> PlantResult<()> {
        let name = self.unit(id).name.clone();
        let r = self
            .unit_mut(id)
            .reactor
            .as_mut()
            .ok_or(PlantError::NotAReactor { unit: name })?;
        r.model.update(temperature, dissolved_o2)?;
        Ok(())
    }

    /// Set a final clarifier's solids capture rate, exclusive (0, 1).
    pub fn set_capture_rate(&mut self, id: UnitId, capture_rate: Real) -> PlantResult<()> {
        let name = self.unit(id).name.clone();
        let c = self
            .unit_mut(id)
            .clarifier
            .as_mut()
            .ok_or(PlantError::NotAClarifier { unit: name.clone() })?;
        if !(capture_rate > 0.0 && capture_rate < 1.0) {
            return Err(PlantError::CaptureRateOutOfRange {
                unit: name,
                value: capture_rate,
            });
        }
        c.capture_rate = capture_rate;
        Ok(())
    }

    /// Set an influent's design flow, m3/d (must be positive).
    pub fn set_design_flow(&mut self, id: UnitId, flow: Real) -> PlantResult<()> {
        let name = self.unit(id).name.clone();
        let data = self
            .unit_mut(id)
            .influent
            .as_mut()
            .ok_or(PlantError::NotAnInfluent { unit: name.clone() })?;
        if flow <= 0.0 {
            return Err(PlantError::NonPositiveDesignFlow {
                unit: name,
                value: flow,
            });
        }
        data.design_flow = flow;
        Ok(())
    }

    /// Replace an influent's measured wastewater characteristics.
    pub fn set_influent_quality(&mut self, id: UnitId, quality: InfluentQuality) -> PlantResult<()> {
        let name = self.unit(id).name.clone();
        let data = self
            .unit_mut(id)
            .influent
            .as_mut()
            .ok_or(PlantError::NotAnInfluent { unit: name })?;
        data.quality = quality;
        Ok(())
    }

    /// Seed a unit's three streams before simulation. Influents keep their
    /// own fractionated load.
    pub fn assign_initial_guess(&mut self, id: UnitId, guess: &CompVec) {
        let u = self.unit_mut(id);
        if u.kind == UnitKind::Influent {
            return;
        }
        u.in_comps = *guess;
        u.mo_comps = *guess;
        u.so_comps = *guess;
    }

    // ------------------------------------------------------------------
    // flow balance

    /// Record the flow contributed by one discharger into a receiver's inlet
    /// map. Unknown dischargers and negative flows are ignored.
    pub fn set_flow(&mut self, receiver: UnitId, discharger: UnitId, flow: Real) {
        if flow >= 0.0 {
            if let Some(slot) = self.unit_mut(receiver).inlet.get_mut(&discharger) {
                *slot = flow;
            }
        }
    }

    /// Combine the individual inlet flows into the unit's total inflow.
    ///
    /// When the main outlet is driven by upstream data the total is the sum
    /// of the inlet contributions; otherwise both outlet flows are already
    /// fixed and the total is their sum (to be passed back upstream).
    pub fn totalize_inflow(&mut self, id: UnitId) -> Real {
        if self.unit(id).kind == UnitKind::Influent {
            self.branch_flow_helper(id);
            return self.unit(id).total_inflow;
        }
        let u = self.unit_mut(id);
        u.total_inflow = if u.upstream_sets_main_flow {
            u.inlet.values().sum()
        } else {
            u.main_outflow + u.side_outflow
        };
        u.total_inflow
    }

    /// Flow-weighted average of the upstream outlet concentrations.
    ///
    /// Does not totalize; call `totalize_inflow` first (or use
    /// `update_combined_input`).
    pub fn blend_inlet_comps(&mut self, id: UnitId) {
        if self.unit(id).kind == UnitKind::Influent {
            let data = self.unit(id).influent.expect("influent data");
            self.unit_mut(id).in_comps = data.quality.to_model_components();
            return;
        }
        let total = self.unit(id).total_inflow;
        if total == 0.0 {
            return;
        }
        let dischargers: Vec<UnitId> = self.unit(id).inlet.keys().copied().collect();
        let mut acc = CompVec::zeros();
        for d in dischargers {
            let du = self.unit(d);
            if du.main_outlet == Some(id) {
                acc += du.mo_comps * du.main_outflow;
            } else {
                acc += du.so_comps * du.side_outflow;
            }
        }
        self.unit_mut(id).in_comps = acc / total;
    }

    /// Totalize the inflow and blend the inlet concentrations. Idempotent
    /// until new upstream data arrives.
    pub fn update_combined_input(&mut self, id: UnitId) {
        self.totalize_inflow(id);
        self.blend_inlet_comps(id);
    }

    /// Derive the one branch flow that is not externally fixed from the
    /// other two, according to the unit kind and flow-source tags.
    pub fn branch_flow_helper(&mut self, id: UnitId) {
        let u = self.unit_mut(id);
        match u.kind {
            UnitKind::Influent => {
                let design = u.influent.expect("influent data").design_flow;
                u.main_outflow = design;
                u.side_outflow = 0.0;
                u.total_inflow = design;
            }
            UnitKind::Pipe | UnitKind::Reactor | UnitKind::Was => {
                if u.upstream_sets_main_flow {
                    u.main_outflow = u.total_inflow;
                } else {
                    u.total_inflow = u.main_outflow;
                }
            }
            UnitKind::Effluent => {
                // main outflow is otherwise set by the run-time flow balance
                if u.upstream_sets_main_flow {
                    u.main_outflow = u.total_inflow;
                }
            }
            UnitKind::Splitter | UnitKind::FinalClarifier => {
                if u.srt_controller {
                    // side outflow was supplied by the waste draw
                    if u.upstream_sets_main_flow {
                        u.main_outflow = u.total_inflow - u.side_outflow;
                    } else {
                        u.total_inflow = u.main_outflow + u.side_outflow;
                    }
                } else if u.upstream_sets_main_flow {
                    u.main_outflow = u.total_inflow - u.side_outflow;
                } else {
                    u.side_outflow = u.total_inflow - u.main_outflow;
                    u.side_flow_defined = true;
                }
            }
        }
    }

    /// Main outlet flow after refreshing the unit's flow balance, m3/d.
    pub fn current_main_outflow(&mut self, id: UnitId) -> Real {
        self.totalize_inflow(id);
        self.branch_flow_helper(id);
        let u = self.unit(id);
        if u.main_outflow < 0.0 {
            warn!(unit = %u.name, flow = u.main_outflow, "main outlet flow is negative");
        }
        u.main_outflow
    }

    /// Side outlet flow after refreshing the unit's flow balance, m3/d.
    pub fn current_side_outflow(&mut self, id: UnitId) -> Real {
        self.totalize_inflow(id);
        self.branch_flow_helper(id);
        let u = self.unit(id);
        if u.side_outflow < 0.0 {
            warn!(unit = %u.name, flow = u.side_outflow, "side outlet flow is negative");
        }
        u.side_outflow
    }

    // ------------------------------------------------------------------
    // discharge

    /// Propagate this unit's computed outlet state into its downstream
    /// units' inlet slots.
    ///
    /// Reactors integrate their mixed liquor to steady state first;
    /// clarifiers split their solids. Concentrations always cross the
    /// boundary by value.
    pub fn discharge(
        &mut self,
        id: UnitId,
        integrator: &dyn ReactorIntegrator,
    ) -> PlantResult<()> {
        match self.unit(id).kind {
            UnitKind::Influent => {
                self.branch_flow_helper(id);
                let u = self.unit_mut(id);
                u.prev_mo_comps = u.in_comps;
                u.prev_so_comps = u.in_comps;
                u.mo_comps = u.in_comps;
                u.so_comps = u.in_comps;
                self.discharge_main_outlet(id)
            }
            UnitKind::Pipe => {
                let u = self.unit_mut(id);
                u.prev_mo_comps = u.mo_comps;
                u.prev_so_comps = u.so_comps;
                self.branch_flow_helper(id);
                let u = self.unit_mut(id);
                u.mo_comps = u.in_comps;
                u.so_comps = u.in_comps;
                self.discharge_main_outlet(id)
            }
            UnitKind::Splitter => {
                let u = self.unit_mut(id);
                u.prev_mo_comps = u.mo_comps;
                u.prev_so_comps = u.so_comps;
                self.branch_flow_helper(id);
                // an ideal splitter carries inlet concentrations on both
                // outlets
                let u = self.unit_mut(id);
                u.mo_comps = u.in_comps;
                u.so_comps = u.in_comps;
                self.discharge_main_outlet(id)?;
                self.discharge_side_outlet(id)
            }
            UnitKind::FinalClarifier => {
                let u = self.unit_mut(id);
                u.prev_mo_comps = u.mo_comps;
                u.prev_so_comps = u.so_comps;
                self.branch_flow_helper(id);
                settle::settle_solids(self.unit_mut(id));
                self.discharge_main_outlet(id)?;
                self.discharge_side_outlet(id)
            }
            UnitKind::Reactor => {
                self.branch_flow_helper(id);
                let u = self.unit_mut(id);
                u.prev_mo_comps = u.mo_comps;
                u.prev_so_comps = u.mo_comps;
                if u.total_inflow <= 0.0 {
                    return Err(PlantError::NoFlow {
                        unit: u.name.clone(),
                    });
                }
                let data = u.reactor.as_ref().expect("reactor data");
                let result = integrator.to_steady_state(
                    &data.model,
                    &u.mo_comps,
                    data.active_vol,
                    u.total_inflow,
                    &u.in_comps,
                );
                if !result.converged {
                    warn!(unit = %u.name, "reactor did not reach steady state");
                }
                u.mo_comps = result.state;
                u.so_comps = result.state;
                u.reactor.as_mut().expect("reactor data").last_converged = result.converged;
                self.discharge_main_outlet(id)
            }
            UnitKind::Was => {
                let u = self.unit_mut(id);
                u.prev_mo_comps = u.mo_comps;
                u.prev_so_comps = u.so_comps;
                self.branch_flow_helper(id);
                let u = self.unit_mut(id);
                u.mo_comps = u.in_comps;
                u.so_comps = u.in_comps;
                // a waste draw may discharge to solids handling or to nothing
                if self.unit(id).main_outlet.is_some() {
                    self.discharge_main_outlet(id)?;
                }
                Ok(())
            }
            UnitKind::Effluent => {
                let u = self.unit_mut(id);
                u.prev_mo_comps = u.mo_comps;
                u.prev_so_comps = u.so_comps;
                self.branch_flow_helper(id);
                let u = self.unit_mut(id);
                u.mo_comps = u.in_comps;
                u.so_comps = u.in_comps;
                Ok(())
            }
        }
    }

    fn discharge_main_outlet(&mut self, id: UnitId) -> PlantResult<()> {
        let receiver = self
            .unit(id)
            .main_outlet
            .ok_or_else(|| PlantError::MainOutletMissing {
                unit: self.unit(id).name.clone(),
            })?;
        let flow = self.unit(id).main_outflow;
        self.set_flow(receiver, id, flow);
        Ok(())
    }

    fn discharge_side_outlet(&mut self, id: UnitId) -> PlantResult<()> {
        let receiver = self
            .unit(id)
            .side_outlet
            .ok_or_else(|| PlantError::SideOutletMissing {
                unit: self.unit(id).name.clone(),
            })?;
        let flow = self.unit(id).side_outflow;
        self.set_flow(receiver, id, flow);
        Ok(())
    }

    // ------------------------------------------------------------------
    // waste draw

    /// Total solids mass held in the given reactors, g.
    pub fn solids_inventory(&self, reactors: &[UnitId]) -> Real {
        reactors
            .iter()
            .map(|&r| {
                let u = self.unit(r);
                let vol = u.reactor.as_ref().map_or(0.0, |d| d.active_vol);
                u.tss(Branch::Main) * vol
            })
            .sum()
    }

    /// Waste sludge flow that holds the plant at the target SRT, m3/d.
    ///
    /// Balances the reactor solids inventory against the solids leaving via
    /// the effluents; an unachievable SRT clamps to zero with a warning.
    pub fn waste_flow_for_srt(
        &mut self,
        was: UnitId,
        target_srt: Real,
        reactors: &[UnitId],
        effluents: &[UnitId],
    ) -> Real {
        self.update_combined_input(was);

        let effluent_solids: Real = effluents
            .iter()
            .map(|&e| {
                let u = self.unit(e);
                u.tss(Branch::Main) * u.main_outflow
            })
            .sum();

        let was_tss = self.unit(was).tss(Branch::Main);
        if was_tss == 0.0 {
            return 0.0;
        }

        let flow = (self.solids_inventory(reactors) / target_srt - effluent_solids) / was_tss;
        if flow < 0.0 {
            warn!(
                unit = %self.unit(was).name,
                target_srt,
                "target SRT cannot be achieved; waste flow clamped to zero"
            );
            return 0.0;
        }
        flow
    }
}

impl std::ops::Index<UnitId> for Plant {
    type Output = Unit;

    /// Panics if the id does not belong to this plant.
    fn index(&self, id: UnitId) -> &Unit {
        &self.units[id.index() as usize]
    }
}
