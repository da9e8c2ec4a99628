//! Process unit state: kinds, branches, flow-data-source tags.

use std::collections::BTreeMap;

use bf_asm::Asm1;
use bf_core::comps::CompVec;
use bf_core::{Real, Tolerances, UnitId, comps};

use crate::influent::InfluentQuality;

/// Concentration used to seed freshly created streams, mg/L.
///
/// Strictly positive so that ratio terms in the kinetics are defined from
/// the very first pass.
pub(crate) const SEED_CONC: Real = 1e-5;

/// The kind of a process unit.
///
/// A single tagged type replaces a deep inheritance chain: branch-flow
/// policy and discharge behavior dispatch on this tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// Source of plant flow and load; never receives.
    Influent,
    /// Connects units; no reaction, no split.
    Pipe,
    /// Ideal flow splitter with identical concentrations on all branches.
    Splitter,
    /// Completely mixed bioreactor governed by the ASM1 kinetics.
    Reactor,
    /// Splitter whose outlets carry different particulate concentrations.
    FinalClarifier,
    /// Waste activated sludge draw; computes its own flow from the SRT.
    Was,
    /// Terminal receiver of treated flow.
    Effluent,
}

impl UnitKind {
    /// Whether units of this kind accept upstream dischargers.
    pub fn has_inlet(self) -> bool {
        self != UnitKind::Influent
    }

    /// Whether units of this kind have a sidestream outlet.
    pub fn has_sidestream(self) -> bool {
        matches!(self, UnitKind::Splitter | UnitKind::FinalClarifier)
    }

    /// Whether units of this kind end a mainstream path.
    pub fn is_terminal(self) -> bool {
        matches!(self, UnitKind::Was | UnitKind::Effluent)
    }

    /// Display label, also used for default unit names.
    pub fn label(self) -> &'static str {
        match self {
            UnitKind::Influent => "Influent",
            UnitKind::Pipe => "Pipe",
            UnitKind::Splitter => "Splitter",
            UnitKind::Reactor => "Reactor",
            UnitKind::FinalClarifier => "FinalClarifier",
            UnitKind::Was => "WAS",
            UnitKind::Effluent => "Effluent",
        }
    }

    pub(crate) fn slot(self) -> usize {
        match self {
            UnitKind::Influent => 0,
            UnitKind::Pipe => 1,
            UnitKind::Splitter => 2,
            UnitKind::Reactor => 3,
            UnitKind::FinalClarifier => 4,
            UnitKind::Was => 5,
            UnitKind::Effluent => 6,
        }
    }
}

/// Number of unit kinds, for per-kind name counters.
pub(crate) const NUM_KINDS: usize = 7;

/// One of the three flow branches of a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Branch {
    Inlet,
    Main,
    Side,
}

/// Who determines the flow on a branch.
///
/// Resolution is monotonic: once a branch leaves `Tbd` it never reverts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FlowDataSource {
    /// Not yet determined.
    #[default]
    Tbd,
    /// Set by the upstream side of the branch.
    Upstream,
    /// Set by the downstream side of the branch at run time.
    Downstream,
    /// Set by the user or the simulation program.
    Program,
}

impl FlowDataSource {
    pub fn known(self) -> bool {
        self != FlowDataSource::Tbd
    }

    /// Set by the downstream or the program rather than by upstream data.
    pub fn external(self) -> bool {
        matches!(self, FlowDataSource::Downstream | FlowDataSource::Program)
    }
}

/// Reactor-specific state.
#[derive(Clone, Debug)]
pub(crate) struct ReactorData {
    /// Active process volume, m3.
    pub active_vol: Real,
    /// The mixed liquor's kinetics.
    pub model: Asm1,
    /// Whether the last integration reached the reactor's steady state.
    pub last_converged: bool,
}

/// Final-clarifier-specific state.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ClarifierData {
    /// Active clarifier volume excluding the storage cone, m3.
    pub active_vol: Real,
    /// Fraction of inlet solids captured into the underflow, in (0, 1).
    pub capture_rate: Real,
}

/// Influent-specific state.
#[derive(Clone, Copy, Debug)]
pub(crate) struct InfluentData {
    /// Plant design flow, m3/d.
    pub design_flow: Real,
    /// Measured wastewater characteristics.
    pub quality: InfluentQuality,
}

/// A process unit: one vertex of the plant graph.
///
/// Each unit owns its three observable states (inlet, main outlet, side
/// outlet) as flow plus a component vector. Vectors are `Copy`; crossing a
/// unit boundary always copies.
#[derive(Clone, Debug)]
pub struct Unit {
    pub(crate) id: UnitId,
    pub(crate) name: String,
    pub(crate) kind: UnitKind,

    /// Upstream dischargers and their contributed flows, m3/d.
    pub(crate) inlet: BTreeMap<UnitId, Real>,
    pub(crate) main_outlet: Option<UnitId>,
    pub(crate) side_outlet: Option<UnitId>,

    pub(crate) in_flow_src: FlowDataSource,
    pub(crate) mo_flow_src: FlowDataSource,
    pub(crate) so_flow_src: FlowDataSource,

    /// Whether the main outlet flow is derived from the total inflow.
    pub(crate) upstream_sets_main_flow: bool,
    /// Whether the sidestream flow has been given a value.
    pub(crate) side_flow_defined: bool,
    pub(crate) srt_controller: bool,

    pub(crate) total_inflow: Real,
    pub(crate) main_outflow: Real,
    pub(crate) side_outflow: Real,

    pub(crate) in_comps: CompVec,
    pub(crate) mo_comps: CompVec,
    pub(crate) so_comps: CompVec,
    pub(crate) prev_mo_comps: CompVec,
    pub(crate) prev_so_comps: CompVec,

    pub(crate) reactor: Option<ReactorData>,
    pub(crate) clarifier: Option<ClarifierData>,
    pub(crate) influent: Option<InfluentData>,
}

impl Unit {
    pub(crate) fn new(id: UnitId, name: String, kind: UnitKind) -> Self {
        let seed = CompVec::from_element(SEED_CONC);
        let mut unit = Self {
            id,
            name,
            kind,
            inlet: BTreeMap::new(),
            main_outlet: None,
            side_outlet: None,
            in_flow_src: FlowDataSource::Tbd,
            mo_flow_src: FlowDataSource::Tbd,
            so_flow_src: FlowDataSource::Tbd,
            upstream_sets_main_flow: false,
            side_flow_defined: false,
            srt_controller: false,
            total_inflow: 0.0,
            main_outflow: 0.0,
            side_outflow: 0.0,
            in_comps: seed,
            mo_comps: seed,
            so_comps: seed,
            prev_mo_comps: seed,
            prev_so_comps: seed,
            reactor: None,
            clarifier: None,
            influent: None,
        };

        match kind {
            UnitKind::Splitter => {}
            UnitKind::FinalClarifier => {
                unit.upstream_sets_main_flow = true;
            }
            UnitKind::Pipe | UnitKind::Reactor => {
                // no sidestream: its flow is zero by definition
                unit.so_flow_src = FlowDataSource::Program;
                unit.side_flow_defined = true;
                if kind == UnitKind::Reactor {
                    unit.upstream_sets_main_flow = true;
                }
            }
            UnitKind::Influent => {
                unit.in_flow_src = FlowDataSource::Upstream;
                unit.mo_flow_src = FlowDataSource::Upstream;
                unit.so_flow_src = FlowDataSource::Program;
                unit.side_flow_defined = true;
                unit.upstream_sets_main_flow = true;
            }
            UnitKind::Effluent => {
                unit.so_flow_src = FlowDataSource::Program;
                unit.side_flow_defined = true;
            }
            UnitKind::Was => {
                unit.in_flow_src = FlowDataSource::Downstream;
                unit.mo_flow_src = FlowDataSource::Program;
                unit.so_flow_src = FlowDataSource::Program;
                unit.side_flow_defined = true;
            }
        }

        unit
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Upstream dischargers and their contributed flows.
    pub fn upstream(&self) -> &BTreeMap<UnitId, Real> {
        &self.inlet
    }

    pub fn main_outlet(&self) -> Option<UnitId> {
        self.main_outlet
    }

    pub fn side_outlet(&self) -> Option<UnitId> {
        self.side_outlet
    }

    pub fn has_sidestream(&self) -> bool {
        self.kind.has_sidestream()
    }

    /// Whether the inlet is connected (influents count as connected).
    pub fn has_discharger(&self) -> bool {
        self.kind == UnitKind::Influent || !self.inlet.is_empty()
    }

    /// Whether the main outlet is connected (terminal kinds count as
    /// connected).
    pub fn main_outlet_connected(&self) -> bool {
        self.kind.is_terminal() || self.main_outlet.is_some()
    }

    pub fn side_outlet_connected(&self) -> bool {
        self.side_outlet.is_some()
    }

    /// Flow data sources for (inlet, main, side).
    pub fn flow_data_src(&self) -> (FlowDataSource, FlowDataSource, FlowDataSource) {
        (self.in_flow_src, self.mo_flow_src, self.so_flow_src)
    }

    pub fn is_srt_controller(&self) -> bool {
        self.srt_controller
    }

    pub fn sidestream_flow_defined(&self) -> bool {
        self.side_flow_defined
    }

    pub fn total_inflow(&self) -> Real {
        self.total_inflow
    }

    pub fn main_outflow(&self) -> Real {
        self.main_outflow
    }

    pub fn side_outflow(&self) -> Real {
        self.side_outflow
    }

    pub fn inlet_concs(&self) -> CompVec {
        self.in_comps
    }

    pub fn main_outlet_concs(&self) -> CompVec {
        self.mo_comps
    }

    pub fn side_outlet_concs(&self) -> CompVec {
        self.so_comps
    }

    /// Active volume for reactors and clarifiers, m3.
    pub fn active_volume(&self) -> Option<Real> {
        self.reactor
            .as_ref()
            .map(|r| r.active_vol)
            .or_else(|| self.clarifier.as_ref().map(|c| c.active_vol))
    }

    /// Whether the last reactor integration reached steady state.
    pub fn reactor_converged(&self) -> Option<bool> {
        self.reactor.as_ref().map(|r| r.last_converged)
    }

    /// The kinetics of a reactor's mixed liquor.
    pub fn asm_model(&self) -> Option<&Asm1> {
        self.reactor.as_ref().map(|r| &r.model)
    }

    /// A final clarifier's solids capture rate.
    pub fn capture_rate(&self) -> Option<Real> {
        self.clarifier.as_ref().map(|c| c.capture_rate)
    }

    fn branch_comps(&self, branch: Branch) -> &CompVec {
        match branch {
            Branch::Inlet => &self.in_comps,
            Branch::Main => &self.mo_comps,
            Branch::Side => &self.so_comps,
        }
    }

    /// Total suspended solids of a branch, mg/L.
    pub fn tss(&self, branch: Branch) -> Real {
        comps::tss(self.branch_comps(branch))
    }

    /// Volatile suspended solids of a branch, mg/L.
    pub fn vss(&self, branch: Branch) -> Real {
        comps::vss(self.branch_comps(branch))
    }

    /// Total COD of a branch, mg/L.
    pub fn cod(&self, branch: Branch) -> Real {
        comps::cod(self.branch_comps(branch))
    }

    /// Total nitrogen of a branch, mg/L.
    pub fn total_n(&self, branch: Branch) -> Real {
        comps::total_n(self.branch_comps(branch))
    }

    /// Per-unit convergence test between two solver rounds.
    ///
    /// Flow conservation must hold within `flow_tol` and both outlet vectors
    /// must be within `conc_tol` of the previous round. Influents are the
    /// boundary condition and always count as converged.
    pub fn is_converged(&self, flow_tol: Real, conc_tol: Tolerances) -> bool {
        if self.kind == UnitKind::Influent {
            return true;
        }
        let flow_ok =
            (self.total_inflow - self.main_outflow - self.side_outflow).abs() < flow_tol;

        let conc_ok = |curr: &CompVec, prev: &CompVec| {
            curr.iter()
                .zip(prev.iter())
                .all(|(c, p)| (c - p).abs() <= conc_tol.abs + conc_tol.rel * p.abs())
        };

        flow_ok
            && conc_ok(&self.mo_comps, &self.prev_mo_comps)
            && conc_ok(&self.so_comps, &self.prev_so_comps)
    }
}
