//! The resolved, validated automaton.
//!
//! A [`Component`] is produced by [`ComponentBuilder::build`] and is
//! read-only afterwards. Regimes and transitions live in two arenas and refer
//! to each other through [`RegimeId`] and [`TransitionId`], so the
//! regime/transition back-references never form ownership cycles. All
//! access goes through the borrowed [`RegimeView`] and [`TransitionView`]
//! handles.

use indexmap::{IndexMap, IndexSet};

use crate::ir::analysis::regime_graph;
use crate::ir::analysis::symbols::SymbolTable;
use crate::ir::ast::{
    Action, AnalogPort, Binding, Condition, EventPort, Expression, Guard, NameGenerator, Ode,
    Regime, RegimeBody, Transition,
};
use crate::ir::error::Result;
use crate::ir::structural::create_component::create_component;

// =============================================================================
// Arena
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegimeId(pub(crate) u32);

impl RegimeId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionId(pub(crate) u32);

impl TransitionId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RegimeData {
    pub name: String,
    pub body: RegimeBody,
    pub transitions: Vec<TransitionId>,
}

#[derive(Debug, Clone)]
pub(crate) struct TransitionData {
    pub name: String,
    pub guard: Guard,
    pub actions: Vec<Action>,
    pub from: RegimeId,
    pub to: Option<RegimeId>,
}

// =============================================================================
// Builder
// =============================================================================

/// Collects regimes, transitions, bindings and ports for one component.
///
/// Regimes and transitions may be supplied in any mix: regimes reachable as
/// transition endpoints and transitions attached to regimes are both picked
/// up when the component is built.
#[derive(Debug, Clone, Default)]
pub struct ComponentBuilder {
    pub(crate) name: String,
    pub(crate) parameters: Option<Vec<String>>,
    pub(crate) regimes: Vec<Regime>,
    pub(crate) transitions: Vec<Transition>,
    pub(crate) bindings: Vec<Binding>,
    pub(crate) ports: Vec<AnalogPort>,
    names: NameGenerator,
}

impl ComponentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Declare the parameter set. The build fails unless it equals the
    /// inferred one.
    pub fn parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters = Some(parameters.into_iter().map(Into::into).collect());
        self
    }

    pub fn regime(mut self, regime: Regime) -> Self {
        self.regimes.push(regime);
        self
    }

    pub fn regimes(mut self, regimes: impl IntoIterator<Item = Regime>) -> Self {
        self.regimes.extend(regimes);
        self
    }

    pub fn transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn transitions(mut self, transitions: impl IntoIterator<Item = Transition>) -> Self {
        self.transitions.extend(transitions);
        self
    }

    pub fn binding(mut self, binding: Binding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Add a binding parsed from `lhs := rhs` text.
    pub fn binding_text(self, text: &str) -> Result<Self> {
        Ok(self.binding(Binding::parse(text)?))
    }

    pub fn port(mut self, port: AnalogPort) -> Self {
        self.ports.push(port);
        self
    }

    pub fn ports(mut self, ports: impl IntoIterator<Item = AnalogPort>) -> Self {
        self.ports.extend(ports);
        self
    }

    /// The generator handing out default regime and transition names for
    /// this component.
    pub fn names(&mut self) -> &mut NameGenerator {
        &mut self.names
    }

    /// Close, resolve and validate the graph.
    pub fn build(self) -> Result<Component> {
        create_component(self)
    }
}

// =============================================================================
// Component
// =============================================================================

#[derive(Debug, Clone)]
pub struct Component {
    pub(crate) name: String,
    pub(crate) regimes: Vec<RegimeData>,
    pub(crate) transitions: Vec<TransitionData>,
    pub(crate) bindings: IndexMap<String, Binding>,
    pub(crate) analog_ports: Vec<AnalogPort>,
    pub(crate) symbols: SymbolTable,
    pub(crate) parameters: IndexSet<String>,
}

impl Component {
    pub fn builder(name: impl Into<String>) -> ComponentBuilder {
        ComponentBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The inferred free parameters.
    pub fn parameters(&self) -> &IndexSet<String> {
        &self.parameters
    }

    pub fn regime(&self, id: RegimeId) -> RegimeView<'_> {
        RegimeView {
            component: self,
            id,
        }
    }

    pub fn transition(&self, id: TransitionId) -> TransitionView<'_> {
        TransitionView {
            component: self,
            id,
        }
    }

    pub fn regimes(&self) -> impl Iterator<Item = RegimeView<'_>> {
        (0..self.regimes.len()).map(move |i| self.regime(RegimeId(i as u32)))
    }

    pub fn transitions(&self) -> impl Iterator<Item = TransitionView<'_>> {
        (0..self.transitions.len()).map(move |i| self.transition(TransitionId(i as u32)))
    }

    pub fn regime_count(&self) -> usize {
        self.regimes.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn regime_by_name(&self, name: &str) -> Option<RegimeView<'_>> {
        self.regimes().find(|r| r.name() == name)
    }

    pub fn transition_by_name(&self, name: &str) -> Option<TransitionView<'_>> {
        self.transitions().find(|t| t.name() == name)
    }

    /// Sources of the transitions entering `target`.
    pub fn regimes_to(&self, target: RegimeId) -> Vec<RegimeView<'_>> {
        let mut sources = IndexSet::new();
        for t in &self.transitions {
            if t.to == Some(target) {
                sources.insert(t.from);
            }
        }
        sources.into_iter().map(|id| self.regime(id)).collect()
    }

    /// Per regime: its transitions' actions, then its own equations.
    pub fn equations(&self) -> impl Iterator<Item = &Expression> {
        self.regimes().flat_map(|r| {
            r.transitions()
                .flat_map(|t| t.equations())
                .chain(r.equations())
        })
    }

    pub fn bindings(&self) -> &IndexMap<String, Binding> {
        &self.bindings
    }

    pub fn analog_ports(&self) -> &[AnalogPort] {
        &self.analog_ports
    }

    pub fn event_ports(&self) -> impl Iterator<Item = &EventPort> {
        self.transitions().flat_map(|t| t.event_ports())
    }

    /// Guard conditions of every transition.
    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.transitions
            .iter()
            .filter_map(|t| t.guard.condition())
    }

    // === Symbol views ===

    /// Dependent variables of every ODE.
    pub fn integrated_variables(&self) -> &IndexSet<String> {
        &self.symbols.integrated
    }

    /// Targets of assignments and in-place updates.
    pub fn assigned_variables(&self) -> &IndexSet<String> {
        &self.symbols.assigned
    }

    /// Independent variables of every ODE (`t` in `dV/dt`).
    pub fn independent_variables(&self) -> &IndexSet<String> {
        &self.symbols.independent
    }

    /// Integrated and assigned variables.
    pub fn state_variables(&self) -> IndexSet<String> {
        self.symbols.state()
    }

    pub fn bound_symbols(&self) -> &IndexSet<String> {
        &self.symbols.bound
    }

    /// Variables and bound symbols; everything that is not a parameter.
    pub fn non_parameter_symbols(&self) -> IndexSet<String> {
        self.symbols.non_parameter()
    }
}

/// Components compare by name and content: regimes, transitions and
/// bindings are matched by name, ordering is ignored.
impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        fn ports_eq(a: &[AnalogPort], b: &[AnalogPort]) -> bool {
            let a: IndexSet<&AnalogPort> = a.iter().collect();
            let b: IndexSet<&AnalogPort> = b.iter().collect();
            a == b
        }

        self.name == other.name
            && self.parameters == other.parameters
            && self.bindings == other.bindings
            && ports_eq(&self.analog_ports, &other.analog_ports)
            && self.regimes.len() == other.regimes.len()
            && self.transitions.len() == other.transitions.len()
            && self.regimes().all(|r| {
                other
                    .regime_by_name(r.name())
                    .is_some_and(|o| r.same_content(&o))
            })
            && self.transitions().all(|t| {
                other
                    .transition_by_name(t.name())
                    .is_some_and(|o| t.same_content(&o))
            })
    }
}

// =============================================================================
// Views
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct RegimeView<'a> {
    component: &'a Component,
    id: RegimeId,
}

impl<'a> RegimeView<'a> {
    fn data(&self) -> &'a RegimeData {
        &self.component.regimes[self.id.index()]
    }

    pub fn id(&self) -> RegimeId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        &self.data().name
    }

    pub fn body(&self) -> &'a RegimeBody {
        &self.data().body
    }

    pub fn nodes(&self) -> impl Iterator<Item = &'a Expression> {
        self.data().body.nodes()
    }

    pub fn equations(&self) -> impl Iterator<Item = &'a Expression> {
        self.data().body.equations()
    }

    pub fn bindings(&self) -> impl Iterator<Item = &'a Binding> {
        self.data().body.bindings()
    }

    pub fn odes(&self) -> impl Iterator<Item = &'a Ode> {
        self.data().body.odes()
    }

    /// Outgoing transitions.
    pub fn transitions(&self) -> impl Iterator<Item = TransitionView<'a>> {
        let component = self.component;
        self.data()
            .transitions
            .iter()
            .map(move |&id| component.transition(id))
    }

    /// Outgoing transitions that change regime.
    pub fn transitions_with_target(&self) -> impl Iterator<Item = TransitionView<'a>> {
        self.transitions().filter(|t| t.target().is_some())
    }

    /// The transition to `target`, if exactly one exists.
    pub fn get_transition_to(&self, target: RegimeId) -> Option<TransitionView<'a>> {
        let mut matching = self
            .transitions()
            .filter(|t| t.target().map(|r| r.id()) == Some(target));
        match (matching.next(), matching.next()) {
            (Some(t), None) => Some(t),
            _ => None,
        }
    }

    /// Regimes one transition away.
    pub fn neighbors(&self) -> IndexSet<RegimeId> {
        self.transitions_with_target()
            .filter_map(|t| t.target().map(|r| r.id()))
            .collect()
    }

    /// Target regime to the transitions leading there.
    pub fn neighbor_map(&self) -> IndexMap<RegimeId, Vec<TransitionView<'a>>> {
        let mut map: IndexMap<RegimeId, Vec<TransitionView<'a>>> = IndexMap::new();
        for t in self.transitions_with_target() {
            if let Some(target) = t.target() {
                map.entry(target.id()).or_default().push(t);
            }
        }
        map
    }

    /// Every regime reachable from this one by following transitions,
    /// this one included.
    pub fn regimes_in_graph(&self) -> IndexSet<RegimeId> {
        regime_graph::reachable_from(self.component, self.id)
    }

    fn same_content(&self, other: &RegimeView<'_>) -> bool {
        let names = |r: &RegimeView<'_>| -> IndexSet<String> {
            r.transitions().map(|t| t.name().to_string()).collect()
        };
        self.name() == other.name() && self.body() == other.body() && names(self) == names(other)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TransitionView<'a> {
    component: &'a Component,
    id: TransitionId,
}

impl<'a> TransitionView<'a> {
    fn data(&self) -> &'a TransitionData {
        &self.component.transitions[self.id.index()]
    }

    pub fn id(&self) -> TransitionId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        &self.data().name
    }

    pub fn guard(&self) -> &'a Guard {
        &self.data().guard
    }

    pub fn condition(&self) -> Option<&'a Condition> {
        self.data().guard.condition()
    }

    pub fn actions(&self) -> &'a [Action] {
        &self.data().actions
    }

    pub fn source(&self) -> RegimeView<'a> {
        self.component.regime(self.data().from)
    }

    /// `None` for a transition that stays in its source regime.
    pub fn target(&self) -> Option<RegimeView<'a>> {
        self.data().to.map(|id| self.component.regime(id))
    }

    pub fn equations(&self) -> impl Iterator<Item = &'a Expression> {
        self.data().actions.iter().filter_map(|a| match a {
            Action::Equation(e) => Some(e),
            Action::Port(_) => None,
        })
    }

    /// The guard port, if any, followed by the send ports among the actions.
    pub fn event_ports(&self) -> impl Iterator<Item = &'a EventPort> {
        let data = self.data();
        let guard = match &data.guard {
            Guard::Port(p) => Some(p),
            Guard::Condition(_) => None,
        };
        guard.into_iter().chain(data.actions.iter().filter_map(|a| match a {
            Action::Port(p) => Some(p),
            Action::Equation(_) => None,
        }))
    }

    fn same_content(&self, other: &TransitionView<'_>) -> bool {
        self.name() == other.name()
            && self.guard() == other.guard()
            && self.actions() == other.actions()
            && self.source().name() == other.source().name()
            && self.target().map(|r| r.name()) == other.target().map(|r| r.name())
    }
}
