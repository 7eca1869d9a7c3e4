//! Component construction: closure, naming, resolution and validation.
//!
//! [`create_component`] turns a [`ComponentBuilder`] into a [`Component`]
//! in one pass:
//!
//! 1. **Closure** collects every regime and transition reachable from the
//!    supplied ones, in either direction.
//! 2. **Naming** keys both arenas by name. Two different entities sharing a
//!    name are rejected; the same entity reached twice is merged.
//! 3. **Resolution** turns name links into arena ids and attaches each
//!    transition to its source regime.
//! 4. **Connectivity**, **bindings**, **parameters** and **ports** are then
//!    checked against the resolved graph.
//!
//! Any failure discards everything built so far.

use indexmap::IndexMap;
use log::debug;

use crate::ir::analysis::bindings::binding_order;
use crate::ir::analysis::ports::check_analog_ports;
use crate::ir::analysis::regime_graph::check_connected;
use crate::ir::analysis::symbols::{
    check_binding_references, check_declared_parameters, infer_parameters, SymbolTable,
};
use crate::ir::ast::{
    Action, Binding, Endpoint, Guard, Regime, RegimeBody, Transition, TransitionEntry,
};
use crate::ir::component::{
    Component, ComponentBuilder, RegimeData, RegimeId, TransitionData, TransitionId,
};
use crate::ir::error::{ModelError, Result};

// =============================================================================
// Closure
// =============================================================================

/// A reference to an arena entry: by name until resolved.
#[derive(Debug, Clone, PartialEq)]
enum Link<Id> {
    Unresolved(String),
    Resolved(Id),
}

#[derive(Debug)]
struct CollectedRegime {
    body: RegimeBody,
    transitions: Vec<Link<TransitionId>>,
}

#[derive(Debug)]
struct CollectedTransition {
    guard: Guard,
    actions: Vec<Action>,
    from: Option<Link<RegimeId>>,
    to: Option<Link<RegimeId>>,
}

/// Name-keyed arenas filled while walking the supplied entities.
#[derive(Debug, Default)]
struct Collector {
    regimes: IndexMap<String, CollectedRegime>,
    transitions: IndexMap<String, CollectedTransition>,
}

fn regime_link_name<'a>(
    regimes: &'a IndexMap<String, CollectedRegime>,
    link: &'a Link<RegimeId>,
) -> &'a str {
    match link {
        Link::Unresolved(name) => name,
        Link::Resolved(id) => regimes
            .get_index(id.index())
            .map_or("", |(name, _)| name.as_str()),
    }
}

impl Collector {
    fn add_regime(&mut self, regime: Regime) -> Result<RegimeId> {
        let (name, body, entries) = regime.into_parts();

        let mut links = Vec::with_capacity(entries.len());
        for entry in entries {
            links.push(match entry {
                TransitionEntry::Reference(t) => Link::Unresolved(t),
                TransitionEntry::Transition(t) => Link::Resolved(self.add_transition(t)?),
            });
        }

        if let Some((idx, _, existing)) = self.regimes.get_full_mut(&name) {
            if existing.body != body {
                return Err(ModelError::DuplicateRegime(name));
            }
            for link in links {
                if !existing.transitions.contains(&link) {
                    existing.transitions.push(link);
                }
            }
            return Ok(RegimeId(idx as u32));
        }

        let (idx, _) = self.regimes.insert_full(
            name,
            CollectedRegime {
                body,
                transitions: links,
            },
        );
        Ok(RegimeId(idx as u32))
    }

    fn add_transition(&mut self, transition: Transition) -> Result<TransitionId> {
        let (name, guard, actions, from, to) = transition.into_parts();
        let from = from.map(|e| self.link_endpoint(e)).transpose()?;
        let to = to.map(|e| self.link_endpoint(e)).transpose()?;
        let collected = CollectedTransition {
            guard,
            actions,
            from,
            to,
        };

        if !self.transitions.contains_key(&name) {
            let (idx, _) = self.transitions.insert_full(name, collected);
            return Ok(TransitionId(idx as u32));
        }

        let regimes = &self.regimes;
        let Some((idx, _, existing)) = self.transitions.get_full_mut(&name) else {
            return Err(ModelError::DuplicateTransition(name));
        };
        let same_to = match (&existing.to, &collected.to) {
            (None, None) => true,
            (Some(a), Some(b)) => regime_link_name(regimes, a) == regime_link_name(regimes, b),
            _ => false,
        };
        if existing.guard != collected.guard || existing.actions != collected.actions || !same_to
        {
            return Err(ModelError::DuplicateTransition(name));
        }

        if let Some(from) = collected.from {
            let owner = existing
                .from
                .as_ref()
                .map(|link| regime_link_name(regimes, link).to_string());
            match owner {
                None => existing.from = Some(from),
                Some(owner) => {
                    let from = regime_link_name(regimes, &from);
                    if owner != from {
                        return Err(ModelError::TransitionReattached {
                            transition: name,
                            owner,
                            regime: from.to_string(),
                        });
                    }
                }
            }
        }
        Ok(TransitionId(idx as u32))
    }

    fn link_endpoint(&mut self, endpoint: Endpoint) -> Result<Link<RegimeId>> {
        match endpoint {
            Endpoint::Reference(name) => Ok(Link::Unresolved(name)),
            Endpoint::Regime(regime) => Ok(Link::Resolved(self.add_regime(*regime)?)),
        }
    }
}

// =============================================================================
// Resolution
// =============================================================================

fn resolve_regime(
    collector: &Collector,
    link: &Link<RegimeId>,
    transition: &str,
) -> Result<RegimeId> {
    match link {
        Link::Resolved(id) => Ok(*id),
        Link::Unresolved(name) => collector
            .regimes
            .get_index_of(name)
            .map(|idx| RegimeId(idx as u32))
            .ok_or_else(|| ModelError::UnresolvedRegime {
                transition: transition.to_string(),
                name: name.clone(),
            }),
    }
}

fn resolve_transition(
    collector: &Collector,
    link: &Link<TransitionId>,
    regime: &str,
) -> Result<TransitionId> {
    match link {
        Link::Resolved(id) => Ok(*id),
        Link::Unresolved(name) => collector
            .transitions
            .get_index_of(name)
            .map(|idx| TransitionId(idx as u32))
            .ok_or_else(|| ModelError::UnresolvedTransition {
                regime: regime.to_string(),
                name: name.clone(),
            }),
    }
}

/// Collapse every link into an arena id and attach transitions to their
/// source regimes.
fn resolve(collector: Collector) -> Result<(Vec<RegimeData>, Vec<TransitionData>)> {
    let regime_name = |id: RegimeId| -> String {
        collector
            .regimes
            .get_index(id.index())
            .map(|(name, _)| name.clone())
            .unwrap_or_default()
    };

    // Source of each transition, from its own `from` or the regime listing it.
    let mut owners: Vec<Option<RegimeId>> = Vec::with_capacity(collector.transitions.len());
    for (name, t) in &collector.transitions {
        owners.push(
            t.from
                .as_ref()
                .map(|link| resolve_regime(&collector, link, name))
                .transpose()?,
        );
    }
    for (idx, (name, regime)) in collector.regimes.iter().enumerate() {
        let id = RegimeId(idx as u32);
        for link in &regime.transitions {
            let tid = resolve_transition(&collector, link, name)?;
            match owners[tid.index()] {
                None => owners[tid.index()] = Some(id),
                Some(owner) if owner != id => {
                    return Err(ModelError::TransitionReattached {
                        transition: collector
                            .transitions
                            .get_index(tid.index())
                            .map(|(n, _)| n.clone())
                            .unwrap_or_default(),
                        owner: regime_name(owner),
                        regime: name.clone(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    let mut transitions = Vec::with_capacity(collector.transitions.len());
    for ((name, t), owner) in collector.transitions.iter().zip(&owners) {
        let from = owner.ok_or_else(|| ModelError::DetachedTransition(name.clone()))?;
        let to = t
            .to
            .as_ref()
            .map(|link| resolve_regime(&collector, link, name))
            .transpose()?;
        if to == Some(from) {
            return Err(ModelError::TransitionToSelf {
                transition: name.clone(),
                regime: regime_name(from),
            });
        }
        transitions.push(TransitionData {
            name: name.clone(),
            guard: t.guard.clone(),
            actions: t.actions.clone(),
            from,
            to,
        });
    }

    let regimes = collector
        .regimes
        .iter()
        .enumerate()
        .map(|(idx, (name, regime))| RegimeData {
            name: name.clone(),
            body: regime.body.clone(),
            transitions: transitions
                .iter()
                .enumerate()
                .filter(|(_, t)| t.from.index() == idx)
                .map(|(tid, _)| TransitionId(tid as u32))
                .collect(),
        })
        .collect();

    Ok((regimes, transitions))
}

// =============================================================================
// Bindings
// =============================================================================

/// Merge supplied and regime-embedded bindings into one name-keyed map.
fn assemble_bindings(
    supplied: Vec<Binding>,
    regimes: &[RegimeData],
) -> Result<IndexMap<String, Binding>> {
    let embedded = regimes
        .iter()
        .flat_map(|r| r.body.bindings().cloned())
        .collect::<Vec<_>>();

    let mut bindings: IndexMap<String, Binding> = IndexMap::new();
    for binding in supplied.into_iter().chain(embedded) {
        match bindings.get(binding.name()) {
            Some(existing) if *existing != binding => {
                return Err(ModelError::ConflictingBindings(binding.name().to_string()));
            }
            Some(_) => {}
            None => {
                bindings.insert(binding.name().to_string(), binding);
            }
        }
    }
    binding_order(&bindings)?;
    Ok(bindings)
}

// =============================================================================
// Entry point
// =============================================================================

/// Build and validate a component.
pub fn create_component(builder: ComponentBuilder) -> Result<Component> {
    let ComponentBuilder {
        name,
        parameters: declared,
        regimes,
        transitions,
        bindings,
        ports,
        ..
    } = builder;

    if regimes.is_empty() && transitions.is_empty() {
        return Err(ModelError::EmptyComponent(name));
    }

    let mut collector = Collector::default();
    for regime in regimes {
        collector.add_regime(regime)?;
    }
    for transition in transitions {
        collector.add_transition(transition)?;
    }
    debug!(
        "component '{}': collected {} regime(s), {} transition(s)",
        name,
        collector.regimes.len(),
        collector.transitions.len()
    );

    let (regimes, transitions) = resolve(collector)?;
    let bindings = assemble_bindings(bindings, &regimes)?;
    debug!("component '{}': {} binding(s)", name, bindings.len());

    let mut component = Component {
        name,
        regimes,
        transitions,
        bindings,
        analog_ports: ports,
        symbols: SymbolTable::default(),
        parameters: Default::default(),
    };
    check_connected(&component)?;

    component.symbols = SymbolTable::collect(&component)?;
    check_binding_references(&component, &component.symbols)?;
    component.parameters = infer_parameters(&component, &component.symbols);
    debug!(
        "component '{}': inferred parameters {:?}",
        component.name, component.parameters
    );

    if let Some(declared) = &declared {
        check_declared_parameters(declared, &component.parameters)?;
    }
    check_analog_ports(
        &component.analog_ports,
        &component.parameters,
        &component.symbols,
    )?;

    Ok(component)
}
