//! Back-substitution of bindings.
//!
//! Both passes are opt-in and leave the receiver untouched: they return an
//! expanded copy. Bindings are first expanded into each other in dependency
//! order, so every binding used for the equation pass is already free of
//! other bindings and a single substitution per reference is enough.
//! Running either pass on its own output changes nothing.

use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};

use crate::ir::analysis::bindings::{binding_order, dependencies};
use crate::ir::ast::{Action, Binding, Expression, Guard};
use crate::ir::component::Component;
use crate::ir::error::{ModelError, Result};

impl Component {
    /// A copy whose bindings reference no other binding.
    pub fn backsub_bindings(&self) -> Result<Component> {
        let mut out = self.clone();
        out.bindings = expand_bindings(&self.bindings)?;
        Ok(out)
    }

    /// A copy where every binding is inlined into the equations, transition
    /// actions, guards and regime-embedded bindings that use it.
    ///
    /// An equation calling a function that is neither a math function nor a
    /// binding is a [`ModelError::UnresolvableFunction`].
    pub fn backsub_equations(&self) -> Result<Component> {
        let bindings = expand_bindings(&self.bindings)?;
        let mut out = self.clone();

        for regime in &mut out.regimes {
            regime.body.try_for_each_mut(&mut |e: &mut Expression| {
                for dep in binding_refs(e.names(), e.funcs(), &bindings) {
                    e.substitute_binding(&bindings[&dep])?;
                }
                warn_bare_references(e.names(), &e.as_expr(), &bindings);
                check_resolved(e.missing_functions(), &e.as_expr(), &bindings)
            })?;
        }

        for transition in &mut out.transitions {
            for action in &mut transition.actions {
                if let Action::Equation(e) = action {
                    for dep in binding_refs(e.names(), e.funcs(), &bindings) {
                        e.substitute_binding(&bindings[&dep])?;
                    }
                    check_resolved(e.missing_functions(), &e.as_expr(), &bindings)?;
                }
            }
            if let Guard::Condition(c) = &mut transition.guard {
                for dep in binding_refs(c.names(), c.funcs(), &bindings) {
                    c.substitute_binding(&bindings[&dep])?;
                }
                check_resolved(c.missing_functions(), c.cond(), &bindings)?;
            }
        }

        debug!(
            "component '{}': inlined {} binding(s)",
            out.name,
            bindings.len()
        );
        out.bindings = bindings;
        Ok(out)
    }
}

/// Binding names referenced through `names` or `funcs`.
fn binding_refs(
    names: &IndexSet<String>,
    funcs: &IndexSet<String>,
    bindings: &IndexMap<String, Binding>,
) -> Vec<String> {
    names
        .iter()
        .chain(funcs)
        .filter(|n| bindings.contains_key(*n))
        .cloned()
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Function bindings named without a call are left as plain symbols.
fn warn_bare_references(
    names: &IndexSet<String>,
    expr: &str,
    bindings: &IndexMap<String, Binding>,
) {
    for name in names {
        if bindings.get(name).is_some_and(Binding::is_function) {
            warn!("'{expr}' names function binding '{name}' without calling it");
        }
    }
}

/// Any missing function left after substitution that is not a binding.
fn check_resolved<'a>(
    mut missing: impl Iterator<Item = &'a str>,
    expr: &str,
    bindings: &IndexMap<String, Binding>,
) -> Result<()> {
    match missing.find(|f| !bindings.contains_key(*f)) {
        Some(function) => Err(ModelError::UnresolvableFunction {
            expr: expr.to_string(),
            function: function.to_string(),
        }),
        None => Ok(()),
    }
}

/// Expand every binding into the ones that depend on it, dependencies
/// first.
fn expand_bindings(bindings: &IndexMap<String, Binding>) -> Result<IndexMap<String, Binding>> {
    let mut out = bindings.clone();
    for name in binding_order(bindings)? {
        let Some(mut binding) = out.get(&name).cloned() else {
            continue;
        };
        let deps: Vec<String> = dependencies(&binding, &out).map(str::to_string).collect();
        for dep in deps {
            if let Some(resolved) = out.get(&dep).cloned() {
                binding.substitute_binding(&resolved)?;
            }
        }
        check_resolved(binding.missing_functions(), &binding.to_string(), &out)?;
        out.insert(name, binding);
    }
    Ok(out)
}
