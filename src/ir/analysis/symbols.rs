//! Symbol classification and parameter inference.
//!
//! Every free name in a component is either a variable (integrated,
//! assigned or independent), a bound symbol (a binding name) or a
//! parameter. Parameters are whatever is left once variables, bound symbols
//! and the reserved math names are removed.

use indexmap::IndexSet;

use crate::ir::ast::Expression;
use crate::ir::component::Component;
use crate::ir::error::{ModelError, Result};
use crate::ir::math::is_reserved;

/// The non-parameter symbols of a component, by role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    /// `X` for every `dX/dt`.
    pub integrated: IndexSet<String>,
    /// Targets of assignments and in-place updates, in regimes and
    /// transitions alike.
    pub assigned: IndexSet<String>,
    /// `t` for every `dX/dt`.
    pub independent: IndexSet<String>,
    /// Binding names.
    pub bound: IndexSet<String>,
}

impl SymbolTable {
    /// Classify the symbols of `component`.
    ///
    /// A binding name that is also integrated or assigned is a
    /// [`ModelError::BoundSymbolAssigned`].
    pub fn collect(component: &Component) -> Result<Self> {
        let mut table = SymbolTable::default();

        for regime in component.regimes() {
            for ode in regime.odes() {
                table.integrated.insert(ode.dependent_variable().to_string());
                table
                    .independent
                    .insert(ode.independent_variable().to_string());
            }
        }

        for eq in component.equations() {
            if let Expression::Assignment(_) | Expression::Inplace(_) = eq {
                table.assigned.insert(eq.defined_symbol().to_string());
            }
        }

        table.bound = component.bindings().keys().cloned().collect();

        if let Some(symbol) = table
            .bound
            .iter()
            .find(|b| table.integrated.contains(*b) || table.assigned.contains(*b))
        {
            return Err(ModelError::BoundSymbolAssigned(symbol.clone()));
        }

        Ok(table)
    }

    /// Integrated and assigned variables.
    pub fn state(&self) -> IndexSet<String> {
        self.integrated.union(&self.assigned).cloned().collect()
    }

    /// Variables of every kind.
    pub fn variables(&self) -> IndexSet<String> {
        self.integrated
            .iter()
            .chain(&self.assigned)
            .chain(&self.independent)
            .cloned()
            .collect()
    }

    /// Variables and bound symbols.
    pub fn non_parameter(&self) -> IndexSet<String> {
        let mut out = self.variables();
        out.extend(self.bound.iter().cloned());
        out
    }
}

/// Free names of every equation, condition and binding that are not
/// variables, bound symbols or reserved math names.
pub fn infer_parameters(component: &Component, symbols: &SymbolTable) -> IndexSet<String> {
    let non_parameter = symbols.non_parameter();
    let equation_names = component.equations().flat_map(|e| e.names());
    let condition_names = component.conditions().flat_map(|c| c.names());
    let binding_names = component.bindings().values().flat_map(|b| b.names());

    equation_names
        .chain(condition_names)
        .chain(binding_names)
        .filter(|name| !non_parameter.contains(*name) && !is_reserved(name))
        .cloned()
        .collect()
}

/// Compare a declared parameter list against the inferred set.
pub fn check_declared_parameters(declared: &[String], inferred: &IndexSet<String>) -> Result<()> {
    let declared: IndexSet<&String> = declared.iter().collect();
    let missing: Vec<String> = inferred
        .iter()
        .filter(|p| !declared.contains(p))
        .cloned()
        .collect();
    let extra: Vec<String> = declared
        .iter()
        .filter(|p| !inferred.contains(**p))
        .map(|p| p.to_string())
        .collect();

    if missing.is_empty() && extra.is_empty() {
        Ok(())
    } else {
        Err(ModelError::ParameterMismatch { extra, missing })
    }
}

/// Bindings are static: their rhs may reference parameters, other bindings
/// and math names, never a variable.
pub fn check_binding_references(component: &Component, symbols: &SymbolTable) -> Result<()> {
    let variables = symbols.variables();
    for binding in component.bindings().values() {
        let offending: Vec<String> = binding
            .names()
            .iter()
            .filter(|n| variables.contains(*n) && !symbols.bound.contains(*n))
            .cloned()
            .collect();
        if !offending.is_empty() {
            return Err(ModelError::BindingReferencesVariables {
                binding: binding.name().to_string(),
                symbols: offending,
            });
        }
    }
    Ok(())
}
