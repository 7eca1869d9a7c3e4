//! Binding dependency graph.
//!
//! A binding depends on every other binding it references, by symbol or by
//! call. The graph must be acyclic; a topological order of it is the order
//! in which bindings can be expanded into each other.

use indexmap::IndexMap;

use crate::ir::ast::Binding;
use crate::ir::error::{ModelError, Result};

/// Names of the bindings `binding` references directly.
pub fn dependencies<'a>(
    binding: &'a Binding,
    bindings: &'a IndexMap<String, Binding>,
) -> impl Iterator<Item = &'a str> {
    binding
        .names()
        .iter()
        .chain(binding.funcs())
        .map(String::as_str)
        .filter(move |name| *name != binding.name() && bindings.contains_key(*name))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    None,
    Visiting,
    Visited,
}

/// Binding names ordered so that every dependency precedes its dependents.
///
/// A cycle is a [`ModelError::RecursiveBindings`] naming the bindings on it.
pub fn binding_order(bindings: &IndexMap<String, Binding>) -> Result<Vec<String>> {
    let mut state = vec![VisitState::None; bindings.len()];
    let mut order = Vec::with_capacity(bindings.len());
    let mut path = Vec::new();

    for idx in 0..bindings.len() {
        if state[idx] == VisitState::None {
            visit(idx, bindings, &mut state, &mut path, &mut order)?;
        }
    }
    Ok(order)
}

fn visit(
    idx: usize,
    bindings: &IndexMap<String, Binding>,
    state: &mut [VisitState],
    path: &mut Vec<String>,
    order: &mut Vec<String>,
) -> Result<()> {
    let Some((name, binding)) = bindings.get_index(idx) else {
        return Ok(());
    };

    match state[idx] {
        VisitState::Visited => return Ok(()),
        VisitState::Visiting => {
            let start = path.iter().position(|n| n == name).unwrap_or(0);
            let mut cycle = path[start..].to_vec();
            cycle.push(name.clone());
            return Err(ModelError::RecursiveBindings(cycle));
        }
        VisitState::None => state[idx] = VisitState::Visiting,
    }

    path.push(name.clone());
    for dep in dependencies(binding, bindings) {
        if let Some(dep_idx) = bindings.get_index_of(dep) {
            visit(dep_idx, bindings, state, path, order)?;
        }
    }
    path.pop();

    state[idx] = VisitState::Visited;
    order.push(name.clone());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(texts: &[&str]) -> IndexMap<String, Binding> {
        texts
            .iter()
            .map(|t| {
                let b = Binding::parse(t).unwrap();
                (b.name().to_string(), b)
            })
            .collect()
    }

    #[test]
    fn test_dependencies_come_first() {
        let bindings = map(&["v2(x, y) := v3(x)*y + k", "k := 2*a", "v3(x) := exp(x)**2"]);
        let order = binding_order(&bindings).unwrap();
        let pos = |n: &str| order.iter().position(|o| o == n).unwrap();
        assert!(pos("v3") < pos("v2"));
        assert!(pos("k") < pos("v2"));
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn test_cycle_is_reported() {
        let bindings = map(&["a := b + 1", "b := c + 1", "c := a*2"]);
        assert_eq!(
            binding_order(&bindings).unwrap_err(),
            ModelError::RecursiveBindings(vec![
                "a".into(),
                "b".into(),
                "c".into(),
                "a".into()
            ])
        );
    }

    #[test]
    fn test_cycle_through_calls() {
        let bindings = map(&["f(x) := g(x) + 1", "g(y) := f(y)*2"]);
        assert!(matches!(
            binding_order(&bindings),
            Err(ModelError::RecursiveBindings(_))
        ));
    }
}
