//! Reachability over the regime graph.

use std::collections::VecDeque;

use indexmap::IndexSet;

use crate::ir::component::{Component, RegimeId};
use crate::ir::error::{ModelError, Result};

/// Regimes reachable from `start` by following transitions forward.
pub fn reachable_from(component: &Component, start: RegimeId) -> IndexSet<RegimeId> {
    let mut visited = IndexSet::new();
    let mut queue = VecDeque::from([start]);

    while let Some(id) = queue.pop_front() {
        if visited.insert(id) {
            queue.extend(component.regime(id).neighbors());
        }
    }
    visited
}

/// Every regime must be connected to every other one, ignoring the
/// direction of transitions. A lone regime is always connected.
pub fn check_connected(component: &Component) -> Result<()> {
    let count = component.regime_count();
    if count <= 1 {
        return Ok(());
    }

    let mut adjacency = vec![Vec::new(); count];
    for t in component.transitions() {
        if let Some(target) = t.target() {
            adjacency[t.source().id().index()].push(target.id());
            adjacency[target.id().index()].push(t.source().id());
        }
    }

    let mut visited = vec![false; count];
    let mut queue = VecDeque::from([RegimeId(0)]);
    while let Some(id) = queue.pop_front() {
        if !visited[id.index()] {
            visited[id.index()] = true;
            queue.extend(adjacency[id.index()].iter().copied());
        }
    }

    let unreachable: Vec<String> = component
        .regimes()
        .filter(|r| !visited[r.id().index()])
        .map(|r| r.name().to_string())
        .collect();
    if unreachable.is_empty() {
        Ok(())
    } else {
        Err(ModelError::DisconnectedRegimes(unreachable))
    }
}
