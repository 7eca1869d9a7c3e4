//! Deterministic default names for regimes and transitions.

use indexmap::IndexMap;

use crate::ir::ast::port::EventPort;
use crate::ir::ast::regime::Regime;
use crate::ir::ast::transition::{Endpoint, Transition};
use crate::ir::error::Result;

/// Hands out `Regime0`, `Regime1`, ... and `Transition0`, ... per context.
///
/// Each builder owns its own generator, so two models built side by side
/// never see each other's counters.
#[derive(Debug, Clone, Default)]
pub struct NameGenerator {
    counters: IndexMap<String, usize>,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next name for `prefix`, e.g. `Regime3`.
    pub fn next(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        let name = format!("{prefix}{counter}");
        *counter += 1;
        name
    }

    /// An empty regime with a fresh name.
    pub fn regime(&mut self) -> Regime {
        Regime::new(self.next("Regime"))
    }

    /// A regime with a fresh name holding the parsed `nodes`.
    pub fn regime_with<'a>(&mut self, nodes: impl IntoIterator<Item = &'a str>) -> Result<Regime> {
        Regime::with_nodes(self.next("Regime"), nodes)
    }

    /// A transition with a fresh name guarded by `condition` and no source
    /// regime yet.
    pub fn on<'a>(
        &mut self,
        condition: &str,
        actions: impl IntoIterator<Item = &'a str>,
        to: Option<Endpoint>,
    ) -> Result<Transition> {
        Transition::on(self.next("Transition"), condition, actions, to)
    }

    /// Like [`on`](Self::on) but guarded by a recv event port.
    pub fn on_event<'a>(
        &mut self,
        port: EventPort,
        actions: impl IntoIterator<Item = &'a str>,
        to: Option<Endpoint>,
    ) -> Result<Transition> {
        Transition::on_event(self.next("Transition"), port, actions, to)
    }
}
