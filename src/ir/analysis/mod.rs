//! Read-only checks over a component under construction.

pub mod bindings;
pub mod ports;
pub mod regime_graph;
pub mod symbols;
