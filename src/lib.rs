//! Abstraction-layer model of neuron components as hybrid automata.
//!
//! A [`Component`] is a set of regimes, each holding ODEs, assignments and
//! bindings, connected by guarded transitions. Components are assembled with
//! a [`ComponentBuilder`], which resolves name references, checks the regime
//! graph and infers the parameter set.

use std::sync::Once;

pub mod diagnostics;
pub mod ir;

pub use ir::ast::{
    AnalogPort, Binding, Condition, EventPort, Expression, Guard, PortMode, ReduceOp, Regime,
    Transition,
};
pub use ir::component::{Component, ComponentBuilder, RegimeId, TransitionId};
pub use ir::error::{ErrorKind, ModelError, Result};

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        env_logger::init();
    });
}
