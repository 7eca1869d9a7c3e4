//! Model entities: expression nodes, guards, ports, regimes and transitions.
//!
//! These are the builder-side types a caller assembles by hand (or a
//! deserializer produces). Regimes and transitions may still refer to each
//! other by name; [`Component`](crate::ir::component::Component) resolves
//! them into a closed graph.

pub mod condition;
pub mod expression;
pub mod naming;
pub mod port;
pub mod regime;
pub mod transition;

pub use condition::Condition;
pub use expression::{
    inplace_add, inplace_div, inplace_mul, inplace_sub, parse_node, Assignment, Binding,
    Expression, Inplace, InplaceOp, Ode, Rhs,
};
pub use naming::NameGenerator;
pub use port::{AnalogPort, EventPort, PortMode, ReduceOp};
pub use regime::{Regime, RegimeBody, RegimeNode, TransitionEntry};
pub use transition::{Action, Endpoint, Guard, Transition};
