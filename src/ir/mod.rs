//! Intermediate representation of hybrid-automaton components.

pub mod analysis;
pub mod ast;
pub mod component;
pub mod document;
pub mod dot;
pub mod error;
pub mod math;
pub mod structural;
pub mod transform;
