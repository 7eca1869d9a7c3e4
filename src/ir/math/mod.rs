//! The expression mini-language: lexer, parser, evaluator and the reserved
//! math namespace.

pub mod expr;
pub mod lexer;
pub mod namespace;

pub use expr::{BinaryOp, MathExpr, UnaryOp};
pub use namespace::{is_math_function, is_math_symbol, is_reserved, Namespace};
