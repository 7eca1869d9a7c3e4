//! Error types for model construction and validation.
//!
//! Every failure raised while parsing expression text, building regimes and
//! transitions, or assembling a [`Component`](crate::ir::component::Component)
//! is a [`ModelError`]. Errors are terminal: a failed construction never
//! yields a partially built model.
//!
//! Variants fall into three categories, reported by [`ModelError::kind`]:
//! - **Syntax** errors for malformed expression or condition text,
//! - **Semantic** errors for well-formed text that violates a model invariant,
//! - **Reference** errors for names that cannot be resolved inside a component.

use std::ops::Range;

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Category of a [`ModelError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Syntax,
    Semantic,
    Reference,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    // =========================================================================
    // Syntax
    // =========================================================================
    #[error("unexpected character(s) '{slice}' in '{text}'")]
    Lex {
        text: String,
        slice: String,
        span: Range<usize>,
    },
    #[error("{message} in '{text}'")]
    Parse {
        text: String,
        message: String,
        span: Range<usize>,
    },
    #[error(
        "'{0}' is not a valid expression, expected 'dX/dt = ...', 'X = ...', 'X op= ...' or 'X := ...'"
    )]
    UnrecognizedExpression(String),
    #[error("unsupported in-place operator '{0}', expected one of '+=', '-=', '*=', '/='")]
    UnsupportedInplaceOp(String),
    #[error("invalid binding left-hand side '{0}', expected a symbol or 'f(a, b, ...)'")]
    InvalidBindingLhs(String),
    #[error("unknown port mode '{0}', expected 'send', 'recv' or 'reduce'")]
    UnknownPortMode(String),
    #[error("unknown reduce operator '{0}', expected one of '+', '-', '*', '/'")]
    UnknownReduceOp(String),

    // =========================================================================
    // Semantic
    // =========================================================================
    #[error("'{expr}' redefines the reserved math name '{symbol}'")]
    ReservedSymbol { expr: String, symbol: String },
    #[error("binding '{0}' may not reference itself")]
    SelfReferencingBinding(String),
    #[error("binding '{0}' uses its own name as an argument")]
    BindingArgumentShadowsName(String),
    #[error("binding '{binding}' does not use its argument '{argument}'")]
    UnusedBindingArgument { binding: String, argument: String },
    #[error("bindings form a cycle: {}", .0.join(" -> "))]
    RecursiveBindings(Vec<String>),
    #[error(
        "binding '{binding}' takes {expected} argument(s) but is called with {found} in '{expr}'"
    )]
    ArityMismatch {
        binding: String,
        expected: usize,
        found: usize,
        expr: String,
    },
    #[error("condition '{cond}' is always {value}")]
    ConstantCondition { cond: String, value: bool },
    #[error("'{0}' refers to its own target, which is only allowed in a transition")]
    SelfReferenceInRegime(String),
    #[error("nested regime '{0}' may not define transitions")]
    NestedRegimeTransitions(String),
    #[error("'{0}' is not a valid transition action, expected an assignment, in-place update or send event port")]
    InvalidTransitionAction(String),
    #[error("event port '{0}' used as a guard must have mode 'recv'")]
    GuardPortNotRecv(String),
    #[error("transition '{transition}' goes from regime '{regime}' to itself")]
    TransitionToSelf { transition: String, regime: String },
    #[error("transition '{transition}' belongs to regime '{owner}' and cannot be attached to '{regime}'")]
    TransitionReattached {
        transition: String,
        owner: String,
        regime: String,
    },
    #[error("transition '{0}' has no source regime")]
    DetachedTransition(String),
    #[error("component '{0}' needs at least one regime or transition")]
    EmptyComponent(String),
    #[error("more than one regime is named '{0}'")]
    DuplicateRegime(String),
    #[error("more than one transition is named '{0}'")]
    DuplicateTransition(String),
    #[error("bindings named '{0}' have different definitions")]
    ConflictingBindings(String),
    #[error("regime graph is disconnected, unreachable regimes: {0:?}")]
    DisconnectedRegimes(Vec<String>),
    #[error("binding '{binding}' references dynamic variables {symbols:?}")]
    BindingReferencesVariables {
        binding: String,
        symbols: Vec<String>,
    },
    #[error("bound symbol '{0}' is also integrated or assigned")]
    BoundSymbolAssigned(String),
    #[error("declared parameters do not match inferred parameters: extra {extra:?}, missing {missing:?}")]
    ParameterMismatch {
        extra: Vec<String>,
        missing: Vec<String>,
    },
    #[error("'recv' analog port '{0}' must target a parameter")]
    RecvPortNotParameter(String),
    #[error("'send' analog port '{0}' must source from a defined symbol")]
    SendPortUndefined(String),
    #[error("analog port symbol '{0}' has conflicting writers")]
    ConflictingPortWriters(String),
    #[error("'{expr}' calls '{function}', which is neither a math function nor a binding")]
    UnresolvableFunction { expr: String, function: String },
    #[error("cannot evaluate '{expr}': {message}")]
    Evaluation { expr: String, message: String },

    // =========================================================================
    // Reference
    // =========================================================================
    #[error("transition '{transition}' refers to unknown regime '{name}'")]
    UnresolvedRegime { transition: String, name: String },
    #[error("regime '{regime}' refers to unknown transition '{name}'")]
    UnresolvedTransition { regime: String, name: String },
}

impl ModelError {
    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::Lex { .. }
            | ModelError::Parse { .. }
            | ModelError::UnrecognizedExpression(_)
            | ModelError::UnsupportedInplaceOp(_)
            | ModelError::InvalidBindingLhs(_)
            | ModelError::UnknownPortMode(_)
            | ModelError::UnknownReduceOp(_) => ErrorKind::Syntax,
            ModelError::UnresolvedRegime { .. } | ModelError::UnresolvedTransition { .. } => {
                ErrorKind::Reference
            }
            _ => ErrorKind::Semantic,
        }
    }

    /// Source text and byte span for errors that point into expression text.
    pub fn source_span(&self) -> Option<(&str, Range<usize>)> {
        match self {
            ModelError::Lex { text, span, .. } | ModelError::Parse { text, span, .. } => {
                Some((text.as_str(), span.clone()))
            }
            _ => None,
        }
    }
}
