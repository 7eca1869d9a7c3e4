//! Regimes: the states of the hybrid automaton.
//!
//! A regime holds a body of ODEs, assignments and bindings that apply while
//! it is active, plus its outgoing transitions. Bodies may nest other
//! regimes, which contribute their nodes to every traversal but cannot own
//! transitions of their own.

use indexmap::IndexMap;

use crate::ir::ast::expression::{parse_node, Assignment, Binding, Expression, Ode};
use crate::ir::ast::transition::{Endpoint, Transition};
use crate::ir::error::{ModelError, Result};

// =============================================================================
// Body
// =============================================================================

/// One entry of a regime body.
#[derive(Debug, Clone, PartialEq)]
pub enum RegimeNode {
    Expression(Expression),
    Regime(Regime),
}

impl RegimeNode {
    /// Body entries are keyed by their text, so the body behaves as a set.
    fn key(&self) -> String {
        match self {
            RegimeNode::Expression(e) => e.as_expr(),
            RegimeNode::Regime(r) => format!("[{}]", r.name),
        }
    }
}

impl From<Expression> for RegimeNode {
    fn from(value: Expression) -> Self {
        RegimeNode::Expression(value)
    }
}

impl From<Ode> for RegimeNode {
    fn from(value: Ode) -> Self {
        RegimeNode::Expression(value.into())
    }
}

impl From<Assignment> for RegimeNode {
    fn from(value: Assignment) -> Self {
        RegimeNode::Expression(value.into())
    }
}

impl From<Binding> for RegimeNode {
    fn from(value: Binding) -> Self {
        RegimeNode::Expression(value.into())
    }
}

impl From<Regime> for RegimeNode {
    fn from(value: Regime) -> Self {
        RegimeNode::Regime(value)
    }
}

/// The insertion-ordered node set of a regime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegimeBody {
    nodes: IndexMap<String, RegimeNode>,
}

impl RegimeBody {
    /// Insert a node. Adding a node equal to one already present is a no-op;
    /// a different nested regime under an existing name is an error.
    pub fn insert(&mut self, node: RegimeNode) -> Result<()> {
        match &node {
            RegimeNode::Expression(e) if e.self_referencing() => {
                return Err(ModelError::SelfReferenceInRegime(e.as_expr()));
            }
            RegimeNode::Regime(r) if !r.transitions.is_empty() => {
                return Err(ModelError::NestedRegimeTransitions(r.name.clone()));
            }
            _ => {}
        }
        let key = node.key();
        if let Some(existing) = self.nodes.get(&key) {
            // Expressions are keyed by their full text.
            if let (RegimeNode::Regime(r), true) = (&node, *existing != node) {
                return Err(ModelError::DuplicateRegime(r.name.clone()));
            }
            return Ok(());
        }
        self.nodes.insert(key, node);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The direct children, nested regimes included.
    pub fn entries(&self) -> impl Iterator<Item = &RegimeNode> {
        self.nodes.values()
    }

    /// Depth-first traversal of every expression, descending into nested
    /// regimes.
    pub fn nodes(&self) -> NodesIter<'_> {
        NodesIter {
            stack: vec![self.nodes.values()],
        }
    }

    /// ODEs and assignments.
    pub fn equations(&self) -> impl Iterator<Item = &Expression> {
        self.nodes().filter(|e| e.is_equation())
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.nodes().filter_map(|e| match e {
            Expression::Binding(b) => Some(b),
            _ => None,
        })
    }

    pub fn odes(&self) -> impl Iterator<Item = &Ode> {
        self.nodes().filter_map(|e| match e {
            Expression::Ode(o) => Some(o),
            _ => None,
        })
    }

    /// Rewrite every expression in place, nested regimes included, and
    /// re-key the body.
    pub(crate) fn try_for_each_mut<F>(&mut self, f: &mut F) -> Result<()>
    where
        F: FnMut(&mut Expression) -> Result<()>,
    {
        let nodes = std::mem::take(&mut self.nodes);
        for (_, mut node) in nodes {
            match &mut node {
                RegimeNode::Expression(e) => f(e)?,
                RegimeNode::Regime(r) => r.body.try_for_each_mut(f)?,
            }
            self.nodes.entry(node.key()).or_insert(node);
        }
        Ok(())
    }
}

/// Depth-first iterator over the expressions of a [`RegimeBody`].
pub struct NodesIter<'a> {
    stack: Vec<indexmap::map::Values<'a, String, RegimeNode>>,
}

impl<'a> Iterator for NodesIter<'a> {
    type Item = &'a Expression;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(top) = self.stack.last_mut() {
            match top.next() {
                Some(RegimeNode::Expression(e)) => return Some(e),
                Some(RegimeNode::Regime(r)) => self.stack.push(r.body.nodes.values()),
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}

// =============================================================================
// Regime
// =============================================================================

/// An outgoing transition, inline or to be resolved by name.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionEntry {
    Reference(String),
    Transition(Transition),
}

impl TransitionEntry {
    pub fn name(&self) -> &str {
        match self {
            TransitionEntry::Reference(name) => name,
            TransitionEntry::Transition(t) => t.name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Regime {
    name: String,
    body: RegimeBody,
    transitions: Vec<TransitionEntry>,
}

impl Regime {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: RegimeBody::default(),
            transitions: Vec::new(),
        }
    }

    /// A regime whose body is parsed from `nodes`.
    pub fn with_nodes<'a>(
        name: impl Into<String>,
        nodes: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self> {
        let mut regime = Self::new(name);
        for text in nodes {
            regime.add_text(text)?;
        }
        Ok(regime)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &RegimeBody {
        &self.body
    }

    /// Add an ODE, assignment, binding or nested regime.
    ///
    /// Self-referencing assignments and in-place updates are rejected: they
    /// are only meaningful as transition actions.
    pub fn add_node(&mut self, node: impl Into<RegimeNode>) -> Result<()> {
        self.body.insert(node.into())
    }

    pub fn add_text(&mut self, text: &str) -> Result<()> {
        self.add_node(parse_node(text)?)
    }

    /// Attach an outgoing transition, making this regime its source.
    pub fn add_transition(&mut self, mut transition: Transition) -> Result<()> {
        transition.set_source(Endpoint::Reference(self.name.clone()))?;
        let existing = self
            .transitions
            .iter()
            .position(|entry| entry.name() == transition.name());
        let Some(idx) = existing else {
            self.transitions.push(TransitionEntry::Transition(transition));
            return Ok(());
        };
        if let TransitionEntry::Transition(t) = &self.transitions[idx] {
            if *t != transition {
                return Err(ModelError::DuplicateTransition(transition.name().to_string()));
            }
            return Ok(());
        }
        self.transitions[idx] = TransitionEntry::Transition(transition);
        Ok(())
    }

    /// Attach an outgoing transition defined elsewhere in the component.
    pub fn add_transition_reference(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.transitions.iter().any(|entry| entry.name() == name) {
            self.transitions.push(TransitionEntry::Reference(name));
        }
    }

    pub fn with_transition(mut self, transition: Transition) -> Result<Self> {
        self.add_transition(transition)?;
        Ok(self)
    }

    pub fn transitions(&self) -> &[TransitionEntry] {
        &self.transitions
    }

    pub fn nodes(&self) -> NodesIter<'_> {
        self.body.nodes()
    }

    pub fn equations(&self) -> impl Iterator<Item = &Expression> {
        self.body.equations()
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.body.bindings()
    }

    pub fn odes(&self) -> impl Iterator<Item = &Ode> {
        self.body.odes()
    }

    /// Inline transitions that change regime.
    pub fn transitions_with_target(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter().filter_map(|entry| match entry {
            TransitionEntry::Transition(t) if t.target().is_some() => Some(t),
            _ => None,
        })
    }

    /// The inline transition to `target`, if exactly one exists.
    pub fn get_transition_to(&self, target: &str) -> Option<&Transition> {
        let mut matching = self
            .transitions_with_target()
            .filter(|t| t.target_name() == Some(target));
        match (matching.next(), matching.next()) {
            (Some(t), None) => Some(t),
            _ => None,
        }
    }

    pub(crate) fn into_parts(self) -> (String, RegimeBody, Vec<TransitionEntry>) {
        (self.name, self.body, self.transitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_is_a_set() {
        let r = Regime::with_nodes("r", ["dV/dt = -V", "dV/dt = -V", "I := g*V"]).unwrap();
        assert_eq!(r.nodes().count(), 2);
        assert_eq!(r.equations().count(), 1);
        assert_eq!(r.bindings().count(), 1);
    }

    #[test]
    fn test_self_reference_is_rejected() {
        let mut r = Regime::new("r");
        assert!(matches!(
            r.add_text("U = U + 1"),
            Err(ModelError::SelfReferenceInRegime(_))
        ));
        assert!(matches!(
            r.add_text("U += 1"),
            Err(ModelError::SelfReferenceInRegime(_))
        ));
        assert!(r.add_text("U = V + 1").is_ok());
    }

    #[test]
    fn test_nested_traversal_is_depth_first() {
        let inner = Regime::with_nodes("inner", ["dW/dt = -W", "a := 1"]).unwrap();
        let mut outer = Regime::with_nodes("outer", ["dV/dt = -V"]).unwrap();
        outer.add_node(inner).unwrap();
        outer.add_text("I = V*W").unwrap();

        let order: Vec<String> = outer.nodes().map(Expression::as_expr).collect();
        assert_eq!(order, ["dV/dt = -V", "dW/dt = -W", "a := 1", "I = V*W"]);
        let odes: Vec<&str> = outer.odes().map(Ode::dependent_variable).collect();
        assert_eq!(odes, ["V", "W"]);
    }

    #[test]
    fn test_nested_regimes_with_one_name_must_agree() {
        let mut outer = Regime::with_nodes("outer", ["dV/dt = -V"]).unwrap();
        outer
            .add_node(Regime::with_nodes("inner", ["dW/dt = -W"]).unwrap())
            .unwrap();
        outer
            .add_node(Regime::with_nodes("inner", ["dW/dt = -W"]).unwrap())
            .unwrap();
        assert_eq!(outer.odes().count(), 2);

        assert_eq!(
            outer.add_node(Regime::with_nodes("inner", ["dX/dt = -X"]).unwrap()),
            Err(ModelError::DuplicateRegime("inner".into()))
        );
        assert_eq!(outer.odes().count(), 2);
    }

    #[test]
    fn test_nested_regime_may_not_own_transitions() {
        let inner = Regime::new("inner")
            .with_transition(Transition::on("t", "V > 1", [], Some("x".into())).unwrap())
            .unwrap();
        let mut outer = Regime::new("outer");
        assert!(matches!(
            outer.add_node(inner),
            Err(ModelError::NestedRegimeTransitions(_))
        ));
    }

    #[test]
    fn test_add_transition_sets_source() {
        let mut r = Regime::new("a");
        r.add_transition(Transition::on("t", "V > 1", [], Some("b".into())).unwrap())
            .unwrap();
        let t = r.get_transition_to("b").unwrap();
        assert_eq!(t.source_name(), Some("a"));

        let err = r
            .add_transition(Transition::on("u", "V > 1", [], Some("a".into())).unwrap())
            .unwrap_err();
        assert!(matches!(err, ModelError::TransitionToSelf { .. }));
    }

    #[test]
    fn test_get_transition_to_requires_a_single_match() {
        let mut r = Regime::new("a");
        r.add_transition(Transition::on("t1", "V > 1", [], Some("b".into())).unwrap())
            .unwrap();
        r.add_transition(Transition::on("t2", "V < -1", [], Some("b".into())).unwrap())
            .unwrap();
        r.add_transition(Transition::on("t3", "V > 2", [], None).unwrap())
            .unwrap();
        assert!(r.get_transition_to("b").is_none());
        assert_eq!(r.transitions_with_target().count(), 2);
        assert_eq!(r.transitions().len(), 3);
    }
}
