//! Transitions: guarded, instantaneous edges of the regime graph.
//!
//! A transition owns a guard, an ordered list of actions and optional
//! source and target regimes. Either end may be given as a concrete
//! [`Regime`] or as a name to be resolved when the component is built. A
//! transition without a target applies its actions and stays in the current
//! regime.

use std::fmt;

use crate::ir::ast::condition::Condition;
use crate::ir::ast::expression::{parse_node, Assignment, Expression, Inplace};
use crate::ir::ast::port::{EventPort, PortMode};
use crate::ir::ast::regime::Regime;
use crate::ir::error::{ModelError, Result};

/// What makes a transition fire.
#[derive(Debug, Clone, PartialEq)]
pub enum Guard {
    Condition(Condition),
    /// Fires when an event arrives on a recv port.
    Port(EventPort),
}

impl Guard {
    pub fn parse(text: &str) -> Result<Self> {
        Condition::new(text).map(Guard::Condition)
    }

    pub fn condition(&self) -> Option<&Condition> {
        match self {
            Guard::Condition(c) => Some(c),
            Guard::Port(_) => None,
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::Condition(c) => fmt::Display::fmt(c, f),
            Guard::Port(p) => write!(f, "@{}", p.symbol),
        }
    }
}

/// One step applied when a transition fires.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// An assignment or in-place update.
    Equation(Expression),
    /// An event emitted on a send port.
    Port(EventPort),
}

impl Action {
    /// Parse an assignment or in-place update.
    pub fn parse(text: &str) -> Result<Self> {
        match parse_node(text)? {
            e @ (Expression::Assignment(_) | Expression::Inplace(_)) => Ok(Action::Equation(e)),
            other => Err(ModelError::InvalidTransitionAction(other.as_expr())),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Action::Equation(Expression::Assignment(_) | Expression::Inplace(_)) => Ok(()),
            Action::Equation(other) => Err(ModelError::InvalidTransitionAction(other.as_expr())),
            Action::Port(p) if p.mode == PortMode::Send => Ok(()),
            Action::Port(p) => Err(ModelError::InvalidTransitionAction(p.to_string())),
        }
    }
}

impl From<Assignment> for Action {
    fn from(value: Assignment) -> Self {
        Action::Equation(Expression::Assignment(value))
    }
}

impl From<Inplace> for Action {
    fn from(value: Inplace) -> Self {
        Action::Equation(Expression::Inplace(value))
    }
}

impl From<EventPort> for Action {
    fn from(value: EventPort) -> Self {
        Action::Port(value)
    }
}

/// One end of a transition before the component resolves it.
#[derive(Debug, Clone)]
pub enum Endpoint {
    /// A regime to be looked up by name.
    Reference(String),
    Regime(Box<Regime>),
}

impl Endpoint {
    pub fn name(&self) -> &str {
        match self {
            Endpoint::Reference(name) => name,
            Endpoint::Regime(r) => r.name(),
        }
    }
}

/// Endpoints compare by name only.
impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl From<&str> for Endpoint {
    fn from(value: &str) -> Self {
        Endpoint::Reference(value.to_string())
    }
}

impl From<String> for Endpoint {
    fn from(value: String) -> Self {
        Endpoint::Reference(value)
    }
}

impl From<Regime> for Endpoint {
    fn from(value: Regime) -> Self {
        Endpoint::Regime(Box::new(value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    name: String,
    guard: Guard,
    actions: Vec<Action>,
    from: Option<Endpoint>,
    to: Option<Endpoint>,
}

impl Transition {
    /// A transition with no actions and no endpoints.
    pub fn new(name: impl Into<String>, guard: Guard) -> Result<Self> {
        if let Guard::Port(port) = &guard {
            if port.mode != PortMode::Recv {
                return Err(ModelError::GuardPortNotRecv(port.symbol.clone()));
            }
        }
        Ok(Self {
            name: name.into(),
            guard,
            actions: Vec::new(),
            from: None,
            to: None,
        })
    }

    /// A transition guarded by `condition` with parsed `actions`.
    pub fn on<'a>(
        name: impl Into<String>,
        condition: &str,
        actions: impl IntoIterator<Item = &'a str>,
        to: Option<Endpoint>,
    ) -> Result<Self> {
        Self::new(name, Guard::parse(condition)?)?.finish(actions, to)
    }

    /// A transition that fires on an event received on `port`.
    pub fn on_event<'a>(
        name: impl Into<String>,
        port: EventPort,
        actions: impl IntoIterator<Item = &'a str>,
        to: Option<Endpoint>,
    ) -> Result<Self> {
        Self::new(name, Guard::Port(port))?.finish(actions, to)
    }

    fn finish<'a>(
        mut self,
        actions: impl IntoIterator<Item = &'a str>,
        to: Option<Endpoint>,
    ) -> Result<Self> {
        for text in actions {
            self.add_action(Action::parse(text)?)?;
        }
        match to {
            Some(to) => self.with_target(to),
            None => Ok(self),
        }
    }

    pub fn add_action(&mut self, action: Action) -> Result<()> {
        action.validate()?;
        self.actions.push(action);
        Ok(())
    }

    pub fn with_action(mut self, action: impl Into<Action>) -> Result<Self> {
        self.add_action(action.into())?;
        Ok(self)
    }

    pub fn with_target(mut self, to: impl Into<Endpoint>) -> Result<Self> {
        self.to = Some(to.into());
        self.check_not_self_loop()?;
        Ok(self)
    }

    pub fn with_source(mut self, from: impl Into<Endpoint>) -> Result<Self> {
        self.set_source(from.into())?;
        Ok(self)
    }

    /// Attach the transition to its source regime.
    ///
    /// A transition has one owner: re-attaching it to a different regime is
    /// a [`ModelError::TransitionReattached`].
    pub(crate) fn set_source(&mut self, from: Endpoint) -> Result<()> {
        if let Some(owner) = &self.from {
            if owner.name() != from.name() {
                return Err(ModelError::TransitionReattached {
                    transition: self.name.clone(),
                    owner: owner.name().to_string(),
                    regime: from.name().to_string(),
                });
            }
            if matches!(from, Endpoint::Reference(_)) {
                return Ok(());
            }
        }
        self.from = Some(from);
        self.check_not_self_loop()
    }

    fn check_not_self_loop(&self) -> Result<()> {
        match (&self.from, &self.to) {
            (Some(from), Some(to)) if from == to => Err(ModelError::TransitionToSelf {
                transition: self.name.clone(),
                regime: from.name().to_string(),
            }),
            _ => Ok(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.guard.condition()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn source(&self) -> Option<&Endpoint> {
        self.from.as_ref()
    }

    pub fn target(&self) -> Option<&Endpoint> {
        self.to.as_ref()
    }

    pub fn source_name(&self) -> Option<&str> {
        self.from.as_ref().map(Endpoint::name)
    }

    pub fn target_name(&self) -> Option<&str> {
        self.to.as_ref().map(Endpoint::name)
    }

    /// The guard port, if any, followed by the send ports among the actions.
    pub fn event_ports(&self) -> impl Iterator<Item = &EventPort> {
        let guard = match &self.guard {
            Guard::Port(p) => Some(p),
            Guard::Condition(_) => None,
        };
        guard.into_iter().chain(self.actions.iter().filter_map(|a| match a {
            Action::Port(p) => Some(p),
            Action::Equation(_) => None,
        }))
    }

    /// Assignment and in-place actions, in order.
    pub fn equations(&self) -> impl Iterator<Item = &Expression> {
        self.actions.iter().filter_map(|a| match a {
            Action::Equation(e) => Some(e),
            Action::Port(_) => None,
        })
    }

    pub(crate) fn into_parts(self) -> (String, Guard, Vec<Action>, Option<Endpoint>, Option<Endpoint>) {
        (self.name, self.guard, self.actions, self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actions_are_restricted() {
        let t = Transition::on("spike", "V > 10", ["V = c", "U += d"], None).unwrap();
        assert_eq!(t.equations().count(), 2);
        assert!(matches!(
            Transition::on("t", "V > 10", ["dV/dt = 1"], None),
            Err(ModelError::InvalidTransitionAction(_))
        ));
        assert!(matches!(
            Transition::on("t", "V > 10", ["x := 1"], None),
            Err(ModelError::InvalidTransitionAction(_))
        ));
    }

    #[test]
    fn test_self_referencing_actions_are_allowed() {
        let t = Transition::on("t", "V > 10", ["U = U + d"], None).unwrap();
        assert!(t.equations().all(Expression::self_referencing));
    }

    #[test]
    fn test_event_ports() {
        let t = Transition::on_event("t", EventPort::recv("spike_in").unwrap(), ["g += w"], None)
            .unwrap()
            .with_action(EventPort::send("spike_out").unwrap())
            .unwrap();
        let ports: Vec<&str> = t.event_ports().map(|p| p.symbol.as_str()).collect();
        assert_eq!(ports, ["spike_in", "spike_out"]);

        assert!(matches!(
            Transition::new("t", Guard::Port(EventPort::send("x").unwrap())),
            Err(ModelError::GuardPortNotRecv(_))
        ));
        let t = Transition::on("t", "V > 1", [], None).unwrap();
        assert!(matches!(
            t.with_action(EventPort::recv("x").unwrap()),
            Err(ModelError::InvalidTransitionAction(_))
        ));
    }

    #[test]
    fn test_self_loop_is_rejected() {
        let t = Transition::on("t", "V > 1", ["V = 0"], Some("a".into()))
            .unwrap()
            .with_source("a");
        assert!(matches!(t, Err(ModelError::TransitionToSelf { .. })));
    }

    #[test]
    fn test_reattachment_is_rejected() {
        let mut t = Transition::on("t", "V > 1", [], Some("b".into())).unwrap();
        t.set_source("a".into()).unwrap();
        t.set_source("a".into()).unwrap();
        assert_eq!(
            t.set_source("c".into()).unwrap_err(),
            ModelError::TransitionReattached {
                transition: "t".into(),
                owner: "a".into(),
                regime: "c".into()
            }
        );
    }

    #[test]
    fn test_endpoints_compare_by_name() {
        let r = Regime::with_nodes("a", ["dV/dt = -V"]).unwrap();
        assert_eq!(Endpoint::from(r), Endpoint::from("a"));
    }
}
