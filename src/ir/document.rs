//! Tree form of a component for serialization.
//!
//! A [`ComponentDocument`] mirrors a built component with every expression
//! kept as text and every cross reference kept as a name. Loading a document
//! always goes through [`ComponentBuilder`], so a document is validated
//! exactly like a component assembled by hand.

use std::fs;
use std::path::Path;

use anyhow::Context;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::ir::ast::{
    Action, AnalogPort, Binding, Endpoint, EventPort, Guard, Regime, RegimeBody, RegimeNode,
    Transition,
};
use crate::ir::component::{Component, ComponentBuilder};
use crate::ir::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDocument {
    pub name: String,
    /// Declared parameters; inferred when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub analog_ports: Vec<AnalogPort>,
    pub regimes: Vec<RegimeDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transitions: Vec<TransitionDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<String>,
    /// Nested regimes; they carry body nodes only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regimes: Vec<RegimeDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionDocument {
    pub name: String,
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub guard: GuardDocument,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionDocument>,
}

/// A condition text or a recv event port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GuardDocument {
    Condition(String),
    Port(EventPort),
}

/// An assignment or in-place update text, or a send event port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionDocument {
    Equation(String),
    Port(EventPort),
}

impl RegimeDocument {
    fn from_body(name: &str, body: &RegimeBody) -> Self {
        let mut nodes = Vec::new();
        let mut regimes = Vec::new();
        for node in body.entries() {
            match node {
                RegimeNode::Expression(e) => nodes.push(e.as_expr()),
                RegimeNode::Regime(r) => regimes.push(Self::from_body(r.name(), r.body())),
            }
        }
        RegimeDocument {
            name: name.to_string(),
            nodes,
            regimes,
        }
    }

    fn to_regime(&self) -> Result<Regime> {
        let mut regime = Regime::new(self.name.as_str());
        for text in &self.nodes {
            regime.add_text(text)?;
        }
        for nested in &self.regimes {
            regime.add_node(nested.to_regime()?)?;
        }
        Ok(regime)
    }
}

impl TransitionDocument {
    fn to_transition(&self) -> Result<Transition> {
        let guard = match &self.guard {
            GuardDocument::Condition(text) => Guard::parse(text)?,
            GuardDocument::Port(port) => Guard::Port(port.clone()),
        };
        let mut transition = Transition::new(self.name.as_str(), guard)?
            .with_source(Endpoint::Reference(self.from.clone()))?;
        for action in &self.actions {
            transition.add_action(match action {
                ActionDocument::Equation(text) => Action::parse(text)?,
                ActionDocument::Port(port) => Action::Port(port.clone()),
            })?;
        }
        match &self.to {
            Some(to) => transition.with_target(Endpoint::Reference(to.clone())),
            None => Ok(transition),
        }
    }
}

impl Component {
    pub fn to_document(&self) -> ComponentDocument {
        let transitions = self
            .transitions()
            .map(|t| TransitionDocument {
                name: t.name().to_string(),
                from: t.source().name().to_string(),
                to: t.target().map(|r| r.name().to_string()),
                guard: match t.guard() {
                    Guard::Condition(c) => GuardDocument::Condition(c.cond().to_string()),
                    Guard::Port(p) => GuardDocument::Port(p.clone()),
                },
                actions: t
                    .actions()
                    .iter()
                    .map(|a| match a {
                        Action::Equation(e) => ActionDocument::Equation(e.as_expr()),
                        Action::Port(p) => ActionDocument::Port(p.clone()),
                    })
                    .collect(),
            })
            .collect();

        ComponentDocument {
            name: self.name.clone(),
            parameters: Some(self.parameters.iter().cloned().collect()),
            analog_ports: self.analog_ports.clone(),
            regimes: self
                .regimes()
                .map(|r| RegimeDocument::from_body(r.name(), r.body()))
                .collect(),
            transitions,
            bindings: self.bindings.values().map(Binding::to_string).collect(),
        }
    }

    /// Build a component from its document, with full validation.
    pub fn from_document(doc: &ComponentDocument) -> Result<Component> {
        let mut builder = ComponentBuilder::new(doc.name.as_str()).ports(doc.analog_ports.clone());
        if let Some(parameters) = &doc.parameters {
            builder = builder.parameters(parameters.iter().map(String::as_str));
        }
        for regime in &doc.regimes {
            builder = builder.regime(regime.to_regime()?);
        }
        for transition in &doc.transitions {
            builder = builder.transition(transition.to_transition()?);
        }
        for text in &doc.bindings {
            builder = builder.binding_text(text)?;
        }
        builder.build()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_document())
    }

    pub fn from_json(text: &str) -> anyhow::Result<Component> {
        let doc: ComponentDocument =
            serde_json::from_str(text).context("malformed component document")?;
        let component = Component::from_document(&doc)
            .with_context(|| format!("invalid component '{}'", doc.name))?;
        Ok(component)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Component> {
        let path = path.as_ref();
        debug!("loading component from {}", path.display());
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Component::from_json(&text).with_context(|| format!("in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use unindent::unindent;

    use super::*;
    use crate::ir::error::ModelError;

    fn leaky_iaf_json() -> String {
        unindent(
            r#"
            {
              "name": "LeakyIAF",
              "analog_ports": [
                {"symbol": "V", "mode": "send"},
                {"symbol": "Isyn", "mode": {"reduce": "+"}}
              ],
              "regimes": [
                {
                  "name": "subthreshold",
                  "nodes": ["dV/dt = (-gl*(V - vrest) + Isyn)/cm"],
                  "regimes": [{"name": "leak", "nodes": ["gl_eff := gl"]}]
                },
                {"name": "refractory", "nodes": ["dV/dt = 0"]}
              ],
              "transitions": [
                {
                  "name": "spike",
                  "from": "subthreshold",
                  "to": "refractory",
                  "guard": "V > vthresh",
                  "actions": ["tspike = t", "V = vreset", {"symbol": "spike_out", "mode": "send"}]
                },
                {
                  "name": "refractory_end",
                  "from": "refractory",
                  "to": "subthreshold",
                  "guard": "t >= tspike + taurefrac"
                }
              ]
            }
            "#,
        )
    }

    #[test]
    fn test_from_json() {
        let c = Component::from_json(&leaky_iaf_json()).unwrap();
        assert_eq!(c.regime_count(), 2);
        assert_eq!(c.transition_count(), 2);
        assert!(c.bindings().contains_key("gl_eff"));
        let spike = c.transition_by_name("spike").unwrap();
        assert_eq!(spike.target().unwrap().name(), "refractory");
        assert_eq!(spike.event_ports().count(), 1);
    }

    #[test]
    fn test_document_round_trip() {
        let c = Component::from_json(&leaky_iaf_json()).unwrap();
        let doc = c.to_document();
        assert_eq!(doc.parameters.as_ref().map(Vec::len), Some(c.parameters().len()));
        let back = Component::from_document(&doc).unwrap();
        assert_eq!(back, c);

        let json = c.to_json().unwrap();
        assert_eq!(Component::from_json(&json).unwrap(), c);
    }

    #[test]
    fn test_event_guard_round_trip() {
        let json = unindent(
            r#"
            {
              "name": "counter",
              "regimes": [{"name": "r", "nodes": ["dx/dt = -x"]}],
              "transitions": [
                {
                  "name": "kick",
                  "from": "r",
                  "guard": {"symbol": "spike_in", "mode": "recv"},
                  "actions": ["x += w"]
                }
              ]
            }
            "#,
        );
        let c = Component::from_json(&json).unwrap();
        let doc = c.to_document();
        assert_eq!(
            doc.transitions[0].guard,
            GuardDocument::Port(EventPort::recv("spike_in").unwrap())
        );
        assert_eq!(doc.transitions[0].to, None);
        assert_eq!(Component::from_document(&doc).unwrap(), c);
    }

    #[test]
    fn test_invalid_documents() {
        assert!(Component::from_json("{\"name\": 1}").is_err());

        let doc = ComponentDocument {
            name: "broken".into(),
            parameters: None,
            analog_ports: vec![],
            regimes: vec![RegimeDocument {
                name: "r".into(),
                nodes: vec!["dV/dt = -V".into()],
                regimes: vec![],
            }],
            transitions: vec![TransitionDocument {
                name: "t".into(),
                from: "r".into(),
                to: Some("nowhere".into()),
                guard: GuardDocument::Condition("V > 1".into()),
                actions: vec![],
            }],
            bindings: vec![],
        };
        assert_eq!(
            Component::from_document(&doc).unwrap_err(),
            ModelError::UnresolvedRegime {
                transition: "t".into(),
                name: "nowhere".into()
            }
        );
    }

    #[test]
    fn test_missing_file() {
        let err = Component::from_json_file("/nonexistent/component.json").unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
