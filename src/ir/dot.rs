//! Graphviz rendering of the regime graph.

use minijinja::{context, Environment};
use serde::Serialize;

use crate::ir::component::Component;

const DOT_TEMPLATE: &str = r#"digraph "{{ name }}" {
    node [shape=record];
{% for node in nodes %}    "{{ node.name }}" [label="{{ node.label }}"];
{% endfor %}{% for edge in edges %}    "{{ edge.source }}" -> "{{ edge.target }}" [label="{{ edge.label }}"];
{% endfor %}}
"#;

#[derive(Serialize)]
struct DotNode {
    name: String,
    label: String,
}

#[derive(Serialize)]
struct DotEdge {
    source: String,
    target: String,
    label: String,
}

/// Escape text for a record label.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '{' | '}' | '|' | '<' | '>' | '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl Component {
    /// One record node per regime and one edge per targeted transition,
    /// labelled with the transition name and guard. With `show_contents`
    /// each node also lists the regime's equations and bindings.
    pub fn to_dot(&self, show_contents: bool) -> Result<String, minijinja::Error> {
        let nodes: Vec<DotNode> = self
            .regimes()
            .map(|regime| {
                let mut label = escape(regime.name());
                if show_contents {
                    label.push('|');
                    for node in regime.nodes() {
                        label.push_str(&escape(&node.as_expr()));
                        label.push_str("\\l");
                    }
                    label = format!("{{{label}}}");
                }
                DotNode {
                    name: escape(regime.name()),
                    label,
                }
            })
            .collect();

        let edges: Vec<DotEdge> = self
            .transitions()
            .filter_map(|transition| {
                let target = transition.target()?;
                Some(DotEdge {
                    source: escape(transition.source().name()),
                    target: escape(target.name()),
                    label: format!(
                        "{}: {}",
                        escape(transition.name()),
                        escape(&transition.guard().to_string())
                    ),
                })
            })
            .collect();

        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.add_template("component.dot", DOT_TEMPLATE)?;
        env.get_template("component.dot")?.render(context!(
            name => escape(&self.name),
            nodes => nodes,
            edges => edges
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::ir::ast::{Regime, Transition};
    use crate::ir::component::ComponentBuilder;

    fn two_regimes() -> crate::ir::component::Component {
        let fire = Transition::on("fire", "V > 1", ["V = 0"], Some("rest".into())).unwrap();
        let wake = Transition::on("wake", "t > 5", Vec::<&str>::new(), Some("up".into())).unwrap();
        let stay = Transition::on("stay", "V < 0", ["V = 0"], None).unwrap();
        ComponentBuilder::new("osc")
            .regime(
                Regime::with_nodes("up", ["dV/dt = 1"])
                    .unwrap()
                    .with_transition(fire)
                    .unwrap()
                    .with_transition(stay)
                    .unwrap(),
            )
            .regime(
                Regime::with_nodes("rest", ["dV/dt = 0"])
                    .unwrap()
                    .with_transition(wake)
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_dot_edges() {
        let dot = two_regimes().to_dot(false).unwrap();
        assert!(dot.starts_with("digraph \"osc\" {"));
        assert!(dot.contains("\"up\" [label=\"up\"];"));
        assert!(dot.contains("\"up\" -> \"rest\" [label=\"fire: V \\> 1\"];"));
        assert!(dot.contains("\"rest\" -> \"up\" [label=\"wake: t \\> 5\"];"));
        assert!(!dot.contains("stay"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn test_dot_contents() {
        let dot = two_regimes().to_dot(true).unwrap();
        assert!(dot.contains("\"up\" [label=\"{up|dV/dt = 1\\l}\"];"));
    }
}
