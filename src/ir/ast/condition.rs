//! Boolean guard expressions.

use std::fmt;

use indexmap::IndexSet;

use crate::ir::ast::expression::{Binding, Rhs};
use crate::ir::error::{ModelError, Result};
use crate::ir::math::lexer::rewrite_identifiers;
use crate::ir::math::{is_reserved, Namespace};
use crate::ir::transform::substitute::substitute_binding;

/// A transition guard such as `V > Vth & t > tref`.
///
/// A guard with no free variables and no function calls is a constant and
/// is rejected with [`ModelError::ConstantCondition`].
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    rhs: Rhs,
}

impl Condition {
    pub fn new(text: &str) -> Result<Self> {
        let rhs = Rhs::parse(text)?;
        if rhs.names().is_empty() && rhs.funcs().is_empty() {
            let value = rhs.evaluate(&Namespace::new())?;
            return Err(ModelError::ConstantCondition {
                cond: rhs.text().to_string(),
                value: value != 0.0,
            });
        }
        Ok(Self { rhs })
    }

    pub fn cond(&self) -> &str {
        self.rhs.text()
    }

    pub fn names(&self) -> &IndexSet<String> {
        self.rhs.names()
    }

    pub fn funcs(&self) -> &IndexSet<String> {
        self.rhs.funcs()
    }

    pub fn missing_functions(&self) -> impl Iterator<Item = &str> {
        self.rhs.missing_functions()
    }

    pub fn evaluate(&self, ns: &Namespace) -> Result<bool> {
        Ok(self.rhs.evaluate(ns)? != 0.0)
    }

    /// A closure taking values for [`names`](Self::names) positionally.
    pub fn evaluator(&self) -> impl Fn(&[f64]) -> Result<bool> + '_ {
        let eval = self.rhs.evaluator();
        move |values: &[f64]| Ok(eval(values)? != 0.0)
    }

    pub fn prefix(&self, prefix: &str) -> Result<String> {
        rewrite_identifiers(self.rhs.text(), |name, _, _| {
            (!is_reserved(name)).then(|| format!("{prefix}{name}"))
        })
    }

    /// Expand `binding` inside the guard. The result is not re-checked for
    /// constness.
    pub fn substitute_binding(&mut self, binding: &Binding) -> Result<()> {
        self.rhs = Rhs::parse(&substitute_binding(self.rhs.text(), binding)?)?;
        Ok(())
    }

    pub fn as_expr(&self) -> String {
        self.rhs.text().to_string()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rhs.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_guards_are_rejected() {
        assert_eq!(
            Condition::new("true").unwrap_err(),
            ModelError::ConstantCondition {
                cond: "true".into(),
                value: true
            }
        );
        assert!(matches!(
            Condition::new("false"),
            Err(ModelError::ConstantCondition { value: false, .. })
        ));
        assert!(matches!(
            Condition::new("1 > 2"),
            Err(ModelError::ConstantCondition { value: false, .. })
        ));
    }

    #[test]
    fn test_names_and_evaluation() {
        let c = Condition::new("V > Vth & t > tref").unwrap();
        let names: Vec<&str> = c.names().iter().map(String::as_str).collect();
        assert_eq!(names, ["V", "Vth", "t", "tref"]);

        let ns = Namespace::new()
            .with_value("V", -40.0)
            .with_value("Vth", -50.0)
            .with_value("t", 10.0)
            .with_value("tref", 5.0);
        assert!(c.evaluate(&ns).unwrap());
        assert!(!c.evaluator()(&[-60.0, -50.0, 10.0, 5.0]).unwrap());
    }

    #[test]
    fn test_function_only_guard_is_dynamic() {
        assert!(Condition::new("spike()").is_ok());
    }

    #[test]
    fn test_unbalanced_parens() {
        assert!(matches!(
            Condition::new("(V > 10"),
            Err(ModelError::Parse { .. })
        ));
    }

    #[test]
    fn test_prefix() {
        let c = Condition::new("x>10 & pi < 3 & exp(pi,y)==1").unwrap();
        assert_eq!(
            c.prefix("PRE_").unwrap(),
            "PRE_x>10 & pi < 3 & exp(pi,PRE_y)==1"
        );
    }

    #[test]
    fn test_substitute_binding() {
        let mut c = Condition::new("V > vth(a)").unwrap();
        c.substitute_binding(&Binding::parse("vth(x) := 2*x + b").unwrap())
            .unwrap();
        assert_eq!(c.cond(), "V > (2*a + b)");
        let names: Vec<&str> = c.names().iter().map(String::as_str).collect();
        assert_eq!(names, ["V", "a", "b"]);
    }
}
