//! Equation and binding nodes.
//!
//! Every node owns a right-hand side ([`Rhs`]) whose free-variable and
//! function-call sets are derived once at construction and re-derived after
//! each [`substitute_binding`](Expression::substitute_binding). The node kind
//! is chosen from the left-hand pattern by [`parse_node`]:
//!
//! - `dX/dt = rhs` is an [`Ode`] on X,
//! - `X = rhs` is an [`Assignment`],
//! - `X op= rhs` with op in `+ - * /` is an [`Inplace`] update,
//! - `X := rhs` or `F(a, b) := rhs` is a [`Binding`].

use std::fmt;

use indexmap::IndexSet;

use crate::ir::error::{ModelError, Result};
use crate::ir::math::lexer::{is_identifier, rewrite_identifiers};
use crate::ir::math::{is_math_function, is_reserved, MathExpr, Namespace};
use crate::ir::transform::substitute::substitute_binding;

// =============================================================================
// Right-hand side
// =============================================================================

/// Parsed right-hand-side text together with its derived name sets.
#[derive(Debug, Clone)]
pub struct Rhs {
    text: String,
    expr: MathExpr,
    names: IndexSet<String>,
    funcs: IndexSet<String>,
}

impl Rhs {
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let expr = MathExpr::parse(text)?;
        Ok(Self {
            text: text.to_string(),
            names: expr.symbols(),
            funcs: expr.functions(),
            expr,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn expr(&self) -> &MathExpr {
        &self.expr
    }

    /// Free variables, excluding the constants `pi` and `e`.
    pub fn names(&self) -> &IndexSet<String> {
        &self.names
    }

    /// Every called function, reserved or not.
    pub fn funcs(&self) -> &IndexSet<String> {
        &self.funcs
    }

    /// Called functions outside the reserved math namespace.
    pub fn missing_functions(&self) -> impl Iterator<Item = &str> {
        self.funcs
            .iter()
            .map(String::as_str)
            .filter(|f| !is_math_function(f))
    }

    pub fn evaluate(&self, ns: &Namespace) -> Result<f64> {
        self.expr.eval(ns).map_err(|message| ModelError::Evaluation {
            expr: self.text.clone(),
            message,
        })
    }

    /// A closure taking values for [`names`](Self::names) positionally.
    pub fn evaluator(&self) -> impl Fn(&[f64]) -> Result<f64> + '_ {
        move |values: &[f64]| {
            let ns: Namespace = self
                .names
                .iter()
                .map(String::as_str)
                .zip(values.iter().copied())
                .collect();
            self.evaluate(&ns)
        }
    }

    fn substituted(&self, binding: &Binding) -> Result<Rhs> {
        Rhs::parse(&substitute_binding(&self.text, binding)?)
    }
}

impl PartialEq for Rhs {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

fn check_target(target: &str, expr: &dyn fmt::Display) -> Result<()> {
    if !is_identifier(target) {
        return Err(ModelError::UnrecognizedExpression(expr.to_string()));
    }
    if is_reserved(target) {
        return Err(ModelError::ReservedSymbol {
            expr: expr.to_string(),
            symbol: target.to_string(),
        });
    }
    Ok(())
}

/// Prefix every non-reserved identifier in `text` except those in `keep`.
fn prefix_text(text: &str, prefix: &str, keep: &[&str]) -> Result<String> {
    rewrite_identifiers(text, |name, _, _| {
        (!is_reserved(name) && !keep.contains(&name)).then(|| format!("{prefix}{name}"))
    })
}

// =============================================================================
// Nodes
// =============================================================================

/// A first-order ordinary differential equation `dX/dt = rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ode {
    dependent_variable: String,
    independent_variable: String,
    rhs: Rhs,
}

impl Ode {
    pub fn new(dependent: &str, independent: &str, rhs: &str) -> Result<Self> {
        let ode = Self {
            dependent_variable: dependent.trim().to_string(),
            independent_variable: independent.trim().to_string(),
            rhs: Rhs::parse(rhs)?,
        };
        check_target(&ode.dependent_variable, &ode)?;
        check_target(&ode.independent_variable, &ode)?;
        Ok(ode)
    }

    pub fn dependent_variable(&self) -> &str {
        &self.dependent_variable
    }

    pub fn independent_variable(&self) -> &str {
        &self.independent_variable
    }

    pub fn lhs(&self) -> String {
        format!(
            "d{}/d{}",
            self.dependent_variable, self.independent_variable
        )
    }
}

impl fmt::Display for Ode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.lhs(), self.rhs.text)
    }
}

/// `X = rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    to: String,
    rhs: Rhs,
}

impl Assignment {
    pub fn new(to: &str, rhs: &str) -> Result<Self> {
        let assignment = Self {
            to: to.trim().to_string(),
            rhs: Rhs::parse(rhs)?,
        };
        check_target(&assignment.to, &assignment)?;
        Ok(assignment)
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    /// True for `U = f(U, ...)`.
    pub fn self_referencing(&self) -> bool {
        self.rhs.names.contains(&self.to)
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.to, self.rhs.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InplaceOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl InplaceOp {
    pub fn parse(op: &str) -> Result<Self> {
        match op.trim() {
            "+=" => Ok(InplaceOp::Add),
            "-=" => Ok(InplaceOp::Sub),
            "*=" => Ok(InplaceOp::Mul),
            "/=" => Ok(InplaceOp::Div),
            other => Err(ModelError::UnsupportedInplaceOp(other.to_string())),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            InplaceOp::Add => "+=",
            InplaceOp::Sub => "-=",
            InplaceOp::Mul => "*=",
            InplaceOp::Div => "/=",
        }
    }
}

/// `X op= rhs`. Always refers to its own target.
#[derive(Debug, Clone, PartialEq)]
pub struct Inplace {
    to: String,
    op: InplaceOp,
    rhs: Rhs,
}

impl Inplace {
    pub fn new(to: &str, op: InplaceOp, rhs: &str) -> Result<Self> {
        let inplace = Self {
            to: to.trim().to_string(),
            op,
            rhs: Rhs::parse(rhs)?,
        };
        check_target(&inplace.to, &inplace)?;
        Ok(inplace)
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn op(&self) -> InplaceOp {
        self.op
    }

    pub fn self_referencing(&self) -> bool {
        true
    }
}

impl fmt::Display for Inplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.to, self.op.symbol(), self.rhs.text)
    }
}

pub fn inplace_add(to: &str, rhs: &str) -> Result<Inplace> {
    Inplace::new(to, InplaceOp::Add, rhs)
}

pub fn inplace_sub(to: &str, rhs: &str) -> Result<Inplace> {
    Inplace::new(to, InplaceOp::Sub, rhs)
}

pub fn inplace_mul(to: &str, rhs: &str) -> Result<Inplace> {
    Inplace::new(to, InplaceOp::Mul, rhs)
}

pub fn inplace_div(to: &str, rhs: &str) -> Result<Inplace> {
    Inplace::new(to, InplaceOp::Div, rhs)
}

/// A static macro: a symbol alias `X := rhs` or a function `F(a, b) := rhs`.
///
/// Bindings never reference themselves, use every formal argument at least
/// once and never take a reserved math name.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    name: String,
    args: Vec<String>,
    rhs: Rhs,
    /// Free names of the rhs minus the formal arguments.
    free: IndexSet<String>,
}

impl Binding {
    /// Build from a left-hand signature (`x` or `f(a, b)`) and rhs text.
    pub fn new(lhs: &str, rhs: &str) -> Result<Self> {
        let (name, args) = parse_signature(lhs)?;
        let rhs = Rhs::parse(rhs)?;
        let binding = Self {
            free: free_names(&rhs, &args),
            name,
            args,
            rhs,
        };
        binding.validate()?;
        Ok(binding)
    }

    /// Parse `lhs := rhs` text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parts = text.split(":=");
        match (parts.next(), parts.next(), parts.next()) {
            (Some(lhs), Some(rhs), None) => Binding::new(lhs, rhs),
            _ => Err(ModelError::InvalidBindingLhs(text.trim().to_string())),
        }
    }

    fn validate(&self) -> Result<()> {
        if is_reserved(&self.name) {
            return Err(ModelError::ReservedSymbol {
                expr: self.to_string(),
                symbol: self.name.clone(),
            });
        }
        if self.args.contains(&self.name) {
            return Err(ModelError::BindingArgumentShadowsName(self.name.clone()));
        }
        if let Some(arg) = self.args.iter().find(|a| is_reserved(a)) {
            return Err(ModelError::ReservedSymbol {
                expr: self.to_string(),
                symbol: arg.clone(),
            });
        }
        if self.free.contains(&self.name) || self.rhs.funcs.contains(&self.name) {
            return Err(ModelError::SelfReferencingBinding(self.name.clone()));
        }
        if let Some(unused) = self.args.iter().find(|a| !self.rhs.names.contains(*a)) {
            return Err(ModelError::UnusedBindingArgument {
                binding: self.name.clone(),
                argument: unused.clone(),
            });
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn is_function(&self) -> bool {
        !self.args.is_empty()
    }

    pub fn rhs(&self) -> &str {
        &self.rhs.text
    }

    pub fn parsed_rhs(&self) -> &Rhs {
        &self.rhs
    }

    /// Free names of the rhs, formal arguments excluded.
    pub fn names(&self) -> &IndexSet<String> {
        &self.free
    }

    pub fn funcs(&self) -> &IndexSet<String> {
        self.rhs.funcs()
    }

    pub fn missing_functions(&self) -> impl Iterator<Item = &str> {
        self.rhs.missing_functions()
    }

    /// Expand `binding` inside this binding's rhs. A formal argument shadows
    /// a binding of the same name.
    pub fn substitute_binding(&mut self, binding: &Binding) -> Result<()> {
        if self.args.iter().any(|a| a == binding.name()) {
            return Ok(());
        }
        self.rhs = self.rhs.substituted(binding)?;
        self.free = free_names(&self.rhs, &self.args);
        self.validate()
    }

    pub fn lhs(&self) -> String {
        if self.args.is_empty() {
            self.name.clone()
        } else {
            format!("{}({})", self.name, self.args.join(", "))
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} := {}", self.lhs(), self.rhs.text)
    }
}

fn free_names(rhs: &Rhs, args: &[String]) -> IndexSet<String> {
    rhs.names
        .iter()
        .filter(|n| !args.contains(n))
        .cloned()
        .collect()
}

/// Split `f(a, b)` into `("f", ["a", "b"])`, or `x` into `("x", [])`.
fn parse_signature(lhs: &str) -> Result<(String, Vec<String>)> {
    let lhs = lhs.trim();
    let invalid = || ModelError::InvalidBindingLhs(lhs.to_string());

    let Some(open) = lhs.find('(') else {
        return if is_identifier(lhs) {
            Ok((lhs.to_string(), Vec::new()))
        } else {
            Err(invalid())
        };
    };
    let name = lhs[..open].trim();
    let inner = lhs[open + 1..].strip_suffix(')').ok_or_else(invalid)?;
    let args: Vec<String> = inner.split(',').map(|a| a.trim().to_string()).collect();

    if !is_identifier(name) || !args.iter().all(|a| is_identifier(a)) {
        return Err(invalid());
    }
    let distinct: IndexSet<&String> = args.iter().collect();
    if distinct.len() != args.len() {
        return Err(invalid());
    }
    Ok((name.to_string(), args))
}

// =============================================================================
// Expression
// =============================================================================

/// Any node produced from one line of expression text.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Ode(Ode),
    Assignment(Assignment),
    Inplace(Inplace),
    Binding(Binding),
}

impl Expression {
    fn rhs_ref(&self) -> &Rhs {
        match self {
            Expression::Ode(e) => &e.rhs,
            Expression::Assignment(e) => &e.rhs,
            Expression::Inplace(e) => &e.rhs,
            Expression::Binding(e) => &e.rhs,
        }
    }

    pub fn rhs(&self) -> &str {
        self.rhs_ref().text()
    }

    pub fn parsed_rhs(&self) -> &Rhs {
        self.rhs_ref()
    }

    /// Free variables of the rhs. Binding arguments are not free.
    pub fn names(&self) -> &IndexSet<String> {
        match self {
            Expression::Binding(b) => b.names(),
            other => other.rhs_ref().names(),
        }
    }

    pub fn funcs(&self) -> &IndexSet<String> {
        self.rhs_ref().funcs()
    }

    pub fn missing_functions(&self) -> impl Iterator<Item = &str> {
        self.rhs_ref().missing_functions()
    }

    pub fn lhs(&self) -> String {
        match self {
            Expression::Ode(e) => e.lhs(),
            Expression::Assignment(e) => e.to.clone(),
            Expression::Inplace(e) => e.to.clone(),
            Expression::Binding(e) => e.lhs(),
        }
    }

    /// The symbol this node defines: the ODE's dependent variable, the
    /// assigned target or the binding name.
    pub fn defined_symbol(&self) -> &str {
        match self {
            Expression::Ode(e) => &e.dependent_variable,
            Expression::Assignment(e) => &e.to,
            Expression::Inplace(e) => &e.to,
            Expression::Binding(e) => &e.name,
        }
    }

    pub fn as_expr(&self) -> String {
        self.to_string()
    }

    pub fn is_equation(&self) -> bool {
        !matches!(self, Expression::Binding(_))
    }

    /// True for assignments of the form `U = f(U)` and every in-place update.
    pub fn self_referencing(&self) -> bool {
        match self {
            Expression::Assignment(a) => a.self_referencing(),
            Expression::Inplace(i) => i.self_referencing(),
            Expression::Ode(_) | Expression::Binding(_) => false,
        }
    }

    /// Macro-expand every use of `binding` in the rhs and refresh the
    /// derived name sets.
    pub fn substitute_binding(&mut self, binding: &Binding) -> Result<()> {
        match self {
            Expression::Ode(e) => e.rhs = e.rhs.substituted(binding)?,
            Expression::Assignment(e) => e.rhs = e.rhs.substituted(binding)?,
            Expression::Inplace(e) => e.rhs = e.rhs.substituted(binding)?,
            Expression::Binding(e) => e.substitute_binding(binding)?,
        }
        Ok(())
    }

    /// Render with every non-reserved symbol and function name prefixed.
    pub fn prefix(&self, prefix: &str) -> Result<String> {
        Ok(match self {
            Expression::Ode(e) => format!(
                "d{prefix}{}/d{} = {}",
                e.dependent_variable,
                e.independent_variable,
                prefix_text(&e.rhs.text, prefix, &[e.independent_variable.as_str()])?
            ),
            Expression::Assignment(e) => format!(
                "{prefix}{} = {}",
                e.to,
                prefix_text(&e.rhs.text, prefix, &[])?
            ),
            Expression::Inplace(e) => format!(
                "{prefix}{} {} {}",
                e.to,
                e.op.symbol(),
                prefix_text(&e.rhs.text, prefix, &[])?
            ),
            Expression::Binding(e) => {
                let keep: Vec<&str> = e.args.iter().map(String::as_str).collect();
                let lhs = if e.args.is_empty() {
                    format!("{prefix}{}", e.name)
                } else {
                    format!("{prefix}{}({})", e.name, e.args.join(", "))
                };
                format!("{lhs} := {}", prefix_text(&e.rhs.text, prefix, &keep)?)
            }
        })
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Ode(e) => fmt::Display::fmt(e, f),
            Expression::Assignment(e) => fmt::Display::fmt(e, f),
            Expression::Inplace(e) => fmt::Display::fmt(e, f),
            Expression::Binding(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl From<Ode> for Expression {
    fn from(value: Ode) -> Self {
        Expression::Ode(value)
    }
}

impl From<Assignment> for Expression {
    fn from(value: Assignment) -> Self {
        Expression::Assignment(value)
    }
}

impl From<Inplace> for Expression {
    fn from(value: Inplace) -> Self {
        Expression::Inplace(value)
    }
}

impl From<Binding> for Expression {
    fn from(value: Binding) -> Self {
        Expression::Binding(value)
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Classify one line of text by its left-hand pattern and build the node.
pub fn parse_node(text: &str) -> Result<Expression> {
    let text = text.trim();
    let unrecognized = || ModelError::UnrecognizedExpression(text.to_string());

    if text.contains(":=") {
        return Binding::parse(text).map(Expression::Binding);
    }

    let eq = text.find('=').ok_or_else(unrecognized)?;
    if text[eq + 1..].starts_with('=') {
        return Err(unrecognized());
    }
    let head = text[..eq].trim_end();
    let rhs = &text[eq + 1..];

    if let Some(op) = head.chars().last().filter(|c| "+-*/".contains(*c)) {
        let target = head[..head.len() - 1].trim();
        if !is_identifier(target) {
            return Err(unrecognized());
        }
        let op = InplaceOp::parse(&format!("{op}="))?;
        return Inplace::new(target, op, rhs).map(Expression::Inplace);
    }
    if head.ends_with(['<', '>', '!']) {
        return Err(unrecognized());
    }

    if let Some((dependent, independent)) = parse_ode_lhs(head) {
        return Ode::new(dependent, independent, rhs).map(Expression::Ode);
    }
    if is_identifier(head) {
        return Assignment::new(head, rhs).map(Expression::Assignment);
    }
    Err(unrecognized())
}

/// `dX/dt` into `("X", "t")`.
fn parse_ode_lhs(head: &str) -> Option<(&str, &str)> {
    let (num, den) = head.split_once('/')?;
    let dependent = num.trim().strip_prefix('d')?;
    let independent = den.trim().strip_prefix('d')?;
    (is_identifier(dependent) && is_identifier(independent)).then_some((dependent, independent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(matches!(parse_node("dV/dt = -V/tau"), Ok(Expression::Ode(_))));
        assert!(matches!(parse_node("U = V + 1"), Ok(Expression::Assignment(_))));
        assert!(matches!(parse_node("U += 10"), Ok(Expression::Inplace(_))));
        assert!(matches!(parse_node("U/=2"), Ok(Expression::Inplace(_))));
        assert!(matches!(parse_node("x := 2*y"), Ok(Expression::Binding(_))));
        assert!(matches!(
            parse_node("f(a, b) := a*b"),
            Ok(Expression::Binding(_))
        ));
    }

    #[test]
    fn test_unparseable_left_hand_sides() {
        for text in ["V > 10", "V == 10", "1 = V", "a b = c", "V <= 3", "dV/dt"] {
            assert!(
                matches!(
                    parse_node(text),
                    Err(ModelError::UnrecognizedExpression(_))
                ),
                "{text}"
            );
        }
    }

    #[test]
    fn test_ode_parts() {
        let Ok(Expression::Ode(ode)) = parse_node("dV/dt = 0.04*V*V - U") else {
            panic!("expected an ODE");
        };
        assert_eq!(ode.dependent_variable(), "V");
        assert_eq!(ode.independent_variable(), "t");
        assert_eq!(ode.to_string(), "dV/dt = 0.04*V*V - U");
    }

    #[test]
    fn test_reserved_targets() {
        for text in [
            "pi := 11",
            "dpi/dt = 10+x",
            "de/dt = 10+x",
            "e = 10+x",
            "pi = 10+x",
            "pi += 10",
            "e += 10",
            "exp(x) := x",
        ] {
            assert!(
                matches!(parse_node(text), Err(ModelError::ReservedSymbol { .. })),
                "{text}"
            );
        }
    }

    #[test]
    fn test_self_referencing_assignment() {
        let Expression::Assignment(a) = parse_node("U = U+1").unwrap() else {
            panic!("expected an assignment");
        };
        assert!(a.self_referencing());
        let Expression::Assignment(a) = parse_node("U = V+1").unwrap() else {
            panic!("expected an assignment");
        };
        assert!(!a.self_referencing());
        assert!(parse_node("U += 1").unwrap().self_referencing());
    }

    #[test]
    fn test_binding_rejects_self_reference() {
        assert!(matches!(
            parse_node("x := 10 + x"),
            Err(ModelError::SelfReferencingBinding(_))
        ));
        assert!(matches!(
            Binding::new("f(a)", "f(a) + 1"),
            Err(ModelError::SelfReferencingBinding(_))
        ));
        assert!(matches!(
            Binding::new("f(f)", "f + 1"),
            Err(ModelError::BindingArgumentShadowsName(_))
        ));
    }

    #[test]
    fn test_binding_requires_every_argument() {
        let err = Binding::new("g(x, y)", "2*x").unwrap_err();
        assert_eq!(
            err,
            ModelError::UnusedBindingArgument {
                binding: "g".into(),
                argument: "y".into()
            }
        );
    }

    #[test]
    fn test_formal_argument_shadows_binding() {
        let mut f = Binding::parse("f(x) := x + k").unwrap();
        f.substitute_binding(&Binding::parse("x := 2").unwrap())
            .unwrap();
        assert_eq!(f.rhs(), "x + k");
        f.substitute_binding(&Binding::parse("k := 3").unwrap())
            .unwrap();
        assert_eq!(f.rhs(), "x + (3)");
    }

    #[test]
    fn test_binding_signature() {
        let b = Binding::parse("ntau( V , W ) := 1/(q10*(V + W))").unwrap();
        assert_eq!(b.name(), "ntau");
        assert_eq!(b.args(), ["V".to_string(), "W".to_string()]);
        assert_eq!(b.to_string(), "ntau(V, W) := 1/(q10*(V + W))");
        let node = Expression::Binding(b);
        let names: Vec<&str> = node
            .names()
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(names, ["q10"]);
        assert!(matches!(
            Binding::new("f(a, a)", "a"),
            Err(ModelError::InvalidBindingLhs(_))
        ));
        assert!(matches!(
            Binding::new("f(a", "a"),
            Err(ModelError::InvalidBindingLhs(_))
        ));
    }

    #[test]
    fn test_missing_functions() {
        let e = parse_node("U = gk(n)*(V - ek) + exp(V)").unwrap();
        let missing: Vec<&str> = e.missing_functions().collect();
        assert_eq!(missing, ["gk"]);
    }

    #[test]
    fn test_prefixing() {
        let b = parse_node("ntau(V) := 1/(q10*(alpha_n(V) + beta_n(V)))").unwrap();
        assert_eq!(
            b.prefix("PRE_").unwrap(),
            "PRE_ntau(V) := 1/(PRE_q10*(PRE_alpha_n(V) + PRE_beta_n(V)))"
        );
        let ode = Expression::Ode(Ode::new("V", "t", "(ina + ik + il + Isyn)/C").unwrap());
        assert_eq!(
            ode.prefix("PRE_").unwrap(),
            "dPRE_V/dt = (PRE_ina + PRE_ik + PRE_il + PRE_Isyn)/PRE_C"
        );
        let a = Expression::Assignment(Assignment::new("U", "gk(n)*(V - ek)").unwrap());
        assert_eq!(a.prefix("PRE_").unwrap(), "PRE_U = PRE_gk(PRE_n)*(PRE_V - PRE_ek)");
        let i = Expression::Inplace(inplace_add("U", "gk(n)*(V - ek)").unwrap());
        assert_eq!(
            i.prefix("PRE_").unwrap(),
            "PRE_U += PRE_gk(PRE_n)*(PRE_V - PRE_ek)"
        );
    }

    #[test]
    fn test_evaluator_takes_values_in_name_order() {
        let e = parse_node("I = g*(V - E)").unwrap();
        let f = e.parsed_rhs().evaluator();
        assert_eq!(f(&[2.0, -60.0, -80.0]).unwrap(), 40.0);
    }

    #[test]
    fn test_as_expr_round_trips() {
        for text in ["dV/dt = -V/tau", "U = V+1", "U *= 2", "f(a, b) := a*b + c"] {
            let node = parse_node(text).unwrap();
            assert_eq!(parse_node(&node.as_expr()).unwrap(), node);
        }
    }
}
