//! Parsed form of the expression mini-language.
//!
//! [`MathExpr::parse`] turns right-hand-side or guard text into a tree using
//! a small recursive-descent parser over the [`lexer`](super::lexer) tokens.
//! The tree is what free-variable and function-call sets are computed from,
//! and what [`MathExpr::eval`] evaluates.
//!
//! Precedence, loosest first:
//!
//! | level      | operators                        |
//! |------------|----------------------------------|
//! | or         | `\|`, `\|\|`, `or`               |
//! | and        | `&`, `&&`, `and`                 |
//! | not        | `!`, `not` (prefix)              |
//! | comparison | `<` `>` `<=` `>=` `==` `!=`      |
//! | additive   | `+` `-`                          |
//! | term       | `*` `/`                          |
//! | unary      | `+` `-` (prefix)                 |
//! | power      | `**` `^` (right associative)     |

use indexmap::IndexSet;

use super::lexer::{lex, Spanned, Token};
use super::namespace::{call_builtin, is_math_symbol, Namespace};
use crate::ir::error::{ModelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MathExpr {
    Number(f64),
    Bool(bool),
    Symbol(String),
    Call {
        name: String,
        args: Vec<MathExpr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<MathExpr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<MathExpr>,
        rhs: Box<MathExpr>,
    },
}

impl MathExpr {
    /// Parse a complete expression. Trailing tokens are an error.
    pub fn parse(text: &str) -> Result<MathExpr> {
        let tokens = lex(text)?;
        let mut parser = Parser {
            text,
            tokens: &tokens,
            pos: 0,
        };
        let expr = parser.parse_or()?;
        if let Some(tok) = parser.peek() {
            let (message, span) = match tok.token {
                Token::ParenClose => ("unmatched ')'".to_string(), tok.span.clone()),
                _ => (
                    format!("unexpected '{}'", &text[tok.span.clone()]),
                    tok.span.clone(),
                ),
            };
            return Err(parser.error_at(message, span));
        }
        Ok(expr)
    }

    /// Free symbols, in order of first appearance. `pi` and `e` are constants
    /// and never free.
    pub fn symbols(&self) -> IndexSet<String> {
        let mut out = IndexSet::new();
        self.collect(&mut out, &mut IndexSet::new());
        out
    }

    /// Names of every function called, reserved or not.
    pub fn functions(&self) -> IndexSet<String> {
        let mut out = IndexSet::new();
        self.collect(&mut IndexSet::new(), &mut out);
        out
    }

    fn collect(&self, symbols: &mut IndexSet<String>, functions: &mut IndexSet<String>) {
        match self {
            MathExpr::Number(_) | MathExpr::Bool(_) => {}
            MathExpr::Symbol(name) => {
                if !is_math_symbol(name) {
                    symbols.insert(name.clone());
                }
            }
            MathExpr::Call { name, args } => {
                functions.insert(name.clone());
                for arg in args {
                    arg.collect(symbols, functions);
                }
            }
            MathExpr::Unary { operand, .. } => operand.collect(symbols, functions),
            MathExpr::Binary { lhs, rhs, .. } => {
                lhs.collect(symbols, functions);
                rhs.collect(symbols, functions);
            }
        }
    }

    /// Evaluate against `ns`. Booleans evaluate to `1.0`/`0.0`.
    pub fn eval(&self, ns: &Namespace) -> std::result::Result<f64, String> {
        let truth = |b: bool| if b { 1.0 } else { 0.0 };
        match self {
            MathExpr::Number(v) => Ok(*v),
            MathExpr::Bool(b) => Ok(truth(*b)),
            MathExpr::Symbol(name) => ns
                .value(name)
                .ok_or_else(|| format!("symbol '{name}' has no value")),
            MathExpr::Call { name, args } => {
                let values = args
                    .iter()
                    .map(|a| a.eval(ns))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                if let Some(result) = call_builtin(name, &values) {
                    return result;
                }
                ns.function(name)
                    .map(|f| f(values.as_slice()))
                    .ok_or_else(|| format!("function '{name}' is not defined"))
            }
            MathExpr::Unary { op, operand } => {
                let v = operand.eval(ns)?;
                Ok(match op {
                    UnaryOp::Neg => -v,
                    UnaryOp::Plus => v,
                    UnaryOp::Not => truth(v == 0.0),
                })
            }
            MathExpr::Binary { op, lhs, rhs } => {
                let a = lhs.eval(ns)?;
                // Short-circuit the boolean connectives.
                match op {
                    BinaryOp::And if a == 0.0 => return Ok(0.0),
                    BinaryOp::Or if a != 0.0 => return Ok(1.0),
                    _ => {}
                }
                let b = rhs.eval(ns)?;
                Ok(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Pow => a.powf(b),
                    BinaryOp::Lt => truth(a < b),
                    BinaryOp::Gt => truth(a > b),
                    BinaryOp::Le => truth(a <= b),
                    BinaryOp::Ge => truth(a >= b),
                    BinaryOp::Eq => truth(a == b),
                    BinaryOp::Ne => truth(a != b),
                    BinaryOp::And | BinaryOp::Or => truth(b != 0.0),
                })
            }
        }
    }
}

// =============================================================================
// Recursive-descent parser
// =============================================================================

struct Parser<'a> {
    text: &'a str,
    tokens: &'a [Spanned],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<Token> {
        self.peek().map(|t| t.token)
    }

    fn advance(&mut self) -> Option<&'a Spanned> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    fn eat(&mut self, token: Token) -> bool {
        if self.peek_token() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error_at(&self, message: String, span: std::ops::Range<usize>) -> ModelError {
        ModelError::Parse {
            text: self.text.to_string(),
            message,
            span,
        }
    }

    fn end_span(&self) -> std::ops::Range<usize> {
        self.text.len()..self.text.len()
    }

    fn parse_or(&mut self) -> Result<MathExpr> {
        let mut lhs = self.parse_and()?;
        while self.eat(Token::Or) {
            let rhs = self.parse_and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<MathExpr> {
        let mut lhs = self.parse_not()?;
        while self.eat(Token::And) {
            let rhs = self.parse_not()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<MathExpr> {
        if self.eat(Token::Not) {
            let operand = self.parse_not()?;
            return Ok(MathExpr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<MathExpr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Less) => BinaryOp::Lt,
                Some(Token::Greater) => BinaryOp::Gt,
                Some(Token::LessEq) => BinaryOp::Le,
                Some(Token::GreaterEq) => BinaryOp::Ge,
                Some(Token::DoubleEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::Ne,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_additive()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_additive(&mut self) -> Result<MathExpr> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_term()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_term(&mut self) -> Result<MathExpr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> Result<MathExpr> {
        let op = match self.peek_token() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.parse_power(),
        };
        self.pos += 1;
        let operand = self.parse_unary()?;
        Ok(MathExpr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_power(&mut self) -> Result<MathExpr> {
        let base = self.parse_primary()?;
        if self.eat(Token::Power) {
            // Exponent binds a signed operand: 2**-1
            let exponent = self.parse_unary()?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<MathExpr> {
        let Some(tok) = self.advance() else {
            return Err(self.error_at("unexpected end of expression".into(), self.end_span()));
        };
        match tok.token {
            Token::Number(v) => Ok(MathExpr::Number(v)),
            Token::True => Ok(MathExpr::Bool(true)),
            Token::False => Ok(MathExpr::Bool(false)),
            Token::Ident => {
                let name = self.text[tok.span.clone()].to_string();
                if self.eat(Token::ParenOpen) {
                    let args = self.parse_arguments(tok.span.start)?;
                    Ok(MathExpr::Call { name, args })
                } else {
                    Ok(MathExpr::Symbol(name))
                }
            }
            Token::ParenOpen => {
                let inner = self.parse_or()?;
                if !self.eat(Token::ParenClose) {
                    return Err(self.error_at("unmatched '('".into(), tok.span.clone()));
                }
                Ok(inner)
            }
            _ => Err(self.error_at(
                format!("unexpected '{}'", &self.text[tok.span.clone()]),
                tok.span.clone(),
            )),
        }
    }

    /// Arguments after an opening parenthesis, up to and including the close.
    fn parse_arguments(&mut self, call_start: usize) -> Result<Vec<MathExpr>> {
        let mut args = Vec::new();
        if self.eat(Token::ParenClose) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_or()?);
            if self.eat(Token::Comma) {
                continue;
            }
            if self.eat(Token::ParenClose) {
                return Ok(args);
            }
            let span = self
                .peek()
                .map_or(call_start..self.text.len(), |t| t.span.clone());
            return Err(self.error_at("unmatched '(' in call".into(), span));
        }
    }
}

fn binary(op: BinaryOp, lhs: MathExpr, rhs: MathExpr) -> MathExpr {
    MathExpr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> IndexSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn names_and_funcs(text: &str) -> (IndexSet<String>, IndexSet<String>) {
        let expr = MathExpr::parse(text).unwrap();
        (expr.symbols(), expr.functions())
    }

    #[test]
    fn test_free_variables_and_calls() {
        let cases: &[(&str, &[&str], &[&str])] = &[
            ("-A/tau_r", &["A", "tau_r"], &[]),
            ("a*(b*V - U)", &["a", "b", "V", "U"], &[]),
            (" 0.04*V*V + 5.0*V + 1. + 140.0 - U + Isyn", &["V", "U", "Isyn"], &[]),
            ("1", &[], &[]),
            ("atan2(sin(x),cos(y))", &["x", "y"], &["atan2", "sin", "cos"]),
            (
                "1 / ( 1 + mg_conc * sin(0.5) *  exp ( -1 * gamma*V))",
                &["mg_conc", "gamma", "V"],
                &["sin", "exp"],
            ),
            ("2*pi*e*f", &["f"], &[]),
        ];
        for (text, names, funcs) in cases {
            let (n, f) = names_and_funcs(text);
            assert_eq!(n, set(names), "names of {text}");
            assert_eq!(f, set(funcs), "funcs of {text}");
        }
    }

    #[test]
    fn test_unbalanced_parentheses() {
        for text in [
            "1 / (( 1 + mg_conc * eta *  exp ( -1 * gamma*V))",
            "1 / ( 1 + mg_conc * eta *  exp ( -1 * gamma*V)))",
            "1 / ( 1 + mg_conc * eta *  exp (( -1 * gamma*V))",
        ] {
            let err = MathExpr::parse(text).unwrap_err();
            assert!(matches!(err, ModelError::Parse { .. }), "{text}: {err}");
        }
    }

    #[test]
    fn test_malformed_numbers() {
        assert!(MathExpr::parse("1..0").is_err());
        assert!(MathExpr::parse("..0").is_err());
    }

    #[test]
    fn test_eval_precedence() {
        let ns = Namespace::new().with_value("x", 2.0);
        let eval = |text: &str| MathExpr::parse(text).unwrap().eval(&ns).unwrap();
        assert_eq!(eval("1 + 2 * 3"), 7.0);
        assert_eq!(eval("-x**2"), -4.0);
        assert_eq!(eval("2**3**2"), 512.0);
        assert_eq!(eval("2^-1"), 0.5);
        assert_eq!(eval("x > 1 & x < 3"), 1.0);
        assert_eq!(eval("not x > 1 or x == 2"), 1.0);
        assert_eq!(eval("(1 + x) * 3"), 9.0);
    }

    #[test]
    fn test_eval_reference_values() {
        let ns: Namespace = [
            ("A", 10.0),
            ("tau_r", 11.0),
            ("V", -70.0),
            ("a", 1.2),
            ("b", 3.0),
            ("U", -80.0),
            ("Isyn", 2.0),
        ]
        .into_iter()
        .collect();
        let eval = |text: &str| MathExpr::parse(text).unwrap().eval(&ns).unwrap();
        assert!((eval("-A/tau_r") + 0.909090909091).abs() < 1e-9);
        assert!((eval("a*(b*V - U)") + 156.0).abs() < 1e-9);
        assert!((eval(" 0.04*V*V + 5.0*V + 1. + 140.0 - U + Isyn") - 69.0).abs() < 1e-9);
    }

    #[test]
    fn test_eval_user_function() {
        let ns = Namespace::new().with_function("twice", |args| 2.0 * args[0]);
        let expr = MathExpr::parse("twice(3) + 1").unwrap();
        assert_eq!(expr.eval(&ns), Ok(7.0));
        let missing = MathExpr::parse("what(3)").unwrap();
        assert!(missing.eval(&ns).is_err());
    }
}
