//! The fixed math namespace available to every expression.
//!
//! Two symbols (`pi`, `e`) and a small set of functions are built in. These
//! names can never be redefined by a model: they are never parameters, never
//! assignment targets and never binding names. Any other function called from
//! an expression is a *missing function* that can only be supplied by a
//! binding of the same name.

use std::collections::HashMap;
use std::fmt;

/// Symbols with a fixed value.
pub const MATH_SYMBOLS: &[&str] = &["pi", "e"];

/// Functions that are always available.
pub const MATH_FUNCTIONS: &[&str] = &[
    "exp", "sin", "cos", "log", "log10", "pow", "sinh", "cosh", "tanh", "sqrt", "mod", "sum",
    "atan", "asin", "acos", "asinh", "acosh", "atanh", "atan2",
];

pub fn is_math_symbol(name: &str) -> bool {
    MATH_SYMBOLS.contains(&name)
}

pub fn is_math_function(name: &str) -> bool {
    MATH_FUNCTIONS.contains(&name)
}

/// True for any name in the reserved math namespace, symbol or function.
pub fn is_reserved(name: &str) -> bool {
    is_math_symbol(name) || is_math_function(name)
}

/// Value of a built-in symbol.
pub fn symbol_value(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        _ => None,
    }
}

/// Apply a built-in function.
///
/// Returns `None` when `name` is not a built-in, and `Some(Err(..))` when it
/// is called with the wrong number of arguments.
pub fn call_builtin(name: &str, args: &[f64]) -> Option<Result<f64, String>> {
    let unary = |f: fn(f64) -> f64| match args {
        [x] => Ok(f(*x)),
        _ => Err(arity_message(name, 1, args.len())),
    };
    let binary = |f: fn(f64, f64) -> f64| match args {
        [x, y] => Ok(f(*x, *y)),
        _ => Err(arity_message(name, 2, args.len())),
    };

    let result = match name {
        "exp" => unary(f64::exp),
        "sin" => unary(f64::sin),
        "cos" => unary(f64::cos),
        "log" => unary(f64::ln),
        "log10" => unary(f64::log10),
        "sinh" => unary(f64::sinh),
        "cosh" => unary(f64::cosh),
        "tanh" => unary(f64::tanh),
        "sqrt" => unary(f64::sqrt),
        "atan" => unary(f64::atan),
        "asin" => unary(f64::asin),
        "acos" => unary(f64::acos),
        "asinh" => unary(f64::asinh),
        "acosh" => unary(f64::acosh),
        "atanh" => unary(f64::atanh),
        "pow" => binary(f64::powf),
        "atan2" => binary(f64::atan2),
        // Result takes the sign of the divisor.
        "mod" => binary(|x, y| x - y * (x / y).floor()),
        "sum" => Ok(args.iter().sum()),
        _ => return None,
    };
    Some(result)
}

fn arity_message(name: &str, expected: usize, found: usize) -> String {
    format!("'{name}' takes {expected} argument(s), got {found}")
}

/// A user supplied function callable from an evaluated expression.
pub type UserFunction = Box<dyn Fn(&[f64]) -> f64>;

/// Values and extra functions an expression is evaluated against.
#[derive(Default)]
pub struct Namespace {
    values: HashMap<String, f64>,
    functions: HashMap<String, UserFunction>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn with_function(
        mut self,
        name: impl Into<String>,
        function: impl Fn(&[f64]) -> f64 + 'static,
    ) -> Self {
        self.functions.insert(name.into(), Box::new(function));
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    /// Model values shadow nothing: `pi` and `e` always resolve to constants.
    pub fn value(&self, name: &str) -> Option<f64> {
        symbol_value(name).or_else(|| self.values.get(name).copied())
    }

    pub fn function(&self, name: &str) -> Option<&UserFunction> {
        self.functions.get(name)
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Namespace {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut ns = Namespace::new();
        for (name, value) in iter {
            ns.set(name, value);
        }
        ns
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("values", &self.values)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved("pi"));
        assert!(is_reserved("atan2"));
        assert!(!is_reserved("V"));
        assert!(!is_math_function("e"));
    }

    #[test]
    fn test_builtin_arity() {
        assert_eq!(call_builtin("pow", &[2.0, 3.0]), Some(Ok(8.0)));
        assert_eq!(call_builtin("sum", &[1.0, 2.0, 3.0]), Some(Ok(6.0)));
        assert!(matches!(call_builtin("sin", &[1.0, 2.0]), Some(Err(_))));
        assert_eq!(call_builtin("gk", &[1.0]), None);
    }

    #[test]
    fn test_mod_follows_divisor_sign() {
        assert_eq!(call_builtin("mod", &[-1.0, 3.0]), Some(Ok(2.0)));
        assert_eq!(call_builtin("mod", &[7.0, 3.0]), Some(Ok(1.0)));
    }

    #[test]
    fn test_constants_cannot_be_shadowed() {
        let ns = Namespace::new().with_value("pi", 3.0).with_value("x", 1.5);
        assert_eq!(ns.value("pi"), Some(std::f64::consts::PI));
        assert_eq!(ns.value("x"), Some(1.5));
        assert_eq!(ns.value("y"), None);
    }
}
