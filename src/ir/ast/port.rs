//! Analog and event port declarations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ir::error::{ModelError, Result};
use crate::ir::math::lexer::is_identifier;

/// Operator combining the values of concurrent writers on a reduce port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReduceOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
}

impl ReduceOp {
    pub fn parse(op: &str) -> Result<Self> {
        match op.trim() {
            "+" => Ok(ReduceOp::Add),
            "-" => Ok(ReduceOp::Sub),
            "*" => Ok(ReduceOp::Mul),
            "/" => Ok(ReduceOp::Div),
            other => Err(ModelError::UnknownReduceOp(other.to_string())),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ReduceOp::Add => "+",
            ReduceOp::Sub => "-",
            ReduceOp::Mul => "*",
            ReduceOp::Div => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortMode {
    Send,
    Recv,
    Reduce(ReduceOp),
}

impl PortMode {
    /// Parse `send`, `recv` or `reduce`; `reduce` requires `op`.
    pub fn parse(mode: &str, op: Option<&str>) -> Result<Self> {
        match (mode.trim(), op) {
            ("send", _) => Ok(PortMode::Send),
            ("recv", _) => Ok(PortMode::Recv),
            ("reduce", Some(op)) => Ok(PortMode::Reduce(ReduceOp::parse(op)?)),
            ("reduce", None) => Err(ModelError::UnknownReduceOp(String::new())),
            (other, _) => Err(ModelError::UnknownPortMode(other.to_string())),
        }
    }

    /// Recv and reduce ports are written from outside the component.
    pub fn is_inbound(&self) -> bool {
        !matches!(self, PortMode::Send)
    }
}

impl fmt::Display for PortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortMode::Send => f.write_str("send"),
            PortMode::Recv => f.write_str("recv"),
            PortMode::Reduce(op) => write!(f, "reduce({})", op.symbol()),
        }
    }
}

fn check_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim();
    if is_identifier(symbol) {
        Ok(symbol.to_string())
    } else {
        Err(ModelError::UnrecognizedExpression(symbol.to_string()))
    }
}

/// A continuous-valued port, read or written while a regime integrates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalogPort {
    pub symbol: String,
    pub mode: PortMode,
}

impl AnalogPort {
    pub fn new(symbol: &str, mode: PortMode) -> Result<Self> {
        Ok(Self {
            symbol: check_symbol(symbol)?,
            mode,
        })
    }

    pub fn send(symbol: &str) -> Result<Self> {
        Self::new(symbol, PortMode::Send)
    }

    pub fn recv(symbol: &str) -> Result<Self> {
        Self::new(symbol, PortMode::Recv)
    }

    pub fn reduce(symbol: &str, op: ReduceOp) -> Result<Self> {
        Self::new(symbol, PortMode::Reduce(op))
    }
}

/// A discrete port, exchanged only when a transition fires.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventPort {
    pub symbol: String,
    pub mode: PortMode,
}

impl EventPort {
    pub fn new(symbol: &str, mode: PortMode) -> Result<Self> {
        Ok(Self {
            symbol: check_symbol(symbol)?,
            mode,
        })
    }

    pub fn send(symbol: &str) -> Result<Self> {
        Self::new(symbol, PortMode::Send)
    }

    pub fn recv(symbol: &str) -> Result<Self> {
        Self::new(symbol, PortMode::Recv)
    }
}

impl fmt::Display for AnalogPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnalogPort({}, {})", self.symbol, self.mode)
    }
}

impl fmt::Display for EventPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventPort({}, {})", self.symbol, self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!(PortMode::parse("send", None).unwrap(), PortMode::Send);
        assert_eq!(
            PortMode::parse("reduce", Some("+")).unwrap(),
            PortMode::Reduce(ReduceOp::Add)
        );
        assert!(matches!(
            PortMode::parse("listen", None),
            Err(ModelError::UnknownPortMode(_))
        ));
        assert!(matches!(
            PortMode::parse("reduce", Some("%")),
            Err(ModelError::UnknownReduceOp(_))
        ));
        assert!(!PortMode::Send.is_inbound());
        assert!(PortMode::Recv.is_inbound());
        assert!(PortMode::Reduce(ReduceOp::Mul).is_inbound());
    }

    #[test]
    fn test_invalid_symbol() {
        assert!(AnalogPort::recv("1V").is_err());
        assert_eq!(AnalogPort::send(" V ").unwrap().symbol, "V");
    }

    #[test]
    fn test_serde_shape() {
        let port = AnalogPort::reduce("Isyn", ReduceOp::Add).unwrap();
        let json = serde_json::to_string(&port).unwrap();
        assert_eq!(json, r#"{"symbol":"Isyn","mode":{"reduce":"+"}}"#);
        let back: AnalogPort = serde_json::from_str(&json).unwrap();
        assert_eq!(back, port);

        let json = serde_json::to_string(&EventPort::send("spike").unwrap()).unwrap();
        assert_eq!(json, r#"{"symbol":"spike","mode":"send"}"#);
    }
}
