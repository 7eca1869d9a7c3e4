//! Analog port checks against the resolved symbol sets.

use indexmap::{IndexMap, IndexSet};

use crate::ir::analysis::symbols::SymbolTable;
use crate::ir::ast::{AnalogPort, PortMode};
use crate::ir::error::{ModelError, Result};

/// Validate the component's analog ports.
///
/// - `recv` and `reduce` ports must target a parameter.
/// - `send` ports must source a parameter, variable or bound symbol.
/// - A `recv` port is the only writer of its symbol. `reduce` ports may
///   share a symbol as long as they all use the same operator.
pub fn check_analog_ports(
    ports: &[AnalogPort],
    parameters: &IndexSet<String>,
    symbols: &SymbolTable,
) -> Result<()> {
    let defined = symbols.non_parameter();
    let mut writers: IndexMap<&str, PortMode> = IndexMap::new();

    for port in ports {
        let symbol = port.symbol.as_str();
        if !port.mode.is_inbound() {
            if !parameters.contains(symbol) && !defined.contains(symbol) {
                return Err(ModelError::SendPortUndefined(port.symbol.clone()));
            }
            continue;
        }
        if !parameters.contains(symbol) {
            return Err(ModelError::RecvPortNotParameter(port.symbol.clone()));
        }
        match writers.get(symbol) {
            Some(PortMode::Reduce(op)) if port.mode == PortMode::Reduce(*op) => {}
            Some(_) => return Err(ModelError::ConflictingPortWriters(port.symbol.clone())),
            None => {
                writers.insert(symbol, port.mode);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ast::ReduceOp;

    fn set(items: &[&str]) -> IndexSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn symbols() -> SymbolTable {
        SymbolTable {
            integrated: set(&["V"]),
            assigned: set(&[]),
            independent: set(&["t"]),
            bound: set(&["gl"]),
        }
    }

    #[test]
    fn test_recv_must_target_parameter() {
        let params = set(&["Isyn"]);
        assert!(check_analog_ports(&[AnalogPort::recv("Isyn").unwrap()], &params, &symbols()).is_ok());
        assert!(matches!(
            check_analog_ports(&[AnalogPort::recv("V").unwrap()], &params, &symbols()),
            Err(ModelError::RecvPortNotParameter(_))
        ));
        assert!(matches!(
            check_analog_ports(&[AnalogPort::recv("gl").unwrap()], &params, &symbols()),
            Err(ModelError::RecvPortNotParameter(_))
        ));
    }

    #[test]
    fn test_send_must_be_defined() {
        let params = set(&["Isyn"]);
        for symbol in ["V", "gl", "Isyn"] {
            assert!(check_analog_ports(&[AnalogPort::send(symbol).unwrap()], &params, &symbols()).is_ok());
        }
        assert!(matches!(
            check_analog_ports(&[AnalogPort::send("W").unwrap()], &params, &symbols()),
            Err(ModelError::SendPortUndefined(_))
        ));
    }

    #[test]
    fn test_writers() {
        let params = set(&["Isyn"]);
        let add = AnalogPort::reduce("Isyn", ReduceOp::Add).unwrap();
        let mul = AnalogPort::reduce("Isyn", ReduceOp::Mul).unwrap();
        let recv = AnalogPort::recv("Isyn").unwrap();

        assert!(check_analog_ports(&[add.clone(), add.clone()], &params, &symbols()).is_ok());
        for ports in [
            vec![recv.clone(), recv.clone()],
            vec![add.clone(), mul],
            vec![recv, add],
        ] {
            assert!(matches!(
                check_analog_ports(&ports, &params, &symbols()),
                Err(ModelError::ConflictingPortWriters(_))
            ));
        }
    }
}
