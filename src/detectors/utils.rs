//! # Detector Utilities
//!
//! @title Interaction Discovery Helpers
//! @author Ramprasad
//!
//! Shared helpers for locating interactions (calls handing control to another
//! account) and tracked values inside statements.

use crate::ir::{Condition, Opcode, Operand, Statement, StatementKind};
use std::collections::HashSet;

/// Block and transaction globals a contract should not lean on.
pub const TRACKED_GLOBALS: &[&str] = &["block.timestamp", "now", "block.number", "tx.origin"];

/// Raw calldata, forwarded verbatim by proxy-style delegatecalls.
pub const MSG_DATA: &str = "msg.data";

/// Where on a statement an interaction was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    /// The statement is the call.
    Statement,
    /// Right-hand side of an assignment or declaration.
    Value,
    /// Condition of a `require`, `if` or `else if`.
    Guard,
    Return,
}

/// A call found on a statement.
#[derive(Debug, Clone, Copy)]
pub struct Interaction<'ir> {
    pub statement: &'ir Statement,
    pub opcode: Opcode,
    pub arguments: &'ir [Condition],
    pub site: Site,
}

/// All interactions carried by `statement` itself (not its children) at the given
/// sites whose opcode satisfies `accept`.
pub fn interactions_of<'ir>(
    statement: &'ir Statement,
    sites: &[Site],
    accept: impl Fn(Opcode) -> bool,
) -> Vec<Interaction<'ir>> {
    let mut found = Vec::new();

    if let StatementKind::Call {
        opcode, arguments, ..
    } = &statement.kind
    {
        if sites.contains(&Site::Statement) && accept(*opcode) {
            found.push(Interaction {
                statement,
                opcode: *opcode,
                arguments,
                site: Site::Statement,
            });
        }
    }

    let records = match &statement.kind {
        StatementKind::Assignment { value, .. } | StatementKind::VariableDeclaration { value, .. } => {
            Some((value.as_slice(), Site::Value))
        }
        StatementKind::Return { values } => Some((values.as_slice(), Site::Return)),
        _ => statement.guard_conditions().map(|c| (c, Site::Guard)),
    };
    if let Some((records, site)) = records {
        if sites.contains(&site) {
            for operand in records.iter().flat_map(Condition::operands) {
                if let Some(opcode) = operand.opcode().filter(|op| accept(*op)) {
                    found.push(Interaction {
                        statement,
                        opcode,
                        arguments: operand.arguments(),
                        site,
                    });
                }
            }
        }
    }
    found
}

/// Returns `true` if any operand of `records`, or of their nested call and index
/// arguments, satisfies `pred`.
pub fn any_operand_deep(records: &[Condition], pred: &dyn Fn(&Operand) -> bool) -> bool {
    records
        .iter()
        .flat_map(Condition::operands)
        .any(|operand| pred(operand) || any_operand_deep(operand.arguments(), pred))
}

/// Returns `true` if `operand` names a tracked global or a tracked variable.
pub fn is_tracked(operand: &Operand, variables: &HashSet<i64>) -> bool {
    operand
        .name()
        .is_some_and(|name| TRACKED_GLOBALS.contains(&name))
        || operand
            .declaration()
            .is_some_and(|id| variables.contains(&id))
}

/// Returns `true` if `operand` is `msg.data`.
pub fn is_msg_data(operand: &Operand) -> bool {
    operand.name() == Some(MSG_DATA)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Term, Variable};

    fn reference(name: &str, declaration: Option<i64>) -> Condition {
        Condition::single(Term::Reference {
            name: name.to_string(),
            declaration,
            ty: None,
        })
    }

    fn send() -> Condition {
        Condition::single(Term::Call {
            opcode: Opcode::Send,
            name: None,
            arguments: vec![reference("amount", Some(4))],
        })
    }

    #[test]
    fn test_interaction_in_declaration_value() {
        let statement = Statement::new(
            StatementKind::VariableDeclaration {
                declarations: vec![Variable {
                    name: "ok".into(),
                    declaration: Some(9),
                    ty: Some("bool".into()),
                    index: vec![],
                }],
                value: vec![send()],
            },
            None,
            None,
        );
        let found = interactions_of(&statement, &[Site::Value], |op: Opcode| op.is_low_level());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].opcode, Opcode::Send);
        assert_eq!(found[0].site, Site::Value);
        assert!(interactions_of(&statement, &[Site::Statement], |op: Opcode| op.is_low_level()).is_empty());
    }

    #[test]
    fn test_tracked_globals_and_variables() {
        let operand = |record: &Condition| record.operands().next().cloned().unwrap();
        let mut variables = HashSet::new();
        assert!(is_tracked(&operand(&reference("block.timestamp", None)), &variables));
        assert!(!is_tracked(&operand(&reference("deadline", Some(3))), &variables));
        variables.insert(3);
        assert!(is_tracked(&operand(&reference("deadline", Some(3))), &variables));
    }

    #[test]
    fn test_deep_search_reaches_call_arguments() {
        let hashed = Condition::single(Term::Call {
            opcode: Opcode::FunctionCall,
            name: Some("keccak256".into()),
            arguments: vec![reference("msg.data", None)],
        });
        assert!(any_operand_deep(&[hashed.clone()], &is_msg_data));
        assert!(!hashed.operands().any(is_msg_data));
    }
}
