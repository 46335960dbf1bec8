//! # V003 - Over-Dependency Detector
//!
//! @title Block State Dependency Detector
//! @author Ramprasad
//!
//! Detects logic that leans on values a block producer or the transaction sender
//! can influence: `block.timestamp` (and `now`), `block.number` and `tx.origin`.
//!
//! ## Tests
//!
//! - **A**: assignments whose value derives from a tracked value. The assigned
//!   variables become tracked for the rest of the function, so chains of
//!   assignments are followed in textual order.
//! - **B**: guards on a tracked value that lead to an interaction.
//! - **C**: return statements exposing a tracked value.
//!
//! ## Vulnerability Pattern
//!
//! ```solidity
//! // VULNERABLE: miner-adjustable timestamp decides the payout
//! function play() public {
//!     if (block.timestamp % 15 == 0) {
//!         msg.sender.transfer(address(this).balance);
//!     }
//! }
//! ```
//!
//! ## CWE Reference
//!
//! - CWE-829: Inclusion of Functionality from Untrusted Control Sphere

use super::utils::{any_operand_deep, is_tracked};
use super::{
    create_finding, statement_location, Details, DetectorResult, MessageKind,
    VulnerabilityDetector,
};
use crate::analysis::{start_from, AnalysisContext};
use crate::ir::visit::statements;
use crate::ir::{Condition, Function, Opcode, Operand, Statement, StatementKind};
use crate::report::Severity;
use std::collections::HashSet;

/// Built-ins that cannot hand control to another account.
const BUILTINS: &[&str] = &[
    "revert",
    "assert",
    "require",
    "keccak256",
    "sha256",
    "sha3",
    "ripemd160",
    "ecrecover",
    "addmod",
    "mulmod",
    "blockhash",
    "gasleft",
    "selfdestruct",
    "suicide",
];

fn is_interaction(opcode: Opcode, name: Option<&str>) -> bool {
    match opcode {
        Opcode::FunctionCall => !name.is_some_and(|name| BUILTINS.contains(&name)),
        other => other.is_low_level(),
    }
}

/// Returns `true` if `statement` itself calls out.
fn interacts(statement: &Statement) -> bool {
    if let StatementKind::Call { opcode, name, .. } = &statement.kind {
        if is_interaction(*opcode, name.as_deref()) {
            return true;
        }
    }
    any_operand_deep(statement.conditions(), &|operand: &Operand| {
        operand
            .opcode()
            .is_some_and(|opcode| is_interaction(opcode, operand.name()))
    })
}

/// Detector for dependence on block and transaction globals.
pub struct OverDependencyDetector;

impl OverDependencyDetector {
    fn guard_leads_to_interaction(&self, sequence: &[Statement], guard: &Statement) -> bool {
        match &guard.kind {
            StatementKind::Require { .. } => {
                let after = start_from(sequence, &guard.path);
                let found = after
                    .iter()
                    .filter(|statement| statement.path != guard.path)
                    .any(interacts);
                found
            }
            _ => statements(guard.children()).any(interacts),
        }
    }
}

impl VulnerabilityDetector for OverDependencyDetector {
    fn id(&self) -> &'static str { "V003" }

    fn name(&self) -> &'static str { "Over-Dependency on Block State" }

    fn description(&self) -> &'static str {
        "Detects assignments, guards and return values derived from block.timestamp, block.number or tx.origin."
    }

    fn severity(&self) -> Severity { Severity::Medium }

    fn cwe(&self) -> Option<&'static str> { Some("CWE-829") }

    fn remediation(&self) -> &'static str {
        "Avoid block and transaction globals in security decisions:\n\
         1. Use msg.sender instead of tx.origin for authorization\n\
         2. Do not derive randomness from block.timestamp or block.number\n\
         3. Tolerate timestamp drift of several seconds in time-based logic"
    }

    fn detect_function(&self, context: &AnalysisContext, function: &Function) -> Option<DetectorResult> {
        let mut tracked: HashSet<i64> = HashSet::new();
        let (mut assignments, mut checks, mut returns) = (0, 0, 0);
        let mut result = DetectorResult::new(
            self,
            Details::OverDependency {
                found_assignments: false,
                found_checks_leading_to_interaction: false,
                found_return_variable: false,
            },
        );
        result.score_limit = 3;

        for statement in statements(&function.sequence) {
            let depends = |records: &[Condition]| {
                any_operand_deep(records, &|operand: &Operand| is_tracked(operand, &tracked))
            };
            let mut flag = |title: String, description: String| {
                result.findings.push(create_finding(
                    self,
                    context,
                    statement_location(context, &function.name, &statement.path),
                    statement.src.as_ref(),
                    title,
                    description,
                ));
            };

            if let Some(value) = statement.assigned_value() {
                if depends(value) {
                    assignments += 1;
                    let names: Vec<&str> = statement.targets().iter().map(|t| t.name.as_str()).collect();
                    flag(
                        format!("`{}` derived from block state", names.join(", ")),
                        format!(
                            "The assignment at {} takes its value from block or transaction globals.",
                            statement.path
                        ),
                    );
                    let newly: Vec<i64> = statement.targets().iter().filter_map(|t| t.declaration).collect();
                    tracked.extend(newly);
                }
            } else if let Some(conditions) = statement.guard_conditions() {
                if depends(conditions) && self.guard_leads_to_interaction(&function.sequence, statement) {
                    checks += 1;
                    flag(
                        "Block state gates an external call".to_string(),
                        format!(
                            "The {} at {} tests block or transaction globals and is followed by an interaction.",
                            statement.label(),
                            statement.path
                        ),
                    );
                }
            } else if let StatementKind::Return { values } = &statement.kind {
                if depends(values) {
                    returns += 1;
                    flag(
                        "Block state returned".to_string(),
                        format!("The return at {} exposes block or transaction globals.", statement.path),
                    );
                }
            }
        }

        result.score = assignments + checks + returns;
        result.details = Details::OverDependency {
            found_assignments: assignments > 0,
            found_checks_leading_to_interaction: checks > 0,
            found_return_variable: returns > 0,
        };

        if assignments > 0 {
            result.message(
                MessageKind::Warning,
                format!("{} assignment(s) derive from block state.", assignments),
            );
        }
        if checks > 0 {
            result.message(
                MessageKind::Error,
                format!("{} check(s) on block state lead to an interaction.", checks),
            );
        }
        if returns > 0 {
            result.message(
                MessageKind::Warning,
                format!("{} return value(s) expose block state.", returns),
            );
        }
        if result.score == 0 {
            result.message(MessageKind::Okay, "No dependency on block state found.");
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract_contract;
    use crate::parser::testing::*;
    use serde_json::Value;

    fn run(body: Vec<Value>) -> DetectorResult {
        let index = index_of(vec![contract(
            "Lottery",
            &[],
            vec![function("play", "public", "nonpayable", &[], body)],
        )]);
        let contract = extract_contract(&index, "Lottery").unwrap().contract;
        let context = AnalysisContext::new(&contract, &index);
        let function = contract.function("play").unwrap();
        OverDependencyDetector.detect_function(&context, function).unwrap()
    }

    #[test]
    fn test_return_timestamp() {
        let result = run(vec![ret(Some(global("block", "timestamp")))]);
        assert_eq!(result.score, 1);
        assert_eq!(result.score_limit, 3);
        assert!(matches!(
            result.details,
            Details::OverDependency { found_return_variable: true, found_assignments: false, .. }
        ));
    }

    #[test]
    fn test_assignment_chain_is_followed() {
        let result = run(vec![
            var_decl(vec![declaration("t", 60, "uint256")], Some(ident("now", -17, "uint256"))),
            var_decl(
                vec![declaration("seed", 61, "uint256")],
                Some(binary(ident("t", 60, "uint256"), "%", literal("15"))),
            ),
            ret(Some(ident("seed", 61, "uint256"))),
        ]);
        assert_eq!(result.score, 3);
        assert_eq!(result.findings.len(), 3);
    }

    #[test]
    fn test_guard_leading_to_transfer() {
        let result = run(vec![if_stmt(
            binary(global("block", "timestamp"), ">", ident("deadline", 7, "uint256")),
            vec![expr_stmt(low_level(global("msg", "sender"), "transfer", vec![literal("1")]))],
            None,
        )]);
        assert_eq!(result.score, 1);
        assert!(matches!(
            result.details,
            Details::OverDependency { found_checks_leading_to_interaction: true, .. }
        ));
    }

    #[test]
    fn test_require_on_origin_before_call() {
        let result = run(vec![
            expr_stmt(require(binary(global("tx", "origin"), "==", ident("owner", 8, "address")), None)),
            expr_stmt(low_level(ident("owner", 8, "address"), "send", vec![literal("1")])),
        ]);
        assert_eq!(result.score, 1);
    }

    #[test]
    fn test_guard_without_interaction_is_ignored() {
        let result = run(vec![if_stmt(
            binary(global("block", "number"), ">", literal("100")),
            vec![expr_stmt(call("revert", vec![]))],
            None,
        )]);
        assert_eq!(result.score, 0);
        assert_eq!(result.messages[0].kind, MessageKind::Okay);
    }
}
