//! # V002 - Mishandled Error Detector
//!
//! @title Unchecked Low-Level Call Result Detector
//! @author Ramprasad
//!
//! Detects low-level calls whose boolean success value is discarded, captured
//! but never tested, or tested by a branch that does nothing.
//!
//! ## Vulnerability Pattern
//!
//! ```solidity
//! // VULNERABLE: send failure is silently ignored
//! function pay(address payable to, uint amount) public {
//!     to.send(amount);
//! }
//! ```
//!
//! ## Secure Pattern
//!
//! ```solidity
//! // SECURE: result captured and checked
//! function pay(address payable to, uint amount) public {
//!     bool ok = to.send(amount);
//!     require(ok);
//! }
//! ```
//!
//! ## CWE Reference
//!
//! - CWE-252: Unchecked Return Value

use super::utils::{any_operand_deep, interactions_of, Site};
use super::{
    create_finding, statement_location, Details, DetectorResult, MessageKind,
    VulnerabilityDetector,
};
use crate::analysis::{start_from, AnalysisContext};
use crate::ir::visit::statements;
use crate::ir::{Function, Opcode, Operand, Statement, StatementKind};
use crate::report::Severity;

fn is_interaction(opcode: Opcode) -> bool {
    matches!(
        opcode,
        Opcode::Call | Opcode::Send | Opcode::StaticCall | Opcode::CallCode | Opcode::DelegateCall
    )
}

/// How a captured success value is used afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handling {
    Checked,
    EmptyBody,
    Unchecked,
}

#[derive(Default)]
struct Tally {
    interactions: usize,
    no_success_values: usize,
    unchecked: usize,
    empty_bodies: usize,
}

/// Detector for discarded or unchecked call results.
pub struct MishandledErrorDetector;

impl MishandledErrorDetector {
    /// Follows the captured variable `declaration` through every statement that may
    /// run after `capture`.
    fn handling(&self, sequence: &[Statement], capture: &Statement, declaration: i64) -> Handling {
        let reachable = start_from(sequence, &capture.path);
        let mentions = |operand: &Operand| operand.declaration() == Some(declaration);

        let mut empty_body = false;
        for statement in reachable.iter().filter(|s| s.path != capture.path) {
            let Some(conditions) = statement.guard_conditions() else {
                continue;
            };
            if !any_operand_deep(conditions, &mentions) {
                continue;
            }
            match &statement.kind {
                StatementKind::If(branch) | StatementKind::ElseIf(branch)
                    if branch.true_body.is_empty() =>
                {
                    empty_body = true;
                }
                _ => return Handling::Checked,
            }
        }

        if empty_body {
            Handling::EmptyBody
        } else {
            Handling::Unchecked
        }
    }
}

impl VulnerabilityDetector for MishandledErrorDetector {
    fn id(&self) -> &'static str { "V002" }

    fn name(&self) -> &'static str { "Mishandled Error" }

    fn description(&self) -> &'static str {
        "Detects low-level calls whose success value is ignored or never acted upon."
    }

    fn severity(&self) -> Severity { Severity::Medium }

    fn cwe(&self) -> Option<&'static str> { Some("CWE-252") }

    fn remediation(&self) -> &'static str {
        "Always handle the result of low-level calls:\n\
         1. Capture the success flag: (bool ok, ) = target.call(data)\n\
         2. Check it with require(ok) or an if branch that reverts or recovers\n\
         3. Prefer transfer() or a pull-payment pattern for plain ether transfers"
    }

    fn detect_function(&self, context: &AnalysisContext, function: &Function) -> Option<DetectorResult> {
        let mut tally = Tally::default();
        let mut result = DetectorResult::new(
            self,
            Details::MishandledErrors {
                no_success_values: 0,
                unchecked_success_values: 0,
                empty_check_bodies: 0,
            },
        );

        for statement in statements(&function.sequence) {
            let location = || statement_location(context, &function.name, &statement.path);

            match &statement.kind {
                StatementKind::Call { opcode, .. } if is_interaction(*opcode) => {
                    tally.interactions += 1;
                    tally.no_success_values += 1;
                    result.findings.push(create_finding(
                        self,
                        context,
                        location(),
                        statement.src.as_ref(),
                        format!("Result of `{}` discarded", opcode),
                        format!(
                            "The `{}` at {} is a bare statement. If it fails, execution continues as if it succeeded.",
                            opcode, statement.path
                        ),
                    ));
                }
                StatementKind::Assignment { .. } | StatementKind::VariableDeclaration { .. } => {
                    for interaction in interactions_of(statement, &[Site::Value], is_interaction) {
                        tally.interactions += 1;
                        let captured = statement
                            .targets()
                            .first()
                            .filter(|target| target.is_bool())
                            .and_then(|target| target.declaration);

                        let Some(declaration) = captured else {
                            tally.no_success_values += 1;
                            result.findings.push(create_finding(
                                self,
                                context,
                                location(),
                                statement.src.as_ref(),
                                format!("Success of `{}` not captured", interaction.opcode),
                                format!(
                                    "The `{}` at {} is assigned, but not into a boolean success flag.",
                                    interaction.opcode, statement.path
                                ),
                            ));
                            continue;
                        };

                        match self.handling(&function.sequence, statement, declaration) {
                            Handling::Checked => {}
                            Handling::Unchecked => {
                                tally.unchecked += 1;
                                result.findings.push(create_finding(
                                    self,
                                    context,
                                    location(),
                                    statement.src.as_ref(),
                                    format!("Success of `{}` never checked", interaction.opcode),
                                    format!(
                                        "The flag captured at {} is never tested by a later require or if.",
                                        statement.path
                                    ),
                                ));
                            }
                            Handling::EmptyBody => {
                                tally.empty_bodies += 1;
                                result.findings.push(create_finding(
                                    self,
                                    context,
                                    location(),
                                    statement.src.as_ref(),
                                    format!("Failed `{}` handled by an empty branch", interaction.opcode),
                                    format!(
                                        "The flag captured at {} is only tested by a branch with an empty body.",
                                        statement.path
                                    ),
                                ));
                            }
                        }
                    }
                }
                _ => {
                    // Calls inside a guard or return hand their result straight to a check
                    // or to the caller.
                    tally.interactions +=
                        interactions_of(statement, &[Site::Guard, Site::Return], is_interaction).len();
                }
            }
        }

        result.score_limit = tally.interactions;
        result.score = tally.no_success_values + tally.unchecked + tally.empty_bodies;
        result.details = Details::MishandledErrors {
            no_success_values: tally.no_success_values,
            unchecked_success_values: tally.unchecked,
            empty_check_bodies: tally.empty_bodies,
        };

        if tally.interactions == 0 {
            result.message(MessageKind::Okay, "No low-level calls found in this function.");
        }
        if tally.no_success_values > 0 {
            result.message(
                MessageKind::Error,
                format!("{} call(s) do not capture their success value.", tally.no_success_values),
            );
        }
        if tally.unchecked > 0 {
            result.message(
                MessageKind::Warning,
                format!("{} captured success value(s) are never checked.", tally.unchecked),
            );
        }
        if tally.empty_bodies > 0 {
            result.message(
                MessageKind::Warning,
                format!("{} success check(s) have an empty body.", tally.empty_bodies),
            );
        }
        if tally.interactions > 0 && result.score == 0 {
            result.message(MessageKind::Okay, "Every call result is captured and checked.");
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
            "Payer",
            &[],
            vec![function("pay", "public", "nonpayable", &[], body)],
        )]);
        let contract = extract_contract(&index, "Payer").unwrap().contract;
        let context = AnalysisContext::new(&contract, &index);
        let function = contract.function("pay").unwrap();
        MishandledErrorDetector.detect_function(&context, function).unwrap()
    }

    fn send() -> Value {
        low_level(ident("target", 3, "address payable"), "send", vec![ident("amount", 4, "uint256")])
    }

    fn ok() -> Value {
        ident("ok", 50, "bool")
    }

    #[test]
    fn test_captured_and_required() {
        let result = run(vec![
            var_decl(vec![declaration("ok", 50, "bool")], Some(send())),
            expr_stmt(require(ok(), None)),
        ]);
        assert_eq!(result.score, 0);
        assert_eq!(result.score_limit, 1);
    }

    #[test]
    fn test_bare_send() {
        let result = run(vec![expr_stmt(send())]);
        assert_eq!(result.score, 1);
        assert_eq!(result.score_limit, 1);
        assert!(matches!(result.details, Details::MishandledErrors { no_success_values: 1, .. }));
    }

    #[test]
    fn test_captured_but_unchecked() {
        let result = run(vec![
            var_decl(vec![declaration("ok", 50, "bool")], Some(send())),
            ret(None),
        ]);
        assert_eq!(result.score, 1);
        assert!(matches!(
            result.details,
            Details::MishandledErrors { unchecked_success_values: 1, .. }
        ));
    }

    #[test]
    fn test_empty_check_body() {
        let result = run(vec![
            var_decl(vec![declaration("ok", 50, "bool")], Some(send())),
            if_stmt(unary("!", ok()), vec![], None),
        ]);
        assert_eq!(result.score, 1);
        assert!(matches!(result.details, Details::MishandledErrors { empty_check_bodies: 1, .. }));
    }

    #[test]
    fn test_if_with_body_counts_as_check() {
        let result = run(vec![
            var_decl(vec![declaration("ok", 50, "bool")], Some(send())),
            if_stmt(unary("!", ok()), vec![expr_stmt(call("revert", vec![]))], None),
        ]);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn test_non_bool_capture() {
        let result = run(vec![var_decl(vec![declaration("n", 51, "uint256")], Some(send()))]);
        assert_eq!(result.score, 1);
        assert_eq!(result.score_limit, 1);
    }

    #[test]
    fn test_call_in_require_is_handled() {
        let result = run(vec![expr_stmt(require(send(), None))]);
        assert_eq!(result.score, 0);
        assert_eq!(result.score_limit, 1);
    }

    #[test]
    fn test_score_never_exceeds_three_per_interaction() {
        let bodies = vec![
            vec![expr_stmt(send()), expr_stmt(send())],
            vec![
                var_decl(vec![declaration("ok", 50, "bool")], Some(send())),
                if_stmt(unary("!", ok()), vec![], None),
                expr_stmt(send()),
            ],
            vec![var_decl(vec![declaration("n", 51, "uint256")], Some(send()))],
        ];
        for body in bodies {
            let result = run(body);
            assert!(result.score_limit > 0);
            assert!(result.score <= 3 * result.score_limit);
        }
    }
}
