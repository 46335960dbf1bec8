//! # V001 - Unsecured Call Detector
//!
//! @title Unguarded and Unlocked Interaction Detector
//! @author Ramprasad
//!
//! Detects value-moving calls that are not covered by any guard, or whose guards
//! are never updated before the call and so cannot act as a reentrancy lock.
//!
//! ## Vulnerability Pattern
//!
//! ```solidity
//! // VULNERABLE: no guard, balance cleared after the call
//! function withdraw(uint amount) public {
//!     msg.sender.call.value(amount)("");
//!     balances[msg.sender] -= amount;
//! }
//! ```
//!
//! ## Secure Pattern
//!
//! ```solidity
//! // SECURE: guard variable updated before the interaction
//! function withdraw(uint amount) public {
//!     require(balances[msg.sender] >= amount);
//!     balances[msg.sender] -= amount;
//!     msg.sender.call.value(amount)("");
//! }
//! ```
//!
//! ## Scoring
//!
//! The limit is the number of interactions. Each unguarded interaction adds 1, as
//! does each guarded interaction none of whose guards has a condition variable
//! reassigned between the guard and the call.
//!
//! ## CWE Reference
//!
//! - CWE-841: Improper Enforcement of Behavioral Workflow

use super::utils::{interactions_of, Interaction, Site};
use super::{
    create_finding, statement_location, Details, DetectorResult, MessageKind,
    VulnerabilityDetector,
};
use crate::analysis::{between, AnalysisContext};
use crate::ir::{Condition, Function, Opcode, Statement, StatementKind};
use crate::report::Severity;
use std::collections::HashSet;

const SITES: &[Site] = &[Site::Statement, Site::Value, Site::Guard, Site::Return];

fn is_interaction(opcode: Opcode) -> bool {
    matches!(
        opcode,
        Opcode::Call | Opcode::Send | Opcode::Transfer | Opcode::StaticCall | Opcode::CallCode
    )
}

/// An interaction with the guards lexically covering it.
struct Guarded<'ir> {
    interaction: Interaction<'ir>,
    guards: Vec<&'ir Statement>,
}

/// Detector for unguarded calls and guards that are not locks.
pub struct UnsecuredCallDetector;

impl UnsecuredCallDetector {
    /// Walks `sequence` recording each interaction with its covering guards.
    ///
    /// A `require` covers the statements after it in the same block. An `if` or
    /// `else if` covers its own body. An `else` arm inherits the guards of the
    /// enclosing block only.
    fn collect<'ir>(
        &self,
        sequence: &'ir [Statement],
        inherited: &[&'ir Statement],
        out: &mut Vec<Guarded<'ir>>,
    ) {
        let mut guards = inherited.to_vec();
        for statement in sequence {
            for interaction in interactions_of(statement, SITES, is_interaction) {
                out.push(Guarded {
                    interaction,
                    guards: guards.clone(),
                });
            }
            match &statement.kind {
                StatementKind::Require { .. } => guards.push(statement),
                StatementKind::If(_) | StatementKind::ElseIf(_) => {
                    let mut covering = guards.clone();
                    covering.push(statement);
                    self.collect(statement.children(), &covering, out);
                }
                _ => self.collect(statement.children(), &guards, out),
            }
        }
    }

    /// Returns `true` if a variable in `guard`'s condition is assigned between the
    /// guard and `target`.
    fn guard_updated(&self, sequence: &[Statement], guard: &Statement, target: &Statement) -> bool {
        let watched: HashSet<i64> = guard
            .guard_conditions()
            .unwrap_or_default()
            .iter()
            .flat_map(Condition::declarations)
            .collect();
        if watched.is_empty() {
            return false;
        }

        let region = between(sequence, &guard.path, &target.path);
        let updated = region
            .iter()
            .filter(|statement| matches!(statement.kind, StatementKind::Assignment { .. }))
            .flat_map(Statement::targets)
            .any(|variable| variable.declaration.is_some_and(|id| watched.contains(&id)));
        updated
    }
}

impl VulnerabilityDetector for UnsecuredCallDetector {
    fn id(&self) -> &'static str { "V001" }

    fn name(&self) -> &'static str { "Unsecured Call" }

    fn description(&self) -> &'static str {
        "Detects value-moving calls with no preceding check, or whose checks are never updated before the call."
    }

    fn severity(&self) -> Severity { Severity::High }

    fn cwe(&self) -> Option<&'static str> { Some("CWE-841") }

    fn remediation(&self) -> &'static str {
        "Follow Checks-Effects-Interactions:\n\
         1. Check: require() the preconditions of the call\n\
         2. Effect: update the checked state (balances, locks) before calling out\n\
         3. Interact: make the external call last\n\
         Consider a reentrancy guard modifier for functions that call out."
    }

    fn detect_function(&self, context: &AnalysisContext, function: &Function) -> Option<DetectorResult> {
        let mut interactions = Vec::new();
        self.collect(&function.sequence, &[], &mut interactions);

        let mut result = DetectorResult::new(
            self,
            Details::UnsecuredCalls {
                no_checks_before: false,
                effects_checked_and_changed: true,
            },
        );
        result.score_limit = interactions.len();

        let mut unguarded = 0;
        let mut unlocked = 0;
        for guarded in &interactions {
            let statement = guarded.interaction.statement;
            let opcode = guarded.interaction.opcode;
            let location = statement_location(context, &function.name, &statement.path);

            if guarded.guards.is_empty() {
                unguarded += 1;
                result.findings.push(create_finding(
                    self,
                    context,
                    location,
                    statement.src.as_ref(),
                    format!("Unguarded `{}` in `{}`", opcode, function.name),
                    format!(
                        "The `{}` at {} runs without any preceding require or enclosing if.\n\
                         Nothing constrains when the external account is called.",
                        opcode, statement.path
                    ),
                ));
            } else if !guarded
                .guards
                .iter()
                .any(|guard| self.guard_updated(&function.sequence, guard, statement))
            {
                unlocked += 1;
                result.findings.push(create_finding(
                    self,
                    context,
                    location,
                    statement.src.as_ref(),
                    format!("Check before `{}` is not a lock", opcode),
                    format!(
                        "The `{}` at {} is guarded, but no guard variable is reassigned before it.\n\
                         A reentrant call passes the same checks again.",
                        opcode, statement.path
                    ),
                ));
            }
        }
        result.score = unguarded + unlocked;
        result.details = Details::UnsecuredCalls {
            no_checks_before: unguarded > 0,
            effects_checked_and_changed: unlocked == 0,
        };

        if interactions.is_empty() {
            result.message(MessageKind::Okay, "No interactions found in this function.");
        } else {
            if unguarded > 0 {
                result.message(
                    MessageKind::Error,
                    format!("{} interaction(s) not covered by a preceding check.", unguarded),
                );
            }
            if unlocked > 0 {
                result.message(
                    MessageKind::Error,
                    format!(
                        "{} guarded interaction(s) run before any checked condition is updated (not a viable lock).",
                        unlocked
                    ),
                );
            }
            if result.score == 0 {
                result.message(
                    MessageKind::Okay,
                    "All interactions are covered by a check whose condition is updated first.",
                );
            }
        }

        log::debug!(
            "{} {}::{}: {}/{}",
            self.id(),
            context.contract.name,
            function.name,
            result.score,
            result.score_limit
        );
        Some(result)
    }
}
