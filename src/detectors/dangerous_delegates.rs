//! # V004 - Dangerous Delegatecall Detector
//!
//! @title Delegatecall Liquidity and Dispatch Detector
//! @author Ramprasad
//!
//! Contract-scoped. Detects payable contracts whose only way to move value is
//! `delegatecall`, and delegatecalls that forward raw `msg.data` so any caller
//! can dispatch arbitrary functions in the contract's storage context.
//!
//! ## Vulnerability Pattern
//!
//! ```solidity
//! // VULNERABLE: payable proxy forwarding arbitrary calldata
//! function () external payable {
//!     implementation.delegatecall(msg.data);
//! }
//! ```
//!
//! ## Secure Pattern
//!
//! ```solidity
//! // SECURE: fixed selector, explicit withdrawal path
//! function upgrade(uint v) external onlyOwner {
//!     lib.delegatecall(abi.encodeWithSelector(Lib.set.selector, v));
//! }
//! function withdraw() external onlyOwner {
//!     msg.sender.transfer(address(this).balance);
//! }
//! ```
//!
//! ## CWE Reference
//!
//! - CWE-749: Exposed Dangerous Method or Function

use super::utils::{any_operand_deep, interactions_of, is_msg_data, Site};
use super::{
    create_finding, statement_location, DelegateSite, Details, DetectorResult, MessageKind, Scope,
    VulnerabilityDetector,
};
use crate::analysis::AnalysisContext;
use crate::ir::visit::statements;
use crate::ir::Opcode;
use crate::report::Severity;

const SITES: &[Site] = &[Site::Statement, Site::Value, Site::Guard, Site::Return];

/// Detector for delegatecall-only liquidity and calldata forwarding.
pub struct DangerousDelegateDetector;

impl VulnerabilityDetector for DangerousDelegateDetector {
    fn id(&self) -> &'static str { "V004" }

    fn name(&self) -> &'static str { "Dangerous Delegatecall" }

    fn description(&self) -> &'static str {
        "Detects payable contracts relying on delegatecall alone and delegatecalls forwarding msg.data."
    }

    fn severity(&self) -> Severity { Severity::High }

    fn scope(&self) -> Scope { Scope::Contract }

    fn cwe(&self) -> Option<&'static str> { Some("CWE-749") }

    fn remediation(&self) -> &'static str {
        "Restrict delegatecall usage:\n\
         1. Never forward msg.data to a delegatecall target reachable by arbitrary callers\n\
         2. Encode a fixed selector and validated arguments instead\n\
         3. Give payable contracts an explicit transfer or withdrawal path"
    }

    fn detect_contract(&self, context: &AnalysisContext) -> Option<DetectorResult> {
        let contract = context.contract;
        let mut result = DetectorResult::new(
            self,
            Details::DangerousDelegates {
                no_other_opcodes: false,
                delegate_calls_with_msg_data: Vec::new(),
            },
        );

        let mut delegates = 0;
        let mut other_opcodes = false;
        let mut forwarding = Vec::new();

        for function in &contract.functions {
            for statement in statements(&function.sequence) {
                for interaction in interactions_of(statement, SITES, |op: Opcode| op.is_low_level()) {
                    if interaction.opcode != Opcode::DelegateCall {
                        other_opcodes = true;
                        continue;
                    }
                    delegates += 1;
                    if !any_operand_deep(interaction.arguments, &is_msg_data) {
                        continue;
                    }
                    forwarding.push(DelegateSite {
                        function: function.name.clone(),
                        path: statement.path.clone(),
                    });
                    result.findings.push(create_finding(
                        self,
                        context,
                        statement_location(context, &function.name, &statement.path),
                        statement.src.as_ref(),
                        format!("Delegatecall forwards msg.data in `{}`", function.name),
                        format!(
                            "The delegatecall at {} passes raw calldata, letting any caller run an arbitrary \
                             function of the target in `{}`'s storage.",
                            statement.path, contract.name
                        ),
                    ));
                }
            }
        }

        let liquidity_risk = contract.payable && !other_opcodes;
        if contract.payable {
            result.score_limit += 1;
            if liquidity_risk {
                result.score += 1;
                result.findings.push(create_finding(
                    self,
                    context,
                    contract.name.clone(),
                    contract.src.as_ref(),
                    format!("Payable `{}` has no ordinary value transfer", contract.name),
                    "The contract accepts ether but never calls, sends or transfers it. Any funds can \
                     only leave through delegatecall, which does not guarantee liquidity."
                        .to_string(),
                ));
                result.message(
                    MessageKind::Error,
                    "Payable contract with no interaction other than delegatecall.",
                );
            } else {
                result.message(MessageKind::Okay, "Payable contract has an ordinary value transfer path.");
            }
        }

        result.score_limit += delegates;
        result.score += forwarding.len();
        if delegates == 0 {
            result.message(MessageKind::Info, "No delegatecalls found in this contract.");
        } else if forwarding.is_empty() {
            result.message(MessageKind::Okay, "No delegatecall forwards msg.data.");
        } else {
            result.message(
                MessageKind::Error,
                format!("{} of {} delegatecall(s) forward msg.data.", forwarding.len(), delegates),
            );
        }

        result.details = Details::DangerousDelegates {
            no_other_opcodes: liquidity_risk,
            delegate_calls_with_msg_data: forwarding,
        };
        log::debug!("{} {}: {}/{}", self.id(), contract.name, result.score, result.score_limit);
        Some(result)
    }
}
