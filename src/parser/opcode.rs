//! # Opcode Classification
//!
//! @title Call Opcode Classifier
//! @author Ramprasad
//!
//! Maps a call's compiler type identifier to a semantic [`Opcode`].
//!
//! The identifier is tested against [`SIGNATURES`] in order and the first fragment
//! it contains wins, so fragments that contain other fragments come first
//! (`barecallcode` before `barecall`).

use super::node::Node;
use crate::ir::Opcode;

/// Type identifier fragments, most specific first.
pub const SIGNATURES: &[(&str, Opcode)] = &[
    ("t_function_barecallcode", Opcode::CallCode),
    ("t_function_baredelegatecall", Opcode::DelegateCall),
    ("t_function_barestaticcall", Opcode::StaticCall),
    ("t_function_barecall", Opcode::Call),
    ("t_function_send", Opcode::Send),
    ("t_function_transfer", Opcode::Transfer),
    ("t_function_require", Opcode::Require),
];

/// Classifies a type identifier by fragment containment.
pub fn classify_signature(type_identifier: &str) -> Option<Opcode> {
    SIGNATURES
        .iter()
        .find(|(fragment, _)| type_identifier.contains(fragment))
        .map(|(_, opcode)| *opcode)
}

/// Classifies a `FunctionCall` node.
///
/// Returns the opcode and, for ordinary calls, the callee's member or identifier
/// name. Never fails: an unmatched call degrades to [`Opcode::FunctionCall`].
pub fn classify_call(call: Node<'_>) -> (Opcode, Option<String>) {
    let callee = call.get("expression");
    if let Some(opcode) = callee
        .and_then(|c| c.type_identifier())
        .and_then(classify_signature)
    {
        return (opcode, None);
    }

    match call.str("kind") {
        Some("typeConversion") => (Opcode::TypeConversion, callee_name(callee)),
        Some("structConstructorCall") => (Opcode::StructConstructorCall, callee_name(callee)),
        _ => (Opcode::FunctionCall, callee_name(callee)),
    }
}

fn callee_name(callee: Option<Node<'_>>) -> Option<String> {
    let callee = callee?;
    callee
        .str("memberName")
        .or_else(|| callee.name())
        .or_else(|| {
            // `foo{value: x}(..)` and `new C(..)` wrap the real callee
            callee
                .get("expression")
                .and_then(|inner| inner.str("memberName").or_else(|| inner.name()))
        })
        .or_else(|| callee.get("typeName").and_then(|t| t.name()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_callcode_wins_over_call() {
        assert_eq!(
            classify_signature("t_function_barecallcode_payable$_t_bytes_memory_ptr_$"),
            Some(Opcode::CallCode)
        );
        assert_eq!(
            classify_signature("t_function_barecall_payable$_t_bytes_memory_ptr_$"),
            Some(Opcode::Call)
        );
        assert_eq!(
            classify_signature("t_function_baredelegatecall_nonpayable$_t_bytes_$"),
            Some(Opcode::DelegateCall)
        );
    }

    #[test]
    fn test_plain_function_call_keeps_member_name() {
        let call = json!({
            "nodeType": "FunctionCall",
            "kind": "functionCall",
            "expression": {
                "nodeType": "MemberAccess",
                "memberName": "balanceOf",
                "typeDescriptions": {"typeIdentifier": "t_function_external_view$_t_address_$"}
            }
        });
        assert_eq!(
            classify_call(Node::new(&call)),
            (Opcode::FunctionCall, Some("balanceOf".to_string()))
        );
    }

    #[test]
    fn test_type_conversion() {
        let call = json!({
            "nodeType": "FunctionCall",
            "kind": "typeConversion",
            "expression": {
                "nodeType": "ElementaryTypeNameExpression",
                "typeDescriptions": {"typeIdentifier": "t_type$_t_uint256_$"},
                "typeName": {"name": "uint256"}
            }
        });
        assert_eq!(
            classify_call(Node::new(&call)),
            (Opcode::TypeConversion, Some("uint256".to_string()))
        );
    }

    #[test]
    fn test_missing_callee_degrades_to_function_call() {
        let call = json!({"nodeType": "FunctionCall"});
        assert_eq!(classify_call(Node::new(&call)), (Opcode::FunctionCall, None));
    }

    #[test]
    fn test_send_and_require() {
        let send = json!({
            "nodeType": "FunctionCall",
            "kind": "functionCall",
            "expression": {
                "nodeType": "MemberAccess",
                "memberName": "send",
                "typeDescriptions": {"typeIdentifier": "t_function_send_nonpayable$_t_uint256_$_returns$_t_bool_$"}
            }
        });
        assert_eq!(classify_call(Node::new(&send)).0, Opcode::Send);
        assert_eq!(
            classify_signature("t_function_require_pure$_t_bool_$_returns$__$"),
            Some(Opcode::Require)
        );
    }
}
