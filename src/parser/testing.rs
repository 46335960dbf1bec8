//! Builders for solc-shaped AST JSON used by unit tests.

use super::AstIndex;
use serde_json::{json, Value};
use std::cell::Cell;

thread_local! {
    static NEXT_ID: Cell<i64> = const { Cell::new(1000) };
}

fn next_id() -> i64 {
    NEXT_ID.with(|id| {
        let value = id.get();
        id.set(value + 1);
        value
    })
}

fn typed(type_string: &str, type_identifier: &str) -> Value {
    json!({"typeString": type_string, "typeIdentifier": type_identifier})
}

pub fn ident(name: &str, declaration: i64, ty: &str) -> Value {
    json!({
        "nodeType": "Identifier",
        "id": next_id(),
        "src": "0:0:0",
        "name": name,
        "referencedDeclaration": declaration,
        "typeDescriptions": typed(ty, "t_unknown")
    })
}

pub fn literal(value: &str) -> Value {
    json!({
        "nodeType": "Literal",
        "id": next_id(),
        "src": "0:0:0",
        "kind": "number",
        "value": value,
        "typeDescriptions": typed("int_const", "t_rational")
    })
}

pub fn binary(left: Value, operator: &str, right: Value) -> Value {
    json!({
        "nodeType": "BinaryOperation",
        "id": next_id(),
        "src": "0:0:0",
        "operator": operator,
        "leftExpression": left,
        "rightExpression": right,
        "typeDescriptions": typed("bool", "t_bool")
    })
}

pub fn unary(operator: &str, sub: Value) -> Value {
    json!({
        "nodeType": "UnaryOperation",
        "id": next_id(),
        "src": "0:0:0",
        "operator": operator,
        "prefix": true,
        "subExpression": sub
    })
}

pub fn tuple(components: Vec<Value>) -> Value {
    json!({
        "nodeType": "TupleExpression",
        "id": next_id(),
        "src": "0:0:0",
        "isInlineArray": false,
        "components": components
    })
}

pub fn member(expression: Value, name: &str, ty: &str) -> Value {
    json!({
        "nodeType": "MemberAccess",
        "id": next_id(),
        "src": "0:0:0",
        "memberName": name,
        "expression": expression,
        "typeDescriptions": typed(ty, "t_unknown")
    })
}

pub fn index(base: Value, index: Value) -> Value {
    json!({
        "nodeType": "IndexAccess",
        "id": next_id(),
        "src": "0:0:0",
        "baseExpression": base,
        "indexExpression": index
    })
}

/// `msg.data`, `block.timestamp` and similar two-part globals.
pub fn global(root: &str, member_name: &str) -> Value {
    member(ident(root, -1, root), member_name, "uint256")
}

fn low_level_identifier(kind: &str) -> &'static str {
    match kind {
        "call" => "t_function_barecall_payable$_t_bytes_memory_ptr_$returns$_t_bool_$_t_bytes_memory_ptr_$",
        "delegatecall" => "t_function_baredelegatecall_nonpayable$_t_bytes_memory_ptr_$returns$_t_bool_$_t_bytes_memory_ptr_$",
        "staticcall" => "t_function_barestaticcall_view$_t_bytes_memory_ptr_$returns$_t_bool_$_t_bytes_memory_ptr_$",
        "callcode" => "t_function_barecallcode_payable$_t_bytes_memory_ptr_$returns$_t_bool_$_t_bytes_memory_ptr_$",
        "send" => "t_function_send_nonpayable$_t_uint256_$returns$_t_bool_$",
        "transfer" => "t_function_transfer_nonpayable$_t_uint256_$returns$__$",
        _ => "t_function_internal_nonpayable$__$returns$__$",
    }
}

/// `target.<kind>(args)` for the low-level members.
pub fn low_level(target: Value, kind: &str, arguments: Vec<Value>) -> Value {
    let callee = json!({
        "nodeType": "MemberAccess",
        "id": next_id(),
        "src": "0:0:0",
        "memberName": kind,
        "expression": target,
        "typeDescriptions": typed("function", low_level_identifier(kind))
    });
    json!({
        "nodeType": "FunctionCall",
        "id": next_id(),
        "src": "0:0:0",
        "kind": "functionCall",
        "expression": callee,
        "arguments": arguments,
        "typeDescriptions": typed("bool", "t_bool")
    })
}

/// Legacy `target.call.value(amount)(args)`.
pub fn call_value(target: Value, amount: Value, arguments: Vec<Value>) -> Value {
    let call_member = json!({
        "nodeType": "MemberAccess",
        "id": next_id(),
        "src": "0:0:0",
        "memberName": "call",
        "expression": target,
        "typeDescriptions": typed("function", low_level_identifier("call"))
    });
    let value_member = json!({
        "nodeType": "MemberAccess",
        "id": next_id(),
        "src": "0:0:0",
        "memberName": "value",
        "expression": call_member,
        "typeDescriptions": typed("function", "t_function_setvalue_nonpayable$_t_uint256_$")
    });
    let inner = json!({
        "nodeType": "FunctionCall",
        "id": next_id(),
        "src": "0:0:0",
        "kind": "functionCall",
        "expression": value_member,
        "arguments": [amount],
        "typeDescriptions": typed("function", low_level_identifier("call"))
    });
    json!({
        "nodeType": "FunctionCall",
        "id": next_id(),
        "src": "0:0:0",
        "kind": "functionCall",
        "expression": inner,
        "arguments": arguments,
        "typeDescriptions": typed("bool", "t_bool")
    })
}

/// `target.call{name: value, ..}(args)`.
pub fn call_options(target: Value, options: Vec<(&str, Value)>, arguments: Vec<Value>) -> Value {
    let call_member = json!({
        "nodeType": "MemberAccess",
        "id": next_id(),
        "src": "0:0:0",
        "memberName": "call",
        "expression": target,
        "typeDescriptions": typed("function", low_level_identifier("call"))
    });
    let (names, values): (Vec<&str>, Vec<Value>) = options.into_iter().unzip();
    let callee = json!({
        "nodeType": "FunctionCallOptions",
        "id": next_id(),
        "src": "0:0:0",
        "expression": call_member,
        "names": names,
        "options": values,
        "typeDescriptions": typed("function", low_level_identifier("call"))
    });
    json!({
        "nodeType": "FunctionCall",
        "id": next_id(),
        "src": "0:0:0",
        "kind": "functionCall",
        "expression": callee,
        "arguments": arguments,
        "typeDescriptions": typed("bool", "t_bool")
    })
}

/// An ordinary internal call `name(args)`.
pub fn call(name: &str, arguments: Vec<Value>) -> Value {
    json!({
        "nodeType": "FunctionCall",
        "id": next_id(),
        "src": "0:0:0",
        "kind": "functionCall",
        "expression": {
            "nodeType": "Identifier",
            "id": next_id(),
            "name": name,
            "referencedDeclaration": 1,
            "typeDescriptions": typed("function ()", "t_function_internal_nonpayable$__$returns$__$")
        },
        "arguments": arguments
    })
}

pub fn require(condition: Value, message: Option<Value>) -> Value {
    let mut arguments = vec![condition];
    arguments.extend(message);
    json!({
        "nodeType": "FunctionCall",
        "id": next_id(),
        "src": "0:0:0",
        "kind": "functionCall",
        "expression": {
            "nodeType": "Identifier",
            "id": next_id(),
            "name": "require",
            "referencedDeclaration": -18,
            "typeDescriptions": typed("function (bool) pure", "t_function_require_pure$_t_bool_$returns$__$")
        },
        "arguments": arguments
    })
}

pub fn assign(lhs: Value, rhs: Value) -> Value {
    json!({
        "nodeType": "Assignment",
        "id": next_id(),
        "src": "0:0:0",
        "operator": "=",
        "leftHandSide": lhs,
        "rightHandSide": rhs
    })
}

pub fn expr_stmt(expression: Value) -> Value {
    json!({
        "nodeType": "ExpressionStatement",
        "id": next_id(),
        "src": "0:0:0",
        "expression": expression
    })
}

pub fn block(statements: Vec<Value>) -> Value {
    json!({"nodeType": "Block", "id": next_id(), "src": "0:0:0", "statements": statements})
}

pub fn if_stmt(condition: Value, body: Vec<Value>, false_body: Option<Value>) -> Value {
    json!({
        "nodeType": "IfStatement",
        "id": next_id(),
        "src": "0:0:0",
        "condition": condition,
        "trueBody": block(body),
        "falseBody": false_body
    })
}

pub fn ret(value: Option<Value>) -> Value {
    json!({"nodeType": "Return", "id": next_id(), "src": "0:0:0", "expression": value})
}

pub fn declaration(name: &str, id: i64, ty: &str) -> Value {
    json!({
        "nodeType": "VariableDeclaration",
        "id": id,
        "src": "0:0:0",
        "name": name,
        "stateVariable": false,
        "typeDescriptions": typed(ty, "t_unknown")
    })
}

pub fn var_decl(declarations: Vec<Value>, value: Option<Value>) -> Value {
    json!({
        "nodeType": "VariableDeclarationStatement",
        "id": next_id(),
        "src": "0:0:0",
        "declarations": declarations,
        "initialValue": value
    })
}

pub fn for_stmt(init: Option<Value>, condition: Option<Value>, body: Vec<Value>) -> Value {
    json!({
        "nodeType": "ForStatement",
        "id": next_id(),
        "src": "0:0:0",
        "initializationExpression": init,
        "condition": condition,
        "loopExpression": null,
        "body": block(body)
    })
}

pub fn placeholder() -> Value {
    json!({"nodeType": "PlaceholderStatement", "id": next_id(), "src": "0:0:0"})
}

pub fn state_var(name: &str, id: i64, ty: &str, visibility: &str) -> Value {
    json!({
        "nodeType": "VariableDeclaration",
        "id": id,
        "src": "0:0:0",
        "name": name,
        "stateVariable": true,
        "visibility": visibility,
        "value": null,
        "typeDescriptions": typed(ty, "t_unknown")
    })
}

pub fn modifier_def(name: &str, body: Vec<Value>) -> Value {
    json!({
        "nodeType": "ModifierDefinition",
        "id": next_id(),
        "src": "0:0:0",
        "name": name,
        "body": block(body)
    })
}

pub fn function(
    name: &str,
    visibility: &str,
    mutability: &str,
    modifiers: &[&str],
    body: Vec<Value>,
) -> Value {
    let invocations: Vec<Value> = modifiers
        .iter()
        .map(|m| {
            json!({
                "nodeType": "ModifierInvocation",
                "id": next_id(),
                "modifierName": {"nodeType": "Identifier", "name": m}
            })
        })
        .collect();
    json!({
        "nodeType": "FunctionDefinition",
        "id": next_id(),
        "src": "0:0:0",
        "name": name,
        "kind": "function",
        "visibility": visibility,
        "stateMutability": mutability,
        "modifiers": invocations,
        "body": block(body)
    })
}

pub fn contract(name: &str, bases: &[&str], nodes: Vec<Value>) -> Value {
    let base_contracts: Vec<Value> = bases
        .iter()
        .map(|b| json!({"nodeType": "InheritanceSpecifier", "baseName": {"nodeType": "UserDefinedTypeName", "name": b}}))
        .collect();
    json!({
        "nodeType": "ContractDefinition",
        "id": next_id(),
        "src": "0:0:0",
        "name": name,
        "contractKind": "contract",
        "baseContracts": base_contracts,
        "nodes": nodes
    })
}

pub fn source_unit(path: &str, contracts: Vec<Value>) -> Value {
    json!({
        "nodeType": "SourceUnit",
        "id": next_id(),
        "src": "0:0:0",
        "absolutePath": path,
        "nodes": contracts
    })
}

/// An index holding one source unit with `contracts`.
pub fn index_of(contracts: Vec<Value>) -> AstIndex {
    let mut index = AstIndex::new();
    index.add_source_unit(source_unit("contracts/Test.sol", contracts), None);
    index
}
