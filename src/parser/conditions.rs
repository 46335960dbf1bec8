//! # Condition Extraction
//!
//! @title Expression Flattening
//! @author Ramprasad
//!
//! Flattens an expression tree into an ordered list of [`Condition`] records.
//!
//! A binary operation yields one record whose operands are resolved to terms. When
//! an operand is itself a binary, tuple or ternary expression it becomes
//! [`Term::Compound`] and its own records are emitted into the same list: before
//! the enclosing record for a left operand, after it for a right operand.

use super::node::{Node, NodeType};
use super::opcode::classify_call;
use super::Extractor;
use crate::error::Result;
use crate::ir::{Condition, Opcode, Operand, Term, Unary};

/// Dotted access path of an expression, e.g. `msg.sender` or `block.timestamp`.
///
/// Index accesses resolve to their base and calls get a `()` suffix. Returns
/// `None` for shapes with no stable name.
pub fn member_path(node: Node<'_>) -> Option<String> {
    match node.node_type() {
        NodeType::Identifier => node.name().map(str::to_string),
        NodeType::MemberAccess => {
            let member = node.str("memberName")?;
            match node.get("expression").and_then(member_path) {
                Some(root) => Some(format!("{}.{}", root, member)),
                None => Some(member.to_string()),
            }
        }
        NodeType::IndexAccess | NodeType::IndexRangeAccess => {
            node.get("baseExpression").and_then(member_path)
        }
        NodeType::FunctionCallOptions => node.get("expression").and_then(member_path),
        NodeType::FunctionCall => node
            .get("expression")
            .and_then(member_path)
            .map(|callee| format!("{}()", callee)),
        _ => None,
    }
}

fn unary_of(node: Node<'_>) -> Unary {
    Unary {
        operator: node.str("operator").unwrap_or_default().to_string(),
        prefix: node.bool("prefix"),
    }
}

/// Unwraps `((x))` to `x`.
fn strip_parens(mut node: Node<'_>) -> Node<'_> {
    while node.is(NodeType::TupleExpression) && !node.bool("isInlineArray") {
        let components = node.list("components");
        match components.as_slice() {
            [Some(inner)] => node = *inner,
            _ => break,
        }
    }
    node
}

/// Binary, tuple and ternary operands are flattened rather than resolved.
fn is_nested(node: Node<'_>) -> bool {
    matches!(
        node.node_type(),
        NodeType::BinaryOperation | NodeType::TupleExpression | NodeType::Conditional
    )
}

impl<'a> Extractor<'a> {
    /// Flattens `expr` into a fresh record list.
    pub(crate) fn conditions_of(&mut self, expr: Node<'_>) -> Vec<Condition> {
        let mut out = Vec::new();
        self.extract_conditions(expr, &mut out);
        out
    }

    /// Appends the records of `expr` to `out`.
    pub(crate) fn extract_conditions(&mut self, expr: Node<'_>, out: &mut Vec<Condition>) {
        match expr.node_type() {
            NodeType::BinaryOperation => self.extract_binary(expr, None, out),
            NodeType::TupleExpression => {
                for component in expr.nodes("components") {
                    self.extract_conditions(component, out);
                }
            }
            NodeType::Conditional => {
                for key in ["condition", "trueExpression", "falseExpression"] {
                    match expr.get(key) {
                        Some(part) => self.extract_conditions(part, out),
                        None => self.record(expr.malformed(key)),
                    }
                }
            }
            NodeType::UnaryOperation => match expr.get("subExpression").map(strip_parens) {
                Some(sub) if sub.is(NodeType::BinaryOperation) => {
                    self.extract_binary(sub, Some(unary_of(expr)), out)
                }
                Some(_) => {
                    let (operand, nested) = self.operand(expr);
                    out.push(Condition::Single(operand));
                    if let Some(nested) = nested {
                        self.extract_conditions(nested, out);
                    }
                }
                None => self.record(expr.malformed("subExpression")),
            },
            _ => match self.term(expr) {
                Ok(term) => out.push(Condition::single(term)),
                Err(err) => self.record(err),
            },
        }
    }

    fn extract_binary(&mut self, expr: Node<'_>, unary: Option<Unary>, out: &mut Vec<Condition>) {
        let (Some(lhs), Some(rhs)) = (expr.get("leftExpression"), expr.get("rightExpression"))
        else {
            let missing = if expr.has("leftExpression") {
                "rightExpression"
            } else {
                "leftExpression"
            };
            self.record(expr.malformed(missing));
            return;
        };

        let (left, left_nested) = self.operand(lhs);
        if let Some(nested) = left_nested {
            self.extract_conditions(nested, out);
        }
        let (right, right_nested) = self.operand(rhs);
        out.push(Condition::Binary {
            left,
            operator: expr.str("operator").unwrap_or_default().to_string(),
            right,
            unary,
        });
        if let Some(nested) = right_nested {
            self.extract_conditions(nested, out);
        }
    }

    /// Resolves one operand.
    ///
    /// Returns the operand and, when it is a nested expression, the node whose
    /// records the caller must flatten.
    fn operand<'n>(&mut self, expr: Node<'n>) -> (Operand, Option<Node<'n>>) {
        match expr.node_type() {
            NodeType::TupleExpression => {
                let components: Vec<Node<'n>> = expr.nodes("components").collect();
                match components.as_slice() {
                    [single] if !is_nested(*single) => self.operand(*single),
                    _ => (Operand::new(Term::Compound), Some(expr)),
                }
            }
            _ if is_nested(expr) => (Operand::new(Term::Compound), Some(expr)),
            NodeType::UnaryOperation => match expr.get("subExpression") {
                Some(sub) => {
                    let (mut operand, nested) = self.operand(sub);
                    if operand.unary.is_none() {
                        operand.unary = Some(unary_of(expr));
                    }
                    (operand, nested)
                }
                None => {
                    self.record(expr.malformed("subExpression"));
                    (unsupported(expr), None)
                }
            },
            _ => match self.term(expr) {
                Ok(term) => (Operand::new(term), None),
                Err(err) => {
                    self.record(err);
                    (unsupported(expr), None)
                }
            },
        }
    }

    /// Resolves a leaf expression to a term.
    fn term(&mut self, expr: Node<'_>) -> Result<Term> {
        let ty = expr.type_string().map(str::to_string);
        match expr.node_type() {
            NodeType::Literal => {
                let value = expr
                    .str("value")
                    .or_else(|| expr.str("hexValue"))
                    .ok_or_else(|| expr.malformed("value"))?;
                Ok(Term::Literal {
                    value: value.to_string(),
                    ty,
                })
            }
            NodeType::Identifier => Ok(Term::Reference {
                name: expr.require_str("name")?.to_string(),
                declaration: expr.referenced_declaration(),
                ty,
            }),
            NodeType::MemberAccess => Ok(Term::Reference {
                name: member_path(expr)
                    .ok_or_else(|| expr.malformed("memberName"))?,
                declaration: expr.referenced_declaration(),
                ty,
            }),
            NodeType::IndexAccess => {
                let base = expr.require("baseExpression")?;
                let arguments = match expr.get("indexExpression") {
                    Some(index) => self.conditions_of(index),
                    None => Vec::new(),
                };
                Ok(Term::Index {
                    name: member_path(base).unwrap_or_default(),
                    declaration: base.referenced_declaration(),
                    ty,
                    arguments,
                })
            }
            NodeType::IndexRangeAccess => {
                let base = expr.require("baseExpression")?;
                let mut arguments = Vec::new();
                for key in ["startExpression", "endExpression"] {
                    if let Some(bound) = expr.get(key) {
                        self.extract_conditions(bound, &mut arguments);
                    }
                }
                Ok(Term::Index {
                    name: member_path(base).unwrap_or_default(),
                    declaration: base.referenced_declaration(),
                    ty,
                    arguments,
                })
            }
            NodeType::FunctionCall => {
                let (opcode, name) = classify_call(expr);
                Ok(Term::Call {
                    opcode,
                    name,
                    arguments: self.call_arguments(expr, opcode),
                })
            }
            _ => Err(expr.unsupported()),
        }
    }

    /// Flattened argument records of a call.
    ///
    /// A legacy `addr.call.value(v)(data)` takes its arguments from the inner
    /// `.value(v)` call. Options of `addr.call{value: v}(data)` come first, in
    /// source order, followed by the call's own arguments.
    pub(crate) fn call_arguments(&mut self, call: Node<'_>, opcode: Opcode) -> Vec<Condition> {
        let source = match call.get("expression") {
            Some(inner)
                if opcode == Opcode::Call
                    && inner.is(NodeType::FunctionCall)
                    && matches!(
                        inner.get("expression").and_then(|e| e.str("memberName")),
                        Some("value") | Some("gas")
                    ) =>
            {
                inner
            }
            _ => call,
        };

        let mut arguments = Vec::new();
        if let Some(options) = call
            .get("expression")
            .filter(|callee| callee.is(NodeType::FunctionCallOptions))
        {
            for option in options.nodes("options") {
                self.extract_conditions(option, &mut arguments);
            }
        }
        for argument in source.nodes("arguments") {
            self.extract_conditions(argument, &mut arguments);
        }
        arguments
    }
}

fn unsupported(expr: Node<'_>) -> Operand {
    Operand::new(Term::Unsupported {
        node_type: expr.node_type_name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::testing::*;
    use crate::parser::AstIndex;

    fn flatten(expr: serde_json::Value) -> (Vec<Condition>, usize) {
        let index = AstIndex::new();
        let mut extractor = Extractor::new(&index);
        let conditions = extractor.conditions_of(Node::new(&expr));
        let diagnostics = extractor.diagnostics().len();
        (conditions, diagnostics)
    }

    #[test]
    fn test_simple_comparison() {
        let (conditions, diagnostics) = flatten(binary(ident("balance", 4, "uint256"), ">=", literal("10")));
        assert_eq!(diagnostics, 0);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].to_string(), "balance >= 10");
        assert!(conditions[0].references(4));
    }

    #[test]
    fn test_nested_binary_ordering() {
        // (a && b) || (c && d): left records first, then the outer record, then right
        let expr = binary(
            tuple(vec![binary(ident("a", 1, "bool"), "&&", ident("b", 2, "bool"))]),
            "||",
            tuple(vec![binary(ident("c", 3, "bool"), "&&", ident("d", 4, "bool"))]),
        );
        let (conditions, _) = flatten(expr);
        let rendered: Vec<String> = conditions.iter().map(|c| c.to_string()).collect();
        assert_eq!(rendered, vec!["a && b", "(..) || (..)", "c && d"]);
    }

    #[test]
    fn test_unary_over_binary_keeps_operator() {
        let expr = unary("!", tuple(vec![binary(ident("x", 1, "uint256"), "==", literal("0"))]));
        let (conditions, _) = flatten(expr);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].to_string(), "!(x == 0)");

        let expr = unary("!", ident("locked", 2, "bool"));
        let (conditions, _) = flatten(expr);
        assert_eq!(conditions[0].to_string(), "!locked");
        assert!(conditions[0].references(2));
    }

    #[test]
    fn test_member_path() {
        let expr = member(ident("msg", -15, "msg"), "sender", "address");
        assert_eq!(member_path(Node::new(&expr)).as_deref(), Some("msg.sender"));
        let (conditions, _) = flatten(expr);
        assert_eq!(conditions[0].to_string(), "msg.sender");
    }

    #[test]
    fn test_index_access_carries_arguments() {
        let expr = index(ident("balances", 9, "mapping(address => uint256)"), member(ident("msg", -15, "msg"), "sender", "address"));
        let (conditions, _) = flatten(expr);
        let operand = conditions[0].operands().next().unwrap();
        assert_eq!(operand.declaration(), Some(9));
        assert_eq!(operand.arguments().len(), 1);
        assert_eq!(conditions[0].to_string(), "balances[msg.sender]");
    }

    #[test]
    fn test_call_value_takes_inner_arguments() {
        let expr = call_value(ident("target", 3, "address"), ident("amount", 5, "uint256"), vec![literal("")]);
        let (conditions, _) = flatten(expr);
        let operand = conditions[0].operands().next().unwrap();
        assert_eq!(operand.opcode(), Some(Opcode::Call));
        assert_eq!(operand.arguments()[0].to_string(), "amount");
    }

    #[test]
    fn test_call_options_carry_value() {
        let expr = call_options(
            ident("target", 3, "address payable"),
            vec![("value", ident("amount", 5, "uint256"))],
            vec![literal("")],
        );
        let (conditions, diagnostics) = flatten(expr);
        assert_eq!(diagnostics, 0);
        let operand = conditions[0].operands().next().unwrap();
        assert_eq!(operand.opcode(), Some(Opcode::Call));
        let arguments: Vec<String> = operand.arguments().iter().map(|a| a.to_string()).collect();
        assert_eq!(arguments, vec!["amount", ""]);
        assert!(operand.arguments()[0].references(5));
    }

    #[test]
    fn test_ternary_flattens_all_parts() {
        let expr = serde_json::json!({
            "nodeType": "Conditional",
            "condition": ident("flag", 1, "bool"),
            "trueExpression": literal("1"),
            "falseExpression": literal("2")
        });
        let (conditions, _) = flatten(expr);
        assert_eq!(conditions.len(), 3);
    }

    #[test]
    fn test_unsupported_shape_is_diagnosed() {
        let expr = serde_json::json!({"nodeType": "NewExpression", "src": "1:2:0"});
        let (conditions, diagnostics) = flatten(expr);
        assert!(conditions.is_empty());
        assert_eq!(diagnostics, 1);
    }
}
