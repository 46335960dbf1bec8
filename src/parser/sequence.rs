//! # Sequence Extraction
//!
//! @title Statement Normalization and Path Indexing
//! @author Ramprasad
//!
//! Normalizes a block of AST statements into [`Statement`] values. An `if` with an
//! `else` chain is laid out as sibling `If`, `ElseIf` and `Else` entries so every
//! arm has its own path; [`assign_paths`] links the arms back to their `If`.

use super::conditions::member_path;
use super::node::{Node, NodeType};
use super::opcode::classify_call;
use super::Extractor;
use crate::error::Result;
use crate::ir::{Branch, Opcode, PathIndex, Statement, StatementKind, Variable};

/// Statements of a block, or the single statement of an unbraced body.
pub(crate) fn block_statements(body: Node<'_>) -> Vec<Node<'_>> {
    match body.node_type() {
        NodeType::Block | NodeType::UncheckedBlock => body.nodes("statements").collect(),
        _ => vec![body],
    }
}

/// Assigns a [`PathIndex`] to every statement and links else arms to their `If`.
///
/// Loop bodies, blocks and branch bodies are indexed; the init statement of a
/// `for` loop is not.
pub fn assign_paths(sequence: &mut [Statement]) {
    assign_under(sequence, &PathIndex::default());
}

fn assign_under(sequence: &mut [Statement], parent: &PathIndex) {
    let mut governing_if = None;
    for (position, statement) in sequence.iter_mut().enumerate() {
        statement.path = parent.child(position);
        match &mut statement.kind {
            StatementKind::If(_) => governing_if = Some(position),
            StatementKind::ElseIf(branch) | StatementKind::Else(branch) => {
                branch.parent_if = governing_if;
            }
            _ => governing_if = None,
        }
        let path = statement.path.clone();
        if let Some(children) = statement.children_mut() {
            assign_under(children, &path);
        }
    }
}

impl<'a> Extractor<'a> {
    /// Normalizes a list of statement nodes, skipping malformed ones.
    pub(crate) fn extract_sequence<'n>(
        &mut self,
        statements: impl IntoIterator<Item = Node<'n>>,
    ) -> Vec<Statement> {
        let mut sequence = Vec::new();
        for node in statements {
            if let Err(err) = self.extract_statement(node, &mut sequence) {
                self.record(err);
            }
        }
        sequence
    }

    fn extract_statement(&mut self, node: Node<'_>, sequence: &mut Vec<Statement>) -> Result<()> {
        let mut id = node.id();
        let src = node.src();
        let kind = match node.node_type() {
            NodeType::ExpressionStatement => {
                let expr = node.require("expression")?;
                id = expr.id().or(id);
                self.expression_statement(expr)?
            }
            NodeType::VariableDeclarationStatement => self.variable_declaration(node),
            NodeType::IfStatement => return self.extract_if(node, sequence),
            NodeType::ForStatement => StatementKind::For {
                conditions: match node.get("condition") {
                    Some(condition) => self.conditions_of(condition),
                    None => Vec::new(),
                },
                initialization: match node.get("initializationExpression") {
                    Some(init) => self.extract_sequence([init]),
                    None => Vec::new(),
                },
                step: match node.get("loopExpression").and_then(|l| l.get("expression")) {
                    Some(step) => self.conditions_of(step),
                    None => Vec::new(),
                },
                body: self.extract_sequence(block_statements(node.require("body")?)),
            },
            NodeType::WhileStatement => StatementKind::While {
                conditions: self.conditions_of(node.require("condition")?),
                body: self.extract_sequence(block_statements(node.require("body")?)),
            },
            NodeType::DoWhileStatement => StatementKind::DoWhile {
                conditions: self.conditions_of(node.require("condition")?),
                body: self.extract_sequence(block_statements(node.require("body")?)),
            },
            NodeType::Block | NodeType::UncheckedBlock => StatementKind::Block {
                body: self.extract_sequence(node.nodes("statements")),
            },
            NodeType::Return => StatementKind::Return {
                values: match node.get("expression") {
                    Some(expr) => self.conditions_of(expr),
                    None => Vec::new(),
                },
            },
            NodeType::EmitStatement => {
                let event_call = node.require("eventCall")?;
                let event = event_call
                    .get("expression")
                    .and_then(member_path)
                    .unwrap_or_default();
                StatementKind::Emit {
                    event,
                    arguments: self.call_arguments(event_call, Opcode::FunctionCall),
                }
            }
            NodeType::PlaceholderStatement => StatementKind::Placeholder,
            // A bare expression where a statement is expected (legacy ASTs).
            NodeType::Assignment
            | NodeType::FunctionCall
            | NodeType::UnaryOperation
            | NodeType::BinaryOperation
            | NodeType::MemberAccess
            | NodeType::IndexAccess
            | NodeType::Identifier => self.expression_statement(node)?,
            _ => StatementKind::Other {
                node_type: node.node_type_name().to_string(),
            },
        };
        sequence.push(Statement::new(kind, id, src));
        Ok(())
    }

    fn expression_statement(&mut self, expr: Node<'_>) -> Result<StatementKind> {
        let kind = match expr.node_type() {
            NodeType::FunctionCall => {
                let (opcode, name) = classify_call(expr);
                if opcode == Opcode::Require {
                    let condition = expr
                        .nodes("arguments")
                        .next()
                        .ok_or_else(|| expr.malformed("arguments"))?;
                    StatementKind::Require {
                        conditions: self.conditions_of(condition),
                    }
                } else {
                    StatementKind::Call {
                        opcode,
                        name,
                        arguments: self.call_arguments(expr, opcode),
                    }
                }
            }
            NodeType::Assignment => {
                let lhs = expr.require("leftHandSide")?;
                let rhs = expr.require("rightHandSide")?;
                let targets = if lhs.is(NodeType::TupleExpression) {
                    lhs.nodes("components").map(|c| self.variable(c)).collect()
                } else {
                    vec![self.variable(lhs)]
                };
                StatementKind::Assignment {
                    targets,
                    operator: expr.str("operator").unwrap_or("=").to_string(),
                    value: self.conditions_of(rhs),
                }
            }
            NodeType::UnaryOperation => StatementKind::UnaryOperation {
                conditions: self.conditions_of(expr),
            },
            NodeType::BinaryOperation => StatementKind::BinaryOperation {
                conditions: self.conditions_of(expr),
            },
            NodeType::MemberAccess => StatementKind::MemberAccess {
                name: member_path(expr).unwrap_or_default(),
                declaration: expr.referenced_declaration(),
            },
            NodeType::IndexAccess => {
                let base = expr.require("baseExpression")?;
                StatementKind::IndexAccess {
                    name: member_path(base).unwrap_or_default(),
                    declaration: base.referenced_declaration(),
                    arguments: match expr.get("indexExpression") {
                        Some(index) => self.conditions_of(index),
                        None => Vec::new(),
                    },
                }
            }
            NodeType::Identifier => StatementKind::Identifier {
                name: expr.require_str("name")?.to_string(),
                declaration: expr.referenced_declaration(),
            },
            _ => StatementKind::Other {
                node_type: expr.node_type_name().to_string(),
            },
        };
        Ok(kind)
    }

    /// An assignment target.
    fn variable(&mut self, node: Node<'_>) -> Variable {
        match node.node_type() {
            NodeType::IndexAccess => {
                let base = node.get("baseExpression");
                Variable {
                    name: base.and_then(member_path).unwrap_or_default(),
                    declaration: base.and_then(|b| b.referenced_declaration()),
                    ty: base.and_then(|b| b.type_string()).map(str::to_string),
                    index: match node.get("indexExpression") {
                        Some(index) => self.conditions_of(index),
                        None => Vec::new(),
                    },
                }
            }
            _ => Variable {
                name: member_path(node).unwrap_or_default(),
                declaration: node.referenced_declaration(),
                ty: node.type_string().map(str::to_string),
                index: Vec::new(),
            },
        }
    }

    fn variable_declaration(&mut self, node: Node<'_>) -> StatementKind {
        let declarations = node
            .nodes("declarations")
            .map(|declaration| Variable {
                name: declaration.name().unwrap_or_default().to_string(),
                declaration: declaration.id(),
                ty: declaration
                    .type_string()
                    .or_else(|| declaration.get("typeName").and_then(|t| t.type_string()))
                    .map(str::to_string),
                index: Vec::new(),
            })
            .collect();
        StatementKind::VariableDeclaration {
            declarations,
            value: match node.get("initialValue") {
                Some(value) => self.conditions_of(value),
                None => Vec::new(),
            },
        }
    }

    /// Pushes the `If` and each arm of its else chain as siblings.
    fn extract_if(&mut self, node: Node<'_>, sequence: &mut Vec<Statement>) -> Result<()> {
        let branch = self.branch(node)?;
        sequence.push(Statement::new(StatementKind::If(branch), node.id(), node.src()));

        let mut alternative = node.get("falseBody");
        while let Some(arm) = alternative {
            if arm.is(NodeType::IfStatement) {
                match self.branch(arm) {
                    Ok(branch) => sequence.push(Statement::new(
                        StatementKind::ElseIf(branch),
                        arm.id(),
                        arm.src(),
                    )),
                    Err(err) => {
                        self.record(err);
                        break;
                    }
                }
                alternative = arm.get("falseBody");
            } else {
                let branch = Branch {
                    conditions: Vec::new(),
                    true_body: self.extract_sequence(block_statements(arm)),
                    parent_if: None,
                };
                sequence.push(Statement::new(StatementKind::Else(branch), arm.id(), arm.src()));
                alternative = None;
            }
        }
        Ok(())
    }

    fn branch(&mut self, node: Node<'_>) -> Result<Branch> {
        let condition = node.require("condition")?;
        let true_body = node.require("trueBody")?;
        Ok(Branch {
            conditions: self.conditions_of(condition),
            true_body: self.extract_sequence(block_statements(true_body)),
            parent_if: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::testing::*;
    use crate::parser::AstIndex;
    use serde_json::{json, Value};

    fn extract(statements: Vec<Value>) -> (Vec<Statement>, usize) {
        let index = AstIndex::new();
        let mut extractor = Extractor::new(&index);
        let block = json!({"nodeType": "Block", "statements": statements});
        let mut sequence = extractor.extract_sequence(block_statements(Node::new(&block)));
        assign_paths(&mut sequence);
        let diagnostics = extractor.diagnostics().len();
        (sequence, diagnostics)
    }

    #[test]
    fn test_else_chain_becomes_siblings() {
        let chain = if_stmt(
            ident("a", 1, "bool"),
            vec![expr_stmt(assign(ident("x", 2, "uint256"), literal("1")))],
            Some(if_stmt(
                ident("b", 3, "bool"),
                vec![],
                Some(block(vec![expr_stmt(assign(ident("x", 2, "uint256"), literal("3")))])),
            )),
        );
        let (sequence, diagnostics) = extract(vec![chain, ret(None)]);
        assert_eq!(diagnostics, 0);
        let labels: Vec<&str> = sequence.iter().map(|s| s.label()).collect();
        assert_eq!(labels, vec!["IfStatement", "ElseIfStatement", "ElseStatement", "Return"]);
        assert_eq!(sequence[1].branch().unwrap().parent_if, Some(0));
        assert_eq!(sequence[2].branch().unwrap().parent_if, Some(0));
        assert_eq!(sequence[2].children()[0].path.as_slice(), &[2, 0]);
        assert_eq!(sequence[3].path.as_slice(), &[3]);
    }

    #[test]
    fn test_require_takes_first_argument() {
        let (sequence, _) = extract(vec![expr_stmt(require(
            binary(ident("amount", 4, "uint256"), ">", literal("0")),
            Some(literal("too small")),
        ))]);
        match &sequence[0].kind {
            StatementKind::Require { conditions } => {
                assert_eq!(conditions.len(), 1);
                assert!(conditions[0].references(4));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_tuple_assignment_targets() {
        let (sequence, _) = extract(vec![expr_stmt(assign(
            tuple(vec![ident("ok", 7, "bool"), ident("data", 8, "bytes memory")]),
            low_level(ident("target", 3, "address"), "call", vec![literal("")]),
        ))]);
        assert_eq!(sequence[0].targets().len(), 2);
        assert!(sequence[0].targets()[0].is_bool());
        assert_eq!(sequence[0].targets()[0].declaration, Some(7));
    }

    #[test]
    fn test_declaration_with_send() {
        let (sequence, _) = extract(vec![var_decl(
            vec![declaration("ok", 11, "bool")],
            Some(low_level(ident("target", 3, "address payable"), "send", vec![ident("amount", 5, "uint256")])),
        )]);
        let value = sequence[0].assigned_value().unwrap();
        assert!(value[0].has_opcode(|op| op == Opcode::Send));
        assert_eq!(sequence[0].targets()[0].declaration, Some(11));
    }

    #[test]
    fn test_loops_index_body_but_not_init() {
        let (sequence, _) = extract(vec![for_stmt(
            Some(var_decl(vec![declaration("i", 20, "uint256")], Some(literal("0")))),
            Some(binary(ident("i", 20, "uint256"), "<", literal("10"))),
            vec![expr_stmt(low_level(ident("target", 3, "address payable"), "transfer", vec![literal("1")]))],
        )]);
        match &sequence[0].kind {
            StatementKind::For { initialization, body, .. } => {
                assert!(initialization[0].path.is_empty());
                assert_eq!(body[0].path.as_slice(), &[0, 0]);
                assert_eq!(body[0].label(), "Transfer");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_malformed_statement_is_skipped() {
        let broken = json!({
            "nodeType": "ExpressionStatement",
            "id": 99,
            "src": "0:1:0",
            "expression": {"nodeType": "Assignment", "id": 98, "src": "0:1:0"}
        });
        let (sequence, diagnostics) = extract(vec![broken, ret(None)]);
        assert_eq!(sequence.len(), 1);
        assert_eq!(diagnostics, 1);
        assert_eq!(sequence[0].path.as_slice(), &[0]);
    }

    #[test]
    fn test_single_statement_body_is_wrapped() {
        let chain = json!({
            "nodeType": "IfStatement",
            "condition": ident("a", 1, "bool"),
            "trueBody": ret(None)
        });
        let (sequence, _) = extract(vec![chain]);
        assert_eq!(sequence[0].children().len(), 1);
        assert_eq!(sequence[0].children()[0].path.as_slice(), &[0, 0]);
    }
}
