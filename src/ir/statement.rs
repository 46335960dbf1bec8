//! # Statements
//!
//! @title Statement IR
//! @author Ramprasad
//!
//! The closed set of statement kinds a function body is normalized into, plus the
//! hierarchical [`PathIndex`] every statement carries once indexed.

use super::condition::{Condition, Opcode};
use super::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a statement inside nested blocks, one entry per depth.
///
/// Entry `k` is the statement's position among its siblings at depth `k`. Paths
/// order lexicographically, which is depth-first textual order.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathIndex(Vec<usize>);

impl PathIndex {
    pub fn new(path: Vec<usize>) -> Self {
        Self(path)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position among siblings at the deepest level.
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Path of the `position`-th child of the statement at this path.
    pub fn child(&self, position: usize) -> Self {
        let mut path = self.0.clone();
        path.push(position);
        Self(path)
    }

    /// Returns `true` if `self` is `other` or lies inside it.
    pub fn starts_with(&self, other: &PathIndex) -> bool {
        self.0.starts_with(&other.0)
    }
}

impl From<Vec<usize>> for PathIndex {
    fn from(path: Vec<usize>) -> Self {
        Self(path)
    }
}

impl fmt::Display for PathIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// An assignment target or declared variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub declaration: Option<i64>,
    pub ty: Option<String>,
    /// Index expression when the target is `base[index]`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub index: Vec<Condition>,
}

impl Variable {
    pub fn is_bool(&self) -> bool {
        self.ty.as_deref() == Some("bool")
    }
}

/// Guard and body shared by the three arms of an if chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub conditions: Vec<Condition>,
    pub true_body: Vec<Statement>,
    /// Sibling position of the governing `if`, set on else-if and else arms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_if: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StatementKind {
    Assignment {
        targets: Vec<Variable>,
        operator: String,
        value: Vec<Condition>,
    },
    VariableDeclaration {
        declarations: Vec<Variable>,
        value: Vec<Condition>,
    },
    /// Any call statement other than `require`, classified by opcode.
    Call {
        opcode: Opcode,
        name: Option<String>,
        arguments: Vec<Condition>,
    },
    Require {
        conditions: Vec<Condition>,
    },
    Emit {
        event: String,
        arguments: Vec<Condition>,
    },
    Return {
        values: Vec<Condition>,
    },
    UnaryOperation {
        conditions: Vec<Condition>,
    },
    BinaryOperation {
        conditions: Vec<Condition>,
    },
    MemberAccess {
        name: String,
        declaration: Option<i64>,
    },
    IndexAccess {
        name: String,
        declaration: Option<i64>,
        arguments: Vec<Condition>,
    },
    Identifier {
        name: String,
        declaration: Option<i64>,
    },
    If(Branch),
    ElseIf(Branch),
    Else(Branch),
    For {
        conditions: Vec<Condition>,
        initialization: Vec<Statement>,
        step: Vec<Condition>,
        body: Vec<Statement>,
    },
    While {
        conditions: Vec<Condition>,
        body: Vec<Statement>,
    },
    DoWhile {
        conditions: Vec<Condition>,
        body: Vec<Statement>,
    },
    Block {
        body: Vec<Statement>,
    },
    Placeholder,
    /// A statement with no analyzable expression (break, assembly, try, ...).
    Other {
        node_type: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<SourceLocation>,
    /// Empty until the sequence is indexed.
    pub path: PathIndex,
    #[serde(flatten)]
    pub kind: StatementKind,
}

impl Statement {
    pub fn new(kind: StatementKind, id: Option<i64>, src: Option<SourceLocation>) -> Self {
        Self {
            id,
            src,
            path: PathIndex::default(),
            kind,
        }
    }

    /// Short kind label used in listings.
    pub fn label(&self) -> &str {
        match &self.kind {
            StatementKind::Assignment { .. } => "Assignment",
            StatementKind::VariableDeclaration { .. } => "VariableDeclarationStatement",
            StatementKind::Call { opcode, .. } => match opcode {
                Opcode::Call => "Call",
                Opcode::Send => "Send",
                Opcode::Transfer => "Transfer",
                Opcode::DelegateCall => "DelegateCall",
                Opcode::StaticCall => "StaticCall",
                Opcode::CallCode => "CallCode",
                Opcode::Require => "Require",
                Opcode::FunctionCall => "FunctionCall",
                Opcode::TypeConversion => "TypeConversion",
                Opcode::StructConstructorCall => "StructConstructorCall",
            },
            StatementKind::Require { .. } => "Require",
            StatementKind::Emit { .. } => "EmitStatement",
            StatementKind::Return { .. } => "Return",
            StatementKind::UnaryOperation { .. } => "UnaryOperation",
            StatementKind::BinaryOperation { .. } => "BinaryOperation",
            StatementKind::MemberAccess { .. } => "MemberAccess",
            StatementKind::IndexAccess { .. } => "IndexAccess",
            StatementKind::Identifier { .. } => "Identifier",
            StatementKind::If(_) => "IfStatement",
            StatementKind::ElseIf(_) => "ElseIfStatement",
            StatementKind::Else(_) => "ElseStatement",
            StatementKind::For { .. } => "ForStatement",
            StatementKind::While { .. } => "WhileStatement",
            StatementKind::DoWhile { .. } => "DoWhileStatement",
            StatementKind::Block { .. } => "Block",
            StatementKind::Placeholder => "PlaceholderStatement",
            StatementKind::Other { node_type } => node_type,
        }
    }

    /// Nested statements that take part in path indexing.
    ///
    /// The init statement of a `for` loop is not part of the indexed tree.
    pub fn children(&self) -> &[Statement] {
        match &self.kind {
            StatementKind::If(branch)
            | StatementKind::ElseIf(branch)
            | StatementKind::Else(branch) => &branch.true_body,
            StatementKind::For { body, .. }
            | StatementKind::While { body, .. }
            | StatementKind::DoWhile { body, .. }
            | StatementKind::Block { body } => body,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Statement>> {
        match &mut self.kind {
            StatementKind::If(branch)
            | StatementKind::ElseIf(branch)
            | StatementKind::Else(branch) => Some(&mut branch.true_body),
            StatementKind::For { body, .. }
            | StatementKind::While { body, .. }
            | StatementKind::DoWhile { body, .. }
            | StatementKind::Block { body } => Some(body),
            _ => None,
        }
    }

    pub fn branch(&self) -> Option<&Branch> {
        match &self.kind {
            StatementKind::If(branch)
            | StatementKind::ElseIf(branch)
            | StatementKind::Else(branch) => Some(branch),
            _ => None,
        }
    }

    /// Returns `true` for the head of an if chain.
    pub fn is_if(&self) -> bool {
        matches!(self.kind, StatementKind::If(_))
    }

    /// Returns `true` for else-if and else arms.
    pub fn is_alternative(&self) -> bool {
        matches!(self.kind, StatementKind::ElseIf(_) | StatementKind::Else(_))
    }

    /// Guard conditions of `require`, `if` and `else if`.
    pub fn guard_conditions(&self) -> Option<&[Condition]> {
        match &self.kind {
            StatementKind::Require { conditions } => Some(conditions),
            StatementKind::If(branch) | StatementKind::ElseIf(branch) => Some(&branch.conditions),
            _ => None,
        }
    }

    /// Right-hand side records of an assignment or declaration.
    pub fn assigned_value(&self) -> Option<&[Condition]> {
        match &self.kind {
            StatementKind::Assignment { value, .. }
            | StatementKind::VariableDeclaration { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Assigned or declared variables.
    pub fn targets(&self) -> &[Variable] {
        match &self.kind {
            StatementKind::Assignment { targets, .. } => targets,
            StatementKind::VariableDeclaration { declarations, .. } => declarations,
            _ => &[],
        }
    }

    /// Condition records carried by the statement itself, excluding children.
    pub fn conditions(&self) -> &[Condition] {
        match &self.kind {
            StatementKind::Assignment { value, .. }
            | StatementKind::VariableDeclaration { value, .. } => value,
            StatementKind::Call { arguments, .. }
            | StatementKind::Emit { arguments, .. }
            | StatementKind::IndexAccess { arguments, .. } => arguments,
            StatementKind::Require { conditions }
            | StatementKind::UnaryOperation { conditions }
            | StatementKind::BinaryOperation { conditions }
            | StatementKind::For { conditions, .. }
            | StatementKind::While { conditions, .. }
            | StatementKind::DoWhile { conditions, .. } => conditions,
            StatementKind::Return { values } => values,
            StatementKind::If(branch)
            | StatementKind::ElseIf(branch)
            | StatementKind::Else(branch) => &branch.conditions,
            _ => &[],
        }
    }
}
