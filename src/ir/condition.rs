//! # Conditions
//!
//! @title Flattened Expression Records
//! @author Ramprasad
//!
//! A [`Condition`] is one record of a flattened expression. Guard conditions,
//! initializers, return values and call arguments are all stored as ordered
//! `Vec<Condition>` lists: a nested binary tree contributes one record per operator
//! level, left-nested levels before the enclosing record and right-nested levels
//! after it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic category of a call expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    Call,
    Send,
    Transfer,
    DelegateCall,
    StaticCall,
    CallCode,
    Require,
    /// Ordinary internal or external function call.
    FunctionCall,
    /// Elementary or contract type conversion such as `uint(x)`.
    TypeConversion,
    StructConstructorCall,
}

impl Opcode {
    /// Returns `true` for the low-level opcodes that hand control or value to
    /// another account.
    pub fn is_low_level(&self) -> bool {
        matches!(
            self,
            Opcode::Call
                | Opcode::Send
                | Opcode::Transfer
                | Opcode::DelegateCall
                | Opcode::StaticCall
                | Opcode::CallCode
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::Call => "call",
            Opcode::Send => "send",
            Opcode::Transfer => "transfer",
            Opcode::DelegateCall => "delegatecall",
            Opcode::StaticCall => "staticcall",
            Opcode::CallCode => "callcode",
            Opcode::Require => "require",
            Opcode::FunctionCall => "function call",
            Opcode::TypeConversion => "type conversion",
            Opcode::StructConstructorCall => "struct constructor",
        };
        write!(f, "{}", name)
    }
}

/// A unary operator applied to an operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unary {
    pub operator: String,
    pub prefix: bool,
}

/// The value an operand resolves to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Term {
    Literal {
        value: String,
        ty: Option<String>,
    },
    /// An identifier or a dotted member path such as `msg.sender`.
    Reference {
        name: String,
        declaration: Option<i64>,
        ty: Option<String>,
    },
    Call {
        opcode: Opcode,
        name: Option<String>,
        arguments: Vec<Condition>,
    },
    Index {
        name: String,
        declaration: Option<i64>,
        ty: Option<String>,
        arguments: Vec<Condition>,
    },
    /// A nested binary, tuple or ternary operand whose records were flattened into
    /// the enclosing list.
    Compound,
    /// A shape the extractor does not model.
    Unsupported { node_type: String },
}

/// One side of a condition, optionally wrapped in a unary operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operand {
    pub term: Term,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unary: Option<Unary>,
}

impl Operand {
    pub fn new(term: Term) -> Self {
        Self { term, unary: None }
    }

    /// Dotted name of a reference or index base.
    pub fn name(&self) -> Option<&str> {
        match &self.term {
            Term::Reference { name, .. } | Term::Index { name, .. } => Some(name),
            Term::Call { name, .. } => name.as_deref(),
            _ => None,
        }
    }

    pub fn declaration(&self) -> Option<i64> {
        match &self.term {
            Term::Reference { declaration, .. } | Term::Index { declaration, .. } => *declaration,
            _ => None,
        }
    }

    pub fn opcode(&self) -> Option<Opcode> {
        match &self.term {
            Term::Call { opcode, .. } => Some(*opcode),
            _ => None,
        }
    }

    /// Nested argument records of a call or index access.
    pub fn arguments(&self) -> &[Condition] {
        match &self.term {
            Term::Call { arguments, .. } | Term::Index { arguments, .. } => arguments,
            _ => &[],
        }
    }
}

/// A flattened expression record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Condition {
    Single(Operand),
    Binary {
        left: Operand,
        operator: String,
        right: Operand,
        /// Unary operator applied to the whole operation, e.g. `!(a == b)`.
        #[serde(skip_serializing_if = "Option::is_none")]
        unary: Option<Unary>,
    },
}

impl Condition {
    pub fn single(term: Term) -> Self {
        Condition::Single(Operand::new(term))
    }

    /// The operands of this record, left to right.
    pub fn operands(&self) -> impl Iterator<Item = &Operand> {
        let (first, second) = match self {
            Condition::Single(operand) => (operand, None),
            Condition::Binary { left, right, .. } => (left, Some(right)),
        };
        std::iter::once(first).chain(second)
    }

    /// Returns `true` if an operand of this record (not its nested arguments) is a
    /// call with an opcode matching `pred`.
    pub fn has_opcode(&self, pred: impl Fn(Opcode) -> bool) -> bool {
        self.operands().filter_map(Operand::opcode).any(pred)
    }

    /// Returns `true` if an operand of this record references `declaration`.
    pub fn references(&self, declaration: i64) -> bool {
        self.operands()
            .any(|operand| operand.declaration() == Some(declaration))
    }

    /// Declaration ids referenced directly by this record's operands.
    pub fn declarations(&self) -> impl Iterator<Item = i64> + '_ {
        self.operands().filter_map(Operand::declaration)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.term {
            Term::Literal { value, .. } => value.clone(),
            Term::Reference { name, .. } => name.clone(),
            Term::Call {
                opcode,
                name,
                arguments,
            } => {
                let callee = match (opcode, name) {
                    (_, Some(name)) => name.clone(),
                    (opcode, None) => opcode.to_string(),
                };
                format!("{}({})", callee, join(arguments))
            }
            Term::Index {
                name, arguments, ..
            } => format!("{}[{}]", name, join(arguments)),
            Term::Compound => "(..)".to_string(),
            Term::Unsupported { node_type } => format!("<{}>", node_type),
        };
        match &self.unary {
            Some(unary) if unary.prefix => write!(f, "{}{}", unary.operator, body),
            Some(unary) => write!(f, "{}{}", body, unary.operator),
            None => write!(f, "{}", body),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Single(operand) => write!(f, "{}", operand),
            Condition::Binary {
                left,
                operator,
                right,
                unary,
            } => match unary {
                Some(unary) => write!(f, "{}({} {} {})", unary.operator, left, operator, right),
                None => write!(f, "{} {} {}", left, operator, right),
            },
        }
    }
}

/// Renders a condition list as a comma separated string.
pub fn join(conditions: &[Condition]) -> String {
    conditions
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
