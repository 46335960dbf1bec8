//! # Intermediate Representation
//!
//! @title Normalized Contract IR
//! @author Ramprasad
//!
//! The canonical, uniformly addressable form the extractor produces from a
//! compiler AST and the detectors consume.
//!
//! ## Key Types
//!
//! - [`Contract`] - Fields, functions and payability of one contract
//! - [`Function`] - A function with its modifier-spliced statement sequence
//! - [`Statement`] - A normalized statement carrying a [`PathIndex`]
//! - [`Condition`] - One flattened expression record
//!
//! The IR is built once per contract and never mutated afterwards. Detectors borrow
//! it immutably.

mod condition;
mod statement;
pub mod visit;

pub use condition::{join, Condition, Opcode, Operand, Term, Unary};
pub use statement::{Branch, PathIndex, Statement, StatementKind, Variable};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A compiler source range, `start:length:file` in the AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Byte offset into the source file.
    pub start: usize,
    pub length: usize,
    /// Compiler file index.
    pub file: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.start, self.length, self.file)
    }
}

/// One extracted contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub name: String,
    /// `contract`, `library` or `interface`.
    pub kind: String,
    /// Direct base contract names in declaration order.
    pub bases: Vec<String>,
    pub fields: Vec<Field>,
    pub functions: Vec<Function>,
    /// `true` if any own function is payable.
    pub payable: bool,
    pub src: Option<SourceLocation>,
}

impl Contract {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// Member of a struct or parameter of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub id: Option<i64>,
    pub ty: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    StateVariable {
        /// Initializer records, empty when the variable has none.
        value: Vec<Condition>,
    },
    Struct {
        members: Vec<Member>,
    },
    Event {
        parameters: Vec<Member>,
    },
    Enum {
        members: Vec<String>,
    },
    UsingFor {
        library: String,
        library_id: Option<i64>,
    },
}

/// A contract-level declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub id: Option<i64>,
    pub ty: Option<String>,
    pub visibility: Option<String>,
    pub src: Option<SourceLocation>,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// A modifier attached to a function, with its own extracted sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierRef {
    pub name: String,
    pub sequence: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Source name, or `constructor`, `fallback` or `receive`.
    pub name: String,
    pub id: Option<i64>,
    pub visibility: String,
    pub state_mutability: String,
    pub modifiers: Vec<ModifierRef>,
    /// Modifier-spliced, indexed body.
    pub sequence: Vec<Statement>,
    pub src: Option<SourceLocation>,
}

impl Function {
    pub fn is_payable(&self) -> bool {
        self.state_mutability == "payable"
    }
}
