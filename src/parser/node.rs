//! # AST Node Access
//!
//! @title Typed View over Compiler JSON
//! @author Ramprasad
//!
//! [`Node`] is a borrowed view over one `serde_json::Value` object of a solc AST.
//! Node kinds are resolved once into the closed [`NodeType`] enum so the extractor
//! dispatches with exhaustive matches instead of string comparisons.

use crate::error::{Error, Result};
use crate::ir::SourceLocation;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// AST node kinds the extractor distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    SourceUnit,
    ContractDefinition,
    FunctionDefinition,
    ModifierDefinition,
    VariableDeclaration,
    StructDefinition,
    EventDefinition,
    EnumDefinition,
    UsingForDirective,
    Block,
    UncheckedBlock,
    ExpressionStatement,
    VariableDeclarationStatement,
    IfStatement,
    ForStatement,
    WhileStatement,
    DoWhileStatement,
    Return,
    EmitStatement,
    PlaceholderStatement,
    Assignment,
    FunctionCall,
    FunctionCallOptions,
    MemberAccess,
    IndexAccess,
    IndexRangeAccess,
    Identifier,
    Literal,
    UnaryOperation,
    BinaryOperation,
    TupleExpression,
    Conditional,
    Unknown,
}

impl NodeType {
    pub fn parse(name: &str) -> Self {
        match name {
            "SourceUnit" => NodeType::SourceUnit,
            "ContractDefinition" => NodeType::ContractDefinition,
            "FunctionDefinition" => NodeType::FunctionDefinition,
            "ModifierDefinition" => NodeType::ModifierDefinition,
            "VariableDeclaration" => NodeType::VariableDeclaration,
            "StructDefinition" => NodeType::StructDefinition,
            "EventDefinition" => NodeType::EventDefinition,
            "EnumDefinition" => NodeType::EnumDefinition,
            "UsingForDirective" => NodeType::UsingForDirective,
            "Block" => NodeType::Block,
            "UncheckedBlock" => NodeType::UncheckedBlock,
            "ExpressionStatement" => NodeType::ExpressionStatement,
            "VariableDeclarationStatement" => NodeType::VariableDeclarationStatement,
            "IfStatement" => NodeType::IfStatement,
            "ForStatement" => NodeType::ForStatement,
            "WhileStatement" => NodeType::WhileStatement,
            "DoWhileStatement" => NodeType::DoWhileStatement,
            "Return" => NodeType::Return,
            "EmitStatement" => NodeType::EmitStatement,
            "PlaceholderStatement" => NodeType::PlaceholderStatement,
            "Assignment" => NodeType::Assignment,
            "FunctionCall" => NodeType::FunctionCall,
            "FunctionCallOptions" => NodeType::FunctionCallOptions,
            "MemberAccess" => NodeType::MemberAccess,
            "IndexAccess" => NodeType::IndexAccess,
            "IndexRangeAccess" => NodeType::IndexRangeAccess,
            "Identifier" => NodeType::Identifier,
            "Literal" => NodeType::Literal,
            "UnaryOperation" => NodeType::UnaryOperation,
            "BinaryOperation" => NodeType::BinaryOperation,
            "TupleExpression" => NodeType::TupleExpression,
            "Conditional" => NodeType::Conditional,
            _ => NodeType::Unknown,
        }
    }
}

/// Parses a solc `src` attribute (`start:length:file`).
pub fn parse_src(src: &str) -> Option<SourceLocation> {
    static SRC: OnceLock<Option<Regex>> = OnceLock::new();
    let re = SRC
        .get_or_init(|| Regex::new(r"^(\d+):(\d+):(-?\d+)$").ok())
        .as_ref()?;
    let caps = re.captures(src.trim())?;
    Some(SourceLocation {
        start: caps[1].parse().ok()?,
        length: caps[2].parse().ok()?,
        // Generated sources use file index -1.
        file: caps[3].parse::<i64>().ok().and_then(|f| usize::try_from(f).ok())?,
    })
}

/// Borrowed view of one AST object.
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    value: &'a Value,
}

impl<'a> Node<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self { value }
    }

    pub fn raw(&self) -> &'a Value {
        self.value
    }

    /// The raw `nodeType` string, empty when absent.
    pub fn node_type_name(&self) -> &'a str {
        self.str("nodeType").unwrap_or("")
    }

    pub fn node_type(&self) -> NodeType {
        NodeType::parse(self.node_type_name())
    }

    pub fn is(&self, node_type: NodeType) -> bool {
        self.node_type() == node_type
    }

    /// A non-null child object or array.
    pub fn get(&self, key: &str) -> Option<Node<'a>> {
        match self.value.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => Some(Node::new(value)),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn str(&self, key: &str) -> Option<&'a str> {
        self.value.get(key).and_then(Value::as_str)
    }

    pub fn bool(&self, key: &str) -> bool {
        self.value.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn i64(&self, key: &str) -> Option<i64> {
        self.value.get(key).and_then(Value::as_i64)
    }

    pub fn id(&self) -> Option<i64> {
        self.i64("id")
    }

    pub fn referenced_declaration(&self) -> Option<i64> {
        self.i64("referencedDeclaration")
    }

    pub fn name(&self) -> Option<&'a str> {
        self.str("name")
    }

    /// Entries of an array field, keeping `null` slots (omitted tuple components).
    pub fn list(&self, key: &str) -> Vec<Option<Node<'a>>> {
        match self.value.get(key).and_then(Value::as_array) {
            Some(items) => items
                .iter()
                .map(|item| if item.is_null() { None } else { Some(Node::new(item)) })
                .collect(),
            None => Vec::new(),
        }
    }

    /// Non-null entries of an array field.
    pub fn nodes(&self, key: &str) -> impl Iterator<Item = Node<'a>> {
        self.value
            .get(key)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter(|item| !item.is_null())
            .map(Node::new)
    }

    pub fn src(&self) -> Option<SourceLocation> {
        self.str("src").and_then(parse_src)
    }

    pub fn type_identifier(&self) -> Option<&'a str> {
        self.value
            .get("typeDescriptions")
            .and_then(|t| t.get("typeIdentifier"))
            .and_then(Value::as_str)
    }

    pub fn type_string(&self) -> Option<&'a str> {
        self.value
            .get("typeDescriptions")
            .and_then(|t| t.get("typeString"))
            .and_then(Value::as_str)
    }

    /// A required child, or [`Error::MalformedNode`].
    pub fn require(&self, key: &'static str) -> Result<Node<'a>> {
        self.get(key).ok_or_else(|| self.malformed(key))
    }

    pub fn require_str(&self, key: &'static str) -> Result<&'a str> {
        self.str(key).ok_or_else(|| self.malformed(key))
    }

    pub fn malformed(&self, field: &'static str) -> Error {
        Error::MalformedNode {
            node_type: self.node_type_name().to_string(),
            field,
            location: self.src(),
        }
    }

    pub fn unsupported(&self) -> Error {
        Error::UnsupportedShape {
            node_type: self.node_type_name().to_string(),
            location: self.src(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_src() {
        let loc = parse_src("120:35:2").unwrap();
        assert_eq!((loc.start, loc.length, loc.file), (120, 35, 2));
        assert!(parse_src("garbage").is_none());
        assert!(parse_src("1:2:-1").is_none());
    }

    #[test]
    fn test_list_keeps_null_components() {
        let value = json!({"nodeType": "TupleExpression", "components": [null, {"nodeType": "Identifier"}]});
        let node = Node::new(&value);
        let components = node.list("components");
        assert_eq!(components.len(), 2);
        assert!(components[0].is_none());
        assert_eq!(node.nodes("components").count(), 1);
    }

    #[test]
    fn test_require_reports_malformed_node() {
        let value = json!({"nodeType": "Assignment", "src": "4:5:0"});
        let err = Node::new(&value).require("leftHandSide").unwrap_err();
        assert!(matches!(err, Error::MalformedNode { field: "leftHandSide", .. }));
    }

    #[test]
    fn test_node_type_dispatch() {
        let value = json!({"nodeType": "UncheckedBlock"});
        assert_eq!(Node::new(&value).node_type(), NodeType::UncheckedBlock);
        let value = json!({"nodeType": "InlineAssembly"});
        assert_eq!(Node::new(&value).node_type(), NodeType::Unknown);
    }
}
