//! # AST Documents
//!
//! @title Compiler Output Loader and Index
//! @author Ramprasad
//!
//! Loads compiler-emitted AST documents and indexes their contract definitions by
//! name so base contracts declared in other files resolve.
//!
//! ## Accepted Shapes
//!
//! - Truffle build artifacts (`ast` + `source`)
//! - Bare `SourceUnit` JSON
//! - solc standard-JSON output (`sources.<path>.ast`)
//! - Hardhat build-info (`input.sources` + `output.sources`)

use super::node::{Node, NodeType};
use crate::error::{Error, Result};
use crate::ir::SourceLocation;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// A source file known to the index.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    /// Source text when the document carried it.
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct ContractEntry {
    unit: usize,
    position: usize,
}

/// Index over every loaded source unit.
#[derive(Debug, Default)]
pub struct AstIndex {
    units: Vec<Value>,
    unit_paths: HashMap<String, usize>,
    files: BTreeMap<usize, SourceFile>,
    contracts: HashMap<String, ContractEntry>,
    contract_order: Vec<String>,
    documents: usize,
}

/// Reads and parses one JSON document.
pub fn read_document(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })
}

impl AstIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from a single file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut index = Self::new();
        index.load_file(path)?;
        Ok(index)
    }

    /// Loads one document from disk.
    ///
    /// # Returns
    ///
    /// The number of new source units added.
    pub fn load_file(&mut self, path: &Path) -> Result<usize> {
        let document = read_document(path)?;
        self.add_document(document, path)
    }

    /// Adds an already parsed document.
    ///
    /// # Arguments
    ///
    /// * `document` - Parsed JSON in one of the accepted shapes
    /// * `origin` - Where the document came from, used in errors
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDocument`] when no source unit can be found.
    pub fn add_document(&mut self, document: Value, origin: &Path) -> Result<usize> {
        let units = split_document(document).map_err(|reason| Error::InvalidDocument {
            path: origin.to_path_buf(),
            reason,
        })?;
        self.documents += 1;

        let mut added = 0;
        for (unit, text) in units {
            if self.add_source_unit(unit, text) {
                added += 1;
            }
        }
        log::debug!("{}: {} new source unit(s)", origin.display(), added);
        Ok(added)
    }

    /// Adds one `SourceUnit`, de-duplicated by `absolutePath`.
    ///
    /// # Returns
    ///
    /// `true` if the unit was new.
    pub fn add_source_unit(&mut self, unit: Value, text: Option<String>) -> bool {
        let node = Node::new(&unit);
        let path = node.str("absolutePath").unwrap_or("<unknown>").to_string();
        let file = node.src().map(|loc| loc.file);

        if let Some(&existing) = self.unit_paths.get(&path) {
            // A later artifact of the same file may carry the text the first lacked.
            if let (Some(text), Some(file)) = (text, file) {
                if let Some(source) = self.files.get_mut(&file) {
                    if source.text.is_none() && source.path == path {
                        source.text = Some(text);
                    }
                }
            }
            log::trace!("skipping duplicate source unit {} (unit {})", path, existing);
            return false;
        }

        if let Some(file) = file {
            match self.files.get(&file) {
                Some(source) if source.path != path => {
                    log::debug!(
                        "file index {} already maps to {}, not {}",
                        file,
                        source.path,
                        path
                    );
                }
                Some(_) => {}
                None => {
                    self.files.insert(
                        file,
                        SourceFile {
                            path: path.clone(),
                            text,
                        },
                    );
                }
            }
        }

        let unit_index = self.units.len();
        let mut definitions = Vec::new();
        for (position, child) in node.list("nodes").into_iter().enumerate() {
            if let Some(child) = child {
                if child.is(NodeType::ContractDefinition) {
                    if let Some(name) = child.name() {
                        definitions.push((name.to_string(), position));
                    }
                }
            }
        }
        for (name, position) in definitions {
            if self.contracts.contains_key(&name) {
                log::warn!("contract `{}` is defined more than once; keeping the first", name);
                continue;
            }
            self.contract_order.push(name.clone());
            self.contracts.insert(
                name,
                ContractEntry {
                    unit: unit_index,
                    position,
                },
            );
        }

        self.unit_paths.insert(path, unit_index);
        self.units.push(unit);
        true
    }

    /// Number of documents loaded.
    pub fn documents(&self) -> usize {
        self.documents
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Looks up a contract definition by name.
    pub fn contract(&self, name: &str) -> Option<Node<'_>> {
        let entry = self.contracts.get(name)?;
        self.units
            .get(entry.unit)?
            .get("nodes")?
            .get(entry.position)
            .map(Node::new)
    }

    /// Contract names in load order.
    pub fn contract_names(&self) -> &[String] {
        &self.contract_order
    }

    /// Path of the source unit declaring `name`.
    pub fn contract_path(&self, name: &str) -> Option<&str> {
        let entry = self.contracts.get(name)?;
        self.units
            .get(entry.unit)
            .and_then(|unit| unit.get("absolutePath"))
            .and_then(Value::as_str)
    }

    pub fn source_file(&self, file: usize) -> Option<&SourceFile> {
        self.files.get(&file)
    }

    /// 1-based line of a source location.
    pub fn line_of(&self, location: &SourceLocation) -> Option<usize> {
        let text = self.source_file(location.file)?.text.as_deref()?;
        let prefix = text.as_bytes().get(..location.start)?;
        Some(prefix.iter().filter(|b| **b == b'\n').count() + 1)
    }

    /// The source text covered by a location, at most `max_lines` lines.
    pub fn snippet(&self, location: &SourceLocation, max_lines: usize) -> Option<String> {
        let text = self.source_file(location.file)?.text.as_deref()?;
        let end = location.start.checked_add(location.length)?;
        let bytes = text.as_bytes().get(location.start..end)?;
        let snippet = String::from_utf8_lossy(bytes);
        let lines: Vec<&str> = snippet.lines().take(max_lines).collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

type UnitWithText = (Value, Option<String>);

/// Splits a document into its source units and their texts.
fn split_document(document: Value) -> std::result::Result<Vec<UnitWithText>, String> {
    let Value::Object(mut map) = document else {
        return Err("top-level JSON value is not an object".to_string());
    };

    if map.get("nodeType").and_then(Value::as_str) == Some("SourceUnit") {
        return Ok(vec![(Value::Object(map), None)]);
    }

    if let Some(ast) = map.remove("ast") {
        if ast.get("nodeType").and_then(Value::as_str) != Some("SourceUnit") {
            return Err("`ast` is not a SourceUnit".to_string());
        }
        let text = map
            .remove("source")
            .and_then(|s| s.as_str().map(str::to_string));
        return Ok(vec![(ast, text)]);
    }

    if let Some(output) = map.remove("output") {
        let texts = map
            .get("input")
            .and_then(|input| input.get("sources"))
            .and_then(Value::as_object)
            .map(|sources| {
                sources
                    .iter()
                    .filter_map(|(path, source)| {
                        source
                            .get("content")
                            .and_then(Value::as_str)
                            .map(|content| (path.clone(), content.to_string()))
                    })
                    .collect::<HashMap<_, _>>()
            })
            .unwrap_or_default();
        let mut units = split_document(output)?;
        for (unit, text) in units.iter_mut() {
            if let Some(path) = unit.get("absolutePath").and_then(Value::as_str) {
                if let Some(content) = texts.get(path) {
                    *text = Some(content.clone());
                }
            }
        }
        return Ok(units);
    }

    if let Some(Value::Object(sources)) = map.remove("sources") {
        let units: Vec<UnitWithText> = sources
            .into_iter()
            .filter_map(|(_, mut source)| source.get_mut("ast").map(Value::take))
            .filter(|ast| ast.get("nodeType").and_then(Value::as_str) == Some("SourceUnit"))
            .map(|ast| (ast, None))
            .collect();
        if units.is_empty() {
            return Err("`sources` contains no SourceUnit ASTs".to_string());
        }
        return Ok(units);
    }

    Err("no `ast`, `sources` or SourceUnit root found".to_string())
}
