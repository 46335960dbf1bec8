//! # Contract Assembly
//!
//! @title Contract Extraction
//! @author Ramprasad
//!
//! Builds a [`Contract`] from its definition node: fields from the whole
//! inheritance hierarchy, modifiers resolved with own definitions overriding
//! inherited ones, and every own implemented function with its modifiers spliced
//! in and its sequence indexed.

use super::modifiers::splice_modifiers;
use super::node::{Node, NodeType};
use super::sequence::{assign_paths, block_statements};
use super::Extractor;
use crate::error::{Diagnostic, Error, Result};
use crate::ir::{Contract, Field, FieldKind, Function, Member, ModifierRef};
use std::collections::{HashMap, HashSet};

/// Direct base names of a contract, in declaration order.
fn base_names<'n>(contract: Node<'n>) -> Vec<&'n str> {
    contract
        .nodes("baseContracts")
        .filter_map(|base| base.get("baseName"))
        .filter_map(|name| name.name().or_else(|| name.str("namePath")))
        // Qualified paths (`Lib.Base`) resolve by their last segment.
        .map(|name| name.rsplit('.').next().unwrap_or(name))
        .collect()
}

fn function_name(function: Node<'_>) -> String {
    match function.str("kind") {
        Some("constructor") => "constructor".to_string(),
        Some("fallback") => "fallback".to_string(),
        Some("receive") => "receive".to_string(),
        _ if function.bool("isConstructor") => "constructor".to_string(),
        _ => match function.name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => "fallback".to_string(),
        },
    }
}

/// `stateMutability`, or its pre-0.5 `payable`/`constant` encoding.
fn state_mutability(function: Node<'_>) -> String {
    if let Some(mutability) = function.str("stateMutability") {
        return mutability.to_string();
    }
    if function.bool("payable") {
        "payable".to_string()
    } else if function.bool("constant") {
        "view".to_string()
    } else {
        "nonpayable".to_string()
    }
}

fn member(node: Node<'_>) -> Member {
    Member {
        name: node.name().unwrap_or_default().to_string(),
        id: node.id(),
        ty: node
            .type_string()
            .or_else(|| node.get("typeName").and_then(|t| t.type_string()))
            .map(str::to_string),
    }
}

impl<'a> Extractor<'a> {
    /// Extracts the named contract.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no loaded unit declares `name`.
    pub fn contract(&mut self, name: &str) -> Result<Contract> {
        let node = self.index.contract(name).ok_or_else(|| Error::NotFound {
            kind: "contract",
            name: name.to_string(),
        })?;

        let mut fields = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(name.to_string());
        self.collect_fields(node, name, false, &mut visited, &mut fields);

        let mut modifiers = HashMap::new();
        let mut visited = HashSet::new();
        visited.insert(name.to_string());
        self.collect_modifiers(node, &mut visited, &mut modifiers);

        let mut functions = Vec::new();
        for definition in node.nodes("nodes") {
            if !definition.is(NodeType::FunctionDefinition) || !definition.has("body") {
                continue;
            }
            match self.function(definition, &modifiers) {
                Ok(function) => functions.push(function),
                Err(err) => self.record(err),
            }
        }

        let payable = functions.iter().any(Function::is_payable);
        log::debug!(
            "extracted {}: {} field(s), {} function(s), payable={}",
            name,
            fields.len(),
            functions.len(),
            payable
        );

        Ok(Contract {
            name: name.to_string(),
            kind: node.str("contractKind").unwrap_or("contract").to_string(),
            bases: base_names(node).into_iter().map(str::to_string).collect(),
            fields,
            functions,
            payable,
            src: node.src(),
        })
    }

    /// Fields of `contract`, bases first. Private members of bases are skipped.
    fn collect_fields(
        &mut self,
        contract: Node<'a>,
        name: &str,
        inherited: bool,
        visited: &mut HashSet<String>,
        out: &mut Vec<Field>,
    ) {
        for base in base_names(contract) {
            if !visited.insert(base.to_string()) {
                continue;
            }
            match self.index.contract(base) {
                Some(definition) => self.collect_fields(definition, base, true, visited, out),
                None => self.push_diagnostic(Diagnostic::unresolved_base(name, base)),
            }
        }

        for definition in contract.nodes("nodes") {
            if inherited && definition.str("visibility") == Some("private") {
                continue;
            }
            if let Some(field) = self.field(definition) {
                out.push(field);
            }
        }
    }

    fn field(&mut self, definition: Node<'_>) -> Option<Field> {
        let kind = match definition.node_type() {
            NodeType::VariableDeclaration if definition.bool("stateVariable") => {
                FieldKind::StateVariable {
                    value: match definition.get("value") {
                        Some(value) => self.conditions_of(value),
                        None => Vec::new(),
                    },
                }
            }
            NodeType::StructDefinition => FieldKind::Struct {
                members: definition.nodes("members").map(member).collect(),
            },
            NodeType::EventDefinition => FieldKind::Event {
                parameters: definition
                    .get("parameters")
                    .map(|p| p.nodes("parameters").map(member).collect())
                    .unwrap_or_default(),
            },
            NodeType::EnumDefinition => FieldKind::Enum {
                members: definition
                    .nodes("members")
                    .filter_map(|m| m.name().map(str::to_string))
                    .collect(),
            },
            NodeType::UsingForDirective => {
                let library = definition.get("libraryName");
                FieldKind::UsingFor {
                    library: library
                        .and_then(|l| l.name().or_else(|| l.str("namePath")))
                        .unwrap_or_default()
                        .to_string(),
                    library_id: library
                        .and_then(|l| l.referenced_declaration().or_else(|| l.id())),
                }
            }
            _ => return None,
        };

        let (name, ty) = match &kind {
            FieldKind::UsingFor { .. } => {
                let target = definition.get("typeName");
                let ty = target
                    .and_then(|t| t.type_string().or_else(|| t.name()))
                    .map(str::to_string);
                (ty.clone().unwrap_or_else(|| "*".to_string()), ty)
            }
            _ => (
                definition.name().unwrap_or_default().to_string(),
                definition.type_string().map(str::to_string),
            ),
        };

        Some(Field {
            name,
            id: definition.id(),
            ty,
            visibility: definition.str("visibility").map(str::to_string),
            src: definition.src(),
            kind,
        })
    }

    /// Modifier definitions visible in `contract`. Own definitions override
    /// inherited ones of the same name.
    fn collect_modifiers(
        &mut self,
        contract: Node<'a>,
        visited: &mut HashSet<String>,
        out: &mut HashMap<&'a str, Node<'a>>,
    ) {
        for base in base_names(contract) {
            if !visited.insert(base.to_string()) {
                continue;
            }
            if let Some(definition) = self.index.contract(base) {
                self.collect_modifiers(definition, visited, out);
            }
        }
        for definition in contract.nodes("nodes") {
            if definition.is(NodeType::ModifierDefinition) && definition.has("body") {
                if let Some(name) = definition.name() {
                    out.insert(name, definition);
                }
            }
        }
    }

    fn function(
        &mut self,
        definition: Node<'_>,
        modifiers: &HashMap<&'a str, Node<'a>>,
    ) -> Result<Function> {
        let name = function_name(definition);
        let body = definition.require("body")?;

        let mut refs = Vec::new();
        for invocation in definition.nodes("modifiers") {
            let Some(modifier_name) = invocation
                .get("modifierName")
                .and_then(|n| n.name().or_else(|| n.str("namePath")))
            else {
                self.record(invocation.malformed("modifierName"));
                continue;
            };
            // Base constructor calls share the `modifiers` list.
            let Some(modifier) = modifiers.get(modifier_name) else {
                log::trace!("`{}` on {} is not a modifier", modifier_name, name);
                continue;
            };
            let modifier_body = modifier.require("body")?;
            let mut sequence = self.extract_sequence(block_statements(modifier_body));
            assign_paths(&mut sequence);
            refs.push(ModifierRef {
                name: modifier_name.to_string(),
                sequence,
            });
        }

        let own = self.extract_sequence(block_statements(body));
        let mut sequence = splice_modifiers(&refs, own, &mut self.diagnostics);
        assign_paths(&mut sequence);

        Ok(Function {
            name,
            id: definition.id(),
            visibility: definition.str("visibility").unwrap_or("public").to_string(),
            state_mutability: state_mutability(definition),
            modifiers: refs,
            sequence,
            src: definition.src(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::testing::*;
    use crate::parser::extract_contract;
    use serde_json::json;

    #[test]
    fn test_fields_include_base_non_private() {
        let base = contract(
            "Base",
            &[],
            vec![
                state_var("owner", 1, "address", "internal"),
                state_var("secret", 2, "uint256", "private"),
            ],
        );
        let child = contract("Child", &["Base"], vec![state_var("balance", 3, "uint256", "public")]);
        let index = index_of(vec![base, child]);
        let extraction = extract_contract(&index, "Child").unwrap();
        let names: Vec<&str> = extraction.contract.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["owner", "balance"]);
        assert_eq!(extraction.contract.bases, vec!["Base".to_string()]);
    }

    #[test]
    fn test_missing_contract_is_not_found() {
        let index = index_of(vec![]);
        let err = extract_contract(&index, "Nope").unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "contract", .. }));
    }

    #[test]
    fn test_own_modifier_overrides_inherited() {
        let base = contract(
            "Base",
            &[],
            vec![modifier_def("guarded", vec![expr_stmt(require(ident("a", 1, "bool"), None)), placeholder()])],
        );
        let child = contract(
            "Child",
            &["Base"],
            vec![
                modifier_def("guarded", vec![placeholder(), ret(None)]),
                function("run", "public", "nonpayable", &["guarded"], vec![expr_stmt(call("work", vec![]))]),
            ],
        );
        let index = index_of(vec![base, child]);
        let extraction = extract_contract(&index, "Child").unwrap();
        let run = extraction.contract.function("run").unwrap();
        let labels: Vec<&str> = run.sequence.iter().map(|s| s.label()).collect();
        assert_eq!(labels, vec!["FunctionCall", "Return"]);
        assert_eq!(run.sequence[1].path.as_slice(), &[1]);
    }

    #[test]
    fn test_payable_and_special_functions() {
        let mut fallback = function("", "external", "payable", &[], vec![]);
        fallback["kind"] = json!("fallback");
        let interface_only = json!({
            "nodeType": "FunctionDefinition",
            "name": "declared",
            "body": null
        });
        let vault = contract(
            "Vault",
            &["Missing"],
            vec![fallback, interface_only, function("withdraw", "public", "nonpayable", &[], vec![])],
        );
        let index = index_of(vec![vault]);
        let extraction = extract_contract(&index, "Vault").unwrap();
        let names: Vec<&str> = extraction.contract.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["fallback", "withdraw"]);
        assert!(extraction.contract.payable);
        assert_eq!(extraction.diagnostics.len(), 1);
    }
}
