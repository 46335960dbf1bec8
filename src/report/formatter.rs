//! # Report Formatters
//!
//! @title Markdown and IR Tree Rendering
//! @author Ramprasad
//!
//! Markdown reports are rendered through a Handlebars template. The extracted IR
//! of a contract renders as an indented statement tree for the `extract` command.

use super::Report;
use crate::error::{Error, Result};
use crate::ir::{join, FieldKind, Statement, StatementKind};
use crate::parser::Extraction;
use handlebars::Handlebars;
use serde_json::json;

/// Markdown report layout.
pub const MARKDOWN_TEMPLATE: &str = r#"# Solidity-Sentinel Security Report

| | |
|---|---|
| Scanned path | `{{metadata.scanned_path}}` |
| Artifacts loaded | {{metadata.artifacts_loaded}} |
| Contracts analyzed | {{metadata.contracts_analyzed}} |
| Version | {{metadata.version}} |
| Timestamp | {{metadata.timestamp}} |

## Summary

| Severity | Count |
|---|---|
| High | {{summary.high}} |
| Medium | {{summary.medium}} |
| Low | {{summary.low}} |
| Info | {{summary.info}} |
| **Total** | **{{summary.total}}** |

## Contracts
{{#each contracts}}

### {{name}}{{#if payable}} (payable){{/if}}

Source: `{{source_path}}`

| Detector | Positive functions | Score | Limit |
|---|---|---|---|
{{#each totals}}
| {{detector_id}} {{name}} | {{positives}} | {{score}} | {{score_limit}} |
{{/each}}
{{#each contract_results}}
| {{detector_id}} {{name}} (contract) | - | {{score}} | {{score_limit}} |
{{/each}}
{{#if skipped}}

{{skipped}} sub-tree(s) were skipped during extraction.
{{/if}}
{{/each}}

## Findings
{{#unless findings}}

No vulnerabilities found.
{{/unless}}
{{#each findings}}

### {{number}}. [{{detector_id}}] {{title}}

{{badge}}

- **Location:** `{{location}}`
- **File:** `{{file_path}}`{{#if line}} line {{line}}{{/if}}
{{#if cwe}}
- **Reference:** {{cwe}}
{{/if}}

{{description}}
{{#if code_snippet}}

```solidity
{{code_snippet}}
```
{{/if}}

**Remediation**

```
{{remediation}}
```
{{/each}}
"#;

/// Renders `report` through [`MARKDOWN_TEMPLATE`].
///
/// # Errors
///
/// [`Error::Template`] if the template fails to compile or render.
pub fn to_markdown(report: &Report) -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(false);
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars
        .register_template_string("report", MARKDOWN_TEMPLATE)
        .map_err(|e| Error::Template(e.to_string()))?;

    let findings: Vec<_> = report
        .findings
        .iter()
        .enumerate()
        .map(|(i, finding)| {
            json!({
                "number": i + 1,
                "badge": finding.severity.markdown_badge(),
                "detector_id": finding.detector_id,
                "title": finding.title,
                "location": finding.location,
                "file_path": finding.file_path,
                "line": finding.line,
                "cwe": finding.cwe,
                "description": finding.description,
                "code_snippet": finding.code_snippet,
                "remediation": finding.remediation,
            })
        })
        .collect();

    let contracts: Vec<_> = report
        .contracts
        .iter()
        .map(|contract| {
            json!({
                "name": contract.name,
                "source_path": contract.source_path,
                "payable": contract.payable,
                "totals": contract.totals,
                "contract_results": contract.contract_results,
                "skipped": contract.diagnostics.len(),
            })
        })
        .collect();

    let mut summary = report.summary.clone();
    summary.high += summary.critical;
    let data = json!({
        "metadata": report.metadata,
        "summary": summary,
        "contracts": contracts,
        "findings": findings,
    });

    handlebars
        .render("report", &data)
        .map_err(|e| Error::Template(e.to_string()))
}

/// Renders the extracted IR of one contract as an indented tree.
///
/// Each statement line starts with its path index. Else arms show the position
/// of their governing `if`.
pub fn render_tree(extraction: &Extraction) -> String {
    let contract = &extraction.contract;
    let mut lines = Vec::new();

    let mut header = format!("{} {}", contract.kind, contract.name);
    if !contract.bases.is_empty() {
        header.push_str(&format!(" is {}", contract.bases.join(", ")));
    }
    if contract.payable {
        header.push_str(" [payable]");
    }
    lines.push(header);

    if !contract.fields.is_empty() {
        lines.push("  fields:".to_string());
    }
    for field in &contract.fields {
        let detail = match &field.kind {
            FieldKind::StateVariable { value } if !value.is_empty() => format!(" = {}", join(value)),
            FieldKind::Struct { members } => format!(" {{ {} member(s) }}", members.len()),
            FieldKind::Event { parameters } => format!(" ({} parameter(s))", parameters.len()),
            FieldKind::Enum { members } => format!(" {{ {} }}", members.join(", ")),
            FieldKind::UsingFor { library, .. } => format!(" using {}", library),
            FieldKind::StateVariable { .. } => String::new(),
        };
        lines.push(format!(
            "    {} {}{}",
            field.ty.as_deref().unwrap_or("-"),
            field.name,
            detail
        ));
    }

    for function in &contract.functions {
        let modifiers: Vec<&str> = function.modifiers.iter().map(|m| m.name.as_str()).collect();
        let mut line = format!(
            "  function {} [{} {}]",
            function.name, function.visibility, function.state_mutability
        );
        if !modifiers.is_empty() {
            line.push_str(&format!(" modifiers: {}", modifiers.join(", ")));
        }
        lines.push(line);
        push_sequence(&function.sequence, 2, &mut lines);
    }

    for diagnostic in &extraction.diagnostics {
        lines.push(format!("  ! {}", diagnostic));
    }

    lines.join("\n")
}

fn push_sequence(sequence: &[Statement], depth: usize, lines: &mut Vec<String>) {
    for statement in sequence {
        lines.push(format!(
            "{}{:<8} {}",
            "  ".repeat(depth),
            statement.path.to_string(),
            describe(statement)
        ));
        push_sequence(statement.children(), depth + 1, lines);
    }
}

fn describe(statement: &Statement) -> String {
    let label = statement.label();
    match &statement.kind {
        StatementKind::Assignment {
            targets,
            operator,
            value,
        } => {
            let names: Vec<&str> = targets.iter().map(|t| t.name.as_str()).collect();
            format!("{} {} {} {}", label, names.join(", "), operator, join(value))
        }
        StatementKind::VariableDeclaration {
            declarations,
            value,
        } => {
            let names: Vec<String> = declarations
                .iter()
                .map(|d| format!("{} {}", d.ty.as_deref().unwrap_or("var"), d.name))
                .collect();
            if value.is_empty() {
                format!("{} {}", label, names.join(", "))
            } else {
                format!("{} {} = {}", label, names.join(", "), join(value))
            }
        }
        StatementKind::Call {
            name: Some(name),
            arguments,
            ..
        } => format!("{} {}({})", label, name, join(arguments)),
        StatementKind::ElseIf(branch) | StatementKind::Else(branch) => {
            let mut parts = vec![label.to_string()];
            if !branch.conditions.is_empty() {
                parts.push(join(&branch.conditions));
            }
            if let Some(parent) = branch.parent_if {
                parts.push(format!("(if at {})", parent));
            }
            parts.join(" ")
        }
        StatementKind::Emit { event, arguments } => {
            format!("{} {}({})", label, event, join(arguments))
        }
        StatementKind::MemberAccess { name, .. }
        | StatementKind::IndexAccess { name, .. }
        | StatementKind::Identifier { name, .. } => format!("{} {}", label, name),
        _ => {
            let conditions = statement.conditions();
            if conditions.is_empty() {
                label.to_string()
            } else {
                format!("{} {}", label, join(conditions))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract_contract;
    use crate::parser::testing::*;
    use crate::report::Report;

    #[test]
    fn test_tree_shows_paths_and_else_links() {
        let flag = || ident("flag", 3, "bool");
        let index = index_of(vec![contract(
            "Switch",
            &[],
            vec![
                state_var("flag", 3, "bool", "public"),
                function(
                    "toggle",
                    "public",
                    "nonpayable",
                    &[],
                    vec![if_stmt(
                        flag(),
                        vec![expr_stmt(assign(flag(), literal("false")))],
                        Some(block(vec![expr_stmt(assign(flag(), literal("true")))])),
                    )],
                ),
            ],
        )]);
        let extraction = extract_contract(&index, "Switch").unwrap();
        let tree = render_tree(&extraction);
        assert!(tree.starts_with("contract Switch"));
        assert!(tree.contains("function toggle [public nonpayable]"));
        assert!(tree.contains("0,0"));
        assert!(tree.contains("IfStatement flag"));
        assert!(tree.contains("ElseStatement (if at 0)"));
        assert!(tree.contains("Assignment flag = true"));
    }

    #[test]
    fn test_markdown_without_findings() {
        let report = Report::new(Vec::new(), "build/contracts".to_string(), 0);
        let markdown = to_markdown(&report).unwrap();
        assert!(markdown.contains("# Solidity-Sentinel Security Report"));
        assert!(markdown.contains("`build/contracts`"));
        assert!(markdown.contains("No vulnerabilities found."));
    }
}
