//! # Modifier Splicing
//!
//! @title Modifier Inlining
//! @author Ramprasad
//!
//! Inlines modifier bodies around a function body. Modifiers wrap inside-out: the
//! last listed modifier wraps the body first and the first listed ends up
//! outermost. Each wrap replaces the modifier's first placeholder (depth-first)
//! with the wrapped sequence.

use crate::error::Diagnostic;
use crate::ir::{ModifierRef, Statement, StatementKind};

/// Splices `modifiers` around `body`.
///
/// # Arguments
///
/// * `modifiers` - Modifiers in the order the function lists them
/// * `body` - The function's own statements
/// * `diagnostics` - Receives a record for each modifier with zero or several
///   placeholders
///
/// # Returns
///
/// The combined sequence with no placeholders left. Paths are not assigned.
pub fn splice_modifiers(
    modifiers: &[ModifierRef],
    body: Vec<Statement>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Statement> {
    let mut result = body;
    if modifiers.is_empty() {
        fill_placeholders(&mut result, &mut None);
        return result;
    }

    for modifier in modifiers.iter().rev() {
        let mut wrapper = modifier.sequence.clone();
        let mut inner = Some(result);
        let placeholders = fill_placeholders(&mut wrapper, &mut inner);
        match placeholders {
            0 => diagnostics.push(Diagnostic::placeholder(
                &modifier.name,
                "no placeholder, the wrapped body is never reached".to_string(),
            )),
            1 => {}
            n => diagnostics.push(Diagnostic::placeholder(
                &modifier.name,
                format!("{} placeholders, only the first is inlined", n),
            )),
        }
        result = wrapper;
    }
    result
}

/// Replaces the first placeholder with `inner` and removes the rest.
///
/// Returns the number of placeholders met.
fn fill_placeholders(sequence: &mut Vec<Statement>, inner: &mut Option<Vec<Statement>>) -> usize {
    let mut count = 0;
    let mut position = 0;
    while position < sequence.len() {
        if matches!(sequence[position].kind, StatementKind::Placeholder) {
            count += 1;
            match inner.take() {
                Some(body) => {
                    let inserted = body.len();
                    sequence.splice(position..=position, body);
                    position += inserted;
                }
                None => {
                    sequence.remove(position);
                }
            }
            continue;
        }
        if let Some(children) = sequence[position].children_mut() {
            count += fill_placeholders(children, inner);
        }
        position += 1;
    }
    count
}
