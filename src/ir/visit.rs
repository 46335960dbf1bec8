//! # IR Visitor
//!
//! @title Statement Tree Traversal
//! @author Ramprasad
//!
//! A read-only visitor over statement sequences, in the style of `syn::visit`.
//! Override `visit_statement` and call [`walk_statement`] to keep descending.

use super::statement::Statement;

pub trait Visit<'ir> {
    fn visit_sequence(&mut self, sequence: &'ir [Statement]) {
        walk_sequence(self, sequence);
    }

    fn visit_statement(&mut self, statement: &'ir Statement) {
        walk_statement(self, statement);
    }
}

pub fn walk_sequence<'ir, V: Visit<'ir> + ?Sized>(visitor: &mut V, sequence: &'ir [Statement]) {
    for statement in sequence {
        visitor.visit_statement(statement);
    }
}

/// Descends into the indexed children of `statement`.
pub fn walk_statement<'ir, V: Visit<'ir> + ?Sized>(visitor: &mut V, statement: &'ir Statement) {
    let children = statement.children();
    if !children.is_empty() {
        visitor.visit_sequence(children);
    }
}

/// Iterates every statement of `sequence` depth-first in textual order.
pub fn statements(sequence: &[Statement]) -> impl Iterator<Item = &Statement> {
    let mut stack: Vec<std::slice::Iter<'_, Statement>> = vec![sequence.iter()];
    std::iter::from_fn(move || loop {
        let top = stack.last_mut()?;
        match top.next() {
            Some(statement) => {
                stack.push(statement.children().iter());
                return Some(statement);
            }
            None => {
                stack.pop();
            }
        }
    })
}
