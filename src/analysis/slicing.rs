//! # Sequence Slicing
//!
//! @title Path Index Algebra
//! @author Ramprasad
//!
//! Selects the statements that may execute after, before, or between given points
//! of an indexed sequence. Selections are sets of [`PathIndex`] values over the
//! original tree; nothing is copied until [`SequenceView::to_sequence`].
//!
//! ## Branch Exclusivity
//!
//! Arms of one if chain never run together. Starting inside an arm drops the
//! arms that follow it; stopping inside an `else if` or `else` arm drops the arms
//! that precede it, back to the governing `if`.

use crate::ir::visit::statements;
use crate::ir::{PathIndex, Statement};
use std::collections::BTreeSet;

/// A subset of an indexed sequence.
///
/// The member set is closed under ancestors: a statement is only a member if its
/// enclosing statements are.
#[derive(Debug, Clone)]
pub struct SequenceView<'a> {
    root: &'a [Statement],
    members: BTreeSet<PathIndex>,
}

impl<'a> SequenceView<'a> {
    fn new(root: &'a [Statement], members: BTreeSet<PathIndex>) -> Self {
        Self { root, members }
    }

    pub fn contains(&self, path: &PathIndex) -> bool {
        self.members.contains(path)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member paths in depth-first order.
    pub fn paths(&self) -> impl Iterator<Item = &PathIndex> {
        self.members.iter()
    }

    /// Member statements in depth-first textual order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Statement> + '_ {
        statements(self.root).filter(move |statement| self.members.contains(&statement.path))
    }

    /// Copies the selection into a standalone pruned sequence.
    pub fn to_sequence(&self) -> Vec<Statement> {
        prune(self.root, &self.members)
    }
}

fn prune(sequence: &[Statement], members: &BTreeSet<PathIndex>) -> Vec<Statement> {
    sequence
        .iter()
        .filter(|statement| members.contains(&statement.path))
        .map(|statement| {
            let mut copy = statement.clone();
            if let Some(children) = copy.children_mut() {
                *children = prune(statement.children(), members);
            }
            copy
        })
        .collect()
}

fn insert_subtree(statement: &Statement, out: &mut BTreeSet<PathIndex>) {
    for nested in statements(std::slice::from_ref(statement)) {
        out.insert(nested.path.clone());
    }
}

fn insert_all(sequence: &[Statement], out: &mut BTreeSet<PathIndex>) {
    for statement in statements(sequence) {
        out.insert(statement.path.clone());
    }
}

/// Statements that may execute from `path` onward, including `path` itself.
///
/// An empty path selects the whole sequence; a path past the end selects nothing
/// below the last resolvable ancestor.
pub fn start_from<'a>(sequence: &'a [Statement], path: &PathIndex) -> SequenceView<'a> {
    let mut members = BTreeSet::new();
    if path.is_empty() {
        insert_all(sequence, &mut members);
    } else {
        start_under(sequence, path.as_slice(), &mut members);
    }
    SequenceView::new(sequence, members)
}

fn start_under(sequence: &[Statement], path: &[usize], out: &mut BTreeSet<PathIndex>) {
    let Some((&head, tail)) = path.split_first() else {
        return;
    };
    let Some(anchor) = sequence.get(head) else {
        return;
    };

    out.insert(anchor.path.clone());
    if tail.is_empty() {
        insert_all(anchor.children(), out);
    } else {
        start_under(anchor.children(), tail, out);
    }

    let mut rest = sequence[head + 1..].iter().peekable();
    if anchor.branch().is_some() {
        // The remaining arms of this chain are exclusive with the anchor.
        while rest.next_if(|statement| statement.is_alternative()).is_some() {}
    }
    for statement in rest {
        insert_subtree(statement, out);
    }
}

/// Statements that may execute up to and including `path`.
///
/// An empty path or a path past the end selects everything before it.
pub fn stop_at<'a>(sequence: &'a [Statement], path: &PathIndex) -> SequenceView<'a> {
    let mut members = BTreeSet::new();
    stop_under(sequence, path.as_slice(), &mut members);
    SequenceView::new(sequence, members)
}

fn stop_under(sequence: &[Statement], path: &[usize], out: &mut BTreeSet<PathIndex>) {
    let Some((&head, tail)) = path.split_first() else {
        insert_all(sequence, out);
        return;
    };
    let Some(anchor) = sequence.get(head) else {
        insert_all(sequence, out);
        return;
    };

    // Earlier arms of the anchor's own chain cannot have run.
    let excluded = match anchor.branch() {
        Some(branch) if anchor.is_alternative() => branch.parent_if.map(|first| first..head),
        _ => None,
    };
    for (position, statement) in sequence[..head].iter().enumerate() {
        if excluded.as_ref().is_some_and(|range| range.contains(&position)) {
            continue;
        }
        insert_subtree(statement, out);
    }

    out.insert(anchor.path.clone());
    if tail.is_empty() {
        insert_all(anchor.children(), out);
    } else {
        stop_under(anchor.children(), tail, out);
    }
}

/// Statements that may execute after `start` and up to `stop`.
///
/// Arms exclusive with either endpoint are excluded, so two points in different
/// arms of one chain share only their common ancestors.
pub fn between<'a>(sequence: &'a [Statement], start: &PathIndex, stop: &PathIndex) -> SequenceView<'a> {
    let after = start_from(sequence, start);
    let before = stop_at(sequence, stop);
    let members = after
        .members
        .intersection(&before.members)
        .cloned()
        .collect();
    SequenceView::new(sequence, members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Branch, StatementKind};
    use crate::parser::assign_paths;

    fn leaf(id: i64) -> Statement {
        Statement::new(StatementKind::Other { node_type: "Break".into() }, Some(id), None)
    }

    fn arm(kind: fn(Branch) -> StatementKind, id: i64, body: Vec<Statement>) -> Statement {
        Statement::new(
            kind(Branch {
                conditions: vec![],
                true_body: body,
                parent_if: None,
            }),
            Some(id),
            None,
        )
    }

    /// 0: s1
    /// 1: if      { 1,0: s11  1,1: s12 }
    /// 2: else if { 2,0: s21 }
    /// 3: else    { 3,0: s31  3,1: s32 }
    /// 4: s4
    fn chain() -> Vec<Statement> {
        let mut sequence = vec![
            leaf(1),
            arm(StatementKind::If, 10, vec![leaf(11), leaf(12)]),
            arm(StatementKind::ElseIf, 20, vec![leaf(21)]),
            arm(StatementKind::Else, 30, vec![leaf(31), leaf(32)]),
            leaf(4),
        ];
        assign_paths(&mut sequence);
        sequence
    }

    fn ids(view: &SequenceView<'_>) -> Vec<i64> {
        view.iter().filter_map(|s| s.id).collect()
    }

    fn path(p: &[usize]) -> PathIndex {
        PathIndex::new(p.to_vec())
    }

    #[test]
    fn test_start_inside_if_skips_other_arms() {
        let sequence = chain();
        let view = start_from(&sequence, &path(&[1, 1]));
        assert_eq!(ids(&view), vec![10, 12, 4]);
    }

    #[test]
    fn test_start_at_top_level() {
        let sequence = chain();
        assert_eq!(ids(&start_from(&sequence, &path(&[4]))), vec![4]);
        assert_eq!(ids(&start_from(&sequence, &path(&[0]))).len(), 10);
        assert!(start_from(&sequence, &path(&[9])).is_empty());
    }

    #[test]
    fn test_stop_inside_else_drops_earlier_arms() {
        let sequence = chain();
        let view = stop_at(&sequence, &path(&[3, 0]));
        assert_eq!(ids(&view), vec![1, 30, 31]);
    }

    #[test]
    fn test_stop_inside_if_keeps_preceding() {
        let sequence = chain();
        let view = stop_at(&sequence, &path(&[1, 0]));
        assert_eq!(ids(&view), vec![1, 10, 11]);
    }

    #[test]
    fn test_between_same_arm() {
        let sequence = chain();
        let view = between(&sequence, &path(&[0]), &path(&[1, 1]));
        assert_eq!(ids(&view), vec![1, 10, 11, 12]);
    }

    #[test]
    fn test_between_exclusive_arms_is_empty() {
        let sequence = chain();
        let view = between(&sequence, &path(&[1, 0]), &path(&[3, 1]));
        assert!(view.is_empty());
    }

    #[test]
    fn test_between_nested_shares_ancestors() {
        let mut sequence = vec![arm(
            StatementKind::If,
            1,
            vec![
                arm(StatementKind::If, 2, vec![leaf(3)]),
                arm(StatementKind::Else, 4, vec![leaf(5)]),
            ],
        )];
        assign_paths(&mut sequence);
        let view = between(&sequence, &path(&[0, 0, 0]), &path(&[0, 1, 0]));
        assert_eq!(ids(&view), vec![1]);
    }

    #[test]
    fn test_to_sequence_prunes() {
        let sequence = chain();
        let pruned = between(&sequence, &path(&[0]), &path(&[1, 0])).to_sequence();
        assert_eq!(pruned.len(), 2);
        assert_eq!(pruned[1].children().len(), 1);
        assert_eq!(pruned[1].children()[0].id, Some(11));
    }
}
