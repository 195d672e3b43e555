//! Computes and seeds the `=>` alignment padding used when rendering constraints.
//!
//! The original recovers each constraint's type name width by scanning its own already-rendered
//! output with a `^(\S+) => ` regex. This crate keeps the constraint's type name as structured
//! data all the way through, so the same alignment can be computed directly from the tree before
//! any rendering happens, with no regex and no render-then-rescan round trip.

use cfmt_parsing::{BlockKind, Node, Promise, PromiseType};

/// Call once after parsing (and, in practice, after [`crate::comments::distribute_comments`]) and
/// before rendering. Sets `Promise::max_type_len` and `Constraint::assign_indent` throughout.
pub fn seed_alignment(node: &mut Node) {
    match node {
        Node::Specification(spec) => {
            for item in &mut spec.items {
                seed_alignment(item);
            }
        }
        Node::Block(block) => {
            let Node::List(list) = block.child_list.as_mut() else {
                return;
            };
            match block.kind {
                BlockKind::Body => seed_selection_list(&mut list.items),
                BlockKind::Bundle | BlockKind::Other => {
                    for item in &mut list.items {
                        if let Node::PromiseType(promise_type) = item {
                            seed_promise_type(promise_type);
                        }
                    }
                }
            }
        }
        _ => {}
    }
}

fn seed_promise_type(promise_type: &mut PromiseType) {
    let Node::List(class_promise_list) = promise_type.class_promise_list.as_mut() else {
        return;
    };
    for item in &mut class_promise_list.items {
        if let Node::Promise(promise) = item {
            seed_promise(promise);
        }
    }
}

fn seed_promise(promise: &mut Promise) {
    let Node::List(constraints) = promise.constraints.as_mut() else {
        return;
    };

    let max_len = constraints
        .items
        .iter()
        .filter_map(constraint_type_name_len)
        .max()
        .unwrap_or(0);
    promise.max_type_len = max_len;

    for item in &mut constraints.items {
        if let Node::Constraint(constraint) = item {
            let len = constraint
                .type_name
                .as_string_leaf()
                .map(|leaf| leaf.text.chars().count())
                .unwrap_or(0);
            constraint.assign_indent = max_len.saturating_sub(len);
        }
    }
}

/// A body's `ClassSelectionList` is flat (no per-promise-type scoping), so every `Selection`
/// across the whole list shares one alignment column, per the invariant in the data model.
fn seed_selection_list(items: &mut [Node]) {
    let max_len = items.iter().filter_map(constraint_type_name_len).max().unwrap_or(0);
    for item in items {
        if let Node::Constraint(constraint) = item {
            let len = constraint
                .type_name
                .as_string_leaf()
                .map(|leaf| leaf.text.chars().count())
                .unwrap_or(0);
            constraint.assign_indent = max_len.saturating_sub(len);
        }
    }
}

fn constraint_type_name_len(item: &Node) -> Option<usize> {
    match item {
        Node::Constraint(c) => c.type_name.as_string_leaf().map(|leaf| leaf.text.chars().count()),
        _ => None,
    }
}
