//! The generic list rendering engine. Every bracketed or virtual list in the tree (an `rlist`
//! literal, a function's argument list, a bundle's promise types, a body's selections, a promise
//! type's classes and promises) goes through [`render_list`] with a [`ListArgs`] record and a
//! per-item [`ItemPlacement`] describing where each item lands.

use cfmt_parsing::{ListKind, ListNode, Node};

use crate::layout::{join_lines, place_at_depth, Line, LayoutOptions, TriState, TAB_SIZE};

/// The brackets, separators and empty-list rendering for one list instance. Unlike the original's
/// per-list-kind `depth_fn`/`respects_preceding_empty_line_fn` closures, this crate precomputes
/// both as a `Vec<ItemPlacement>` up front (see [`fixed_depths`] and [`class_item_depths`]) — the
/// logic reads the same, it is just evaluated eagerly instead of lazily per item.
pub struct ListArgs {
    pub start: Vec<Line>,
    pub end: Vec<Line>,
    pub empty: Vec<Line>,
    pub join_by: Vec<Line>,
    pub terminator: String,
    pub end_terminator: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ItemPlacement {
    pub depth: usize,
    pub respects_preceding_empty_line: TriState,
}

impl ItemPlacement {
    fn plain(depth: usize) -> Self {
        Self {
            depth,
            respects_preceding_empty_line: TriState::Inherit,
        }
    }
}

/// Renders a list's items against the given args and per-item placements. `placements` must have
/// exactly one entry per `list.items`.
pub fn render_list(
    list: &ListNode,
    args: &ListArgs,
    placements: &[ItemPlacement],
    options: &LayoutOptions,
    render_item: impl Fn(&Node, &LayoutOptions) -> Vec<Line>,
) -> Vec<Line> {
    if list.items.is_empty() {
        return join_lines([args.start.clone(), args.empty.clone(), args.end.clone()]);
    }

    let last_index = list.items.len() - 1;
    let mut body: Vec<Line> = vec![];

    for (i, item) in list.items.iter().enumerate() {
        if i > 0 {
            body = join_lines([body, args.join_by.clone()]);
        }

        let placement = placements[i];
        let child_options = options
            .child(&[placement.depth])
            .with_respects_preceding_empty_line(placement.respects_preceding_empty_line);

        let mut item_lines = render_item(item, &child_options);
        if !item.is_comment() {
            let terminator = if i == last_index {
                &args.end_terminator
            } else {
                &args.terminator
            };
            if let Some(last) = item_lines.last_mut() {
                last.text.push_str(terminator);
            }
        }

        body.extend(place_at_depth(item_lines, placement.depth));
    }

    join_lines([args.start.clone(), body, args.end.clone()])
}

/// Whether this list qualifies for an inline, comma-joined rendering at all. An `rlist`/argument
/// list that carries any comment — attached or as a bare item — always breaks one item per line,
/// since a comment cannot share a line with whatever follows it.
pub fn is_inlinable(list: &ListNode) -> bool {
    list.items.iter().all(|item| {
        !item.is_comment() && item.meta().map_or(true, |meta| meta.comments.is_empty())
    })
}

/// `List` (an `rlist`/`slist` literal: `{ "a", "b" }`) and `ArgumentList` (`(a, b)`) share the same
/// brace/paren shape; they differ only in delimiter and in whether an empty call may drop its
/// parens.
pub fn brace_list_args(open: &str, close: &str, empty: Vec<Line>) -> ListArgs {
    ListArgs {
        start: vec![Line::new(open)],
        end: vec![Line::new(close)],
        empty,
        join_by: vec![],
        terminator: ",".to_string(),
        end_terminator: ",".to_string(),
    }
}

/// A single-item inline candidate record for an otherwise braced list: `{ item }` rather than
/// `{\n    item,\n}`. Offered only when the list is inlinable and has exactly one item (the
/// original's own rule — a multi-item list always breaks one item per line regardless of width).
pub fn inline_brace_args(open: &str, close: &str) -> ListArgs {
    ListArgs {
        start: vec![Line::new(format!("{open} "))],
        end: vec![Line::new(format!(" {close}"))],
        empty: vec![],
        join_by: vec![],
        terminator: String::new(),
        end_terminator: String::new(),
    }
}

/// All items of a `PromiseTypeList` (a bundle's direct children: `PromiseType` and stray
/// top-level comments) sit one tab in from the bundle's own `{`.
pub fn promise_type_list_args() -> ListArgs {
    ListArgs {
        start: vec![],
        end: vec![],
        empty: vec![],
        join_by: vec![],
        terminator: String::new(),
        end_terminator: String::new(),
    }
}

pub fn fixed_depths(count: usize, depth: usize) -> Vec<ItemPlacement> {
    vec![ItemPlacement::plain(depth); count]
}

/// Depth policy for `ClassPromiseList` (items: `Class`, `Promise`, `Comment`) and, with
/// `promise_like` swapped for `Selection` and `default_depth = TAB_SIZE`, for `ClassSelectionList`.
///
/// - `Class` -> one tab.
/// - a promise-like item -> two tabs.
/// - `Comment` -> two tabs if the nearest preceding `Class`-or-promise-like sibling (scanning
///   backwards) is promise-like, or if there is no such sibling at all; otherwise compared against
///   `default_depth` using the comment's own original source indentation.
///
/// Additionally, the item immediately after a `Class` never respects its own preceding blank line
/// — a blank line right after a class guard reads as separating the guard from its body, not as
/// a deliberate gap the author wants preserved.
pub fn class_item_depths(
    items: &[Node],
    promise_like: impl Fn(&Node) -> bool,
    default_depth: usize,
) -> Vec<ItemPlacement> {
    let mut placements = Vec::with_capacity(items.len());

    for (i, item) in items.iter().enumerate() {
        let depth = match item {
            Node::Class(_) => TAB_SIZE,
            Node::Comment(comment) => {
                let mut nearest_is_promise_like = true;
                for earlier in items[..i].iter().rev() {
                    if matches!(earlier, Node::Class(_)) {
                        nearest_is_promise_like = false;
                        break;
                    }
                    if promise_like(earlier) {
                        nearest_is_promise_like = true;
                        break;
                    }
                }
                if nearest_is_promise_like {
                    TAB_SIZE * 2
                } else if comment.original_indentation <= TAB_SIZE * default_depth {
                    TAB_SIZE
                } else {
                    TAB_SIZE * 2
                }
            }
            _ => TAB_SIZE * 2,
        };

        let respects_preceding_empty_line = if i > 0 && matches!(items[i - 1], Node::Class(_)) {
            TriState::No
        } else {
            TriState::Inherit
        };

        placements.push(ItemPlacement {
            depth,
            respects_preceding_empty_line,
        });
    }

    placements
}
