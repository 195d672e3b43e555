//! Distributes comments that the parser left as plain `Node::Comment` items, interleaved in
//! parse order inside every list, onto the nodes they actually annotate.
//!
//! The parser already does the equivalent of the original's "Insert" policy: a standalone comment
//! is emitted as its own item in the surrounding list, in source position, rather than being
//! bundled onto a neighbour up front. What is left to do here is the per-node *adoption* pass: an
//! end-of-line comment (one with no line break between it and whatever came before) almost always
//! belongs to the item immediately preceding it on the same physical line, so it is folded into
//! that item's `comments` rather than rendered as a sibling line.

use cfmt_parsing::{CommentAffinity, Node};

/// Recursively walks the tree, merging end-of-line comments into their preceding sibling at every
/// list. Call once after parsing and before running structural transforms or rendering.
pub fn distribute_comments(node: &mut Node) {
    match node {
        Node::Specification(spec) => {
            adopt_comments_in_place(&mut spec.items);
            for item in &mut spec.items {
                distribute_comments(item);
            }
        }
        Node::Block(block) => {
            if let Some(args) = &mut block.args {
                distribute_comments(args);
            }
            distribute_comments(&mut block.child_list);
        }
        Node::PromiseType(promise_type) => {
            distribute_comments(&mut promise_type.class_promise_list);
        }
        Node::Promise(promise) => {
            distribute_comments(&mut promise.constraints);
        }
        Node::Constraint(constraint) => {
            distribute_comments(&mut constraint.value);
        }
        Node::Function(call) => {
            distribute_comments(&mut call.args);
        }
        Node::List(list) => {
            adopt_comments_in_place(&mut list.items);
            for item in &mut list.items {
                distribute_comments(item);
            }
        }
        Node::Class(_) | Node::StringLeaf(_) | Node::Comment(_) => {}
    }
}

fn adopt_comments_in_place(items: &mut Vec<Node>) {
    demote_open_brace_comment(items);

    let mut i = 0;
    while i < items.len() {
        let is_trailing_end_of_line_comment = i > 0
            && matches!(&items[i], Node::Comment(comment) if comment.is_end_of_line());

        if !is_trailing_end_of_line_comment {
            i += 1;
            continue;
        }

        let preceding_allows_it = items[i - 1]
            .meta()
            .map_or(true, |meta| meta.allows_end_of_line_comments);

        if preceding_allows_it {
            if let Node::Comment(mut comment) = items.remove(i) {
                comment.priority = 1;
                if let Some(meta) = items[i - 1].meta_mut() {
                    meta.comments.push(comment);
                }
            }
            // don't advance i: items[i] is now whatever followed the removed comment
        } else {
            // the preceding node can't carry an end-of-line comment (e.g. a block's closing
            // brace line): demote it to standalone so it still renders, just on its own line.
            if let Node::Comment(comment) = &mut items[i] {
                comment.affinity = CommentAffinity::Standalone;
            }
            i += 1;
        }
    }
}

/// If the very first item is an end-of-line comment (the "of the open brace" case: `foo: { #
/// note`) and the next item is a standalone comment, the first is demoted to standalone so the
/// two comments render in source order instead of the first looking like it trails whatever
/// precedes the whole list.
fn demote_open_brace_comment(items: &mut [Node]) {
    if items.len() < 2 {
        return;
    }
    let first_is_eol = matches!(&items[0], Node::Comment(c) if c.is_end_of_line());
    let second_is_standalone = matches!(&items[1], Node::Comment(c) if c.is_standalone());
    if first_is_eol && second_is_standalone {
        if let Node::Comment(comment) = &mut items[0] {
            comment.affinity = CommentAffinity::Standalone;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use cfmt_parsing::parse;
    use pretty_assertions::assert_eq;

    fn promise_type_list(tree: &Node) -> &cfmt_parsing::ListNode {
        let Node::Specification(spec) = tree else {
            panic!("expected a specification")
        };
        let Node::Block(block) = &spec.items[0] else {
            panic!("expected a block")
        };
        let Node::List(list) = block.child_list.as_ref() else {
            panic!("expected a promise type list")
        };
        list
    }

    #[test]
    fn folds_a_trailing_comment_into_its_preceding_sibling() {
        let mut tree = parse(
            "bundle agent main {\nvars:\n  \"x\" string => \"y\"; # trailing\n}\n",
        )
        .unwrap();
        distribute_comments(&mut tree);

        let list = promise_type_list(&tree);
        let Node::PromiseType(vars) = &list.items[0] else {
            panic!("expected a promise type")
        };
        let Node::List(class_promise_list) = vars.class_promise_list.as_ref() else {
            panic!("expected a class/promise list")
        };
        assert_eq!(class_promise_list.items.len(), 1);
        let Node::Promise(promise) = &class_promise_list.items[0] else {
            panic!("expected a promise")
        };
        assert_eq!(promise.meta.comments.len(), 1);
        assert_eq!(promise.meta.comments[0].text_lines[0], "trailing");
    }

    #[test]
    fn keeps_a_standalone_comment_as_its_own_item() {
        let mut tree = parse(
            "bundle agent main {\nvars:\n  # a header\n  \"x\" string => \"y\";\n}\n",
        )
        .unwrap();
        distribute_comments(&mut tree);

        let list = promise_type_list(&tree);
        let Node::PromiseType(vars) = &list.items[0] else {
            panic!("expected a promise type")
        };
        let Node::List(class_promise_list) = vars.class_promise_list.as_ref() else {
            panic!("expected a class/promise list")
        };
        assert_eq!(class_promise_list.items.len(), 2);
        assert!(class_promise_list.items[0].is_comment());
        assert!(matches!(class_promise_list.items[1], Node::Promise(_)));
    }
}
