//! Structural transforms applied to a bundle's `PromiseTypeList` after parsing: dropping promise
//! types with nothing in them, and reordering promise types into CFEngine's fixed evaluation
//! order while keeping any interleaved comments glued to the item they originally preceded.

use cfmt_parsing::{ListKind, Node};

/// The order CFEngine itself evaluates promise types in, regardless of their order in source.
/// Promise types not named here sort after all of these, keeping their relative order.
pub const EVALUATION_ORDER: &[&str] = &[
    "meta",
    "vars",
    "defaults",
    "classes",
    "users",
    "files",
    "packages",
    "guest_environments",
    "methods",
    "processes",
    "services",
    "commands",
    "storage",
    "databases",
    "access",
    "roles",
    "measurements",
    "delete_lines",
    "field_edits",
    "insert_lines",
    "replace_patterns",
    "reports",
];

fn evaluation_rank(name: &str) -> usize {
    EVALUATION_ORDER
        .iter()
        .position(|candidate| *candidate == name)
        .unwrap_or(EVALUATION_ORDER.len())
}

/// Drops any `PromiseType` with no items and no attached comments on itself. Only meaningful on a
/// bundle's `PromiseTypeList`; bodies have no promise-type layer to prune.
pub fn remove_empty_promise_types(node: &mut Node) {
    visit_promise_type_lists(node, |list| {
        list.items.retain(|item| match item {
            Node::PromiseType(promise_type) => {
                let has_comments = !promise_type.meta.comments.is_empty();
                let has_children = match promise_type.class_promise_list.as_ref() {
                    Node::List(inner) => !inner.items.is_empty(),
                    _ => true,
                };
                let keep = has_children || has_comments;
                if !keep {
                    log::debug!(
                        "dropping empty promise type {:?}",
                        promise_type.name.as_string_leaf().map(|leaf| leaf.text.as_str())
                    );
                }
                keep
            }
            _ => true,
        });
    });
}

/// Stably sorts `PromiseType` items into `EVALUATION_ORDER`, re-threading each comment so it still
/// immediately precedes whatever item originally followed it (or sits at the end, if it was
/// trailing). Comments are never reordered relative to each other or moved across a promise type
/// boundary on their own; only the promise types move.
pub fn sort_to_evaluation_order(node: &mut Node) {
    visit_promise_type_lists(node, |list| {
        // Record, for each comment's original index, the index of the item it preceded (or
        // `items.len()` if it was trailing), so it can be reattached after the promise types move.
        let mut anchors: Vec<(Node, usize)> = vec![];
        let mut promise_types: Vec<Node> = vec![];

        let mut i = 0;
        while i < list.items.len() {
            if list.items[i].is_comment() {
                // Find the next non-comment item's eventual new position by remembering how many
                // promise types precede it in the *original* order; we translate that to a new
                // anchor once promise_types is stably sorted below, keyed by original identity
                // via insertion index recorded as `promise_types.len()` at encounter time.
                anchors.push((list.items.remove(i), promise_types.len()));
                continue;
            }
            promise_types.push(list.items.remove(i));
        }

        let mut indexed: Vec<(usize, Node)> = promise_types.into_iter().enumerate().collect();
        indexed.sort_by_key(|(original_index, item)| {
            let rank = match item {
                Node::PromiseType(promise_type) => {
                    evaluation_rank(&promise_type.name.as_string_leaf().unwrap().text)
                }
                _ => EVALUATION_ORDER.len(),
            };
            (rank, *original_index)
        });

        // Map original promise-type index -> new index, so anchors can be retargeted.
        let mut new_index_of_original = vec![0usize; indexed.len()];
        for (new_index, (original_index, _)) in indexed.iter().enumerate() {
            new_index_of_original[*original_index] = new_index;
        }

        let mut result: Vec<Node> = indexed.into_iter().map(|(_, item)| item).collect();

        // Reinsert comments in reverse original order so repeated inserts at the same target
        // index keep multi-comment runs in their original relative order.
        for (comment, original_anchor) in anchors.into_iter().rev() {
            let target = if original_anchor >= new_index_of_original.len() {
                result.len()
            } else {
                new_index_of_original[original_anchor]
            };
            result.insert(target.min(result.len()), comment);
        }

        list.items = result;
    });
}

fn visit_promise_type_lists(node: &mut Node, mut f: impl FnMut(&mut cfmt_parsing::ListNode) + Clone) {
    match node {
        Node::Specification(spec) => {
            for item in &mut spec.items {
                visit_promise_type_lists(item, f.clone());
            }
        }
        Node::Block(block) => {
            if let Node::List(list) = block.child_list.as_mut() {
                if list.kind == ListKind::PromiseTypeList {
                    f(list);
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use cfmt_parsing::parse;
    use pretty_assertions::assert_eq;

    fn promise_type_names(node: &Node) -> Vec<String> {
        let Node::Specification(spec) = node else {
            panic!("expected a specification")
        };
        let Node::Block(block) = &spec.items[0] else {
            panic!("expected a block")
        };
        let Node::List(list) = block.child_list.as_ref() else {
            panic!("expected a promise type list")
        };
        list.items
            .iter()
            .filter_map(|item| match item {
                Node::PromiseType(promise_type) => {
                    Some(promise_type.name.as_string_leaf().unwrap().text.clone())
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn sorts_promise_types_into_evaluation_order() {
        let mut tree = parse(
            "bundle agent main {\nreports:\n  \"late\";\nvars:\n  \"x\" string => \"y\";\nclasses:\n  \"c\" expression => \"d\";\n}\n",
        )
        .unwrap();
        sort_to_evaluation_order(&mut tree);
        assert_eq!(promise_type_names(&tree), vec!["vars", "classes", "reports"]);
    }

    #[test]
    fn leaves_unranked_promise_types_in_relative_order_after_ranked_ones() {
        let mut tree = parse(
            "bundle agent main {\nmade_up_type:\n  \"x\";\nvars:\n  \"y\" string => \"z\";\n}\n",
        )
        .unwrap();
        sort_to_evaluation_order(&mut tree);
        assert_eq!(promise_type_names(&tree), vec!["vars", "made_up_type"]);
    }

    #[test]
    fn removes_promise_types_with_no_promises_and_no_comments() {
        let mut tree = parse(
            "bundle agent main {\nvars:\nclasses:\n  \"c\" expression => \"d\";\n}\n",
        )
        .unwrap();
        remove_empty_promise_types(&mut tree);
        assert_eq!(promise_type_names(&tree), vec!["classes"]);
    }

    #[test]
    fn keeps_an_empty_promise_type_that_carries_a_comment() {
        let mut tree =
            parse("bundle agent main {\nvars: # still here\nclasses:\n  \"c\" expression => \"d\";\n}\n")
                .unwrap();
        remove_empty_promise_types(&mut tree);
        assert_eq!(promise_type_names(&tree), vec!["vars", "classes"]);
    }
}
