use std::fmt::{self, Display, Formatter};

use cfmt_parsing::Node;

/// Renders a parenthesized, s-expression-style dump of the tree, for the `--tree` debugging flag.
pub fn format_tree(out: &mut Formatter, node: &Node) -> Result<(), fmt::Error> {
    format_node(out, node, 0)
}

fn format_node(out: &mut Formatter, node: &Node, depth: u16) -> Result<(), fmt::Error> {
    macro_rules! indent {
        () => {
            for _ in 0..depth {
                write!(out, "  ")?;
            }
        };
    }

    writeln!(out)?;
    indent!();

    match node {
        Node::Specification(spec) => {
            write!(out, "(specification")?;
            for item in &spec.items {
                format_node(out, item, depth + 1)?;
            }
            write!(out, ")")?;
        }
        Node::Block(block) => {
            write!(out, "({:?} {:?}", block.kind, block.keyword_text)?;
            format_node(out, &block.block_type, depth + 1)?;
            format_node(out, &block.name, depth + 1)?;
            if let Some(args) = &block.args {
                format_node(out, args, depth + 1)?;
            }
            format_node(out, &block.child_list, depth + 1)?;
            write!(out, ")")?;
        }
        Node::PromiseType(promise_type) => {
            write!(out, "(promise_type")?;
            format_node(out, &promise_type.name, depth + 1)?;
            format_node(out, &promise_type.class_promise_list, depth + 1)?;
            write!(out, ")")?;
        }
        Node::Class(class) => {
            write!(out, "(class")?;
            format_node(out, &class.expression, depth + 1)?;
            write!(out, ")")?;
        }
        Node::Promise(promise) => {
            write!(out, "(promise")?;
            format_node(out, &promise.promiser, depth + 1)?;
            if let Some(promisee) = &promise.promisee {
                format_node(out, promisee, depth + 1)?;
            }
            format_node(out, &promise.constraints, depth + 1)?;
            write!(out, ")")?;
        }
        Node::Constraint(constraint) => {
            write!(out, "({}", if constraint.is_selection { "selection" } else { "constraint" })?;
            format_node(out, &constraint.type_name, depth + 1)?;
            format_node(out, &constraint.value, depth + 1)?;
            write!(out, ")")?;
        }
        Node::Function(call) => {
            write!(out, "(call")?;
            format_node(out, &call.name, depth + 1)?;
            format_node(out, &call.args, depth + 1)?;
            write!(out, ")")?;
        }
        Node::StringLeaf(leaf) => {
            write!(out, "{:?}", leaf.text)?;
        }
        Node::Comment(comment) => {
            write!(out, "(comment {:?})", comment.text_lines.join(" "))?;
        }
        Node::List(list) => {
            write!(out, "({:?}", list.kind)?;
            for item in &list.items {
                format_node(out, item, depth + 1)?;
            }
            write!(out, ")")?;
        }
    }

    Ok(())
}

pub struct DebugTree<'a>(pub &'a Node);

impl Display for DebugTree<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        format_tree(f, self.0)
    }
}
