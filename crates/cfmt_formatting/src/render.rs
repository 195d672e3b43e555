//! Turns a distributed, alignment-seeded tree into `Line`s, variant by variant. This is the
//! `lines(options)` method the rest of the engine keeps referring to; here it is a free function
//! dispatching on `Node` rather than a trait method, since `Node` is a closed enum with no need
//! for dynamic dispatch.

use cfmt_parsing::{
    Block, BlockKind, Class, Comment, Constraint, FunctionCall, ListKind, ListNode, Node,
    Promise, PromiseType, Specification,
};

use crate::layout::{
    first_that_fits, join_lines, place_at_depth, text_line, Line, LayoutOptions, TAB_SIZE,
};
use crate::lists::{
    brace_list_args, class_item_depths, fixed_depths, inline_brace_args, is_inlinable,
    promise_type_list_args, render_list, ItemPlacement,
};

/// Constraint type names whose value can never be a bareword bundle/body reference, so their
/// value never gets to drop the parens of an empty argument list.
const KNOWN_VALUE_TYPES: &[&str] = &[
    "ifvarclass", "int", "real", "string", "data", "ilist", "slist", "rlist",
];

pub fn lines(node: &Node, options: &LayoutOptions) -> Vec<Line> {
    if let Node::Comment(comment) = node {
        let mut result = vec![];
        if comment.preceded_by_empty_line && options.respects_preceding_empty_line.resolve(true) {
            result.push(Line::blank());
        }
        result.extend(comment.text_lines.iter().map(|text| Line::new(format_comment_line(text))));
        return result;
    }

    let meta = node.meta().expect("every non-Comment node carries NodeMeta");

    let mut result = vec![];
    if meta.preceded_by_empty_line
        && options
            .respects_preceding_empty_line
            .resolve(meta.respects_preceding_empty_line)
    {
        result.push(Line::blank());
    }

    let (tail_comment, standalone_comments) = select_comments(&meta.comments);
    for comment in standalone_comments {
        for text in &comment.text_lines {
            result.push(Line::new(format_comment_line(text)));
        }
    }

    let body = body_lines(node, options);
    let body = match tail_comment {
        Some(comment) => attach_tail_comment(body, comment),
        None => body,
    };
    result.extend(body);
    result
}

/// Picks the end-of-line comment with the highest priority as the tail comment rendered on the
/// body's last line; everything else renders as its own standalone line ahead of the body. In
/// practice a node rarely carries more than one comment at all, since the parser only merges a
/// single trailing end-of-line comment per item.
fn select_comments(comments: &[Comment]) -> (Option<&Comment>, Vec<&Comment>) {
    let mut tail: Option<&Comment> = None;
    let mut rest = vec![];
    for comment in comments {
        if !comment.is_end_of_line() {
            rest.push(comment);
            continue;
        }
        match tail {
            Some(current) if current.priority >= comment.priority => rest.push(comment),
            Some(current) => {
                rest.push(current);
                tail = Some(comment);
            }
            None => tail = Some(comment),
        }
    }
    (tail, rest)
}

fn attach_tail_comment(mut body: Vec<Line>, comment: &Comment) -> Vec<Line> {
    let comment_line = Line::new(format_comment_line(&comment.text_lines.join(" ")));
    match body.last_mut() {
        Some(last) => last.end_comments.push(comment_line),
        None => body.push(Line::new("").with_end_comment(comment_line)),
    }
    body
}

/// `#foo` normalizes to `# foo`; a line already starting with `#`, `-` or `=` right after the
/// hash (`##section`, `#- - - -`, `#=====`) is left exactly as written.
fn format_comment_line(text: &str) -> String {
    match text.chars().next() {
        Some(c) if matches!(c, '#' | '-' | '=') => format!("#{text}"),
        _ => format!("# {text}"),
    }
}

fn body_lines(node: &Node, options: &LayoutOptions) -> Vec<Line> {
    match node {
        Node::Comment(_) => unreachable!("Node::Comment is handled in lines() before body_lines"),
        Node::StringLeaf(leaf) => text_line(leaf.text.clone()),
        Node::Specification(spec) => render_specification(spec, options),
        Node::Block(block) => render_block(block, options),
        Node::PromiseType(promise_type) => render_promise_type(promise_type, options),
        Node::Class(class) => render_class(class, options),
        Node::Promise(promise) => render_promise(promise, options),
        Node::Constraint(constraint) => render_constraint(constraint, options),
        Node::Function(call) => render_function_call(call, options),
        Node::List(list) => render_list_node(list, options),
    }
}

fn render_specification(spec: &Specification, options: &LayoutOptions) -> Vec<Line> {
    let mut result = vec![];
    for item in &spec.items {
        result.extend(lines(item, options));
    }
    result
}

fn render_class(class: &Class, options: &LayoutOptions) -> Vec<Line> {
    let mut result = lines(&class.expression, options);
    if let Some(last) = result.last_mut() {
        last.text.push_str("::");
    }
    result
}

fn render_block(block: &Block, options: &LayoutOptions) -> Vec<Line> {
    let keyword = match block.kind {
        BlockKind::Bundle => "bundle",
        BlockKind::Body => "body",
        BlockKind::Other => block.keyword_text.as_str(),
    };

    let mut header = join_lines([
        text_line(format!("{keyword} ")),
        lines(&block.block_type, options),
        text_line(" "),
        lines(&block.name, options),
    ]);

    if let Some(args) = &block.args {
        let args_options = options.with_allow_braceless_argument_list(false);
        header = join_lines([header, lines(args, &args_options)]);
    }

    let mut result = header;
    if let Some(last) = result.last_mut() {
        last.text.push_str(" {");
    } else {
        result.push(Line::new("{"));
    }
    result.push(Line::blank());
    result.extend(lines(&block.child_list, options));
    result.push(Line::new("}"));
    result
}

fn render_promise_type(promise_type: &PromiseType, options: &LayoutOptions) -> Vec<Line> {
    let name = &promise_type
        .name
        .as_string_leaf()
        .expect("PromiseType.name is always a StringLeaf")
        .text;
    let mut result = vec![Line::new(format!("{name}:"))];

    let has_promises = promise_type
        .class_promise_list
        .as_list()
        .map_or(false, |list| list.items.iter().any(|item| matches!(item, Node::Promise(_))));
    if has_promises {
        result.push(Line::blank());
    }

    result.extend(lines(&promise_type.class_promise_list, options));
    result
}

fn render_promise(promise: &Promise, options: &LayoutOptions) -> Vec<Line> {
    let promiser_lines = lines(&promise.promiser, options);

    let promiser_and_promisee = match &promise.promisee {
        Some(promisee) => {
            let promisee_lines = lines(promisee, options);
            let inline = join_lines([promiser_lines.clone(), text_line(" -> "), promisee_lines.clone()]);

            let mut broken = promiser_lines.clone();
            let tail = join_lines([text_line("-> "), promisee_lines]);
            broken.extend(place_at_depth(tail, TAB_SIZE));

            first_that_fits(
                options,
                vec![
                    Box::new(move |_: &LayoutOptions| inline.clone()) as Box<dyn FnOnce(&LayoutOptions) -> Vec<Line>>,
                    Box::new(move |_: &LayoutOptions| broken.clone()),
                ],
            )
        }
        None => promiser_lines,
    };

    let Node::List(constraint_list) = promise.constraints.as_ref() else {
        unreachable!("Promise.constraints is always a Node::List")
    };

    if constraint_list.items.is_empty() {
        let mut result = promiser_and_promisee;
        if let Some(last) = result.last_mut() {
            last.text.push(';');
        }
        return result;
    }

    // Historical note, preserved from the original: a true single-line `promiser type => value;`
    // form was considered and rejected because it did not honour `assign_indent`.
    let single_constraint_without_comments = promise.promisee.is_none()
        && constraint_list.items.len() == 1
        && matches!(&constraint_list.items[0], Node::Constraint(c) if c.meta.comments.is_empty());

    let constraint_options = options.child(&[TAB_SIZE]);
    let mut result = promiser_and_promisee;

    if single_constraint_without_comments {
        let mut constraint_lines = lines(&constraint_list.items[0], &constraint_options);
        if let Some(last) = constraint_lines.last_mut() {
            last.text.push(';');
        }
        result.extend(place_at_depth(constraint_lines, TAB_SIZE));
        return result;
    }

    let last_index = constraint_list.items.len() - 1;
    for (i, item) in constraint_list.items.iter().enumerate() {
        let mut item_lines = lines(item, &constraint_options);
        if !item.is_comment() {
            let terminator = if i == last_index { ';' } else { ',' };
            if let Some(last) = item_lines.last_mut() {
                last.text.push(terminator);
            }
        }
        result.extend(place_at_depth(item_lines, TAB_SIZE));
    }
    result
}

fn render_constraint(constraint: &Constraint, options: &LayoutOptions) -> Vec<Line> {
    let type_lines = lines(&constraint.type_name, options);
    let pad = " ".repeat(constraint.assign_indent);

    let type_name_text = constraint.type_name.as_string_leaf().map(|leaf| leaf.text.as_str()).unwrap_or("");
    let allow_braceless = !constraint.is_selection && !KNOWN_VALUE_TYPES.contains(&type_name_text);

    let mut inline_prefix = type_lines.clone();
    let inline_depth = inline_prefix.last().map(Line::length).unwrap_or(0) + pad.len() + 4;
    if let Some(last) = inline_prefix.last_mut() {
        last.text.push_str(&format!("{pad} => "));
    }
    let inline_value_options = options.child(&[inline_depth]).with_allow_braceless_argument_list(allow_braceless);
    let inline = join_lines([inline_prefix, lines(&constraint.value, &inline_value_options)]);

    let mut candidates: Vec<Box<dyn FnOnce(&LayoutOptions) -> Vec<Line>>> =
        vec![Box::new(move |_: &LayoutOptions| inline.clone())];

    if options.may_line_break_constraint {
        let broken_depth = TAB_SIZE + constraint.assign_indent;
        let mut broken = type_lines;
        if let Some(last) = broken.last_mut() {
            last.text.push_str(&format!("{pad} =>"));
        }
        let broken_value_options =
            options.child(&[broken_depth]).with_allow_braceless_argument_list(allow_braceless);
        let value_lines = place_at_depth(lines(&constraint.value, &broken_value_options), broken_depth + 3);
        broken.extend(value_lines);
        candidates.push(Box::new(move |_: &LayoutOptions| broken.clone()));
    }

    let mut result = first_that_fits(options, candidates);
    if constraint.is_selection {
        if let Some(last) = result.last_mut() {
            last.text.push(';');
        }
    }
    result
}

fn render_function_call(call: &FunctionCall, options: &LayoutOptions) -> Vec<Line> {
    join_lines([lines(&call.name, options), lines(&call.args, options)])
}

fn render_list_node(list: &ListNode, options: &LayoutOptions) -> Vec<Line> {
    match list.kind {
        ListKind::List => render_brace_list(list, options, "{", "}"),
        ListKind::ArgumentList => render_brace_list(list, options, "(", ")"),
        ListKind::PromiseTypeList => {
            let placements = fixed_depths(list.items.len(), TAB_SIZE);
            render_list(list, &promise_type_list_args(), &placements, options, lines)
        }
        ListKind::ClassSelectionList => {
            let placements = class_item_depths(
                &list.items,
                |item| matches!(item, Node::Constraint(c) if c.is_selection),
                1,
            );
            render_list(list, &promise_type_list_args(), &placements, options, lines)
        }
        ListKind::ClassPromiseList => {
            let placements =
                class_item_depths(&list.items, |item| matches!(item, Node::Promise(_)), 2);
            render_list(list, &promise_type_list_args(), &placements, options, lines)
        }
        // Reached only by debug tree dumps; `render_promise` lays out a promise's own
        // `ConstraintList` directly so it can apply its one-constraint/no-constraint special
        // cases.
        ListKind::ConstraintList => {
            let placements = fixed_depths(list.items.len(), 0);
            render_list(list, &promise_type_list_args(), &placements, options, lines)
        }
    }
}

/// `List` (`{ "a", "b" }`) and `ArgumentList` (`(a, b)`) render identically except for the
/// delimiter and for whether an empty argument list may drop its parens entirely.
fn render_brace_list(list: &ListNode, options: &LayoutOptions, open: &str, close: &str) -> Vec<Line> {
    let is_argument_list = open == "(";

    if list.items.is_empty() {
        if is_argument_list && options.allow_braceless_argument_list {
            return text_line("");
        }
        return text_line(format!("{open}{close}"));
    }

    if is_inlinable(list) && list.items.len() == 1 {
        let placements = vec![ItemPlacement {
            depth: 0,
            respects_preceding_empty_line: crate::layout::TriState::Inherit,
        }];
        return render_list(list, &inline_brace_args(open, close), &placements, options, lines);
    }

    let placements = fixed_depths(list.items.len(), TAB_SIZE);
    render_list(list, &brace_list_args(open, close, vec![]), &placements, options, lines)
}

#[cfg(test)]
mod test {
    use super::*;
    use cfmt_parsing::{NodeMeta, Position, StringLeaf};
    use pretty_assertions::assert_eq;

    fn pos() -> Position {
        Position {
            start_line: 1,
            end_line: 1,
            start_byte: 0,
            end_byte: 0,
            parse_index: 0,
        }
    }

    fn string_leaf(text: impl Into<String>) -> Box<Node> {
        Box::new(Node::StringLeaf(StringLeaf::new(pos(), text)))
    }

    #[test]
    fn wraps_a_constraint_value_three_columns_past_the_arrow() {
        let constraint = Constraint {
            meta: NodeMeta::new(pos()),
            type_name: string_leaf("ifvarclass"),
            value: string_leaf("x".repeat(100)),
            is_selection: false,
            assign_indent: 0,
        };

        let lines = render_constraint(&constraint, &LayoutOptions::new(40));

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "ifvarclass =>");
        assert_eq!(lines[1].indent, Some(TAB_SIZE + 3));
    }

    #[test]
    fn renders_a_promise_with_no_constraints_as_a_bare_semicolon() {
        let promise = Promise {
            meta: NodeMeta::new(pos()),
            promiser: string_leaf("\"x\""),
            promisee: None,
            constraints: Box::new(Node::List(ListNode::new(pos(), ListKind::ConstraintList))),
            max_type_len: 0,
        };

        let lines = render_promise(&promise, &LayoutOptions::new(80));

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "\"x\";");
    }
}
