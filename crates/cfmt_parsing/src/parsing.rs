pub mod node;
mod parser;

pub use node::*;
pub use parser::{ParseError, Parser};

/// Parses a whole policy file into a `Specification`.
pub fn parse(source: &str) -> Result<Node, ParseError> {
    let mut parser = Parser::new(source.as_bytes())?;
    parser.parse_specification()
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_ok(source: &str) -> Node {
        parse(source).unwrap_or_else(|error| panic!("expected {source:?} to parse, got {error}"))
    }

    #[test]
    fn parses_minimal_bundle() {
        let spec = parse_ok("bundle agent main {\nvars:\n  \"x\" string => \"y\";\n}\n");
        let Node::Specification(spec) = spec else {
            panic!("expected a specification")
        };
        assert_eq!(spec.items.len(), 1);
        let Node::Block(block) = &spec.items[0] else {
            panic!("expected a block")
        };
        assert_eq!(block.kind, BlockKind::Bundle);
        assert_eq!(block.block_type.as_string_leaf().unwrap().text, "agent");
        assert_eq!(block.name.as_string_leaf().unwrap().text, "main");

        let Node::List(promise_types) = block.child_list.as_ref() else {
            panic!("expected a promise type list")
        };
        assert_eq!(promise_types.kind, ListKind::PromiseTypeList);
        assert_eq!(promise_types.items.len(), 1);

        let Node::PromiseType(vars) = &promise_types.items[0] else {
            panic!("expected a promise type")
        };
        assert_eq!(vars.name.as_string_leaf().unwrap().text, "vars");
    }

    #[test]
    fn parses_class_guard_and_promise_with_constraints() {
        let spec = parse_ok(
            "bundle agent main {\nvars:\n  linux::\n    \"x\" string => \"y\", policy => \"free\";\n}\n",
        );
        let Node::Specification(spec) = spec else {
            panic!("expected a specification")
        };
        let Node::Block(block) = &spec.items[0] else {
            panic!("expected a block")
        };
        let Node::List(promise_types) = block.child_list.as_ref() else {
            panic!("expected a promise type list")
        };
        let Node::PromiseType(vars) = &promise_types.items[0] else {
            panic!("expected a promise type")
        };
        let Node::List(class_promise_list) = vars.class_promise_list.as_ref() else {
            panic!("expected a class/promise list")
        };
        assert_eq!(class_promise_list.items.len(), 2);

        let Node::Class(class) = &class_promise_list.items[0] else {
            panic!("expected a class guard")
        };
        assert_eq!(class.expression.as_string_leaf().unwrap().text, "linux");

        let Node::Promise(promise) = &class_promise_list.items[1] else {
            panic!("expected a promise")
        };
        assert_eq!(promise.promiser.as_string_leaf().unwrap().text, "\"x\"");
        let Node::List(constraints) = promise.constraints.as_ref() else {
            panic!("expected a constraint list")
        };
        assert_eq!(constraints.items.len(), 2);
    }

    #[test]
    fn parses_parenthesized_compound_class_guard() {
        let spec = parse_ok(
            "bundle agent main {\nvars:\n  (linux|redhat).!excludes_host::\n    \"x\" string => \"y\";\n}\n",
        );
        let Node::Specification(spec) = spec else {
            panic!("expected a specification")
        };
        let Node::Block(block) = &spec.items[0] else {
            panic!("expected a block")
        };
        let Node::List(promise_types) = block.child_list.as_ref() else {
            panic!("expected a promise type list")
        };
        let Node::PromiseType(vars) = &promise_types.items[0] else {
            panic!("expected a promise type")
        };
        let Node::List(class_promise_list) = vars.class_promise_list.as_ref() else {
            panic!("expected a class/promise list")
        };
        let Node::Class(class) = &class_promise_list.items[0] else {
            panic!("expected a class guard")
        };
        assert_eq!(class.expression.as_string_leaf().unwrap().text, "(linux|redhat).!excludes_host");
        assert!(matches!(class_promise_list.items[1], Node::Promise(_)));
    }

    #[test]
    fn parses_promisee_arrow() {
        let spec = parse_ok("bundle agent main {\nmethods:\n  \"x\" -> \"y\" usebundle => other;\n}\n");
        let Node::Specification(spec) = spec else {
            panic!("expected a specification")
        };
        let Node::Block(block) = &spec.items[0] else {
            panic!("expected a block")
        };
        let Node::List(promise_types) = block.child_list.as_ref() else {
            panic!("expected a promise type list")
        };
        let Node::PromiseType(methods) = &promise_types.items[0] else {
            panic!("expected a promise type")
        };
        let Node::List(items) = methods.class_promise_list.as_ref() else {
            panic!("expected a class/promise list")
        };
        let Node::Promise(promise) = &items.items[0] else {
            panic!("expected a promise")
        };
        assert_eq!(
            promise.promisee.as_ref().unwrap().as_string_leaf().unwrap().text,
            "\"y\""
        );
    }

    #[test]
    fn parses_function_call_value() {
        let spec = parse_ok("bundle agent main {\nvars:\n  \"x\" string => join(\"a\", somelist);\n}\n");
        let Node::Specification(spec) = spec else {
            panic!("expected a specification")
        };
        let Node::Block(block) = &spec.items[0] else {
            panic!("expected a block")
        };
        let Node::List(promise_types) = block.child_list.as_ref() else {
            panic!("expected a promise type list")
        };
        let Node::PromiseType(vars) = &promise_types.items[0] else {
            panic!("expected a promise type")
        };
        let Node::List(items) = vars.class_promise_list.as_ref() else {
            panic!("expected a class/promise list")
        };
        let Node::Promise(promise) = &items.items[0] else {
            panic!("expected a promise")
        };
        let Node::List(constraints) = promise.constraints.as_ref() else {
            panic!("expected a constraint list")
        };
        let Node::Constraint(constraint) = &constraints.items[0] else {
            panic!("expected a constraint")
        };
        let Node::Function(call) = constraint.value.as_ref() else {
            panic!("expected a function call value")
        };
        assert_eq!(call.name.as_string_leaf().unwrap().text, "join");
        let Node::List(args) = call.args.as_ref() else {
            panic!("expected an argument list")
        };
        assert_eq!(args.items.len(), 2);
    }

    #[test]
    fn parses_body_as_class_selection_list() {
        let spec = parse_ok("body file control {\n  inputs => { \"a.cf\" };\n}\n");
        let Node::Specification(spec) = spec else {
            panic!("expected a specification")
        };
        let Node::Block(block) = &spec.items[0] else {
            panic!("expected a block")
        };
        assert_eq!(block.kind, BlockKind::Body);
        let Node::List(selections) = block.child_list.as_ref() else {
            panic!("expected a class/selection list")
        };
        assert_eq!(selections.kind, ListKind::ClassSelectionList);
        let Node::Constraint(selection) = &selections.items[0] else {
            panic!("expected a selection")
        };
        assert!(selection.is_selection);
    }

    #[test]
    fn collects_standalone_and_end_of_line_comments() {
        let spec =
            parse_ok("# header\nbundle agent main {\nvars:\n  \"x\" string => \"y\"; # trailing\n}\n");
        let Node::Specification(spec) = spec else {
            panic!("expected a specification")
        };
        assert!(matches!(spec.items[0], Node::Comment(_)));
        if let Node::Comment(comment) = &spec.items[0] {
            assert!(comment.is_standalone());
            assert_eq!(comment.text_lines[0], "header");
        }
    }

    #[test]
    fn reports_unterminated_list_as_a_parse_error() {
        let result = parse("bundle agent main {\nvars:\n  \"x\" string => { \"a\";\n}\n");
        assert!(result.is_err());
    }
}
