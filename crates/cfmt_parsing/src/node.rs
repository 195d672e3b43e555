use cfmt_lexing::{TextPosition, Token};

/// `(start_line, end_line, start_byte, end_byte, parse_index)`. Byte offsets give an unambiguous
/// total order for comparing a comment's position against a sibling's (two tokens on the same
/// line still compare correctly), while line numbers are what the formatter needs to decide
/// whether two nodes were adjacent in the source. `parse_index` is a parse-order counter; since
/// this tree already stores children in parse order it mostly exists for the comment distributor's
/// own bookkeeping rather than for ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub start_line: usize,
    pub end_line: usize,
    pub start_byte: usize,
    pub end_byte: usize,
    pub parse_index: usize,
}

impl Position {
    pub fn from_token(buffer: &[u8], token: &Token, parse_index: usize) -> Self {
        let start = TextPosition::from_buffer_index(buffer, token.span.0);
        let end = TextPosition::from_buffer_index(buffer, token.span.1);
        Self {
            start_line: start.line,
            end_line: end.line,
            start_byte: token.span.0,
            end_byte: token.span.1,
            parse_index,
        }
    }

    /// Position spanning from `self`'s start to `other`'s end.
    pub fn through(&self, other: &Position) -> Position {
        Position {
            start_line: self.start_line,
            end_line: other.end_line,
            start_byte: self.start_byte,
            end_byte: other.end_byte,
            parse_index: self.parse_index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentAffinity {
    /// Trails a token on the same source line; rendered on that same output line.
    EndOfLine,
    /// Occupies one or more whole source lines by itself.
    Standalone,
}

/// A lexed comment. Used both as a plain attachment on a node's `comments` list and, when it
/// survives as an item of a list in its own right, as a `Node::Comment`.
#[derive(Debug, Clone)]
pub struct Comment {
    pub position: Position,
    pub text_lines: Vec<String>,
    pub affinity: CommentAffinity,
    pub original_indentation: usize,
    pub priority: u8,
    pub preceded_by_empty_line: bool,
}

impl Comment {
    pub fn is_end_of_line(&self) -> bool {
        self.affinity == CommentAffinity::EndOfLine
    }

    pub fn is_standalone(&self) -> bool {
        self.affinity == CommentAffinity::Standalone
    }
}

#[derive(Debug, Clone)]
pub struct NodeMeta {
    pub position: Position,
    pub comments: Vec<Comment>,
    pub preceded_by_empty_line: bool,
    pub respects_preceding_empty_line: bool,
    pub allows_end_of_line_comments: bool,
}

impl NodeMeta {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            comments: vec![],
            preceded_by_empty_line: false,
            respects_preceding_empty_line: true,
            allows_end_of_line_comments: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Bundle,
    Body,
    /// An unrecognised leading block keyword, kept and rendered verbatim instead of rejected.
    /// Mirrors the teacher's tolerance of unknown statement keywords.
    Other,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub meta: NodeMeta,
    pub kind: BlockKind,
    pub keyword_text: String,
    /// Always a `Node::StringLeaf`, e.g. `"agent"` in `bundle agent foo`.
    pub block_type: Box<Node>,
    /// Always a `Node::StringLeaf`, the block's name.
    pub name: Box<Node>,
    /// Always a `Node::List` of kind `ListKind::ArgumentList`. Empty when the block has no
    /// parenthesized parameter list at all (most bodies; some bundles).
    pub args: Option<Box<Node>>,
    /// Always a `Node::List` of kind `ListKind::PromiseTypeList` (bundle) or
    /// `ListKind::ClassSelectionList` (body).
    pub child_list: Box<Node>,
}

#[derive(Debug, Clone)]
pub struct PromiseType {
    pub meta: NodeMeta,
    /// Always a `Node::StringLeaf`.
    pub name: Box<Node>,
    /// Always a `Node::List` of kind `ListKind::ClassPromiseList`.
    pub class_promise_list: Box<Node>,
}

#[derive(Debug, Clone)]
pub struct Class {
    pub meta: NodeMeta,
    /// Always a `Node::StringLeaf` holding the raw class guard expression text.
    pub expression: Box<Node>,
}

#[derive(Debug, Clone)]
pub struct Promise {
    pub meta: NodeMeta,
    /// Always a `Node::StringLeaf`.
    pub promiser: Box<Node>,
    /// Always a `Node::StringLeaf`, when present.
    pub promisee: Option<Box<Node>>,
    /// Always a `Node::List` of kind `ListKind::ConstraintList`.
    pub constraints: Box<Node>,
    /// Longest constraint type name among this promise's own constraints. Filled in by the
    /// alignment pass, not the parser.
    pub max_type_len: usize,
}

#[derive(Debug, Clone)]
pub struct Constraint {
    pub meta: NodeMeta,
    /// Always a `Node::StringLeaf`.
    pub type_name: Box<Node>,
    pub value: Box<Node>,
    pub is_selection: bool,
    /// Padding columns so this constraint's `=>` lines up with the widest type name in its scope
    /// (a promise's own constraints, or a body's whole selection list). Filled in by the alignment
    /// pass, not the parser.
    pub assign_indent: usize,
}

#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub meta: NodeMeta,
    /// Always a `Node::StringLeaf`.
    pub name: Box<Node>,
    /// Always a `Node::List` of kind `ListKind::ArgumentList`.
    pub args: Box<Node>,
}

#[derive(Debug, Clone)]
pub struct StringLeaf {
    pub meta: NodeMeta,
    pub text: String,
}

impl StringLeaf {
    pub fn new(position: Position, text: impl Into<String>) -> Self {
        Self {
            meta: NodeMeta::new(position),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// An `rlist`/`slist` literal value: `{ "a", "b" }`
    List,
    /// A function call or promise type argument list: `(a, b)`
    ArgumentList,
    /// A bundle's top-level promise type list
    PromiseTypeList,
    /// A body's top-level class/selection list
    ClassSelectionList,
    /// A promise type's class/promise list
    ClassPromiseList,
    /// A promise's constraint list
    ConstraintList,
}

#[derive(Debug, Clone)]
pub struct ListNode {
    pub meta: NodeMeta,
    pub kind: ListKind,
    /// Items in parse order, content nodes and `Node::Comment`s interleaved exactly as lexed. A
    /// leading run of comments belongs before the first content item; a trailing run belongs
    /// before the closing bracket. There is no separate bucket for either — the rendering layer
    /// finds them the same way the comment distributor finds everything else, by walking `items`.
    pub items: Vec<Node>,
    /// Opening brace/paren position, for list kinds that have one (`List`, `ArgumentList`,
    /// `PromiseTypeList`, `ClassSelectionList`). `ClassPromiseList` and `ConstraintList` are
    /// virtual groupings with no bracket of their own, so this is `None` for them.
    pub open_brace: Option<Position>,
    pub close_brace: Option<Position>,
}

impl ListNode {
    pub fn new(position: Position, kind: ListKind) -> Self {
        Self {
            meta: NodeMeta::new(position),
            kind,
            items: vec![],
            open_brace: None,
            close_brace: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Specification {
    pub meta: NodeMeta,
    pub items: Vec<Node>,
}

#[derive(Debug, Clone)]
pub enum Node {
    Specification(Specification),
    Block(Block),
    PromiseType(PromiseType),
    Class(Class),
    Promise(Promise),
    Constraint(Constraint),
    Function(FunctionCall),
    StringLeaf(StringLeaf),
    Comment(Comment),
    List(ListNode),
}

impl Node {
    pub fn position(&self) -> Position {
        match self {
            Node::Specification(n) => n.meta.position,
            Node::Block(n) => n.meta.position,
            Node::PromiseType(n) => n.meta.position,
            Node::Class(n) => n.meta.position,
            Node::Promise(n) => n.meta.position,
            Node::Constraint(n) => n.meta.position,
            Node::Function(n) => n.meta.position,
            Node::StringLeaf(n) => n.meta.position,
            Node::Comment(c) => c.position,
            Node::List(n) => n.meta.position,
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Node::Comment(_))
    }

    pub fn meta(&self) -> Option<&NodeMeta> {
        match self {
            Node::Specification(n) => Some(&n.meta),
            Node::Block(n) => Some(&n.meta),
            Node::PromiseType(n) => Some(&n.meta),
            Node::Class(n) => Some(&n.meta),
            Node::Promise(n) => Some(&n.meta),
            Node::Constraint(n) => Some(&n.meta),
            Node::Function(n) => Some(&n.meta),
            Node::StringLeaf(n) => Some(&n.meta),
            Node::Comment(_) => None,
            Node::List(n) => Some(&n.meta),
        }
    }

    pub fn meta_mut(&mut self) -> Option<&mut NodeMeta> {
        match self {
            Node::Specification(n) => Some(&mut n.meta),
            Node::Block(n) => Some(&mut n.meta),
            Node::PromiseType(n) => Some(&mut n.meta),
            Node::Class(n) => Some(&mut n.meta),
            Node::Promise(n) => Some(&mut n.meta),
            Node::Constraint(n) => Some(&mut n.meta),
            Node::Function(n) => Some(&mut n.meta),
            Node::StringLeaf(n) => Some(&mut n.meta),
            Node::Comment(_) => None,
            Node::List(n) => Some(&mut n.meta),
        }
    }

    pub fn preceded_by_empty_line(&self) -> bool {
        match self {
            Node::Comment(c) => c.preceded_by_empty_line,
            _ => self.meta().map_or(false, |m| m.preceded_by_empty_line),
        }
    }

    pub fn set_preceded_by_empty_line(&mut self, value: bool) {
        match self {
            Node::Comment(c) => c.preceded_by_empty_line = value,
            _ => {
                if let Some(meta) = self.meta_mut() {
                    meta.preceded_by_empty_line = value;
                }
            }
        }
    }

    /// Children in parse order, exhaustively matched over every node kind. There is no dynamic
    /// string-keyed child map to fall back on, so adding a field that should participate in
    /// comment distribution means updating this match arm by hand.
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Specification(n) => n.items.iter().collect(),
            Node::Block(n) => {
                let mut v = vec![n.block_type.as_ref(), n.name.as_ref()];
                if let Some(args) = &n.args {
                    v.push(args.as_ref());
                }
                v.push(n.child_list.as_ref());
                v
            }
            Node::PromiseType(n) => vec![n.name.as_ref(), n.class_promise_list.as_ref()],
            Node::Class(n) => vec![n.expression.as_ref()],
            Node::Promise(n) => {
                let mut v = vec![n.promiser.as_ref()];
                if let Some(promisee) = &n.promisee {
                    v.push(promisee.as_ref());
                }
                v.push(n.constraints.as_ref());
                v
            }
            Node::Constraint(n) => vec![n.type_name.as_ref(), n.value.as_ref()],
            Node::Function(n) => vec![n.name.as_ref(), n.args.as_ref()],
            Node::StringLeaf(_) => vec![],
            Node::Comment(_) => vec![],
            Node::List(n) => n.items.iter().collect(),
        }
    }

    /// View this node as a `ListNode`, for call sites (comment distribution, structural
    /// transforms, the list rendering engine) that need the list's own fields
    /// (`items`, `kind`, ...) rather than the generic `Node` wrapper.
    pub fn as_list(&self) -> Option<&ListNode> {
        match self {
            Node::List(list) => Some(list),
            _ => None,
        }
    }

    /// View this node as a `StringLeaf`, for call sites rendering a promiser, class guard,
    /// bare word or block name.
    pub fn as_string_leaf(&self) -> Option<&StringLeaf> {
        match self {
            Node::StringLeaf(leaf) => Some(leaf),
            _ => None,
        }
    }
}
