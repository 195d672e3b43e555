use cfmt_lexing::{scan_iter, LexerError, TextPosition, Token, TokenType};

use crate::node::{
    Block, BlockKind, Class, Comment, CommentAffinity, Constraint, FunctionCall, ListKind,
    ListNode, Node, NodeMeta, Position, Promise, PromiseType, Specification, StringLeaf,
};

#[derive(Debug)]
pub struct ParseError {
    pub message: String,
    pub position: TextPosition,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

/// Recursive-descent parser over a flat token stream. Comments are never attached to a node at
/// parse time — they are simply pushed into whatever item list they were lexed inside of, in
/// parse order, leaving the comment distributor downstream to pair end-of-line comments with the
/// item that precedes them and to decide where standalone comments anchor. This mirrors how the
/// original formatter's node tree carries comments as ordinary children rather than as metadata
/// bolted onto some other node.
pub struct Parser<'a> {
    buffer: &'a [u8],
    tokens: Vec<Token<'a>>,
    pos: usize,
    parse_index: usize,
}

impl<'a> Parser<'a> {
    pub fn new(buffer: &'a [u8]) -> Result<Self, ParseError> {
        let mut tokens = vec![];
        for result in scan_iter(buffer) {
            match result {
                Ok(token) => tokens.push(token),
                Err(error) => return Err(Self::lexer_error(buffer, error)),
            }
        }
        Ok(Self {
            buffer,
            tokens,
            pos: 0,
            parse_index: 0,
        })
    }

    fn lexer_error(buffer: &[u8], error: LexerError) -> ParseError {
        ParseError {
            message: error.message,
            position: TextPosition::from_buffer_index(buffer, error.position),
        }
    }

    fn error(&self, message: impl Into<String>, byte_index: usize) -> ParseError {
        ParseError {
            message: message.into(),
            position: TextPosition::from_buffer_index(self.buffer, byte_index),
        }
    }

    fn next_parse_index(&mut self) -> usize {
        self.parse_index += 1;
        self.parse_index
    }

    fn position_for(&mut self, token: &Token) -> Position {
        let index = self.next_parse_index();
        Position::from_token(self.buffer, token, index)
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token<'a>> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Consumes whitespace, line breaks and comments starting at the cursor. Returns the comments
    /// encountered (each already carrying its own affinity/indentation/blank-line flag) and
    /// whether the upcoming significant token was preceded by a blank line.
    fn collect_trivia(&mut self) -> (Vec<Comment>, bool) {
        let mut comments = vec![];
        let mut consecutive_breaks = 0usize;

        loop {
            match self.peek().map(|t| t.token_type) {
                Some(TokenType::WhiteSpace) => {
                    self.bump();
                }
                Some(TokenType::LineBreak) => {
                    self.bump();
                    consecutive_breaks += 1;
                }
                Some(TokenType::Comment) => {
                    let token = self.bump().unwrap();
                    let position = self.position_for(&token);
                    let affinity = if consecutive_breaks == 0 {
                        CommentAffinity::EndOfLine
                    } else {
                        CommentAffinity::Standalone
                    };
                    let indentation =
                        TextPosition::from_buffer_index(self.buffer, token.span.0).col - 1;
                    comments.push(Comment {
                        position,
                        text_lines: vec![comment_text(token.text)],
                        affinity,
                        original_indentation: indentation,
                        priority: 0,
                        preceded_by_empty_line: consecutive_breaks >= 2,
                    });
                    consecutive_breaks = 0;
                }
                _ => break,
            }
        }

        (comments, consecutive_breaks >= 2)
    }

    fn comments_as_items(comments: Vec<Comment>) -> Vec<Node> {
        comments.into_iter().map(Node::Comment).collect()
    }

    /// Peeks past trivia to classify the upcoming significant token without consuming anything.
    fn peek_significant_kind(&self) -> Option<TokenType> {
        let mut i = self.pos;
        loop {
            match self.tokens.get(i).map(|t| t.token_type) {
                Some(TokenType::WhiteSpace) | Some(TokenType::LineBreak) | Some(TokenType::Comment) => {
                    i += 1;
                }
                other => return other,
            }
        }
    }

    fn peek_significant_at(&self, skip: usize) -> Option<TokenType> {
        let mut i = self.pos;
        let mut seen = 0;
        loop {
            match self.tokens.get(i).map(|t| t.token_type) {
                Some(TokenType::WhiteSpace) | Some(TokenType::LineBreak) | Some(TokenType::Comment) => {
                    i += 1;
                }
                Some(other) => {
                    if seen == skip {
                        return Some(other);
                    }
                    seen += 1;
                    i += 1;
                }
                None => return None,
            }
        }
    }

    fn expect(&mut self, token_type: TokenType, what: &str) -> Result<Token<'a>, ParseError> {
        self.collect_trivia();
        match self.bump() {
            Some(token) if token.token_type == token_type => Ok(token),
            Some(token) => Err(self.error(
                format!("expected {what}, found {:?} {:?}", token.token_type, token.text),
                token.span.0,
            )),
            None => Err(self.error(format!("expected {what}, found end of file"), self.buffer.len())),
        }
    }

    fn string_leaf(&mut self, what: &str) -> Result<Box<Node>, ParseError> {
        self.collect_trivia();
        match self.peek() {
            Some(token) if matches!(token.token_type, TokenType::Word | TokenType::String) => {
                self.bump();
                let position = self.position_for(&token);
                Ok(Box::new(Node::StringLeaf(StringLeaf {
                    meta: NodeMeta::new(position),
                    text: token.text.to_string(),
                })))
            }
            Some(token) => Err(self.error(
                format!("expected {what}, found {:?} {:?}", token.token_type, token.text),
                token.span.0,
            )),
            None => Err(self.error(format!("expected {what}, found end of file"), self.buffer.len())),
        }
    }

    pub fn parse_specification(&mut self) -> Result<Node, ParseError> {
        let mut items = vec![];
        let start_index = self.next_parse_index();

        loop {
            let (comments, blank_before) = self.collect_trivia();
            items.extend(Self::comments_as_items(comments));

            match self.peek_significant_kind() {
                None => break,
                Some(TokenType::Word) => {
                    let mut block = self.parse_block()?;
                    block.set_preceded_by_empty_line(blank_before);
                    items.push(block);
                }
                Some(other) => {
                    let token = self.bump().unwrap();
                    return Err(self.error(
                        format!("expected 'bundle' or 'body', found {other:?} {:?}", token.text),
                        token.span.0,
                    ));
                }
            }
        }

        let position = Self::span_of(&items, start_index);
        Ok(Node::Specification(Specification {
            meta: NodeMeta::new(position),
            items,
        }))
    }

    fn span_of(items: &[Node], fallback_index: usize) -> Position {
        match (items.first(), items.last()) {
            (Some(first), Some(last)) => first.position().through(&last.position()),
            _ => Position {
                start_line: 1,
                end_line: 1,
                start_byte: 0,
                end_byte: 0,
                parse_index: fallback_index,
            },
        }
    }

    fn parse_block(&mut self) -> Result<Node, ParseError> {
        let keyword = self.bump().expect("caller peeked a Word token");
        let start_position = self.position_for(&keyword);
        let kind = match keyword.text {
            "bundle" => BlockKind::Bundle,
            "body" => BlockKind::Body,
            other => {
                log::warn!("unrecognised block keyword {other:?}, formatting it as a bundle");
                BlockKind::Other
            }
        };

        let block_type = self.string_leaf("a block type")?;
        let name = self.string_leaf("a block name")?;

        let args = if self.peek_significant_kind() == Some(TokenType::OpenParen) {
            Some(Box::new(self.parse_list(ListKind::ArgumentList, TokenType::OpenParen, TokenType::ClosingParen)?))
        } else {
            None
        };

        self.expect(TokenType::OpenCurlyBrace, "'{'")?;

        let child_list_kind = match kind {
            BlockKind::Body => ListKind::ClassSelectionList,
            BlockKind::Bundle | BlockKind::Other => ListKind::PromiseTypeList,
        };
        let child_list = self.parse_promise_type_or_selection_list(child_list_kind)?;

        let close_brace = self.expect(TokenType::ClosingCurlyBrace, "'}'")?;
        let close_position = self.position_for(&close_brace);

        Ok(Node::Block(Block {
            meta: NodeMeta::new(start_position.through(&close_position)),
            kind,
            keyword_text: keyword.text.to_string(),
            block_type,
            name,
            args,
            child_list: Box::new(child_list),
        }))
    }

    /// A bundle's body is a list of promise types (`vars: ... ;`); a CFEngine body's body is a
    /// flat list of classes and key/value selections, which the parser models identically to a
    /// bundle's promise-type list one level up: both are "word, then either `::` (class) or
    /// `=>`/promise-body (selection or promise)". Bodies never nest a further promise-type layer,
    /// so for `ClassSelectionList` the items parsed here are classes and selections directly
    /// rather than promise types.
    fn parse_promise_type_or_selection_list(&mut self, kind: ListKind) -> Result<Node, ParseError> {
        let list_start = self.next_parse_index();
        let mut items = vec![];

        loop {
            let (comments, blank_before) = self.collect_trivia();
            items.extend(Self::comments_as_items(comments));

            match self.peek_significant_kind() {
                None | Some(TokenType::ClosingCurlyBrace) => break,
                Some(TokenType::Word) => {
                    let mut item = match kind {
                        ListKind::PromiseTypeList => self.parse_promise_type()?,
                        ListKind::ClassSelectionList => self.parse_class_or_selection()?,
                        _ => unreachable!("only called for PromiseTypeList/ClassSelectionList"),
                    };
                    item.set_preceded_by_empty_line(blank_before);
                    items.push(item);
                }
                Some(other) => {
                    let token = self.bump().unwrap();
                    return Err(self.error(format!("unexpected {other:?} {:?}", token.text), token.span.0));
                }
            }
        }

        let position = Self::span_of(&items, list_start);
        Ok(Node::List(ListNode {
            meta: NodeMeta::new(position),
            kind,
            items,
            open_brace: None,
            close_brace: None,
        }))
    }

    fn parse_promise_type(&mut self) -> Result<Node, ParseError> {
        let name_token = self.bump().expect("caller peeked a Word token");
        let name_position = self.position_for(&name_token);
        let name = Box::new(Node::StringLeaf(StringLeaf {
            meta: NodeMeta::new(name_position),
            text: name_token.text.to_string(),
        }));

        self.expect(TokenType::Colon, "':'")?;

        let list_start = self.next_parse_index();
        let mut items = vec![];

        loop {
            let (comments, blank_before) = self.collect_trivia();
            items.extend(Self::comments_as_items(comments));

            match self.peek_significant_kind() {
                None | Some(TokenType::ClosingCurlyBrace) => break,
                Some(TokenType::Word) | Some(TokenType::String) => {
                    // A new promise type starts when a bare word is immediately followed by a
                    // single colon (not a double colon, which marks a class guard).
                    if self.peek_significant_kind() == Some(TokenType::Word)
                        && self.peek_significant_at(1) == Some(TokenType::Colon)
                    {
                        break;
                    }
                    let mut item = self.parse_class_or_promise()?;
                    item.set_preceded_by_empty_line(blank_before);
                    items.push(item);
                }
                Some(other) => {
                    let token = self.bump().unwrap();
                    return Err(self.error(format!("unexpected {other:?} {:?}", token.text), token.span.0));
                }
            }
        }

        let position = name_position.through(&Self::span_of(&items, list_start));
        let class_promise_list = Node::List(ListNode {
            meta: NodeMeta::new(Self::span_of(&items, list_start)),
            kind: ListKind::ClassPromiseList,
            items,
            open_brace: None,
            close_brace: None,
        });

        Ok(Node::PromiseType(PromiseType {
            meta: NodeMeta::new(position),
            name,
            class_promise_list: Box::new(class_promise_list),
        }))
    }

    /// A body's top level is flatter than a bundle's: classes and selections sit directly under
    /// the body, with no intervening promise-type layer.
    fn parse_class_or_selection(&mut self) -> Result<Node, ParseError> {
        if self.class_guard_end().is_some() {
            self.parse_class()
        } else {
            self.parse_selection()
        }
    }

    fn parse_class_or_promise(&mut self) -> Result<Node, ParseError> {
        if self.class_guard_end().is_some() {
            self.parse_class()
        } else {
            self.parse_promise()
        }
    }

    /// Looks ahead from the cursor for a class guard terminated by `::`: one or more `Word`s,
    /// optionally grouped with balanced parens (`(linux|redhat).!excludes_host::`), with no
    /// parens left open and no colon nested inside a group. Returns the token index of the
    /// terminating `::` without consuming anything, so the dispatcher can decide whether to
    /// parse a class, a selection, or a promise before committing to either.
    fn class_guard_end(&self) -> Option<usize> {
        let mut i = self.pos;
        let mut depth: i32 = 0;

        loop {
            match self.tokens.get(i).map(|t| t.token_type) {
                Some(TokenType::WhiteSpace) | Some(TokenType::LineBreak) | Some(TokenType::Comment) => {
                    i += 1;
                }
                Some(TokenType::Word) => i += 1,
                Some(TokenType::OpenParen) => {
                    depth += 1;
                    i += 1;
                }
                Some(TokenType::ClosingParen) => {
                    if depth == 0 {
                        return None;
                    }
                    depth -= 1;
                    i += 1;
                }
                Some(TokenType::DoubleColon) if depth == 0 => return Some(i),
                _ => return None,
            }
        }
    }

    /// Consumes a class guard expression up to and including its terminating `::`, keeping the
    /// whole thing (parens, `|`/`&`/`!`/`.` operators and all) as one raw text blob rather than
    /// parsing its boolean structure.
    fn parse_class(&mut self) -> Result<Node, ParseError> {
        let colon_index = self.class_guard_end().expect("caller already confirmed a class guard");

        let start_token = self.peek().expect("caller peeked a guard token");
        let start_position = self.position_for(&start_token);
        let guard_start_byte = start_token.span.0;

        let mut guard_end_byte = guard_start_byte;
        let mut colon_token = start_token;
        while self.pos <= colon_index {
            let token = self.bump().expect("within class_guard_end's scanned range");
            colon_token = token;
            if !matches!(token.token_type, TokenType::WhiteSpace | TokenType::LineBreak | TokenType::Comment) {
                guard_end_byte = token.span.1;
            }
        }
        let end_position = self.position_for(&colon_token);

        let guard_text = std::str::from_utf8(&self.buffer[guard_start_byte..=guard_end_byte])
            .expect("class guard bytes are valid UTF-8, carved from an already-UTF-8 buffer")
            .trim_end_matches("::")
            .trim_end()
            .to_string();

        Ok(Node::Class(Class {
            meta: NodeMeta::new(start_position.through(&end_position)),
            expression: Box::new(Node::StringLeaf(StringLeaf {
                meta: NodeMeta::new(start_position),
                text: guard_text,
            })),
        }))
    }

    /// A body-level `name => value;` selection, modeled as a `Constraint` with `is_selection`
    /// set, since it shares the promise-constraint grammar exactly.
    fn parse_selection(&mut self) -> Result<Node, ParseError> {
        let mut constraint = self.parse_constraint_inner(true)?;
        let semicolon = self.expect(TokenType::SemiColon, "';'")?;
        let end_position = self.position_for(&semicolon);
        if let Node::Constraint(c) = &mut constraint {
            c.meta.position = c.meta.position.through(&end_position);
        }
        Ok(constraint)
    }

    fn parse_promise(&mut self) -> Result<Node, ParseError> {
        let promiser = self.string_leaf("a promiser")?;
        let start_position = promiser.position();

        let promisee = if self.peek_significant_kind() == Some(TokenType::Arrow) {
            self.expect(TokenType::Arrow, "'->'")?;
            Some(self.string_leaf("a promisee")?)
        } else {
            None
        };

        let constraints_start = self.next_parse_index();
        let mut items = vec![];

        loop {
            let (comments, blank_before) = self.collect_trivia();
            items.extend(Self::comments_as_items(comments));

            match self.peek_significant_kind() {
                Some(TokenType::SemiColon) | None => break,
                Some(TokenType::Word) => {
                    let mut constraint = self.parse_constraint_inner(false)?;
                    constraint.set_preceded_by_empty_line(blank_before);
                    items.push(constraint);

                    let (trailing_comments, _) = self.collect_trivia();
                    items.extend(Self::comments_as_items(trailing_comments));
                    if self.peek_significant_kind() == Some(TokenType::Comma) {
                        self.expect(TokenType::Comma, "','")?;
                    } else {
                        break;
                    }
                }
                Some(other) => {
                    let token = self.bump().unwrap();
                    return Err(self.error(format!("unexpected {other:?} {:?}", token.text), token.span.0));
                }
            }
        }

        let semicolon = self.expect(TokenType::SemiColon, "';'")?;
        let end_position = self.position_for(&semicolon);

        let constraints = Node::List(ListNode {
            meta: NodeMeta::new(Self::span_of(&items, constraints_start)),
            kind: ListKind::ConstraintList,
            items,
            open_brace: None,
            close_brace: None,
        });

        Ok(Node::Promise(Promise {
            meta: NodeMeta::new(start_position.through(&end_position)),
            promiser,
            promisee,
            constraints: Box::new(constraints),
            max_type_len: 0,
        }))
    }

    fn parse_constraint_inner(&mut self, is_selection: bool) -> Result<Node, ParseError> {
        let type_name = self.string_leaf("a constraint name")?;
        let start_position = type_name.position();
        self.expect(TokenType::FatArrow, "'=>'")?;
        let value = self.parse_value()?;
        let end_position = value.position();

        Ok(Node::Constraint(Constraint {
            meta: NodeMeta::new(start_position.through(&end_position)),
            type_name,
            value: Box::new(value),
            is_selection,
            assign_indent: 0,
        }))
    }

    fn parse_value(&mut self) -> Result<Node, ParseError> {
        self.collect_trivia();
        match self.peek_significant_kind() {
            Some(TokenType::OpenCurlyBrace) => {
                self.parse_list(ListKind::List, TokenType::OpenCurlyBrace, TokenType::ClosingCurlyBrace)
            }
            Some(TokenType::Word) if self.peek_significant_at(1) == Some(TokenType::OpenParen) => {
                self.parse_function_call()
            }
            Some(TokenType::Word) | Some(TokenType::String) => {
                Ok(*self.string_leaf("a value")?)
            }
            Some(other) => {
                let token = self.bump();
                let span = token.map(|t| t.span.0).unwrap_or(self.buffer.len());
                Err(self.error(format!("expected a value, found {other:?}"), span))
            }
            None => Err(self.error("expected a value, found end of file", self.buffer.len())),
        }
    }

    fn parse_function_call(&mut self) -> Result<Node, ParseError> {
        let name = self.string_leaf("a function name")?;
        let start_position = name.position();
        let args = self.parse_list(ListKind::ArgumentList, TokenType::OpenParen, TokenType::ClosingParen)?;
        let end_position = args.position();

        Ok(Node::Function(FunctionCall {
            meta: NodeMeta::new(start_position.through(&end_position)),
            name,
            args: Box::new(args),
        }))
    }

    /// Parses a bracketed, comma-separated list: an `rlist`/`slist` literal (`{ ... }`) or an
    /// argument list (`( ... )`).
    fn parse_list(
        &mut self,
        kind: ListKind,
        open: TokenType,
        close: TokenType,
    ) -> Result<Node, ParseError> {
        let open_token = self.expect(open, bracket_name(open))?;
        let open_position = self.position_for(&open_token);

        let mut items = vec![];
        loop {
            let (comments, blank_before) = self.collect_trivia();
            items.extend(Self::comments_as_items(comments));

            if self.peek_significant_kind() == Some(close) {
                break;
            }
            if self.peek_significant_kind().is_none() {
                return Err(self.error(format!("unterminated {}", bracket_name(open)), self.buffer.len()));
            }

            let mut value = self.parse_value()?;
            value.set_preceded_by_empty_line(blank_before);
            items.push(value);

            let (trailing_comments, _) = self.collect_trivia();
            items.extend(Self::comments_as_items(trailing_comments));

            if self.peek_significant_kind() == Some(TokenType::Comma) {
                self.expect(TokenType::Comma, "','")?;
            } else {
                break;
            }
        }

        let close_token = self.expect(close, bracket_name(close))?;
        let close_position = self.position_for(&close_token);

        Ok(Node::List(ListNode {
            meta: NodeMeta::new(open_position.through(&close_position)),
            kind,
            items,
            open_brace: Some(open_position),
            close_brace: Some(close_position),
        }))
    }
}

fn bracket_name(token_type: TokenType) -> &'static str {
    match token_type {
        TokenType::OpenCurlyBrace => "'{'",
        TokenType::ClosingCurlyBrace => "'}'",
        TokenType::OpenParen => "'('",
        TokenType::ClosingParen => "')'",
        _ => "bracket",
    }
}

/// Strips the leading `#` and a single following space, matching how CFEngine policy authors
/// conventionally write comments. Multiple leading `#`s (e.g. `## section header`) are preserved.
fn comment_text(raw: &str) -> String {
    let without_hash = raw.strip_prefix('#').unwrap_or(raw);
    without_hash.strip_prefix(' ').unwrap_or(without_hash).to_string()
}
