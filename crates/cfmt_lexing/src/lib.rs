//
// Simple lexer to break up a stream of characters into a small set of tokens for further
// processing:
//
// - String: Any single- or double quoted string
// - Word: Any maximal run of non-delimiter characters (keywords, promise type labels without
//   their trailing colon, class guard expressions without their trailing "::", bare identifiers,
//   numbers, booleans, ...)
// - Comment: "#" to end of line
// - OpenCurlyBrace, ClosingCurlyBrace, OpenParen, ClosingParen, Comma
// - Arrow ("->"), FatArrow ("=>"), DoubleColon ("::"), Colon (":"), SemiColon
//

use std::str;

const TAB: u8 = 9;
const NEWLINE: u8 = 10;
const CARRIAGE_RETURN: u8 = 13;
const SPACE: u8 = 32;
const HASH: u8 = 35;
const DOUBLE_QUOTE: u8 = 34;
const SINGLE_QUOTE: u8 = 39;
const OPEN_PAREN: u8 = 40;
const CLOSE_PAREN: u8 = 41;
const COMMA: u8 = 44;
const DASH: u8 = 45;
const COLON: u8 = 58;
const SEMICOLON: u8 = 59;
const EQUALS: u8 = 61;
const GREATER_THAN: u8 = 62;
const BACKSLASH: u8 = 92;
const LEFT_CURLY_BRACKET: u8 = 123;
const RIGHT_CURLY_BRACKET: u8 = 125;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenType {
    String,
    Word,
    Comment,
    OpenCurlyBrace,
    ClosingCurlyBrace,
    OpenParen,
    ClosingParen,
    Comma,
    Arrow,
    FatArrow,
    DoubleColon,
    Colon,
    SemiColon,
    WhiteSpace,
    LineBreak,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Token<'a> {
    pub token_type: TokenType,
    pub span: (usize, usize),
    pub text: &'a str,
}

impl Token<'_> {
    pub fn is_whitespace(&self) -> bool {
        matches!(self.token_type, TokenType::WhiteSpace)
    }

    pub fn is_line_break(&self) -> bool {
        matches!(self.token_type, TokenType::LineBreak)
    }
}

pub trait DebugTokenExt {
    fn human_readable_string(&self) -> String;
}

impl DebugTokenExt for Token<'_> {
    /// Format the tokens into a nice, human readable string for troubleshooting purposes
    fn human_readable_string(&self) -> String {
        format!(
            "{:<20} {:<15} {:?}\n",
            format!("{:?}", self.token_type),
            format!("{} -> {}", self.span.0, self.span.1),
            self.text,
        )
    }
}

impl DebugTokenExt for Vec<Token<'_>> {
    fn human_readable_string(&self) -> String {
        let mut output = String::new();

        for token in self {
            output.push_str(&token.human_readable_string());
        }

        output
    }
}

/// 1-based cursor position in a text file
pub struct TextPosition {
    pub line: usize,
    pub col: usize,
}

impl TextPosition {
    pub fn from_buffer_index(buffer: &[u8], index: usize) -> Self {
        let mut line = 1;
        let mut col = 1;

        for (i, c) in buffer.iter().enumerate() {
            if i == index {
                break;
            }

            if *c == NEWLINE {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }

        Self { line, col }
    }
}

impl core::fmt::Display for TextPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {} col {}", self.line, self.col)
    }
}

#[derive(Debug)]
pub struct LexerError {
    pub message: String,
    pub position: usize,
}

pub struct ScanIterator<'a> {
    buffer: &'a [u8],
    cursor: usize,
    done: bool,
}

impl<'a> Iterator for ScanIterator<'a> {
    type Item = Result<Token<'a>, LexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match next_token(self.buffer, self.cursor) {
            Ok(Some((next_cursor, token))) => {
                self.cursor = next_cursor;
                Some(Ok(token))
            }
            Ok(None) => None,
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}

/// Non-fallible scanner kept for debug tooling; panics on lexer errors
pub fn scan(buffer: &[u8]) -> impl Iterator<Item = Token> {
    scan_iter(buffer).map(|result| result.expect("lexer error"))
}

pub fn scan_iter(buffer: &[u8]) -> ScanIterator {
    ScanIterator {
        buffer,
        cursor: 0,
        done: false,
    }
}

/// Reads the next token from the buffer, returns None on EOF
fn next_token(buffer: &[u8], cursor: usize) -> Result<Option<(usize, Token)>, LexerError> {
    let char = match buffer.get(cursor) {
        Some(char) => char,
        None => return Ok(None),
    };

    macro_rules! get_str {
        ($length:expr) => {
            str::from_utf8(buffer.get(cursor..cursor + $length).unwrap()).map_err(|err| {
                LexerError {
                    message: format!("{}", err),
                    position: cursor,
                }
            })?
        };
    }

    macro_rules! read_token {
        ($token_type:expr, $length:expr) => {{
            let token = Token {
                token_type: $token_type,
                span: (cursor, cursor + $length - 1),
                text: get_str!($length),
            };

            Ok(Some((cursor + $length, token)))
        }};
    }

    if *char == SEMICOLON {
        read_token!(TokenType::SemiColon, 1)
    } else if *char == COMMA {
        read_token!(TokenType::Comma, 1)
    } else if *char == LEFT_CURLY_BRACKET {
        read_token!(TokenType::OpenCurlyBrace, 1)
    } else if *char == RIGHT_CURLY_BRACKET {
        read_token!(TokenType::ClosingCurlyBrace, 1)
    } else if *char == OPEN_PAREN {
        read_token!(TokenType::OpenParen, 1)
    } else if *char == CLOSE_PAREN {
        read_token!(TokenType::ClosingParen, 1)
    } else if *char == COLON && buffer.get(cursor + 1) == Some(&COLON) {
        read_token!(TokenType::DoubleColon, 2)
    } else if *char == COLON {
        read_token!(TokenType::Colon, 1)
    } else if *char == DASH && buffer.get(cursor + 1) == Some(&GREATER_THAN) {
        read_token!(TokenType::Arrow, 2)
    } else if *char == EQUALS && buffer.get(cursor + 1) == Some(&GREATER_THAN) {
        read_token!(TokenType::FatArrow, 2)
    } else if let Some(whitespace_length) = scan_whitespace(buffer, cursor) {
        read_token!(TokenType::WhiteSpace, whitespace_length)
    } else if let Some(line_break_length) = scan_line_break(buffer, cursor) {
        read_token!(TokenType::LineBreak, line_break_length)
    } else if let Some(string_length) = scan_string(buffer, cursor)? {
        read_token!(TokenType::String, string_length)
    } else if let Some(comment_length) = scan_comment(buffer, cursor) {
        read_token!(TokenType::Comment, comment_length)
    } else if let Some(word_length) = scan_word(buffer, cursor) {
        read_token!(TokenType::Word, word_length)
    } else {
        Err(LexerError {
            message: format!("Unexpected character: {:?}", *char as char),
            position: cursor,
        })
    }
}

/// Checks if there is a string at the current position
fn scan_string(buffer: &[u8], cursor: usize) -> Result<Option<usize>, LexerError> {
    let quote_char = match buffer[cursor] {
        DOUBLE_QUOTE => DOUBLE_QUOTE,
        SINGLE_QUOTE => SINGLE_QUOTE,
        _ => return Ok(None),
    };

    let mut prev_char: Option<&u8> = None;
    let mut i = cursor + 1;

    loop {
        if let Some(char) = buffer.get(i) {
            let prev_char_is_backslash = match prev_char {
                Some(x) => *x == BACKSLASH,
                None => false,
            };

            if *char == quote_char && !prev_char_is_backslash {
                return Ok(Some(i + 1 - cursor));
            }

            prev_char = Some(char);
        } else {
            return Err(LexerError {
                message: format!(
                    "Unexpected end of input, string started at {} was never terminated",
                    TextPosition::from_buffer_index(buffer, cursor),
                ),
                position: cursor,
            });
        }

        i += 1;
    }
}

/// Checks if there is a "#" comment at the current position
fn scan_comment(buffer: &[u8], cursor: usize) -> Option<usize> {
    if buffer.get(cursor) != Some(&HASH) {
        return None;
    }

    let mut length = 1;

    for i in cursor + 1.. {
        if scan_line_break(buffer, i).is_some() || i == buffer.len() {
            break;
        }

        length += 1;
    }

    Some(length)
}

/// Checks if there is whitespace at the current position
fn scan_whitespace(buffer: &[u8], cursor: usize) -> Option<usize> {
    let mut i = cursor;

    while buffer.get(i).map_or(false, |char| [SPACE, TAB].contains(char)) {
        i += 1;
    }

    let len = i - cursor;
    if len > 0 {
        Some(len)
    } else {
        None
    }
}

/// Checks if there is a line break at this position
fn scan_line_break(buffer: &[u8], cursor: usize) -> Option<usize> {
    if buffer.get(cursor) == Some(&NEWLINE) {
        Some(1)
    } else if buffer.get(cursor) == Some(&CARRIAGE_RETURN) && buffer.get(cursor + 1) == Some(&NEWLINE) {
        Some(2)
    } else {
        None
    }
}

/// Scans a maximal run of word characters, stopping before a hard delimiter or the start of an
/// "->" / "=>" operator
fn scan_word(buffer: &[u8], cursor: usize) -> Option<usize> {
    let mut i = cursor;

    while let Some(char) = buffer.get(i) {
        if is_delimiter(char) {
            break;
        }

        if (*char == DASH || *char == EQUALS) && buffer.get(i + 1) == Some(&GREATER_THAN) {
            break;
        }

        i += 1;
    }

    if i > cursor {
        Some(i - cursor)
    } else {
        None
    }
}

/// Returns true if this character should delimit a word
fn is_delimiter(c: &u8) -> bool {
    [
        SPACE,
        TAB,
        CARRIAGE_RETURN,
        NEWLINE,
        SEMICOLON,
        COMMA,
        COLON,
        LEFT_CURLY_BRACKET,
        RIGHT_CURLY_BRACKET,
        OPEN_PAREN,
        CLOSE_PAREN,
        DOUBLE_QUOTE,
        SINGLE_QUOTE,
        HASH,
    ]
    .contains(c)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dedent(text: &str) -> String {
        let mut text = textwrap_dedent(text).trim().to_string();
        text.push('\n');
        text
    }

    // Small local dedent, to avoid taking on a dependency purely for test fixtures in this crate
    fn textwrap_dedent(text: &str) -> String {
        let lines: Vec<&str> = text.lines().collect();
        let min_indent = lines
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.len() - line.trim_start().len())
            .min()
            .unwrap_or(0);
        lines
            .iter()
            .map(|line| {
                if line.len() >= min_indent {
                    &line[min_indent..]
                } else {
                    ""
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn tokens_to_string(buffer: &[u8]) -> String {
        scan_iter(buffer)
            .map(|result| result.expect("lexer error").human_readable_string())
            .collect()
    }

    #[test]
    fn smoke_test() {
        let buffer: Vec<u8> = dedent(
            r#"
            bundle agent foo {
                vars:
                    "x" string => "y"; # comment
            }
            "#,
        )
        .bytes()
        .collect();

        let tokens: Vec<_> = scan_iter(&buffer)
            .map(|r| r.expect("lexer error"))
            .collect();

        let types: Vec<_> = tokens
            .iter()
            .filter(|t| !matches!(t.token_type, TokenType::WhiteSpace))
            .map(|t| t.token_type)
            .collect();

        assert_eq!(
            types,
            vec![
                TokenType::Word, // bundle
                TokenType::Word, // agent
                TokenType::Word, // foo
                TokenType::OpenCurlyBrace,
                TokenType::LineBreak,
                TokenType::Word, // vars
                TokenType::Colon,
                TokenType::LineBreak,
                TokenType::String, // "x"
                TokenType::Word,   // string
                TokenType::FatArrow,
                TokenType::String, // "y"
                TokenType::SemiColon,
                TokenType::Comment,
                TokenType::LineBreak,
                TokenType::ClosingCurlyBrace,
                TokenType::LineBreak,
            ]
        );
    }

    #[test]
    fn double_colon_is_a_single_token() {
        let buffer = b"linux::".to_vec();
        let tokens: Vec<_> = scan_iter(&buffer).map(|r| r.expect("lexer error")).collect();

        assert_eq!(tokens[0].token_type, TokenType::Word);
        assert_eq!(tokens[0].text, "linux");
        assert_eq!(tokens[1].token_type, TokenType::DoubleColon);
    }

    #[test]
    fn promise_type_colon_is_distinct_from_double_colon() {
        let buffer = b"meta:".to_vec();
        let tokens: Vec<_> = scan_iter(&buffer).map(|r| r.expect("lexer error")).collect();

        assert_eq!(tokens[0].token_type, TokenType::Word);
        assert_eq!(tokens[0].text, "meta");
        assert_eq!(tokens[1].token_type, TokenType::Colon);
    }

    #[test]
    fn arrow_without_surrounding_whitespace() {
        let buffer = b"a->b".to_vec();
        let tokens: Vec<_> = scan_iter(&buffer).map(|r| r.expect("lexer error")).collect();

        let types: Vec<_> = tokens.iter().map(|t| t.token_type).collect();
        assert_eq!(
            types,
            vec![TokenType::Word, TokenType::Arrow, TokenType::Word]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let buffer = b"\"unterminated".to_vec();
        let result: Vec<_> = scan_iter(&buffer).collect();

        assert!(result.last().unwrap().is_err());
    }

    #[test]
    fn comment_runs_to_end_of_line() {
        let buffer = b"# hello world\nnext".to_vec();
        let tokens: Vec<_> = scan_iter(&buffer).map(|r| r.expect("lexer error")).collect();

        assert_eq!(tokens[0].token_type, TokenType::Comment);
        assert_eq!(tokens[0].text, "# hello world");
    }
}
