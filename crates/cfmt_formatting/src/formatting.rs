mod alignment;
pub mod comments;
pub mod layout;
pub mod lists;
pub mod render;
pub mod structural;

use cfmt_parsing::{parse, ParseError};

use crate::alignment::seed_alignment;
use crate::comments::distribute_comments;
use crate::layout::{Line, LayoutOptions};
use crate::structural::{remove_empty_promise_types, sort_to_evaluation_order};

/// Page width and other knobs the layout engine wraps against.
#[derive(Debug, Clone, Copy)]
pub struct FormatConfig {
    pub page_width: usize,
    pub tab_width: usize,
    pub removes_empty_promise_types: bool,
    pub sorts_promise_types_to_evaluation_order: bool,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            page_width: 80,
            tab_width: 4,
            removes_empty_promise_types: false,
            sorts_promise_types_to_evaluation_order: false,
        }
    }
}

#[derive(Debug)]
pub enum Error {
    ParseError(ParseError),
    IOError(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ParseError(parse_error) => write!(f, "{}", parse_error),
            Error::IOError(text) => write!(f, "{}", text),
        }
    }
}

impl std::error::Error for Error {}

impl From<ParseError> for Error {
    fn from(error: ParseError) -> Self {
        Error::ParseError(error)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IOError(format!("I/O Error: {}", error))
    }
}

/// Parses `buffer` as a policy file, reorders and aligns it per `config`, and writes the
/// formatted result to `out`. This is the single entry point the CLI drives.
pub fn format_policy<T: std::io::Write>(
    out: &mut T,
    buffer: &[u8],
    config: &FormatConfig,
) -> Result<(), Error> {
    let source = std::str::from_utf8(buffer)
        .map_err(|error| Error::IOError(format!("source is not valid UTF-8: {error}")))?;

    let mut tree = parse(source)?;

    if config.removes_empty_promise_types {
        remove_empty_promise_types(&mut tree);
    }
    if config.sorts_promise_types_to_evaluation_order {
        sort_to_evaluation_order(&mut tree);
    }
    distribute_comments(&mut tree);
    seed_alignment(&mut tree);

    let options = LayoutOptions::new(config.page_width);
    let rendered = render::lines(&tree, &options);
    out.write_all(serialize(&rendered).as_bytes())?;
    Ok(())
}

/// Joins rendered lines into source text: `indent ++ text ++ end_comments`, one line per entry.
/// A blank line (no text, no trailing comment) is written without any leading indentation.
fn serialize(lines: &[Line]) -> String {
    let mut out = String::new();
    for line in lines {
        if line.text.is_empty() && line.end_comments.is_empty() {
            out.push('\n');
            continue;
        }
        out.push_str(&" ".repeat(line.indent.unwrap_or(0)));
        out.push_str(&line.text);
        for comment in &line.end_comments {
            out.push(' ');
            out.push_str(&comment.text);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    fn format_str(buffer: &str, config: &FormatConfig) -> Result<String, Error> {
        let mut out = vec![];
        format_policy(&mut out, buffer.as_bytes(), config)?;
        Ok(String::from_utf8(out).expect("formatter only ever writes UTF-8"))
    }

    #[test]
    fn formats_minimal_bundle() {
        let source = "bundle agent main {\nvars:\n  \"x\" string => \"y\";\n}\n";
        let result = format_str(source, &FormatConfig::default()).unwrap();
        assert!(result.starts_with("bundle agent main {\n\n"));
        assert!(result.trim_end().ends_with('}'));
        assert!(result.contains("\"x\""));
        assert!(result.contains("string =>"));
    }

    #[test]
    fn aligns_constraints_within_a_promise() {
        let source =
            "bundle agent main {\nvars:\n  \"x\" string => \"y\", ifvarclass => \"linux\";\n}\n";
        let result = format_str(source, &FormatConfig::default()).unwrap();
        // "string" (6 chars) is shorter than "ifvarclass" (10 chars), so its arrow gets 4 extra
        // columns of padding to line up with ifvarclass's.
        assert!(result.contains("string     =>"));
        assert!(result.contains("ifvarclass =>"));
    }

    #[test]
    fn removes_empty_promise_types_when_configured() {
        let source = "bundle agent main {\nvars:\nclasses:\n  \"x\" expression => \"y\";\n}\n";
        let config = FormatConfig {
            removes_empty_promise_types: true,
            ..FormatConfig::default()
        };
        let result = format_str(source, &config).unwrap();
        assert!(!result.contains("vars:"));
        assert!(result.contains("classes:"));
    }

    #[test]
    fn sorts_promise_types_to_evaluation_order_when_configured() {
        let source = "bundle agent main {\nreports:\n  \"late\";\nvars:\n  \"x\" string => \"y\";\n}\n";
        let config = FormatConfig {
            sorts_promise_types_to_evaluation_order: true,
            ..FormatConfig::default()
        };
        let result = format_str(source, &config).unwrap();
        assert!(result.find("vars:").unwrap() < result.find("reports:").unwrap());
    }

    #[test]
    fn preserves_standalone_and_trailing_comments() {
        let source =
            "# header\nbundle agent main {\nvars:\n  \"x\" string => \"y\"; # trailing\n}\n";
        let result = format_str(source, &FormatConfig::default()).unwrap();
        assert!(result.starts_with("# header\n"));
        assert!(result.contains("; # trailing"));
    }

    #[test]
    fn formats_body_selections_as_a_flat_class_selection_list() {
        let source = "body file control {\n  inputs => { \"a.cf\" };\n}\n";
        let result = format_str(source, &FormatConfig::default()).unwrap();
        assert!(result.starts_with("body file control {\n\n"));
        assert!(result.contains("inputs"));
        assert!(result.contains("\"a.cf\""));
    }

    #[test]
    fn rejects_unterminated_policy_as_a_parse_error() {
        let source = "bundle agent main {\nvars:\n  \"x\" string => { \"a\";\n}\n";
        let error = format_str(source, &FormatConfig::default()).unwrap_err();
        assert!(matches!(error, Error::ParseError(_)));
    }
}
