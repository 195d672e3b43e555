/// Indentation unit used throughout the engine; CFEngine policy is conventionally indented in
/// multiples of four columns regardless of the CLI's reported tab width.
pub const TAB_SIZE: usize = 4;

/// One line of output: leading text, an optional indent (added by the parent that placed this
/// line), and any end-of-line comment fragments trailing it. Indent is `Option` rather than a bare
/// `0` so that `join` can tell "no indent set yet" apart from "explicitly flush left".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub indent: Option<usize>,
    pub end_comments: Vec<Line>,
}

impl Line {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            indent: None,
            end_comments: vec![],
        }
    }

    pub fn blank() -> Self {
        Line::new("")
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = Some(indent);
        self
    }

    pub fn with_end_comment(mut self, comment: Line) -> Self {
        self.end_comments.push(comment);
        self
    }

    pub fn length(&self) -> usize {
        self.indent.unwrap_or(0)
            + self.text.chars().count()
            + self.end_comments.iter().map(Line::length).sum::<usize>()
    }

    /// Concatenates text, keeps `self`'s indent unless unset, and appends `other`'s end comments.
    pub fn join(mut self, other: Line) -> Line {
        self.text.push_str(&other.text);
        if self.indent.is_none() {
            self.indent = other.indent;
        }
        self.end_comments.extend(other.end_comments);
        self
    }
}

/// Splices a sequence of line lists horizontally: the last line of one list is joined to the
/// first line of the next, and the remaining lines of each list are appended as-is. This is the
/// only primitive by which multi-line fragments combine side by side (e.g. a promiser followed by
/// its constraint list).
pub fn join_lines(parts: impl IntoIterator<Item = Vec<Line>>) -> Vec<Line> {
    let mut result: Vec<Line> = vec![];
    for part in parts {
        if part.is_empty() {
            continue;
        }
        match result.pop() {
            Some(last) => {
                let mut iter = part.into_iter();
                let first = iter.next().expect("checked non-empty above");
                result.push(last.join(first));
                result.extend(iter);
            }
            None => result.extend(part),
        }
    }
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriState {
    Yes,
    No,
    Inherit,
}

impl TriState {
    pub fn resolve(self, node_value: bool) -> bool {
        match self {
            TriState::Yes => true,
            TriState::No => false,
            TriState::Inherit => node_value,
        }
    }
}

/// Per-subtree formatting context. Small and `Copy`, so every `child(...)` call is a cheap value
/// copy rather than a shared mutable structure.
#[derive(Debug, Clone, Copy)]
pub struct LayoutOptions {
    pub page_width: usize,
    pub indent: usize,
    pub ancestor_indent: usize,
    pub may_line_break_constraint: bool,
    pub respects_preceding_empty_line: TriState,
    pub allow_braceless_argument_list: bool,
}

impl LayoutOptions {
    pub fn new(page_width: usize) -> Self {
        Self {
            page_width,
            indent: 0,
            ancestor_indent: 0,
            may_line_break_constraint: true,
            respects_preceding_empty_line: TriState::Inherit,
            allow_braceless_argument_list: false,
        }
    }

    pub fn depth(&self) -> usize {
        self.indent + self.ancestor_indent
    }

    pub fn available_width(&self) -> usize {
        self.page_width.saturating_sub(self.depth())
    }

    /// Returns a copy scoped to a child subtree: accumulates `indent` into `ancestor_indent` and
    /// sets the new `indent` to the sum of the given extra depths (fixed column counts, or the
    /// length of some already-rendered line the child must align past).
    pub fn child(&self, extra_depths: &[usize]) -> Self {
        Self {
            ancestor_indent: self.ancestor_indent + self.indent,
            indent: extra_depths.iter().sum(),
            respects_preceding_empty_line: TriState::Inherit,
            ..*self
        }
    }

    pub fn with_respects_preceding_empty_line(mut self, value: TriState) -> Self {
        self.respects_preceding_empty_line = value;
        self
    }

    pub fn with_may_line_break_constraint(mut self, value: bool) -> Self {
        self.may_line_break_constraint = value;
        self
    }

    pub fn with_allow_braceless_argument_list(mut self, value: bool) -> Self {
        self.allow_braceless_argument_list = value;
        self
    }

}

/// Sets every line's indent to `depth` plus whatever indent it already carries, first line
/// included. Use this to place a freestanding fragment that starts a new output line (a list
/// item, a block's body, a wrapped constraint value).
pub fn place_at_depth(lines: Vec<Line>, depth: usize) -> Vec<Line> {
    lines
        .into_iter()
        .map(|mut line| {
            line.indent = Some(depth + line.indent.unwrap_or(0));
            line
        })
        .collect()
}

/// A single line of plain text, for splicing into a fragment via `join_lines`.
pub fn text_line(text: impl Into<String>) -> Vec<Line> {
    vec![Line::new(text)]
}

/// Runs each candidate in order and returns the first whose longest line fits
/// `options.available_width()`. Falls back to the last candidate if none fit.
pub fn first_that_fits<'a>(
    options: &LayoutOptions,
    candidates: impl IntoIterator<Item = Box<dyn FnOnce(&LayoutOptions) -> Vec<Line> + 'a>>,
) -> Vec<Line> {
    let available = options.available_width();
    let mut fallback = None;
    for candidate in candidates {
        let lines = candidate(options);
        if lines.iter().all(|line| line.length() <= available) {
            return lines;
        }
        fallback = Some(lines);
    }
    fallback.unwrap_or_default()
}
