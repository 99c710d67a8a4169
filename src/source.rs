//! Character cursor over a source string.
//!
//! The cursor is the only stage that knows raw text. Later stages ask it
//! for diagnostics so every error carries the offending line and the
//! lines around it.

use std::fmt;

/// A point in the source text.
///
/// `line` and `column` are 1-based, `index` is the byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub index: usize,
}

impl Position {
    /// Position of the first character.
    #[must_use]
    pub const fn start() -> Self {
        Self {
            line: 1,
            column: 1,
            index: 0,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::start()
    }
}

/// One line of source shown around a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextLine {
    pub number: usize,
    pub text: String,
}

/// A fatal condition tied to a source location, with surrounding context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub source_name: Option<String>,
    pub line: usize,
    pub column: usize,
    /// At most three lines: the one before, the failing one, the one after.
    pub context: Vec<ContextLine>,
}

impl Diagnostic {
    /// Attach the name of the source (usually a file path).
    #[must_use]
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        let name = self.source_name.as_deref().unwrap_or("<input>");
        let gutter = self
            .context
            .iter()
            .map(|l| l.number.to_string().len())
            .max()
            .unwrap_or(1);

        writeln!(f, "{:gutter$}--> {name}:{}:{}", "", self.line, self.column)?;
        writeln!(f, "{:gutter$} |", "")?;

        for line in &self.context {
            writeln!(f, "{:>gutter$} | {}", line.number, line.text)?;
            if line.number == self.line {
                let pad = self.column.saturating_sub(1);
                writeln!(f, "{:gutter$} | {:pad$}^", "", "")?;
            }
        }

        Ok(())
    }
}

/// Scanning position over a source string.
#[derive(Debug, Clone)]
pub struct SourceCursor<'a> {
    source: &'a str,
    position: Position,
}

impl<'a> SourceCursor<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        let mut position = Position::start();
        if source.starts_with('\u{FEFF}') {
            position.index = '\u{FEFF}'.len_utf8();
        }
        Self { source, position }
    }

    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Look at the character `offset` places ahead without consuming it.
    #[must_use]
    pub fn peek(&self, offset: usize) -> Option<char> {
        self.source
            .get(self.position.index..)
            .and_then(|rest| rest.chars().nth(offset))
    }

    #[must_use]
    pub const fn eof(&self) -> bool {
        self.position.index >= self.source.len()
    }

    /// Build a diagnostic for `message`, defaulting to the current position.
    #[must_use]
    pub fn fail(
        &self,
        message: impl Into<String>,
        line: Option<usize>,
        column: Option<usize>,
    ) -> Diagnostic {
        let line = line.unwrap_or(self.position.line);
        let column = column.unwrap_or(self.position.column);

        Diagnostic {
            message: message.into(),
            source_name: None,
            line,
            column,
            context: context_lines(self.source, line),
        }
    }
}

impl Iterator for SourceCursor<'_> {
    type Item = char;

    /// Return the current character and advance past it.
    fn next(&mut self) -> Option<char> {
        let ch = self.peek(0)?;
        self.position.index += ch.len_utf8();

        let line_break = match ch {
            '\n' => true,
            // \r\n counts once, on the \n
            '\r' => self.peek(0) != Some('\n'),
            _ => false,
        };

        if line_break {
            self.position.line += 1;
            self.position.column = 1;
        } else {
            self.position.column += 1;
        }

        Some(ch)
    }
}

fn context_lines(source: &str, line: usize) -> Vec<ContextLine> {
    let first = line.saturating_sub(1).max(1);
    let last = line + 1;

    source
        .lines()
        .enumerate()
        .map(|(i, text)| (i + 1, text))
        .filter(|(number, _)| (first..=last).contains(number))
        .map(|(number, text)| ContextLine {
            number,
            text: text.trim_end_matches('\r').to_string(),
        })
        .collect()
}
