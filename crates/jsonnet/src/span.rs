//! Source positions and ranges, threaded from the lexer through every AST
//! node and into runtime diagnostics.

use std::{fmt, rc::Rc};

/// A file name shared by every position that originates from the same
/// source unit (the top-level program or an imported file).
///
/// Cheaply cloned: every `Pos` in a parse carries one of these.
pub type FileName = Rc<str>;

/// A single point in a source file, 1-based line/column, 0-based byte
/// offset (matches the convention of most editor integrations).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Pos {
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

impl Pos {
    pub const START: Self = Self { line: 1, column: 1, offset: 0 };
}

/// A half-open byte range `[start, end)` within a named source file.
///
/// This is the "source-position record attached from the lexer through
/// every AST node" that spec.md §2 calls out as the only cross-cutting
/// concern in the system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Span {
    pub file: FileName,
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub fn new(file: FileName, start: Pos, end: Pos) -> Self {
        Self { file, start, end }
    }

    /// Merges two spans from the same file into the smallest span covering
    /// both. Used by the parser to widen a node's span to include its
    /// children and by the desugarer to preserve original positions on
    /// rewritten nodes.
    pub fn merge(&self, other: &Self) -> Self {
        debug_assert_eq!(self.file, other.file, "cannot merge spans from different files");
        let start = if self.start.offset <= other.start.offset { self.start } else { other.start };
        let end = if self.end.offset >= other.end.offset { self.end } else { other.end };
        Self { file: self.file.clone(), start, end }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(f, "{}:{}:{}-{}", self.file, self.start.line, self.start.column, self.end.column)
        } else {
            write!(
                f,
                "{}:{}:{}-{}:{}",
                self.file, self.start.line, self.start.column, self.end.line, self.end.column
            )
        }
    }
}
