//! The diagnostic hierarchy shared by every stage of the pipeline.
//!
//! Mirrors the teacher's exception design (one error enum, manual
//! [`fmt::Display`], a traceback built from stack frames) scaled down to
//! what a Jsonnet pipeline needs: lexing, parsing, static checks and
//! evaluation each produce the same shape of error so the CLI and the
//! embedding API have a single type to report.

use std::fmt;

use crate::lexer::LexError;
use crate::parser::ParseError;
use crate::span::Span;

/// One entry in an evaluation traceback, innermost frame first.
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub span: Span,
    /// `None` for anonymous call sites (e.g. top-level program evaluation).
    pub description: Option<String>,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(desc) => write!(f, "{}: {}", self.span, desc),
            None => write!(f, "{}", self.span),
        }
    }
}

/// What stage of the pipeline produced the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Stage {
    #[strum(serialize = "lexer")]
    Lex,
    #[strum(serialize = "parser")]
    Parse,
    #[strum(serialize = "static check")]
    Static,
    #[strum(serialize = "runtime")]
    Runtime,
}

/// A single Jsonnet diagnostic: what went wrong, where, and the call stack
/// active when it was raised. This is the only error type the public API
/// surfaces (see `lib.rs`); every internal error converts into one of these
/// before crossing back out to a caller.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub stage: Stage,
    pub message: String,
    pub span: Span,
    pub stack: Vec<StackFrame>,
}

impl Diagnostic {
    pub fn new(stage: Stage, message: impl Into<String>, span: Span) -> Self {
        Self { stage, message: message.into(), span, stack: Vec::new() }
    }

    pub fn runtime(message: impl Into<String>, span: Span) -> Self {
        Self::new(Stage::Runtime, message, span)
    }

    pub fn with_frame(mut self, frame: StackFrame) -> Self {
        self.stack.push(frame);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {} error: {}", self.span, self.stage, self.message)?;
        for frame in &self.stack {
            writeln!(f, "\tat {frame}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

impl From<LexError> for Diagnostic {
    fn from(e: LexError) -> Self {
        Self::new(Stage::Lex, e.message, e.span)
    }
}

impl From<ParseError> for Diagnostic {
    fn from(e: ParseError) -> Self {
        Self::new(Stage::Parse, e.message, e.span)
    }
}

pub type EvalResult<T> = Result<T, Diagnostic>;
