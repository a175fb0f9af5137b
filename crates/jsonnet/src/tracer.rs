//! Evaluation tracing, standing in for the `log`/`tracing` crates the rest
//! of the ecosystem reaches for.
//!
//! Mirrors the teacher's `VmTracer` design: a trait with no-op default
//! methods so [`NoopTracer`] costs nothing, concrete implementations for
//! stderr logging and in-memory recording, and hook points at the handful
//! of events worth observing in a lazy evaluator — thunk forcing, function
//! calls, and `std.trace` calls from user code.

use crate::span::Span;

/// One recorded event, used by [`RecordingTracer`] for post-mortem
/// inspection (e.g. in tests asserting evaluation order).
#[derive(Debug, Clone)]
pub enum TraceEvent {
    ThunkForce { span: Span, depth: usize },
    Call { name: Option<String>, depth: usize },
    Return { depth: usize },
    UserTrace { message: String, span: Span },
}

/// Hook points the evaluator calls into during a run. Default
/// implementations are empty so `NoopTracer` compiles away entirely.
pub trait VmTracer: std::fmt::Debug {
    fn on_thunk_force(&mut self, _span: &Span, _depth: usize) {}
    fn on_call(&mut self, _name: Option<&str>, _depth: usize) {}
    fn on_return(&mut self, _depth: usize) {}
    /// Called by the native `std.trace` builtin. Implementations that want
    /// `std.trace`'s classic stderr behavior should override this; the
    /// default is silent so swapping tracers doesn't change evaluation
    /// semantics, only observability.
    fn on_user_trace(&mut self, _message: &str, _span: &Span) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl VmTracer for NoopTracer {}

/// Writes a human-readable log to stderr, including `std.trace` output —
/// this is the tracer the CLI wires up when `std.trace` is expected to
/// behave like the reference implementation's stderr side channel.
#[derive(Debug, Default)]
pub struct StderrTracer {
    limit: Option<usize>,
    count: usize,
}

impl StderrTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit), count: 0 }
    }

    fn at_limit(&self) -> bool {
        self.limit.is_some_and(|l| self.count >= l)
    }
}

impl VmTracer for StderrTracer {
    fn on_thunk_force(&mut self, span: &Span, depth: usize) {
        if self.at_limit() {
            return;
        }
        eprintln!("force {span} (depth={depth})");
        self.count += 1;
    }

    fn on_call(&mut self, name: Option<&str>, depth: usize) {
        if self.at_limit() {
            return;
        }
        eprintln!("  >>> call {} depth={depth}", name.unwrap_or("<anonymous>"));
    }

    fn on_return(&mut self, depth: usize) {
        if self.at_limit() {
            return;
        }
        eprintln!("  <<< return depth={depth}");
    }

    fn on_user_trace(&mut self, message: &str, span: &Span) {
        eprintln!("TRACE: {span} {message}");
    }
}

/// Captures every event for assertions in tests or tooling that wants a
/// full execution history rather than a live stderr stream.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }
}

impl VmTracer for RecordingTracer {
    fn on_thunk_force(&mut self, span: &Span, depth: usize) {
        self.events.push(TraceEvent::ThunkForce { span: span.clone(), depth });
    }

    fn on_call(&mut self, name: Option<&str>, depth: usize) {
        self.events.push(TraceEvent::Call { name: name.map(String::from), depth });
    }

    fn on_return(&mut self, depth: usize) {
        self.events.push(TraceEvent::Return { depth });
    }

    fn on_user_trace(&mut self, message: &str, span: &Span) {
        self.events.push(TraceEvent::UserTrace { message: message.to_owned(), span: span.clone() });
    }
}
