//! Lexer, parser, desugarer and lazy tree-walking evaluator for the
//! Jsonnet configuration language.
//!
//! The pipeline is a straight line, each stage owning one file:
//! [`lexer`] → [`parser`] (producing the sugared [`ast`]) → [`desugar`]
//! (lowering to the primitive [`core`] tree) → [`eval`] (walking `core`
//! against an [`env::Env`], producing a [`value::Value`]) → [`manifest`]
//! (rendering a `Value` as JSON). [`object`] and [`function`] hold the two
//! pieces of runtime semantics dense enough to earn their own module:
//! `+` inheritance/`super` resolution, and parameter binding. [`builtins`]
//! and [`stdlib`] together build the `std` value every program starts
//! with; [`resolver`] is the `import` capability an embedder plugs in.
//!
//! [`evaluate`] and [`evaluate_to_value`] are the embedding entry points;
//! the CLI crate is a thin layer over the same two functions plus a
//! filesystem-backed [`resolver::ImportResolver`].

mod ast;
mod builtins;
mod core;
mod desugar;
mod env;
pub mod error;
mod eval;
mod function;
mod lexer;
mod manifest;
mod object;
mod parser;
pub mod resolver;
pub mod resource;
mod span;
pub mod stdlib;
pub mod tracer;
mod value;

use std::rc::Rc;

use crate::env::Env;
use crate::error::Diagnostic;
use crate::eval::{ExtVars, synthetic_span};
use crate::resolver::{ImportResolver, NullResolver};
use crate::resource::{LimitedTracker, ResourceTracker};
use crate::tracer::{NoopTracer, VmTracer};
use crate::value::Thunk;

pub use crate::error::{EvalResult, Stage, StackFrame};
pub use crate::eval::Evaluator;
pub use crate::resolver::{ImportError, InMemoryResolver};
pub use crate::resource::{DEFAULT_MAX_RECURSION_DEPTH, NoLimitTracker, ResourceError};
pub use crate::span::{FileName, Pos, Span};
pub use crate::tracer::{RecordingTracer, StderrTracer, TraceEvent};
pub use crate::value::Value;

/// Top-level knobs for [`evaluate`]/[`evaluate_to_value`], covering every
/// option the CLI exposes (spec.md §6): external variables, top-level
/// arguments, the recursion ceiling, output shape, and the two
/// embedder-supplied capabilities (import resolution, tracing).
///
/// Takes ownership rather than borrowing, since [`resolver::ImportResolver`]
/// and [`tracer::VmTracer`] are trait objects with no generic `Clone`.
pub struct EvalOptions {
    /// `--ext-str name=value` pairs: bound as literal strings.
    pub ext_vars: Vec<(String, String)>,
    /// `--ext-code name=expr` pairs: parsed and evaluated as Jsonnet.
    pub ext_codes: Vec<(String, String)>,
    /// `--tla-str name=value` pairs, applied if the entry point evaluates
    /// to a function.
    pub tla_vars: Vec<(String, String)>,
    /// `--tla-code name=expr` pairs, likewise applied as named arguments.
    pub tla_codes: Vec<(String, String)>,
    /// `--max-stack`; `None` uses [`DEFAULT_MAX_RECURSION_DEPTH`].
    pub max_stack: Option<usize>,
    /// `-S`/`--string`: the program must evaluate to a string, printed
    /// raw instead of being JSON-manifested.
    pub string_output: bool,
    /// Repeated once per nesting level by [`evaluate`]'s JSON output.
    pub indent: String,
    pub import_resolver: Box<dyn ImportResolver>,
    pub tracer: Box<dyn VmTracer>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            ext_vars: Vec::new(),
            ext_codes: Vec::new(),
            tla_vars: Vec::new(),
            tla_codes: Vec::new(),
            max_stack: None,
            string_output: false,
            indent: manifest::DEFAULT_INDENT.to_string(),
            import_resolver: Box::new(NullResolver),
            tracer: Box::new(NoopTracer),
        }
    }
}

/// Evaluates `source` and renders the result the way the CLI does: JSON
/// (indented per [`EvalOptions::indent`]) unless `string_output` is set, in
/// which case the program must evaluate to a string and that string is
/// returned verbatim.
pub fn evaluate(source: &str, file: impl Into<FileName>, options: EvalOptions) -> Result<String, Diagnostic> {
    let indent = options.indent.clone();
    let string_output = options.string_output;
    let (mut evaluator, value) = run(source, file.into(), options)?;
    let span = synthetic_span(evaluator.current_file());
    if string_output {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            other => Err(Diagnostic::runtime(
                format!("expected a string result since -S was used, got {}", other.type_name()),
                span,
            )),
        }
    } else {
        manifest::manifest_json(&mut evaluator, &value, &span, &indent)
    }
}

/// Evaluates `source` and returns the raw [`Value`], for embedders that
/// want to inspect the result themselves rather than go through JSON.
pub fn evaluate_to_value(source: &str, file: impl Into<FileName>, options: EvalOptions) -> Result<Value, Diagnostic> {
    run(source, file.into(), options).map(|(_, v)| v)
}

fn run(source: &str, file: FileName, options: EvalOptions) -> Result<(Evaluator, Value), Diagnostic> {
    let EvalOptions { ext_vars, ext_codes, tla_vars, tla_codes, max_stack, import_resolver, tracer, .. } = options;

    let std_value = stdlib::build_std();
    let root_env = Env::root().bind(Rc::from("std"), Thunk::ready(std_value.clone()));

    let mut ext_var_thunks: ExtVars = ExtVars::default();
    for (name, text) in &ext_vars {
        ext_var_thunks.insert(Rc::from(name.as_str()), Thunk::ready(Value::str(text.clone())));
    }
    for (name, code) in &ext_codes {
        let ext_file: FileName = Rc::from(format!("<ext-code:{name}>"));
        let ast = parser::parse(code, ext_file.clone()).map_err(Diagnostic::from)?;
        let core = desugar::desugar(&ast);
        desugar::check_static(&core)?;
        ext_var_thunks.insert(Rc::from(name.as_str()), Thunk::new(core, root_env.clone()));
    }

    let tracker: Box<dyn ResourceTracker> = Box::new(match max_stack {
        Some(limit) => LimitedTracker::new(limit),
        None => LimitedTracker::default(),
    });

    let ast = parser::parse(source, file.clone()).map_err(Diagnostic::from)?;
    let core = desugar::desugar(&ast);
    desugar::check_static(&core)?;

    let mut evaluator = Evaluator::new(import_resolver, tracker, tracer, std_value, ext_var_thunks, file);
    let top_env = evaluator.root_env();
    let mut value = evaluator.eval(&core, &top_env)?;

    if !tla_vars.is_empty() || !tla_codes.is_empty() {
        let Value::Function(func) = value else {
            return Err(Diagnostic::runtime(
                format!("top-level arguments were given but the entry point is a {}, not a function", value.type_name()),
                synthetic_span(evaluator.current_file()),
            ));
        };
        let mut named: Vec<(Rc<str>, Thunk)> = Vec::with_capacity(tla_vars.len() + tla_codes.len());
        for (name, text) in &tla_vars {
            named.push((Rc::from(name.as_str()), Thunk::ready(Value::str(text.clone()))));
        }
        for (name, code) in &tla_codes {
            let tla_file: FileName = Rc::from(format!("<tla-code:{name}>"));
            let ast = parser::parse(code, tla_file.clone()).map_err(Diagnostic::from)?;
            let core = desugar::desugar(&ast);
            desugar::check_static(&core)?;
            named.push((Rc::from(name.as_str()), Thunk::new(core, evaluator.root_env())));
        }
        let span = synthetic_span(evaluator.current_file());
        value = evaluator.call_named(&func, &named, &span)?;
    }

    Ok((evaluator, value))
}
