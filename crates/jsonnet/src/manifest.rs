//! JSON manifestation: turning a fully-evaluated [`Value`] into the JSON
//! text a Jsonnet program produces as output (spec.md §4.7).
//!
//! Field order follows [`ObjectValue::field_names`]'s "first introduced,
//! last overridden" rule; hidden (`::`) fields are skipped; every object's
//! asserts are forced (via [`object::get_field`]'s `ensure_asserts`, which
//! already runs the first time any field on that instance is read) before
//! its fields are read.

use crate::error::Diagnostic;
use crate::eval::Evaluator;
use crate::object;
use crate::span::Span;
use crate::value::Value;

/// Default indentation unit used by the CLI and the embedding API unless
/// overridden, matching the reference implementation's own default.
pub const DEFAULT_INDENT: &str = "   ";

/// Renders `v` as pretty-printed JSON, repeating `indent` once per nesting
/// level (an empty string collapses to compact, single-line output).
pub fn manifest_json(evaluator: &mut Evaluator, v: &Value, span: &Span, indent: &str) -> Result<String, Diagnostic> {
    let mut out = String::new();
    write_value(evaluator, v, span, indent, 0, &mut out)?;
    Ok(out)
}

/// Renders `v` the way `std.toString` and assert/error messages do:
/// strings pass through verbatim, everything else manifests as compact
/// JSON (no added whitespace) so a string concatenated with `+` doesn't
/// pick up stray newlines.
pub fn display_string(evaluator: &mut Evaluator, v: &Value, span: &Span) -> Result<String, Diagnostic> {
    if let Value::Str(s) = v {
        return Ok(s.to_string());
    }
    let mut out = String::new();
    write_value(evaluator, v, span, "", 0, &mut out)?;
    Ok(out)
}

fn write_value(evaluator: &mut Evaluator, v: &Value, span: &Span, indent: &str, depth: usize, out: &mut String) -> Result<(), Diagnostic> {
    match v {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(*n, span, out)?,
        Value::Str(s) => write_json_string(s, out),
        Value::Array(items) => {
            if items.is_empty() {
                out.push_str("[ ]");
            } else {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    push_newline_indent(out, indent, depth + 1);
                    let value = evaluator.force(item)?;
                    write_value(evaluator, &value, span, indent, depth + 1, out)?;
                }
                push_newline_indent(out, indent, depth);
                out.push(']');
            }
        }
        Value::Object(obj) => {
            let names = obj.field_names(false);
            if names.is_empty() {
                out.push_str("{ }");
            } else {
                out.push('{');
                for (i, name) in names.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    push_newline_indent(out, indent, depth + 1);
                    write_json_string(name, out);
                    out.push(':');
                    if !indent.is_empty() {
                        out.push(' ');
                    }
                    let value = object::get_field(evaluator, obj, name, span)?;
                    write_value(evaluator, &value, span, indent, depth + 1, out)?;
                }
                push_newline_indent(out, indent, depth);
                out.push('}');
            }
        }
        Value::Function(_) => return Err(Diagnostic::runtime("tried to manifest a function value", span.clone())),
    }
    Ok(())
}

fn push_newline_indent(out: &mut String, indent: &str, depth: usize) {
    if !indent.is_empty() {
        out.push('\n');
        for _ in 0..depth {
            out.push_str(indent);
        }
    }
}

fn write_number(n: f64, span: &Span, out: &mut String) -> Result<(), Diagnostic> {
    if !n.is_finite() {
        return Err(Diagnostic::runtime("tried to manifest a non-finite number (NaN or infinity)", span.clone()));
    }
    if n == n.trunc() && n.abs() < 1e15 {
        out.push_str(&(n as i64).to_string());
    } else {
        out.push_str(&format!("{n}"));
    }
    Ok(())
}

/// Escapes `s` per JSON's string grammar; reuses `serde_json`'s string
/// encoder rather than re-deriving the escape table the lexer already
/// implements in reverse.
fn write_json_string(s: &str, out: &mut String) {
    match serde_json::to_string(s) {
        Ok(escaped) => out.push_str(&escaped),
        Err(_) => out.push_str("\"\""),
    }
}
