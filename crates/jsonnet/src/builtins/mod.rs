//! Native implementations of the `std` functions that can't be written in
//! Jsonnet itself: type introspection, the higher-order iteration
//! primitives everything else in `stdlib/std.jsonnet` is built from, string
//! encoding/formatting, and host interaction (`extVar`, `thisFile`,
//! `trace`). Grounded on the same shape the desugarer already assumes
//! (`crate::desugar`'s calls to `std.slice`/`std.objectHasAll`) and wired
//! into a plain [`ObjectValue`] the same way a literal `{ ... }` object
//! would be, just with [`FieldBody::Native`] bodies instead of core AST.

pub mod format;

use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::Diagnostic;
use crate::eval::Evaluator;
use crate::manifest;
use crate::span::Span;
use crate::value::{FieldBody, FieldDef, FieldVisibility, FunctionValue, NativeFn, ObjectLayer, ObjectValue, Thunk, Value};

fn arg(evaluator: &mut Evaluator, args: &[Thunk], i: usize) -> Result<Value, Diagnostic> {
    evaluator.force(&args[i])
}

fn expect_str(v: Value, span: &Span, who: &str) -> Result<Rc<str>, Diagnostic> {
    match v {
        Value::Str(s) => Ok(s),
        other => Err(Diagnostic::runtime(format!("{who}: expected a string, got {}", other.type_name()), span.clone())),
    }
}

fn expect_number(v: Value, span: &Span, who: &str) -> Result<f64, Diagnostic> {
    match v {
        Value::Number(n) => Ok(n),
        other => Err(Diagnostic::runtime(format!("{who}: expected a number, got {}", other.type_name()), span.clone())),
    }
}

fn expect_array(v: Value, span: &Span, who: &str) -> Result<Rc<Vec<Thunk>>, Diagnostic> {
    match v {
        Value::Array(a) => Ok(a),
        other => Err(Diagnostic::runtime(format!("{who}: expected an array, got {}", other.type_name()), span.clone())),
    }
}

fn expect_object(v: Value, span: &Span, who: &str) -> Result<Rc<ObjectValue>, Diagnostic> {
    match v {
        Value::Object(o) => Ok(o),
        other => Err(Diagnostic::runtime(format!("{who}: expected an object, got {}", other.type_name()), span.clone())),
    }
}

fn expect_function(v: Value, span: &Span, who: &str) -> Result<Rc<FunctionValue>, Diagnostic> {
    match v {
        Value::Function(f) => Ok(f),
        other => Err(Diagnostic::runtime(format!("{who}: expected a function, got {}", other.type_name()), span.clone())),
    }
}

fn call_span(name: &str) -> Span {
    crate::eval::synthetic_span(Rc::from(format!("<std.{name}>")))
}

/// One entry in the native registry: `name` is how it's exposed under
/// `std.`, `params` are its positional parameter names (native functions
/// take no defaults — every default Jsonnet's `std` exposes is applied by
/// the pure-Jsonnet wrapper layer in `stdlib/std.jsonnet`), `func` is the
/// implementation.
struct Entry {
    name: &'static str,
    params: &'static [&'static str],
    func: NativeFn,
}

fn entry(name: &'static str, params: &'static [&'static str], func: impl Fn(&mut Evaluator, &[Thunk]) -> Result<Value, Diagnostic> + 'static) -> Entry {
    Entry { name, params, func: Rc::new(func) }
}

/// Builds the native half of `std`. [`crate::stdlib::build_std`] layers the
/// pure-Jsonnet half on top of this by evaluating the bundled
/// `std.jsonnet` source with this object already bound, so Jsonnet-defined
/// helpers can call straight through to these.
pub fn build_native_std() -> Value {
    let mut fields = IndexMap::new();
    for e in registry() {
        let body = FieldBody::Native(Value::Function(Rc::new(FunctionValue::Native { name: Rc::from(e.name), params: e.params.iter().map(|p| Rc::from(*p)).collect(), func: e.func })));
        fields.insert(Rc::from(e.name) as Rc<str>, FieldDef { visibility: FieldVisibility::Hidden, plus: false, body });
    }
    Value::Object(Rc::new(ObjectValue::new(vec![ObjectLayer { fields, asserts: Vec::new() }])))
}

fn registry() -> Vec<Entry> {
    vec![
        entry("type", &["x"], |e, a| {
            let v = arg(e, a, 0)?;
            Ok(Value::str(v.type_name()))
        }),
        entry("length", &["x"], |e, a| {
            let span = call_span("length");
            let v = arg(e, a, 0)?;
            let n = match v {
                Value::Str(s) => s.chars().count(),
                Value::Array(items) => items.len(),
                Value::Object(o) => o.field_names(false).len(),
                Value::Function(f) => f.params().len(),
                other => return Err(Diagnostic::runtime(format!("length: argument must be a string, array, object, or function, got {}", other.type_name()), span)),
            };
            Ok(Value::Number(n as f64))
        }),
        entry("makeArray", &["sz", "func"], |e, a| {
            let span = call_span("makeArray");
            let n = expect_number(arg(e, a, 0)?, &span, "makeArray")? as i64;
            let func = expect_function(arg(e, a, 1)?, &span, "makeArray")?;
            let mut items = Vec::with_capacity(n.max(0) as usize);
            for i in 0..n {
                let idx = Thunk::ready(Value::Number(i as f64));
                let v = e.call_value(&func, &[idx], &span)?;
                items.push(Thunk::ready(v));
            }
            Ok(Value::Array(Rc::new(items)))
        }),
        entry("filter", &["func", "arr"], |e, a| {
            let span = call_span("filter");
            let func = expect_function(arg(e, a, 0)?, &span, "filter")?;
            let items = expect_array(arg(e, a, 1)?, &span, "filter")?;
            let mut out = Vec::new();
            for item in items.iter() {
                let keep = e.call_value(&func, &[item.clone()], &span)?;
                if keep.truthy() {
                    out.push(item.clone());
                }
            }
            Ok(Value::Array(Rc::new(out)))
        }),
        entry("map", &["func", "arr"], |e, a| {
            let span = call_span("map");
            let func = expect_function(arg(e, a, 0)?, &span, "map")?;
            let items = expect_array(arg(e, a, 1)?, &span, "map")?;
            let mut out = Vec::with_capacity(items.len());
            for item in items.iter() {
                let v = e.call_value(&func, &[item.clone()], &span)?;
                out.push(Thunk::ready(v));
            }
            Ok(Value::Array(Rc::new(out)))
        }),
        entry("foldl", &["func", "arr", "init"], |e, a| {
            let span = call_span("foldl");
            let func = expect_function(arg(e, a, 0)?, &span, "foldl")?;
            let items = expect_array(arg(e, a, 1)?, &span, "foldl")?;
            let mut acc = arg(e, a, 2)?;
            for item in items.iter() {
                acc = e.call_value(&func, &[Thunk::ready(acc), item.clone()], &span)?;
            }
            Ok(acc)
        }),
        entry("foldr", &["func", "arr", "init"], |e, a| {
            let span = call_span("foldr");
            let func = expect_function(arg(e, a, 0)?, &span, "foldr")?;
            let items = expect_array(arg(e, a, 1)?, &span, "foldr")?;
            let mut acc = arg(e, a, 2)?;
            for item in items.iter().rev() {
                acc = e.call_value(&func, &[item.clone(), Thunk::ready(acc)], &span)?;
            }
            Ok(acc)
        }),
        entry("objectHasEx", &["obj", "fname", "hidden"], |e, a| {
            let span = call_span("objectHasEx");
            let obj = expect_object(arg(e, a, 0)?, &span, "objectHasEx")?;
            let name = expect_str(arg(e, a, 1)?, &span, "objectHasEx")?;
            let hidden = arg(e, a, 2)?.truthy();
            let has = if hidden { obj.has_field(&name) } else { obj.field_names(false).contains(&name) };
            Ok(Value::Bool(has))
        }),
        entry("objectHasAll", &["obj", "fname"], |e, a| {
            let span = call_span("objectHasAll");
            let obj = expect_object(arg(e, a, 0)?, &span, "objectHasAll")?;
            let name = expect_str(arg(e, a, 1)?, &span, "objectHasAll")?;
            Ok(Value::Bool(obj.has_field(&name)))
        }),
        entry("objectFieldsEx", &["obj", "hidden"], |e, a| {
            let span = call_span("objectFieldsEx");
            let obj = expect_object(arg(e, a, 0)?, &span, "objectFieldsEx")?;
            let hidden = arg(e, a, 1)?.truthy();
            let mut names = obj.field_names(hidden);
            names.sort();
            Ok(Value::Array(Rc::new(names.into_iter().map(|n| Thunk::ready(Value::str(n))).collect())))
        }),
        entry("slice", &["indexable", "from", "to", "step"], |e, a| {
            let span = call_span("slice");
            native_slice(e, arg(e, a, 0)?, arg(e, a, 1)?, arg(e, a, 2)?, arg(e, a, 3)?, &span)
        }),
        entry("codepoint", &["str"], |e, a| {
            let span = call_span("codepoint");
            let s = expect_str(arg(e, a, 0)?, &span, "codepoint")?;
            let ch = s.chars().next().ok_or_else(|| Diagnostic::runtime("codepoint: string must not be empty", span.clone()))?;
            Ok(Value::Number(ch as u32 as f64))
        }),
        entry("char", &["n"], |e, a| {
            let span = call_span("char");
            let n = expect_number(arg(e, a, 0)?, &span, "char")?;
            let ch = char::from_u32(n as u32).ok_or_else(|| Diagnostic::runtime(format!("char: {n} is not a valid codepoint"), span.clone()))?;
            Ok(Value::str(ch.to_string()))
        }),
        entry("substr", &["str", "from", "len"], |e, a| {
            let span = call_span("substr");
            let s = expect_str(arg(e, a, 0)?, &span, "substr")?;
            let from = expect_number(arg(e, a, 1)?, &span, "substr")? as usize;
            let len = expect_number(arg(e, a, 2)?, &span, "substr")? as usize;
            let chars: Vec<char> = s.chars().collect();
            let end = (from + len).min(chars.len());
            let start = from.min(chars.len());
            Ok(Value::str(chars[start..end].iter().collect::<String>()))
        }),
        entry("toString", &["a"], |e, a| {
            let span = call_span("toString");
            let v = arg(e, a, 0)?;
            manifest::display_string(e, &v, &span).map(Value::str)
        }),
        entry("format", &["str", "vals"], |e, a| {
            let span = call_span("format");
            let fmt = arg(e, a, 0)?;
            let vals = arg(e, a, 1)?;
            format::format_string(e, &fmt, &vals, &span)
        }),
        entry("mod", &["a", "b"], |e, a| {
            let span = call_span("mod");
            let l = arg(e, a, 0)?;
            let r = arg(e, a, 1)?;
            match (&l, &r) {
                (Value::Number(x), Value::Number(y)) => {
                    if *y == 0.0 {
                        return Err(Diagnostic::runtime("division by zero in mod", span));
                    }
                    Ok(Value::Number(x - y * (x / y).trunc()))
                }
                (Value::Str(_), _) => format::format_string(e, &l, &r, &span),
                _ => Err(Diagnostic::runtime(format!("mod: not defined for {} and {}", l.type_name(), r.type_name()), span)),
            }
        }),
        entry("equals", &["a", "b"], |e, a| {
            let span = call_span("equals");
            let l = arg(e, a, 0)?;
            let r = arg(e, a, 1)?;
            Ok(Value::Bool(e.values_equal(&l, &r, &span)?))
        }),
        entry("extVar", &["x"], |e, a| {
            let span = call_span("extVar");
            let name = expect_str(arg(e, a, 0)?, &span, "extVar")?;
            match e.ext_var(&name) {
                Some(t) => e.force(&t),
                None => Err(Diagnostic::runtime(format!("undefined external variable: {name}"), span)),
            }
        }),
        entry("thisFile", &[], |e, _a| Ok(Value::str(e.current_file().to_string()))),
        entry("trace", &["str", "rest"], |e, a| {
            let span = call_span("trace");
            let msg = expect_str(arg(e, a, 0)?, &span, "trace")?;
            e.trace(&msg, &span);
            arg(e, a, 1)
        }),
        entry("manifestJsonEx", &["value", "indent"], |e, a| {
            let span = call_span("manifestJsonEx");
            let v = arg(e, a, 0)?;
            let indent = expect_str(arg(e, a, 1)?, &span, "manifestJsonEx")?;
            manifest::manifest_json(e, &v, &span, &indent).map(Value::str)
        }),
        entry("asciiUpper", &["str"], |e, a| {
            let span = call_span("asciiUpper");
            let s = expect_str(arg(e, a, 0)?, &span, "asciiUpper")?;
            Ok(Value::str(s.to_ascii_uppercase()))
        }),
        entry("asciiLower", &["str"], |e, a| {
            let span = call_span("asciiLower");
            let s = expect_str(arg(e, a, 0)?, &span, "asciiLower")?;
            Ok(Value::str(s.to_ascii_lowercase()))
        }),
        entry("floor", &["x"], |e, a| numeric1(e, a, "floor", f64::floor)),
        entry("ceil", &["x"], |e, a| numeric1(e, a, "ceil", f64::ceil)),
        entry("sqrt", &["x"], |e, a| numeric1(e, a, "sqrt", f64::sqrt)),
        entry("abs", &["x"], |e, a| numeric1(e, a, "abs", f64::abs)),
        entry("sign", &["x"], |e, a| numeric1(e, a, "sign", f64::signum)),
        entry("exp", &["x"], |e, a| numeric1(e, a, "exp", f64::exp)),
        entry("log", &["x"], |e, a| numeric1(e, a, "log", f64::ln)),
        entry("pow", &["x", "n"], |e, a| {
            let span = call_span("pow");
            let x = expect_number(arg(e, a, 0)?, &span, "pow")?;
            let n = expect_number(arg(e, a, 1)?, &span, "pow")?;
            Ok(Value::Number(x.powf(n)))
        }),
        entry("flatMap", &["func", "arr"], |e, a| {
            let span = call_span("flatMap");
            let func = expect_function(arg(e, a, 0)?, &span, "flatMap")?;
            match arg(e, a, 1)? {
                Value::Array(items) => {
                    let mut out = Vec::new();
                    for item in items.iter() {
                        let v = e.call_value(&func, &[item.clone()], &span)?;
                        match v {
                            Value::Array(sub) => out.extend(sub.iter().cloned()),
                            other => return Err(Diagnostic::runtime(format!("flatMap: function must return an array, got {}", other.type_name()), span)),
                        }
                    }
                    Ok(Value::Array(Rc::new(out)))
                }
                Value::Str(s) => {
                    let mut out = String::new();
                    for ch in s.chars() {
                        let v = e.call_value(&func, &[Thunk::ready(Value::str(ch.to_string()))], &span)?;
                        match v {
                            Value::Str(piece) => out.push_str(&piece),
                            other => return Err(Diagnostic::runtime(format!("flatMap: function must return a string, got {}", other.type_name()), span)),
                        }
                    }
                    Ok(Value::str(out))
                }
                other => Err(Diagnostic::runtime(format!("flatMap: expected an array or string, got {}", other.type_name()), span)),
            }
        }),
        entry("parseInt", &["str"], |e, a| {
            let span = call_span("parseInt");
            let s = expect_str(arg(e, a, 0)?, &span, "parseInt")?;
            s.trim().parse::<i64>().map(|n| Value::Number(n as f64)).map_err(|_| Diagnostic::runtime(format!("parseInt: invalid integer literal: {s}"), span))
        }),
        entry("startsWith", &["a", "b"], |e, a| {
            let span = call_span("startsWith");
            let x = expect_str(arg(e, a, 0)?, &span, "startsWith")?;
            let y = expect_str(arg(e, a, 1)?, &span, "startsWith")?;
            Ok(Value::Bool(x.starts_with(&*y)))
        }),
        entry("endsWith", &["a", "b"], |e, a| {
            let span = call_span("endsWith");
            let x = expect_str(arg(e, a, 0)?, &span, "endsWith")?;
            let y = expect_str(arg(e, a, 1)?, &span, "endsWith")?;
            Ok(Value::Bool(x.ends_with(&*y)))
        }),
    ]
}

fn numeric1(evaluator: &mut Evaluator, args: &[Thunk], who: &'static str, f: fn(f64) -> f64) -> Result<Value, Diagnostic> {
    let span = call_span(who);
    let x = expect_number(arg(evaluator, args, 0)?, &span, who)?;
    Ok(Value::Number(f(x)))
}

/// `std.slice`: the desugared form of `a[from:to:step]`, also callable
/// directly. Works over both arrays and strings (a string slice yields a
/// string, matching spec.md §4.3's slice rewrite).
fn native_slice(evaluator: &mut Evaluator, target: Value, from: Value, to: Value, step: Value, span: &Span) -> Result<Value, Diagnostic> {
    let as_index = |v: &Value, default: i64, span: &Span| -> Result<i64, Diagnostic> {
        match v {
            Value::Null => Ok(default),
            Value::Number(n) => Ok(*n as i64),
            other => Err(Diagnostic::runtime(format!("slice index must be a number or null, got {}", other.type_name()), span.clone())),
        }
    };
    let step = match &step {
        Value::Null => 1,
        Value::Number(n) => *n as i64,
        other => return Err(Diagnostic::runtime(format!("slice step must be a number or null, got {}", other.type_name()), span.clone())),
    };
    if step <= 0 {
        return Err(Diagnostic::runtime("slice step must be a positive number", span.clone()));
    }

    match target {
        Value::Array(items) => {
            let len = items.len() as i64;
            let from = as_index(&from, 0, span)?.clamp(0, len);
            let to = as_index(&to, len, span)?.clamp(0, len);
            let mut out = Vec::new();
            let mut i = from;
            while i < to {
                out.push(items[i as usize].clone());
                i += step;
            }
            Ok(Value::Array(Rc::new(out)))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len() as i64;
            let from = as_index(&from, 0, span)?.clamp(0, len);
            let to = as_index(&to, len, span)?.clamp(0, len);
            let mut out = String::new();
            let mut i = from;
            while i < to {
                out.push(chars[i as usize]);
                i += step;
            }
            Ok(Value::str(out))
        }
        other => Err(Diagnostic::runtime(format!("slice: expected an array or string, got {}", other.type_name()), span.clone())),
    }
}
