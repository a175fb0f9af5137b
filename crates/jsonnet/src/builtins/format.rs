//! `%` string formatting: backs both the `%` binary operator (when its left
//! operand is a string) and the native `std.format` builtin, per spec.md
//! §4.8's `format` entry. Implements the common printf-style subset Jsonnet
//! programs actually rely on: `%s %d %f %g %e %x %X %o %%`, with `-`/`0`/`+`
//! flags, field width and precision.

use crate::error::Diagnostic;
use crate::eval::Evaluator;
use crate::manifest;
use crate::span::Span;
use crate::value::Value;

pub fn format_string(evaluator: &mut Evaluator, fmt_val: &Value, args_val: &Value, span: &Span) -> Result<Value, Diagnostic> {
    let Value::Str(fmt) = fmt_val else {
        return Err(Diagnostic::runtime(format!("format string must be a string, got {}", fmt_val.type_name()), span.clone()));
    };
    let args: Vec<Value> = match args_val {
        Value::Array(items) => items.iter().map(|t| evaluator.force(t)).collect::<Result<_, _>>()?,
        other => vec![other.clone()],
    };
    render(evaluator, fmt, &args, span).map(Value::str)
}

struct Spec {
    left_align: bool,
    zero_pad: bool,
    plus_sign: bool,
    width: Option<usize>,
    precision: Option<usize>,
    conv: char,
}

fn render(evaluator: &mut Evaluator, fmt: &str, args: &[Value], span: &Span) -> Result<String, Diagnostic> {
    let mut out = String::new();
    let mut chars = fmt.chars().peekable();
    let mut next_arg = 0usize;
    let mut take_arg = |span: &Span| -> Result<Value, Diagnostic> {
        let v = args.get(next_arg).cloned().ok_or_else(|| Diagnostic::runtime("not enough values for format string", span.clone()))?;
        next_arg += 1;
        Ok(v)
    };

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        let mut left_align = false;
        let mut zero_pad = false;
        let mut plus_sign = false;
        loop {
            match chars.peek() {
                Some('-') => {
                    left_align = true;
                    chars.next();
                }
                Some('0') => {
                    zero_pad = true;
                    chars.next();
                }
                Some('+') => {
                    plus_sign = true;
                    chars.next();
                }
                Some(' ') => {
                    chars.next();
                }
                _ => break,
            }
        }

        let width = read_number(&mut chars);
        let precision = if chars.peek() == Some(&'.') {
            chars.next();
            Some(read_number(&mut chars).unwrap_or(0))
        } else {
            None
        };

        let Some(conv) = chars.next() else {
            return Err(Diagnostic::runtime("truncated format specifier", span.clone()));
        };
        let spec = Spec { left_align, zero_pad, plus_sign, width, precision, conv };
        let rendered = render_one(evaluator, &spec, &mut take_arg, span)?;
        out.push_str(&pad(&rendered, &spec));
    }
    Ok(out)
}

fn read_number(chars: &mut std::iter::Peekable<std::str::Chars>) -> Option<usize> {
    let mut s = String::new();
    while let Some(c) = chars.peek() {
        if c.is_ascii_digit() {
            s.push(*c);
            chars.next();
        } else {
            break;
        }
    }
    s.parse().ok()
}

fn pad(s: &str, spec: &Spec) -> String {
    let Some(width) = spec.width else {
        return s.to_string();
    };
    if s.chars().count() >= width {
        return s.to_string();
    }
    let fill = width - s.chars().count();
    if spec.left_align {
        format!("{s}{}", " ".repeat(fill))
    } else if spec.zero_pad && matches!(spec.conv, 'd' | 'f' | 'g' | 'e' | 'x' | 'X' | 'o') {
        if let Some(rest) = s.strip_prefix('-') {
            format!("-{}{rest}", "0".repeat(fill))
        } else {
            format!("{}{s}", "0".repeat(fill))
        }
    } else {
        format!("{}{s}", " ".repeat(fill))
    }
}

fn render_one(
    evaluator: &mut Evaluator,
    spec: &Spec,
    take_arg: &mut impl FnMut(&Span) -> Result<Value, Diagnostic>,
    span: &Span,
) -> Result<String, Diagnostic> {
    match spec.conv {
        's' => {
            let v = take_arg(span)?;
            manifest::display_string(evaluator, &v, span)
        }
        'd' => {
            let n = as_number(take_arg(span)?, span)?;
            Ok(with_sign(n.trunc() as i64, spec))
        }
        'x' => Ok(format!("{:x}", as_number(take_arg(span)?, span)? as i64)),
        'X' => Ok(format!("{:X}", as_number(take_arg(span)?, span)? as i64)),
        'o' => Ok(format!("{:o}", as_number(take_arg(span)?, span)? as i64)),
        'f' => {
            let n = as_number(take_arg(span)?, span)?;
            let prec = spec.precision.unwrap_or(6);
            Ok(with_sign_str(format!("{n:.prec$}"), n, spec))
        }
        'e' => {
            let n = as_number(take_arg(span)?, span)?;
            let prec = spec.precision.unwrap_or(6);
            Ok(format!("{n:.prec$e}"))
        }
        'g' => {
            let n = as_number(take_arg(span)?, span)?;
            Ok(format!("{n}"))
        }
        'c' => {
            let n = as_number(take_arg(span)?, span)?;
            let ch = char::from_u32(n as u32).unwrap_or('\u{fffd}');
            Ok(ch.to_string())
        }
        other => Err(Diagnostic::runtime(format!("unsupported format conversion '%{other}'"), span.clone())),
    }
}

fn with_sign(n: i64, spec: &Spec) -> String {
    if spec.plus_sign && n >= 0 {
        format!("+{n}")
    } else {
        n.to_string()
    }
}

fn with_sign_str(s: String, n: f64, spec: &Spec) -> String {
    if spec.plus_sign && n >= 0.0 {
        format!("+{s}")
    } else {
        s
    }
}

fn as_number(v: Value, span: &Span) -> Result<f64, Diagnostic> {
    match v {
        Value::Number(n) => Ok(n),
        other => Err(Diagnostic::runtime(format!("format argument must be a number, got {}", other.type_name()), span.clone())),
    }
}
