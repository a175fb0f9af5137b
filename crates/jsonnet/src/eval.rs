//! The tree-walking evaluator: turns a desugared [`crate::core`] tree plus
//! an [`Env`] into a [`Value`], forcing thunks and tracking recursion depth
//! as it goes (spec.md §5).

use std::rc::Rc;

use ahash::AHashMap;

use crate::core::{CoreArg, CoreCompClause, CoreExpr, PCore};
use crate::env::Env;
use crate::error::Diagnostic;
use crate::function;
use crate::object;
use crate::resolver::ImportResolver;
use crate::resource::ResourceTracker;
use crate::span::{FileName, Pos, Span};
use crate::tracer::VmTracer;
use crate::value::{FunctionValue, ObjectLayer, ObjectValue, Thunk, Value};

use crate::ast::{BinaryOp, UnaryOp};

/// Per-variable bindings the embedder supplies for `std.extVar`, already
/// evaluated (or, for `--ext-code`, parsed and ready to be) into thunks —
/// built by `lib.rs` before the evaluator starts, since extVars are
/// themselves ordinary Jsonnet values that may be code.
pub type ExtVars = AHashMap<Rc<str>, Thunk>;

/// Owns everything evaluation needs beyond the expression tree itself: the
/// import resolver and its memoization cache, the resource tracker
/// enforcing a recursion ceiling, the tracer observing evaluation, the
/// `std` library binding every program sees, and the external variables
/// supplied by the embedder or CLI.
pub struct Evaluator {
    resolver: Box<dyn ImportResolver>,
    tracker: Box<dyn ResourceTracker>,
    tracer: Box<dyn VmTracer>,
    std_env: Env,
    ext_vars: ExtVars,
    import_cache: AHashMap<String, Value>,
    file_stack: Vec<FileName>,
}

impl Evaluator {
    pub fn new(
        resolver: Box<dyn ImportResolver>,
        tracker: Box<dyn ResourceTracker>,
        tracer: Box<dyn VmTracer>,
        std_value: Value,
        ext_vars: ExtVars,
        entry_file: FileName,
    ) -> Self {
        let std_env = Env::root().bind(Rc::from("std"), Thunk::ready(std_value));
        Self { resolver, tracker, tracer, std_env, ext_vars, import_cache: AHashMap::new(), file_stack: vec![entry_file] }
    }

    /// The root environment every top-level program (and every freshly
    /// imported file) starts evaluation in: just `std` bound, nothing else.
    pub fn root_env(&self) -> Env {
        self.std_env.clone()
    }

    pub fn ext_var(&self, name: &str) -> Option<Thunk> {
        self.ext_vars.get(name).cloned()
    }

    pub fn current_file(&self) -> FileName {
        self.file_stack.last().expect("file_stack always has the entry file").clone()
    }

    pub fn force(&mut self, thunk: &Thunk) -> Result<Value, Diagnostic> {
        thunk.force_with(|expr, env| self.eval(&expr, &env))
    }

    /// Evaluates `node` in `env`. This is the only place recursion depth is
    /// charged, so every nested call below goes back through `self.eval`
    /// rather than recursing directly — a native builtin that calls back
    /// into a user closure does too, via [`Self::call`].
    pub fn eval(&mut self, node: &PCore, env: &Env) -> Result<Value, Diagnostic> {
        self.tracker.enter().map_err(|e| Diagnostic::runtime(e.to_string(), node.span.clone()))?;
        self.tracer.on_thunk_force(&node.span, self.tracker.depth());
        let result = self.eval_inner(node, env);
        self.tracker.exit();
        result
    }

    fn eval_inner(&mut self, node: &PCore, env: &Env) -> Result<Value, Diagnostic> {
        let span = &node.span;
        match &node.expr {
            CoreExpr::Null => Ok(Value::Null),
            CoreExpr::True => Ok(Value::Bool(true)),
            CoreExpr::False => Ok(Value::Bool(false)),
            CoreExpr::Number(n) => Ok(Value::Number(*n)),
            CoreExpr::Str(s) => Ok(Value::Str(s.clone())),

            CoreExpr::Var(name) => env
                .lookup(name)
                .ok_or_else(|| Diagnostic::runtime(format!("unknown variable: {name}"), span.clone()))
                .and_then(|t| self.force(&t)),

            CoreExpr::SelfExpr => env
                .self_obj()
                .map(Value::Object)
                .ok_or_else(|| Diagnostic::runtime("'self' used outside an object", span.clone())),

            CoreExpr::Super => Err(Diagnostic::runtime("'super' cannot be used outside of a field or index expression", span.clone())),

            CoreExpr::Dollarself => env
                .dollar()
                .map(Value::Object)
                .ok_or_else(|| Diagnostic::runtime("'$' used outside an object", span.clone())),

            CoreExpr::Array(items) => {
                let thunks = items.iter().map(|e| Thunk::new(e.clone(), env.clone())).collect();
                Ok(Value::Array(Rc::new(thunks)))
            }

            CoreExpr::ArrayComp { body, clauses } => {
                let envs = self.eval_comp_envs(clauses, env)?;
                let thunks = envs.into_iter().map(|e| Thunk::new(body.clone(), e)).collect();
                Ok(Value::Array(Rc::new(thunks)))
            }

            CoreExpr::Object(core_obj) => {
                let layer = object::build_layer(self, core_obj, env)?;
                Ok(Value::Object(Rc::new(ObjectValue::new(vec![layer]))))
            }

            CoreExpr::ObjectComp { key, value, clauses } => self.eval_object_comp(key, value, clauses, env),

            CoreExpr::Function { params, body } => {
                Ok(Value::Function(Rc::new(FunctionValue::Closure { params: params.clone(), body: body.clone(), env: env.clone(), name: None })))
            }

            CoreExpr::Local { binds, body } => {
                let mut map = AHashMap::with_capacity(binds.len());
                let mut placeholders = Vec::with_capacity(binds.len());
                for (name, value) in binds {
                    let thunk = Thunk::new(value.clone(), Env::root());
                    map.insert(name.clone(), thunk.clone());
                    placeholders.push(thunk);
                }
                let frame_env = env.bind_many(map);
                for thunk in &placeholders {
                    thunk.rebind_env(frame_env.clone());
                }
                self.eval(body, &frame_env)
            }

            CoreExpr::If { cond, then_branch, else_branch } => {
                let c = self.eval(cond, env)?;
                match c {
                    Value::Bool(true) => self.eval(then_branch, env),
                    Value::Bool(false) => self.eval(else_branch, env),
                    other => Err(Diagnostic::runtime(format!("condition must be a boolean, got {}", other.type_name()), cond.span.clone())),
                }
            }

            CoreExpr::Binary { op, lhs, rhs } => self.eval_binary(op, lhs, rhs, env, span),
            CoreExpr::Unary { op, operand } => self.eval_unary(op, operand, env, span),

            CoreExpr::Apply { target, args, tailstrict } => {
                let func = self.eval(target, env)?;
                let Value::Function(func) = func else {
                    return Err(Diagnostic::runtime(format!("cannot call a {}", func.type_name()), span.clone()));
                };
                self.call(&func, args, env, *tailstrict, span)
            }

            CoreExpr::Index { target, index } => {
                let target_val = self.eval(target, env)?;
                self.index(&target_val, index, env, span)
            }

            CoreExpr::IndexSuper { index } => {
                let Some(view) = env.super_view() else {
                    return Err(Diagnostic::runtime("no superclass", span.clone()));
                };
                let name = self.eval_index_name(index, env)?;
                object::find_super_field(self, &view, &name, span)?
                    .ok_or_else(|| Diagnostic::runtime(format!("superclass has no field named \"{name}\""), span.clone()))
            }

            CoreExpr::InSuper(e) => {
                let name = self.eval_index_name(e, env)?;
                match env.super_view() {
                    Some(view) => Ok(Value::Bool(object::has_super_field(&view, &name))),
                    None => Err(Diagnostic::runtime("no superclass", span.clone())),
                }
            }

            CoreExpr::Error { message } => {
                let msg = self.eval_to_display_string(message, env)?;
                Err(Diagnostic::runtime(msg, span.clone()))
            }

            CoreExpr::Assert { assert, body } => {
                let ok = self.eval(&assert.cond, env)?;
                if !ok.truthy() {
                    let msg = match &assert.message {
                        Some(m) => self.eval_to_display_string(m, env)?,
                        None => "assertion failed".to_string(),
                    };
                    return Err(Diagnostic::runtime(msg, assert.cond.span.clone()));
                }
                self.eval(body, env)
            }

            CoreExpr::Import(path) => self.import(path, span),
            CoreExpr::ImportStr(path) => {
                let (_, contents) = self.resolve_import(path, span)?;
                Ok(Value::str(contents))
            }
            CoreExpr::ImportBin(path) => {
                let (_, contents) = self.resolve_import(path, span)?;
                let bytes: Vec<Thunk> = contents.bytes().map(|b| Thunk::ready(Value::Number(b as f64))).collect();
                Ok(Value::Array(Rc::new(bytes)))
            }
        }
    }

    fn eval_object_comp(&mut self, key: &PCore, value: &PCore, clauses: &[CoreCompClause], env: &Env) -> Result<Value, Diagnostic> {
        let envs = self.eval_comp_envs(clauses, env)?;
        let mut fields = indexmap::IndexMap::new();
        for e in envs {
            let key_val = self.eval(key, &e)?;
            let Value::Str(name) = key_val else {
                return Err(Diagnostic::runtime(format!("object comprehension key must be a string, got {}", key_val.type_name()), key.span.clone()));
            };
            let body = crate::value::FieldBody::Core { expr: value.clone(), env: e };
            fields.insert(name, crate::value::FieldDef { visibility: crate::value::FieldVisibility::Visible, plus: false, body });
        }
        let layer = ObjectLayer { fields, asserts: Vec::new() };
        Ok(Value::Object(Rc::new(ObjectValue::new(vec![layer]))))
    }

    /// Evaluates a chain of `for`/`if` comprehension clauses against `env`,
    /// returning one environment per surviving combination of loop
    /// variables. Materializing every environment up front (rather than
    /// threading a lazy iterator through) is simpler and fine here, since
    /// `for` already demands its source array be fully forced to iterate.
    fn eval_comp_envs(&mut self, clauses: &[CoreCompClause], env: &Env) -> Result<Vec<Env>, Diagnostic> {
        let Some((first, rest)) = clauses.split_first() else {
            return Ok(vec![env.clone()]);
        };
        match first {
            CoreCompClause::For { var, expr } => {
                let arr = self.eval(expr, env)?;
                let Value::Array(items) = arr else {
                    return Err(Diagnostic::runtime(format!("'for' source must be an array, got {}", arr.type_name()), expr.span.clone()));
                };
                let mut out = Vec::new();
                for item in items.iter() {
                    let loop_env = env.bind(var.clone(), item.clone());
                    out.extend(self.eval_comp_envs(rest, &loop_env)?);
                }
                Ok(out)
            }
            CoreCompClause::If(cond) => {
                let c = self.eval(cond, env)?;
                if c.truthy() {
                    self.eval_comp_envs(rest, env)
                } else {
                    Ok(Vec::new())
                }
            }
        }
    }

    fn eval_index_name(&mut self, index: &PCore, env: &Env) -> Result<Rc<str>, Diagnostic> {
        match self.eval(index, env)? {
            Value::Str(s) => Ok(s),
            other => Err(Diagnostic::runtime(format!("field name must be a string, got {}", other.type_name()), index.span.clone())),
        }
    }

    fn index(&mut self, target: &Value, index: &PCore, env: &Env, span: &Span) -> Result<Value, Diagnostic> {
        match target {
            Value::Object(obj) => {
                let name = self.eval_index_name(index, env)?;
                object::get_field(self, obj, &name, span)
            }
            Value::Array(items) => {
                let i = self.eval(index, env)?;
                let Value::Number(n) = i else {
                    return Err(Diagnostic::runtime(format!("array index must be a number, got {}", i.type_name()), index.span.clone()));
                };
                let idx = Self::index_to_usize(n, items.len(), &index.span)?;
                self.force(&items[idx])
            }
            Value::Str(s) => {
                let i = self.eval(index, env)?;
                let Value::Number(n) = i else {
                    return Err(Diagnostic::runtime(format!("string index must be a number, got {}", i.type_name()), index.span.clone()));
                };
                let chars: Vec<char> = s.chars().collect();
                let idx = Self::index_to_usize(n, chars.len(), &index.span)?;
                Ok(Value::str(chars[idx].to_string()))
            }
            other => Err(Diagnostic::runtime(format!("cannot index a {}", other.type_name()), span.clone())),
        }
    }

    fn index_to_usize(n: f64, len: usize, span: &Span) -> Result<usize, Diagnostic> {
        if n.fract() != 0.0 || n < 0.0 {
            return Err(Diagnostic::runtime(format!("index must be a non-negative integer, got {n}"), span.clone()));
        }
        let idx = n as usize;
        if idx >= len {
            return Err(Diagnostic::runtime(format!("index {idx} out of bounds, length is {len}"), span.clone()));
        }
        Ok(idx)
    }

    /// Calls `func` with `args`, evaluated against the *caller's* `env`.
    /// `tailstrict` forces every argument before the call, matching
    /// `std`'s tail-call-friendly builtins (spec.md §4.4).
    pub fn call(&mut self, func: &Rc<FunctionValue>, args: &[CoreArg], env: &Env, tailstrict: bool, call_span: &Span) -> Result<Value, Diagnostic> {
        let arg_thunks: Vec<(Option<Rc<str>>, Thunk)> = args
            .iter()
            .map(|a| match a {
                CoreArg::Positional(e) => (None, Thunk::new(e.clone(), env.clone())),
                CoreArg::Named(name, e) => (Some(name.clone()), Thunk::new(e.clone(), env.clone())),
            })
            .collect();
        if tailstrict {
            for (_, t) in &arg_thunks {
                self.force(t)?;
            }
        }
        self.call_bound(func, &arg_thunks, call_span)
    }

    /// Calls `func` with already-built argument thunks, all positional —
    /// the entry point native builtins use to call back into a user
    /// closure (`std.map`'s callback and the like), since they already
    /// hold `Thunk`s rather than unevaluated `CoreArg` expressions.
    pub fn call_value(&mut self, func: &Rc<FunctionValue>, args: &[Thunk], call_span: &Span) -> Result<Value, Diagnostic> {
        let arg_thunks: Vec<(Option<Rc<str>>, Thunk)> = args.iter().map(|t| (None, t.clone())).collect();
        self.call_bound(func, &arg_thunks, call_span)
    }

    /// Calls `func` with already-built named argument thunks — used to
    /// apply top-level arguments (`--tla-str`/`--tla-code`) to an entry
    /// point that evaluates to a function, the same way a user's own named
    /// call-site arguments are bound.
    pub fn call_named(&mut self, func: &Rc<FunctionValue>, args: &[(Rc<str>, Thunk)], call_span: &Span) -> Result<Value, Diagnostic> {
        let arg_thunks: Vec<(Option<Rc<str>>, Thunk)> = args.iter().map(|(n, t)| (Some(n.clone()), t.clone())).collect();
        self.call_bound(func, &arg_thunks, call_span)
    }

    fn call_bound(&mut self, func: &Rc<FunctionValue>, arg_thunks: &[(Option<Rc<str>>, Thunk)], call_span: &Span) -> Result<Value, Diagnostic> {
        match &**func {
            FunctionValue::Closure { params, body, env: closure_env, name } => {
                let call_env = function::bind_args(params, arg_thunks, closure_env, call_span)?;
                self.tracer.on_call(name.as_deref(), self.tracker.depth());
                let result = self.eval(body, &call_env);
                self.tracer.on_return(self.tracker.depth());
                result
            }
            FunctionValue::Native { name, params, func: native } => {
                let cparams: Vec<crate::core::CoreParam> = params.iter().map(|n| crate::core::CoreParam { name: n.clone(), default: None }).collect();
                let call_env = function::bind_args(&cparams, arg_thunks, &Env::root(), call_span)?;
                let ordered: Vec<Thunk> = params.iter().map(|n| call_env.lookup(n).expect("bound by bind_args")).collect();
                self.tracer.on_call(Some(name), self.tracker.depth());
                let result = native(self, &ordered);
                self.tracer.on_return(self.tracker.depth());
                result
            }
        }
    }

    /// Forwards a `std.trace` call to the configured tracer.
    pub fn trace(&mut self, message: &str, span: &Span) {
        self.tracer.on_user_trace(message, span);
    }

    fn eval_binary(&mut self, op: &BinaryOp, lhs: &PCore, rhs: &PCore, env: &Env, span: &Span) -> Result<Value, Diagnostic> {
        // Short-circuiting operators evaluate their right side lazily.
        match op {
            BinaryOp::And => {
                let l = self.eval(lhs, env)?;
                return match l {
                    Value::Bool(false) => Ok(Value::Bool(false)),
                    Value::Bool(true) => self.expect_bool(self.eval(rhs, env)?, &rhs.span),
                    other => Err(Diagnostic::runtime(format!("'&&' needs a boolean, got {}", other.type_name()), lhs.span.clone())),
                };
            }
            BinaryOp::Or => {
                let l = self.eval(lhs, env)?;
                return match l {
                    Value::Bool(true) => Ok(Value::Bool(true)),
                    Value::Bool(false) => self.expect_bool(self.eval(rhs, env)?, &rhs.span),
                    other => Err(Diagnostic::runtime(format!("'||' needs a boolean, got {}", other.type_name()), lhs.span.clone())),
                };
            }
            _ => {}
        }

        let l = self.eval(lhs, env)?;
        let r = self.eval(rhs, env)?;
        match op {
            BinaryOp::Add => self.add_values(&l, &r, span),
            BinaryOp::Sub => self.numeric(l, r, span, |a, b| a - b),
            BinaryOp::Mul => self.numeric(l, r, span, |a, b| a * b),
            BinaryOp::Div => {
                let (a, b) = (self.as_number(&l, span)?, self.as_number(&r, span)?);
                if b == 0.0 {
                    return Err(Diagnostic::runtime("division by zero", span.clone()));
                }
                Ok(Value::Number(a / b))
            }
            BinaryOp::Mod => self.modulo(&l, &r, span),
            BinaryOp::Eq => Ok(Value::Bool(self.values_equal(&l, &r, span)?)),
            BinaryOp::Ne => Ok(Value::Bool(!self.values_equal(&l, &r, span)?)),
            BinaryOp::Lt => self.compare(&l, &r, span).map(|o| Value::Bool(o == std::cmp::Ordering::Less)),
            BinaryOp::Le => self.compare(&l, &r, span).map(|o| Value::Bool(o != std::cmp::Ordering::Greater)),
            BinaryOp::Gt => self.compare(&l, &r, span).map(|o| Value::Bool(o == std::cmp::Ordering::Greater)),
            BinaryOp::Ge => self.compare(&l, &r, span).map(|o| Value::Bool(o != std::cmp::Ordering::Less)),
            BinaryOp::BitAnd => self.integral(l, r, span, |a, b| a & b),
            BinaryOp::BitOr => self.integral(l, r, span, |a, b| a | b),
            BinaryOp::BitXor => self.integral(l, r, span, |a, b| a ^ b),
            BinaryOp::Shl => self.integral(l, r, span, |a, b| a.wrapping_shl(b as u32)),
            BinaryOp::Shr => self.integral(l, r, span, |a, b| a.wrapping_shr(b as u32)),
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
            BinaryOp::In => unreachable!("lowered to a std call by the desugarer"),
        }
    }

    fn expect_bool(&self, v: Value, span: &Span) -> Result<Value, Diagnostic> {
        match v {
            Value::Bool(_) => Ok(v),
            other => Err(Diagnostic::runtime(format!("expected a boolean, got {}", other.type_name()), span.clone())),
        }
    }

    fn eval_unary(&mut self, op: &UnaryOp, operand: &PCore, env: &Env, span: &Span) -> Result<Value, Diagnostic> {
        let v = self.eval(operand, env)?;
        match (op, &v) {
            (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
            (UnaryOp::Pos, Value::Number(n)) => Ok(Value::Number(*n)),
            (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
            (UnaryOp::BitNot, Value::Number(n)) => Ok(Value::Number(!Self::to_i64(*n, span)? as f64)),
            _ => Err(Diagnostic::runtime(format!("unary operator not defined for {}", v.type_name()), span.clone())),
        }
    }

    fn as_number(&self, v: &Value, span: &Span) -> Result<f64, Diagnostic> {
        match v {
            Value::Number(n) => Ok(*n),
            other => Err(Diagnostic::runtime(format!("expected a number, got {}", other.type_name()), span.clone())),
        }
    }

    fn numeric(&self, l: Value, r: Value, span: &Span, f: impl Fn(f64, f64) -> f64) -> Result<Value, Diagnostic> {
        Ok(Value::Number(f(self.as_number(&l, span)?, self.as_number(&r, span)?)))
    }

    fn to_i64(n: f64, span: &Span) -> Result<i64, Diagnostic> {
        if n.fract() != 0.0 {
            return Err(Diagnostic::runtime(format!("bitwise operators require integers, got {n}"), span.clone()));
        }
        Ok(n as i64)
    }

    fn integral(&self, l: Value, r: Value, span: &Span, f: impl Fn(i64, i64) -> i64) -> Result<Value, Diagnostic> {
        let a = Self::to_i64(self.as_number(&l, span)?, span)?;
        let b = Self::to_i64(self.as_number(&r, span)?, span)?;
        Ok(Value::Number(f(a, b) as f64))
    }

    fn modulo(&mut self, l: &Value, r: &Value, span: &Span) -> Result<Value, Diagnostic> {
        match (l, r) {
            (Value::Number(a), Value::Number(b)) => {
                if *b == 0.0 {
                    return Err(Diagnostic::runtime("division by zero in '%'", span.clone()));
                }
                Ok(Value::Number(a - b * (a / b).trunc()))
            }
            (Value::Str(_), _) => crate::builtins::format::format_string(self, l, r, span),
            _ => Err(Diagnostic::runtime(format!("'%' not defined for {} and {}", l.type_name(), r.type_name()), span.clone())),
        }
    }

    /// Implements `+` for every type it's defined on, and is reused by
    /// object-field `+:` accumulation (spec.md §4.6) since that's exactly
    /// the same operator applied between a field's own value and the
    /// inherited one.
    pub fn add_values(&mut self, l: &Value, r: &Value, span: &Span) -> Result<Value, Diagnostic> {
        match (l, r) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::Str(_), _) | (_, Value::Str(_)) => {
                let ls = self.display_value(l, span)?;
                let rs = self.display_value(r, span)?;
                Ok(Value::str(format!("{ls}{rs}")))
            }
            (Value::Array(a), Value::Array(b)) => {
                let mut items = Vec::with_capacity(a.len() + b.len());
                items.extend(a.iter().cloned());
                items.extend(b.iter().cloned());
                Ok(Value::Array(Rc::new(items)))
            }
            (Value::Object(a), Value::Object(b)) => Ok(Value::Object(object::merge(a.clone(), b.clone()))),
            _ => Err(Diagnostic::runtime(format!("'+' not defined for {} and {}", l.type_name(), r.type_name()), span.clone())),
        }
    }

    /// Converts a value to its display form for implicit string
    /// concatenation: strings pass through, everything else uses the same
    /// rendering `std.toString`/error messages use.
    fn display_value(&mut self, v: &Value, span: &Span) -> Result<String, Diagnostic> {
        match v {
            Value::Str(s) => Ok(s.to_string()),
            other => crate::manifest::display_string(self, other, span),
        }
    }

    /// Evaluates `node` and renders it the way `error`/`assert` messages
    /// and `std.toString` do.
    pub fn eval_to_display_string(&mut self, node: &PCore, env: &Env) -> Result<String, Diagnostic> {
        let v = self.eval(node, env)?;
        self.display_value(&v, &node.span)
    }

    fn compare(&mut self, l: &Value, r: &Value, span: &Span) -> Result<std::cmp::Ordering, Diagnostic> {
        match (l, r) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b).ok_or_else(|| Diagnostic::runtime("cannot compare NaN", span.clone())),
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (Value::Array(a), Value::Array(b)) => self.compare_arrays(a, b, span),
            _ => Err(Diagnostic::runtime(format!("cannot order {} and {}", l.type_name(), r.type_name()), span.clone())),
        }
    }

    fn compare_arrays(&mut self, a: &[Thunk], b: &[Thunk], span: &Span) -> Result<std::cmp::Ordering, Diagnostic> {
        for i in 0..a.len().min(b.len()) {
            let (av, bv) = (self.force(&a[i])?, self.force(&b[i])?);
            let ord = self.compare(&av, &bv, span)?;
            if ord != std::cmp::Ordering::Equal {
                return Ok(ord);
            }
        }
        Ok(a.len().cmp(&b.len()))
    }

    /// Deep structural equality, per spec.md §8's "equality" testable
    /// property: numbers and strings by value, arrays element-wise,
    /// objects by their visible field set and values, functions never
    /// equal (not even to themselves, matching the reference
    /// implementation's refusal to compare closures).
    pub fn values_equal(&mut self, l: &Value, r: &Value, span: &Span) -> Result<bool, Diagnostic> {
        match (l, r) {
            (Value::Null, Value::Null) => Ok(true),
            (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
            (Value::Number(a), Value::Number(b)) => Ok(a == b),
            (Value::Str(a), Value::Str(b)) => Ok(a == b),
            (Value::Array(a), Value::Array(b)) => {
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    let (xv, yv) = (self.force(x)?, self.force(y)?);
                    if !self.values_equal(&xv, &yv, span)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Value::Object(a), Value::Object(b)) => {
                let mut af = a.field_names(false);
                let mut bf = b.field_names(false);
                af.sort();
                bf.sort();
                if af != bf {
                    return Ok(false);
                }
                for name in &af {
                    let (xv, yv) = (object::get_field(self, a, name, span)?, object::get_field(self, b, name, span)?);
                    if !self.values_equal(&xv, &yv, span)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Value::Function(_), _) | (_, Value::Function(_)) => Err(Diagnostic::runtime("cannot test equality of functions", span.clone())),
            _ => Ok(false),
        }
    }

    fn import(&mut self, path: &str, span: &Span) -> Result<Value, Diagnostic> {
        let (canonical, contents) = self.resolve_import(path, span)?;
        if let Some(cached) = self.import_cache.get(&canonical) {
            return Ok(cached.clone());
        }
        let file: FileName = Rc::from(canonical.as_str());
        let ast = crate::parser::parse(&contents, file.clone()).map_err(Diagnostic::from)?;
        let core = crate::desugar::desugar(&ast);
        self.file_stack.push(file);
        let result = self.eval(&core, &self.root_env());
        self.file_stack.pop();
        let value = result?;
        self.import_cache.insert(canonical, value.clone());
        Ok(value)
    }

    fn resolve_import(&mut self, path: &str, span: &Span) -> Result<(String, String), Diagnostic> {
        let importer = self.current_file();
        self.resolver.resolve(&importer, path).map_err(|e| Diagnostic::runtime(e.to_string(), span.clone()))
    }
}

/// A zero-width span at the start of `file`, used when manufacturing
/// synthetic nodes (native builtin registration, the entry point of a
/// `-e` inline program) that need *some* position but have no real source.
pub fn synthetic_span(file: FileName) -> Span {
    Span::new(file, Pos::START, Pos::START)
}
