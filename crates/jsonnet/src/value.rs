//! Runtime values, thunks, and the object representation object inheritance
//! is built on.
//!
//! Thunks are the central laziness mechanism spec.md §3/§5 describes: a
//! memoizing cell that starts `Unforced`, transitions to `Forcing` while its
//! expression is under evaluation (the same flag doubling as the cycle
//! detector, since there is no concurrency), and finally settles into
//! `Forced` or `Failed`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::core::{CoreAssert, PCore};
use crate::env::Env;
use crate::error::Diagnostic;
use crate::span::Span;

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Array(Rc<Vec<Thunk>>),
    Object(Rc<ObjectValue>),
    Function(Rc<FunctionValue>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    pub fn truthy(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }
}

enum ThunkState {
    Unforced { expr: PCore, env: Env },
    /// Marker left behind while the expression is mid-evaluation; seeing
    /// this state again during a force is a `self`-referential cycle. Keeps
    /// the original span around purely for that error message.
    Forcing(Span),
    Forced(Value),
    Failed(Diagnostic),
}

impl fmt::Debug for ThunkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unforced { .. } => write!(f, "Unforced"),
            Self::Forcing(_) => write!(f, "Forcing"),
            Self::Forced(v) => write!(f, "Forced({})", v.type_name()),
            Self::Failed(_) => write!(f, "Failed"),
        }
    }
}

/// A memoizing, lazily-evaluated cell. Cloning a `Thunk` shares the same
/// underlying cell (`Rc`), so forcing it once from any clone memoizes the
/// result for all of them — this is what gives `local x = expensive(); [x,
/// x, x]` its single-evaluation guarantee.
#[derive(Debug, Clone)]
pub struct Thunk(Rc<RefCell<ThunkState>>);

impl Thunk {
    pub fn new(expr: PCore, env: Env) -> Self {
        Self(Rc::new(RefCell::new(ThunkState::Unforced { expr, env })))
    }

    pub fn ready(value: Value) -> Self {
        Self(Rc::new(RefCell::new(ThunkState::Forced(value))))
    }

    pub fn failed(diag: Diagnostic) -> Self {
        Self(Rc::new(RefCell::new(ThunkState::Failed(diag))))
    }

    /// Patches the captured environment of a still-`Unforced` thunk in
    /// place. Used to build self- and mutually-recursive `local` bindings:
    /// the thunk is created against a throwaway environment before the
    /// frame containing its own binding exists, then pointed at that frame
    /// once it does, so looking itself (or a sibling) up while forcing
    /// resolves correctly. A no-op once the thunk has started evaluating.
    pub fn rebind_env(&self, new_env: Env) {
        if let ThunkState::Unforced { env, .. } = &mut *self.0.borrow_mut() {
            *env = new_env;
        }
    }

    /// Forces this thunk's state directly to `Forced`, bypassing evaluation.
    /// Used once, by `stdlib::build_std`, to complete the same
    /// placeholder-then-patch bootstrap `rebind_env` performs for recursive
    /// `local`s: `std` can only refer to its own fully-merged value once
    /// that value has been computed from `std.jsonnet`, which itself needs
    /// `std` bound while it evaluates.
    pub fn set_forced(&self, value: Value) {
        *self.0.borrow_mut() = ThunkState::Forced(value);
    }

    /// `true` once this thunk has a memoized value or error and will not
    /// re-run its expression; used by tests and by `std.__cacheSize`-style
    /// diagnostics, not on any evaluation hot path.
    pub fn is_settled(&self) -> bool {
        matches!(&*self.0.borrow(), ThunkState::Forced(_) | ThunkState::Failed(_))
    }

    /// Forces the thunk, evaluating `force_unforced` only the first time.
    /// `force_unforced` receives the captured `(expr, env)` pair and must
    /// return the computed value or a diagnostic.
    pub fn force_with(&self, force_unforced: impl FnOnce(PCore, Env) -> Result<Value, Diagnostic>) -> Result<Value, Diagnostic> {
        let taken = {
            let mut state = self.0.borrow_mut();
            match &*state {
                ThunkState::Forced(v) => return Ok(v.clone()),
                ThunkState::Failed(e) => return Err(e.clone()),
                ThunkState::Forcing(span) => {
                    return Err(Diagnostic::runtime("cyclic reference detected while evaluating this value", span.clone()));
                }
                ThunkState::Unforced { .. } => {
                    let span = match &*state {
                        ThunkState::Unforced { expr, .. } => expr.span.clone(),
                        _ => unreachable!(),
                    };
                    let ThunkState::Unforced { expr, env } = std::mem::replace(&mut *state, ThunkState::Forcing(span)) else {
                        unreachable!()
                    };
                    (expr, env)
                }
            }
        };
        match force_unforced(taken.0, taken.1) {
            Ok(v) => {
                *self.0.borrow_mut() = ThunkState::Forced(v.clone());
                Ok(v)
            }
            Err(e) => {
                *self.0.borrow_mut() = ThunkState::Failed(e.clone());
                Err(e)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldVisibility {
    Visible,
    Hidden,
    ForceVisible,
}

impl From<&crate::core::FieldVisibility> for FieldVisibility {
    fn from(v: &crate::core::FieldVisibility) -> Self {
        match v {
            crate::core::FieldVisibility::Visible => Self::Visible,
            crate::core::FieldVisibility::Hidden => Self::Hidden,
            crate::core::FieldVisibility::ForceVisible => Self::ForceVisible,
        }
    }
}

/// What a field evaluates to when forced: either ordinary Jsonnet source
/// (the common case, evaluated against the lexical environment captured
/// when the enclosing object literal was written) or a value handed in
/// directly by the host — how the `std` library's native functions appear
/// as object fields without round-tripping through the core AST at all.
#[derive(Debug, Clone)]
pub enum FieldBody {
    Core { expr: PCore, env: Env },
    Native(Value),
}

/// One field definition contributed by a single layer of a `+` chain.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub visibility: FieldVisibility,
    pub plus: bool,
    pub body: FieldBody,
}

/// One source object in a (possibly single-element) `+` chain, in
/// left-to-right order. `super` from the perspective of layer `i` sees
/// layers `0..i`.
#[derive(Debug, Clone)]
pub struct ObjectLayer {
    pub fields: IndexMap<Rc<str>, FieldDef>,
    pub asserts: Vec<(CoreAssert, Env)>,
}

/// A bounded view of an object's layers, used to resolve `super` lookups:
/// only layers `0..upto` are visible, matching spec.md §4.6's one-level
/// `super` chaining under repeated `+`.
#[derive(Debug, Clone)]
pub struct SuperView {
    pub object: Rc<ObjectValue>,
    pub upto: usize,
}

/// A fully-constructed object value. Each instance has a fixed identity for
/// `self` — merging `a + b` always produces a *new* `ObjectValue`, never
/// mutates `a` or `b` — so field results can be memoized once per instance
/// in `cache` without any risk of returning results computed for a
/// different `self`.
pub struct ObjectValue {
    pub layers: Vec<ObjectLayer>,
    cache: RefCell<IndexMap<Rc<str>, Thunk>>,
    /// Asserts already run for this instance; checked once before the
    /// first field is read, per spec.md §4.6.
    pub asserts_checked: RefCell<bool>,
}

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectValue").field("layers", &self.layers.len()).finish()
    }
}

impl ObjectValue {
    pub fn new(layers: Vec<ObjectLayer>) -> Self {
        Self { layers, cache: RefCell::new(IndexMap::new()), asserts_checked: RefCell::new(false) }
    }

    /// Finds the topmost layer defining `name`, if any, searching layers
    /// `0..upto` from most to least derived.
    fn find(&self, name: &str, upto: usize) -> Option<(usize, &FieldDef)> {
        self.layers[..upto].iter().enumerate().rev().find_map(|(i, layer)| layer.fields.get(name).map(|f| (i, f)))
    }

    pub fn find_visible(&self, name: &str) -> Option<(usize, &FieldDef)> {
        self.find(name, self.layers.len())
    }

    /// All field names visible from the outside (not `::`-hidden),
    /// last-write-wins order per layer but first-seen display order,
    /// matching manifestation's field ordering rule (spec.md §4.7).
    pub fn field_names(&self, include_hidden: bool) -> Vec<Rc<str>> {
        let mut seen = IndexMap::new();
        for layer in &self.layers {
            for (name, def) in &layer.fields {
                seen.insert(name.clone(), def.visibility);
            }
        }
        seen.into_iter()
            .filter(|(_, vis)| include_hidden || *vis != FieldVisibility::Hidden)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.layers.iter().any(|l| l.fields.contains_key(name))
    }

    pub fn cached(&self, name: &str) -> Option<Thunk> {
        self.cache.borrow().get(name).cloned()
    }

    pub fn insert_cache(&self, name: Rc<str>, thunk: Thunk) {
        self.cache.borrow_mut().insert(name, thunk);
    }
}

/// Either a user-defined closure or a native Rust implementation of a
/// `std` builtin. Both are called through the same `Value::Function`
/// surface so object/array/function dispatch in `eval.rs` doesn't need to
/// distinguish them except at the call boundary.
pub enum FunctionValue {
    Closure { params: Vec<crate::core::CoreParam>, body: PCore, env: Env, name: Option<Rc<str>> },
    Native { name: Rc<str>, params: Vec<Rc<str>>, func: NativeFn },
}

pub type NativeFn = Rc<dyn Fn(&mut crate::eval::Evaluator, &[Thunk]) -> Result<Value, Diagnostic>>;

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closure { name, params, .. } => f.debug_struct("Closure").field("name", name).field("arity", &params.len()).finish(),
            Self::Native { name, .. } => f.debug_struct("Native").field("name", name).finish(),
        }
    }
}

impl FunctionValue {
    pub fn params(&self) -> Vec<Rc<str>> {
        match self {
            Self::Closure { params, .. } => params.iter().map(|p| p.name.clone()).collect(),
            Self::Native { params, .. } => params.clone(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Closure { name, .. } => name.as_deref(),
            Self::Native { name, .. } => Some(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::core::{CoreExpr, CoreNode};
    use crate::eval::synthetic_span;

    fn dummy_thunk() -> Thunk {
        let file: crate::span::FileName = Rc::from("<test>");
        Thunk::new(CoreNode::new(CoreExpr::Null, synthetic_span(file)), Env::root())
    }

    #[test]
    fn force_with_memoizes_and_runs_once() {
        let t = dummy_thunk();
        let calls = Cell::new(0);
        for _ in 0..3 {
            let v = t.force_with(|_expr, _env| {
                calls.set(calls.get() + 1);
                Ok(Value::Number(42.0))
            });
            assert!(matches!(v, Ok(Value::Number(n)) if n == 42.0));
        }
        assert_eq!(calls.get(), 1, "force_with must only evaluate the thunk once");
        assert!(t.is_settled());
    }

    #[test]
    fn force_with_memoizes_failure_too() {
        let t = dummy_thunk();
        let calls = Cell::new(0);
        let span = synthetic_span(Rc::from("<test>"));
        for _ in 0..2 {
            let v = t.force_with(|_expr, _env| {
                calls.set(calls.get() + 1);
                Err(Diagnostic::runtime("boom", span.clone()))
            });
            assert!(v.is_err());
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn set_forced_bypasses_evaluation() {
        let t = dummy_thunk();
        assert!(!t.is_settled());
        t.set_forced(Value::Bool(true));
        assert!(t.is_settled());
        let v = t.force_with(|_, _| panic!("should never run"));
        assert!(matches!(v, Ok(Value::Bool(true))));
    }

    #[test]
    fn rebind_env_is_noop_once_forced() {
        let t = Thunk::ready(Value::Null);
        t.rebind_env(Env::root());
        assert!(matches!(t.force_with(|_, _| panic!()), Ok(Value::Null)));
    }
}
