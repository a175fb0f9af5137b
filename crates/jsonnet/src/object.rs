//! Object construction and the `+` inheritance operator.
//!
//! The representation in [`crate::value`] does the heavy lifting: an
//! object's layers are just the left-to-right list of operands that were
//! ever `+`-joined to produce it, and `super` resolution is "search layers
//! below the one a field came from." That makes `+` itself almost free —
//! concatenate the layer lists — and keeps chained inheritance (`a + b +
//! c`) correct without special-casing depth, beyond spec.md §4.6's minimum
//! one-level requirement.

use std::rc::Rc;

use crate::core::{CoreAssert, CoreField, CoreObject};
use crate::env::Env;
use crate::error::Diagnostic;
use crate::eval::Evaluator;
use crate::value::{FieldBody, FieldDef, ObjectLayer, ObjectValue, SuperView, Value};

/// Builds the single-layer object produced by evaluating one `{ ... }`
/// literal. `defining_env` is the lexical environment at the literal's
/// location; `self`/`super`/`$` are added fresh every time a field is
/// forced, not baked in here.
pub fn build_layer(evaluator: &mut Evaluator, core: &CoreObject, defining_env: &Env) -> Result<ObjectLayer, Diagnostic> {
    let mut fields = indexmap::IndexMap::new();
    for f in &core.fields {
        let name = static_field_name(evaluator, f, defining_env)?;
        let body = FieldBody::Core { expr: f.value.clone(), env: defining_env.clone() };
        fields.insert(name, FieldDef { visibility: (&f.visibility).into(), plus: f.plus, body });
    }
    let asserts = core.asserts.iter().map(|a: &CoreAssert| (a.clone(), defining_env.clone())).collect();
    Ok(ObjectLayer { fields, asserts })
}

/// Most field names are literal identifiers/strings, already desugared to
/// a `CoreExpr::Str` by the desugarer — this is the hot path and avoids a
/// spurious evaluation. A genuinely computed `[e]: ...` name still has to
/// be evaluated eagerly at object-construction time (spec.md §4.6: field
/// names, unlike field values, are not lazy).
fn static_field_name(evaluator: &mut Evaluator, f: &CoreField, env: &Env) -> Result<Rc<str>, Diagnostic> {
    if let crate::core::CoreExpr::Str(s) = &f.name.expr {
        return Ok(s.clone());
    }
    match evaluator.eval(&f.name, env)? {
        Value::Str(s) => Ok(s),
        other => Err(Diagnostic::runtime(format!("field name must be a string, got {}", other.type_name()), f.name.span.clone())),
    }
}

pub fn merge(lhs: Rc<ObjectValue>, rhs: Rc<ObjectValue>) -> Rc<ObjectValue> {
    let mut layers = Vec::with_capacity(lhs.layers.len() + rhs.layers.len());
    layers.extend(lhs.layers.iter().cloned());
    layers.extend(rhs.layers.iter().cloned());
    Rc::new(ObjectValue::new(layers))
}

/// Forces `obj`'s field `name`, building the `self`/`super`/`$` context
/// fresh from the layer that defines it, honoring `+:` accumulation with
/// whatever `super.name` resolves to below that layer.
pub fn get_field(evaluator: &mut Evaluator, obj: &Rc<ObjectValue>, name: &str, call_span: &crate::span::Span) -> Result<Value, Diagnostic> {
    ensure_asserts(evaluator, obj)?;
    if let Some(thunk) = obj.cached(name) {
        return evaluator.force(&thunk);
    }
    let Some((layer_idx, def)) = obj.find_visible(name) else {
        return Err(Diagnostic::runtime(format!("object has no field named \"{name}\""), call_span.clone()));
    };
    let def = def.clone();
    let super_view = if layer_idx == 0 { None } else { Some(SuperView { object: obj.clone(), upto: layer_idx }) };
    let value = eval_field(evaluator, &def, obj, super_view, name, call_span)?;
    let thunk = crate::value::Thunk::ready(value.clone());
    obj.insert_cache(Rc::from(name), thunk);
    Ok(value)
}

/// Evaluates one field's body in the context of `obj` (the `self` that
/// triggered this lookup, even when `def` came from a `super` view below
/// it), honoring `+:` accumulation against whatever `super_view` resolves
/// to. Native fields (the `std` library) skip the `self`/`super` dance
/// entirely since they never reference either.
fn eval_field(
    evaluator: &mut Evaluator,
    def: &FieldDef,
    obj: &Rc<ObjectValue>,
    super_view: Option<SuperView>,
    name: &str,
    call_span: &crate::span::Span,
) -> Result<Value, Diagnostic> {
    let FieldBody::Core { expr, env } = &def.body else {
        let FieldBody::Native(v) = &def.body else { unreachable!() };
        return Ok(v.clone());
    };
    let dollar = env.dollar().unwrap_or_else(|| obj.clone());
    let field_env = env.bind_context(obj.clone(), super_view.clone(), dollar);
    if def.plus {
        let own = evaluator.eval(expr, &field_env)?;
        match super_view {
            Some(sv) => match find_super_field(evaluator, &sv, name, call_span)? {
                Some(super_val) => evaluator.add_values(&own, &super_val, call_span),
                None => Ok(own),
            },
            None => Ok(own),
        }
    } else {
        evaluator.eval(expr, &field_env)
    }
}

/// `super.name` lookup: identical to a normal field lookup, just bounded
/// to the layers below the field that triggered it, and never itself
/// triggers `+:` accumulation beyond what `get_field` already does for
/// that bounded view (a `super` view is just a smaller `ObjectValue`
/// search window over the same underlying layers).
pub fn find_super_field(evaluator: &mut Evaluator, view: &SuperView, name: &str, call_span: &crate::span::Span) -> Result<Option<Value>, Diagnostic> {
    let Some((layer_idx, def)) = view.object.layers[..view.upto].iter().enumerate().rev().find_map(|(i, l)| l.fields.get(name).map(|f| (i, f.clone()))) else {
        return Ok(None);
    };
    let super_view = if layer_idx == 0 { None } else { Some(SuperView { object: view.object.clone(), upto: layer_idx }) };
    let value = eval_field(evaluator, &def, &view.object, super_view, name, call_span)?;
    Ok(Some(value))
}

pub fn has_super_field(view: &SuperView, name: &str) -> bool {
    view.object.layers[..view.upto].iter().any(|l| l.fields.contains_key(name))
}

fn ensure_asserts(evaluator: &mut Evaluator, obj: &Rc<ObjectValue>) -> Result<(), Diagnostic> {
    if *obj.asserts_checked.borrow() {
        return Ok(());
    }
    *obj.asserts_checked.borrow_mut() = true;
    for (layer_idx, layer) in obj.layers.iter().enumerate() {
        for (assert, env) in &layer.asserts {
            let dollar = env.dollar().unwrap_or_else(|| obj.clone());
            let super_view = if layer_idx == 0 { None } else { Some(SuperView { object: obj.clone(), upto: layer_idx }) };
            let ctx = env.bind_context(obj.clone(), super_view, dollar);
            let ok = evaluator.eval(&assert.cond, &ctx)?;
            if !ok.truthy() {
                let msg = match &assert.message {
                    Some(m) => evaluator.eval_to_display_string(m, &ctx)?,
                    None => "object assertion failed".to_string(),
                };
                return Err(Diagnostic::runtime(msg, assert.cond.span.clone()));
            }
        }
    }
    Ok(())
}
