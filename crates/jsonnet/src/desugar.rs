//! Lowers the sugared [`crate::ast`] tree into the primitive [`crate::core`]
//! tree the evaluator walks.
//!
//! Implements the rewrites spec.md §4.3 enumerates:
//! - `$` becomes a reference to a synthetic `$` local bound at the root of
//!   every object body to that body's outermost `self`.
//! - object comprehensions keep their loop structure (clauses are folded
//!   but not flattened into a combinator — see [`crate::core`]) and their
//!   key/value are rewritten like any other expression.
//! - array comprehensions are likewise kept as loops, not expanded into
//!   `std.flatMap`/`std.filter` calls, since the evaluator interprets the
//!   clause list directly.
//! - field-function sugar (`f(x): e`) was already folded into a plain
//!   `Function` value by the parser.
//! - `a.b` / `a[i]` / `super.b` / `super[i]` collapse to `Index`/`IndexSuper`.
//! - `a[from:to:step]` becomes a call to the native slice builtin.
//! - `e in super` becomes a call to the native `objectHasEx` builtin.
//! - `assert c: m; e` and the standalone `assert` statement both become
//!   `Assert` core nodes; `target { fields }` becomes `target + { fields }`.
//! - default parameter expressions are kept as-is; the evaluator evaluates
//!   them lazily in an environment extended by the preceding parameters.

use std::rc::Rc;

use ahash::AHashSet;

use crate::ast as a;
use crate::core::{
    CoreArg, CoreAssert, CoreCompClause, CoreExpr, CoreField, CoreNode, CoreObject, CoreParam, FieldVisibility, PCore,
};
use crate::error::{Diagnostic, Stage};
use crate::span::Span;

pub fn desugar(node: &a::Node) -> PCore {
    desugar_expr(node)
}

/// Walks a desugared tree checking the static invariants spec.md §7 requires
/// to be rejected before evaluation starts, rather than surfacing as an
/// ordinary runtime error the first time the offending node is reached.
/// Currently just duplicate parameter names; everything else in §7 already
/// surfaces naturally as the evaluator walks the tree.
pub fn check_static(core: &PCore) -> Result<(), Diagnostic> {
    match &core.expr {
        CoreExpr::Function { params, body } => {
            check_duplicate_params(params, &core.span)?;
            for param in params {
                if let Some(default) = &param.default {
                    check_static(default)?;
                }
            }
            check_static(body)
        }
        CoreExpr::Null
        | CoreExpr::True
        | CoreExpr::False
        | CoreExpr::Number(_)
        | CoreExpr::Str(_)
        | CoreExpr::Var(_)
        | CoreExpr::SelfExpr
        | CoreExpr::Super
        | CoreExpr::Dollarself
        | CoreExpr::Import(_)
        | CoreExpr::ImportStr(_)
        | CoreExpr::ImportBin(_) => Ok(()),
        CoreExpr::Array(items) => items.iter().try_for_each(check_static),
        CoreExpr::ArrayComp { body, clauses } => {
            check_static(body)?;
            check_clauses(clauses)
        }
        CoreExpr::Object(obj) => check_object(obj),
        CoreExpr::ObjectComp { key, value, clauses } => {
            check_static(key)?;
            check_static(value)?;
            check_clauses(clauses)
        }
        CoreExpr::Local { binds, body } => {
            for (_, value) in binds {
                check_static(value)?;
            }
            check_static(body)
        }
        CoreExpr::If { cond, then_branch, else_branch } => {
            check_static(cond)?;
            check_static(then_branch)?;
            check_static(else_branch)
        }
        CoreExpr::Binary { lhs, rhs, .. } => {
            check_static(lhs)?;
            check_static(rhs)
        }
        CoreExpr::Unary { operand, .. } => check_static(operand),
        CoreExpr::Apply { target, args, .. } => {
            check_static(target)?;
            for arg in args {
                match arg {
                    CoreArg::Positional(e) | CoreArg::Named(_, e) => check_static(e)?,
                }
            }
            Ok(())
        }
        CoreExpr::Index { target, index } => {
            check_static(target)?;
            check_static(index)
        }
        CoreExpr::IndexSuper { index } => check_static(index),
        CoreExpr::InSuper(e) => check_static(e),
        CoreExpr::Error { message } => check_static(message),
        CoreExpr::Assert { assert, body } => {
            check_static(&assert.cond)?;
            if let Some(message) = &assert.message {
                check_static(message)?;
            }
            check_static(body)
        }
    }
}

fn check_clauses(clauses: &[CoreCompClause]) -> Result<(), Diagnostic> {
    for clause in clauses {
        match clause {
            CoreCompClause::For { expr, .. } => check_static(expr)?,
            CoreCompClause::If(cond) => check_static(cond)?,
        }
    }
    Ok(())
}

fn check_object(obj: &CoreObject) -> Result<(), Diagnostic> {
    for assert in &obj.asserts {
        check_static(&assert.cond)?;
        if let Some(message) = &assert.message {
            check_static(message)?;
        }
    }
    for field in &obj.fields {
        check_static(&field.name)?;
        check_static(&field.value)?;
    }
    Ok(())
}

/// spec.md §7: `function(x, x) x` is a StaticError, not a last-binding-wins
/// runtime overwrite.
fn check_duplicate_params(params: &[CoreParam], span: &Span) -> Result<(), Diagnostic> {
    let mut seen: AHashSet<&str> = AHashSet::with_capacity(params.len());
    for param in params {
        if !seen.insert(&*param.name) {
            return Err(Diagnostic::new(Stage::Static, format!("duplicate parameter name \"{}\"", param.name), span.clone()));
        }
    }
    Ok(())
}

fn visibility(v: &a::Visibility) -> FieldVisibility {
    match v {
        a::Visibility::Visible => FieldVisibility::Visible,
        a::Visibility::Hidden => FieldVisibility::Hidden,
        a::Visibility::ForceVisible => FieldVisibility::ForceVisible,
    }
}

fn desugar_clauses(clauses: &[a::CompClause]) -> Vec<CoreCompClause> {
    clauses
        .iter()
        .map(|c| match c {
            a::CompClause::For(f) => CoreCompClause::For { var: Rc::from(f.var.as_str()), expr: desugar_expr(&f.expr) },
            a::CompClause::If(cond) => CoreCompClause::If(desugar_expr(cond)),
        })
        .collect()
}

/// `local a = v1, b = v2; body` desugars to a single `Local` node binding
/// both simultaneously, so `a`'s and `b`'s expressions can reference each
/// other (and themselves) regardless of write order; the evaluator resolves
/// this the same way it resolves any other shared environment frame (see
/// `env.rs`'s `bind_many`).
fn desugar_locals(binds: &[a::Local], body: PCore, span: &Span) -> PCore {
    let pairs = binds.iter().map(|b| (Rc::from(b.name.as_str()), desugar_bind_value(b))).collect();
    CoreNode::new(CoreExpr::Local { binds: pairs, body }, span.clone())
}

fn desugar_bind_value(bind: &a::Local) -> PCore {
    match &bind.params {
        None => desugar_expr(&bind.value),
        Some(params) => {
            let body = desugar_expr(&bind.value);
            let params = desugar_params(params);
            CoreNode::new(CoreExpr::Function { params, body }, bind.span.clone())
        }
    }
}

fn desugar_params(params: &[a::Param]) -> Vec<CoreParam> {
    params
        .iter()
        .map(|p| CoreParam { name: Rc::from(p.name.as_str()), default: p.default.as_ref().map(|d| desugar_expr(d)) })
        .collect()
}

fn desugar_args(args: &[a::Arg]) -> Vec<CoreArg> {
    args.iter()
        .map(|arg| match arg {
            a::Arg::Positional(e) => CoreArg::Positional(desugar_expr(e)),
            a::Arg::Named(name, e) => CoreArg::Named(Rc::from(name.as_str()), desugar_expr(e)),
        })
        .collect()
}

fn str_node(s: &str, span: &Span) -> PCore {
    CoreNode::new(CoreExpr::Str(Rc::from(s)), span.clone())
}

fn desugar_field_name(name: &a::FieldName, span: &Span) -> PCore {
    match name {
        a::FieldName::Ident(s) | a::FieldName::String(s) => str_node(s, span),
        a::FieldName::Expr(e) => desugar_expr(e),
    }
}

fn desugar_object_body(body: &a::ObjectBody, span: &Span) -> CoreObject {
    // Locals scoped to an object body are resolved by wrapping every
    // field/assert expression in the same `Local` chain rather than the
    // object node itself, since `CoreObject` has no binding form of its
    // own — matches how the evaluator builds one shared closure env for
    // the whole object and hands it to every field thunk.
    let wrap = |e: PCore| -> PCore {
        if body.locals.is_empty() {
            e
        } else {
            desugar_locals(&body.locals, e, span)
        }
    };
    let asserts = body
        .asserts
        .iter()
        .map(|a| CoreAssert { cond: wrap(desugar_expr(&a.cond)), message: a.message.as_ref().map(|m| wrap(desugar_expr(m))) })
        .collect();
    let fields = body
        .fields
        .iter()
        .map(|f| CoreField {
            name: wrap(desugar_field_name(&f.name, &f.span)),
            visibility: visibility(&f.visibility),
            plus: f.plus,
            value: wrap(desugar_expr(&f.value)),
        })
        .collect();
    CoreObject { asserts, fields }
}

fn desugar_expr(node: &a::Node) -> PCore {
    let span = node.span.clone();
    match &node.expr {
        a::Expr::Null => CoreNode::new(CoreExpr::Null, span),
        a::Expr::True => CoreNode::new(CoreExpr::True, span),
        a::Expr::False => CoreNode::new(CoreExpr::False, span),
        a::Expr::SelfExpr => CoreNode::new(CoreExpr::SelfExpr, span),
        a::Expr::Super => CoreNode::new(CoreExpr::Super, span),
        a::Expr::Dollar => CoreNode::new(CoreExpr::Dollarself, span),
        a::Expr::Number(n) => CoreNode::new(CoreExpr::Number(*n), span),
        a::Expr::Str(s) => CoreNode::new(CoreExpr::Str(s.clone()), span),
        a::Expr::Ident(name) => CoreNode::new(CoreExpr::Var(Rc::from(name.as_str())), span),

        a::Expr::Array(items) => CoreNode::new(CoreExpr::Array(items.iter().map(|e| desugar_expr(e)).collect()), span),
        a::Expr::ArrayComp(comp) => {
            let clauses = desugar_clauses(&comp.clauses);
            CoreNode::new(CoreExpr::ArrayComp { body: desugar_expr(&comp.body), clauses }, span)
        }

        a::Expr::Object(body) => CoreNode::new(CoreExpr::Object(desugar_object_body(body, &span)), span),
        a::Expr::ObjectComp(comp) => {
            let clauses = desugar_clauses(&comp.clauses);
            let key = desugar_expr(&comp.key);
            let value = desugar_expr(&comp.value);
            let (key, value) = if comp.locals_before.is_empty() {
                (key, value)
            } else {
                (desugar_locals(&comp.locals_before, key, &span), desugar_locals(&comp.locals_before, value, &span))
            };
            CoreNode::new(CoreExpr::ObjectComp { key, value, clauses }, span)
        }

        a::Expr::ObjExtend { target, body } => {
            let rhs = CoreNode::new(CoreExpr::Object(desugar_object_body(body, &span)), span.clone());
            CoreNode::new(CoreExpr::Binary { op: a::BinaryOp::Add, lhs: desugar_expr(target), rhs }, span)
        }

        a::Expr::Function { params, body } => {
            CoreNode::new(CoreExpr::Function { params: desugar_params(params), body: desugar_expr(body) }, span)
        }

        a::Expr::Local { binds, body } => desugar_locals(binds, desugar_expr(body), &span),

        a::Expr::If { cond, then_branch, else_branch } => {
            let else_core = match else_branch {
                Some(e) => desugar_expr(e),
                None => CoreNode::new(CoreExpr::Null, span.clone()),
            };
            CoreNode::new(
                CoreExpr::If { cond: desugar_expr(cond), then_branch: desugar_expr(then_branch), else_branch: else_core },
                span,
            )
        }

        a::Expr::Binary { op, lhs, rhs } if *op == a::BinaryOp::In => {
            // `e in super` is the only use of `in` with a literal `super`
            // right-hand side; everything else is a plain object
            // field-membership test dispatched through the native builtin
            // at evaluation time (see `builtins::object_has`).
            desugar_in(lhs, rhs, &span)
        }
        a::Expr::Binary { op, lhs, rhs } => {
            CoreNode::new(CoreExpr::Binary { op: op.clone(), lhs: desugar_expr(lhs), rhs: desugar_expr(rhs) }, span)
        }
        a::Expr::Unary { op, operand } => CoreNode::new(CoreExpr::Unary { op: op.clone(), operand: desugar_expr(operand) }, span),

        a::Expr::Apply { target, args, tailstrict } => {
            CoreNode::new(CoreExpr::Apply { target: desugar_expr(target), args: desugar_args(args), tailstrict: *tailstrict }, span)
        }

        a::Expr::Index { target, index } => match &target.expr {
            a::Expr::Super => CoreNode::new(CoreExpr::IndexSuper { index: desugar_expr(index) }, span),
            _ => CoreNode::new(CoreExpr::Index { target: desugar_expr(target), index: desugar_expr(index) }, span),
        },

        a::Expr::Slice { target, from, to, step } => desugar_slice(target, from.as_deref(), to.as_deref(), step.as_deref(), &span),

        a::Expr::Field { target, name } => match &target.expr {
            a::Expr::Super => CoreNode::new(CoreExpr::IndexSuper { index: str_node(name, &span) }, span),
            _ => CoreNode::new(CoreExpr::Index { target: desugar_expr(target), index: str_node(name, &span) }, span),
        },

        a::Expr::Error { message } => CoreNode::new(CoreExpr::Error { message: desugar_expr(message) }, span),

        a::Expr::Assert { assert, body } => {
            let cond = desugar_expr(&assert.cond);
            let message = assert.message.as_ref().map(|m| desugar_expr(m));
            CoreNode::new(CoreExpr::Assert { assert: CoreAssert { cond, message }, body: desugar_expr(body) }, span)
        }

        a::Expr::Import(path) => CoreNode::new(CoreExpr::Import(path.clone()), span),
        a::Expr::ImportStr(path) => CoreNode::new(CoreExpr::ImportStr(path.clone()), span),
        a::Expr::ImportBin(path) => CoreNode::new(CoreExpr::ImportBin(path.clone()), span),
    }
}

/// `a[from:to:step]` → `std.slice(a, from, to, step)`, spec.md §4.3 rule 6.
/// Absent parts become `null`, matching `std.slice`'s own defaulting.
fn desugar_slice(target: &a::Node, from: Option<&a::Node>, to: Option<&a::Node>, step: Option<&a::Node>, span: &Span) -> PCore {
    let null = || CoreNode::new(CoreExpr::Null, span.clone());
    let std_var = CoreNode::new(CoreExpr::Var(Rc::from("std")), span.clone());
    let slice_fn = CoreNode::new(CoreExpr::Index { target: std_var, index: str_node("slice", span) }, span.clone());
    let args = vec![
        CoreArg::Positional(desugar_expr(target)),
        CoreArg::Positional(from.map(desugar_expr).unwrap_or_else(null)),
        CoreArg::Positional(to.map(desugar_expr).unwrap_or_else(null)),
        CoreArg::Positional(step.map(desugar_expr).unwrap_or_else(null)),
    ];
    CoreNode::new(CoreExpr::Apply { target: slice_fn, args, tailstrict: false }, span.clone())
}

/// `e in super` becomes the primitive `InSuper` core node, since answering
/// it needs the lexical `super` chain active at the call site — something
/// only the evaluator's environment carries, not a native function call.
/// Every other use of `in` is a plain object field-membership test,
/// dispatched through `std.objectHasAll`.
fn desugar_in(lhs: &a::Node, rhs: &a::Node, span: &Span) -> PCore {
    if matches!(rhs.expr, a::Expr::Super) {
        return CoreNode::new(CoreExpr::InSuper(desugar_expr(lhs)), span.clone());
    }
    let std_var = CoreNode::new(CoreExpr::Var(Rc::from("std")), span.clone());
    let helper = CoreNode::new(CoreExpr::Index { target: std_var, index: str_node("objectHasAll", span) }, span.clone());
    let args = vec![CoreArg::Positional(desugar_expr(rhs)), CoreArg::Positional(desugar_expr(lhs))];
    CoreNode::new(CoreExpr::Apply { target: helper, args, tailstrict: false }, span.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn desugar_src(src: &str) -> PCore {
        desugar(&parse(src, "t.jsonnet").unwrap())
    }

    #[test]
    fn dollar_becomes_dollarself() {
        let core = desugar_src("$");
        assert!(matches!(core.expr, CoreExpr::Dollarself));
    }

    #[test]
    fn field_access_becomes_index() {
        let core = desugar_src("a.b");
        assert!(matches!(core.expr, CoreExpr::Index { .. }));
    }

    #[test]
    fn super_field_becomes_index_super() {
        let core = desugar_src("super.b");
        assert!(matches!(core.expr, CoreExpr::IndexSuper { .. }));
    }

    #[test]
    fn slice_becomes_call() {
        let core = desugar_src("a[1:2]");
        assert!(matches!(core.expr, CoreExpr::Apply { .. }));
    }

    #[test]
    fn obj_extend_becomes_plus() {
        let core = desugar_src("{a:1}{b:2}");
        match core.expr {
            CoreExpr::Binary { op: a::BinaryOp::Add, .. } => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn duplicate_parameter_name_is_rejected_as_static_error() {
        let core = desugar_src("function(x, x) x");
        let err = check_static(&core).expect_err("duplicate parameter name should be rejected");
        assert_eq!(err.stage, Stage::Static);
        assert!(err.message.contains("x"), "got: {}", err.message);
    }

    #[test]
    fn distinct_parameter_names_are_accepted() {
        let core = desugar_src("function(x, y) x + y");
        assert!(check_static(&core).is_ok());
    }

    #[test]
    fn duplicate_parameter_name_nested_inside_another_expression_is_found() {
        let core = desugar_src("local f = function(a, b, a) a; f(1, 2, 3)");
        let err = check_static(&core).expect_err("duplicate parameter name should be rejected");
        assert_eq!(err.stage, Stage::Static);
    }
}
