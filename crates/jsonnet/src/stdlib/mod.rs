//! Assembles the complete `std` object evaluation sees: native primitives
//! from [`crate::builtins`], merged with the pure-Jsonnet helpers bundled
//! from `std.jsonnet`, exactly the way ordinary user code merges two object
//! literals with `+` (`object::merge`, no separate code path).

use std::rc::Rc;

use crate::core::{CoreExpr, CoreNode};
use crate::env::Env;
use crate::eval::{synthetic_span, Evaluator, ExtVars};
use crate::object;
use crate::resolver::NullResolver;
use crate::resource::NoLimitTracker;
use crate::span::FileName;
use crate::tracer::NoopTracer;
use crate::value::{Thunk, Value};

const STD_SOURCE: &str = include_str!("std.jsonnet");
const STD_FILE_NAME: &str = "<std>";

/// Builds the `std` value every evaluator starts with.
///
/// Bootstrapping needs its own throwaway evaluator, since the evaluator
/// `std` is destined for can't be constructed before `std` exists. The
/// bundled source's own `std.foo(...)` calls (it freely calls native
/// primitives alongside its own helpers) need `std` to already mean the
/// final merged object, not just the native half — so this uses the same
/// placeholder-then-patch trick `eval.rs` uses to let recursive `local`
/// bindings see their own frame: bind `std` to a thunk before the value it
/// will hold exists, evaluate the bundle against that binding, merge the
/// result with the native layer, then force the placeholder to the answer.
pub fn build_std() -> Value {
    let native = crate::builtins::build_native_std();
    let Value::Object(native_obj) = &native else {
        unreachable!("build_native_std always returns an object");
    };

    let file: FileName = Rc::from(STD_FILE_NAME);
    let ast = crate::parser::parse(STD_SOURCE, file.clone()).expect("bundled std.jsonnet must parse");
    let core = crate::desugar::desugar(&ast);

    let placeholder = Thunk::new(CoreNode::new(CoreExpr::Null, synthetic_span(file.clone())), Env::root());
    let bootstrap_env = Env::root().bind(Rc::from("std"), placeholder.clone());

    let mut evaluator = Evaluator::new(
        Box::new(NullResolver),
        Box::new(NoLimitTracker::default()),
        Box::new(NoopTracer),
        native.clone(),
        ExtVars::default(),
        file,
    );
    let jsonnet_value = evaluator.eval(&core, &bootstrap_env).expect("bundled std.jsonnet must evaluate");
    let Value::Object(jsonnet_obj) = jsonnet_value else {
        panic!("bundled std.jsonnet must evaluate to an object");
    };

    let combined = object::merge(native_obj.clone(), jsonnet_obj);
    placeholder.set_forced(Value::Object(combined.clone()));
    Value::Object(combined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_without_panicking() {
        let std_value = build_std();
        assert!(matches!(std_value, Value::Object(_)));
    }

    #[test]
    fn native_and_jsonnet_fields_are_both_reachable() {
        let Value::Object(obj) = build_std() else { unreachable!() };
        assert!(obj.has_field("length"));
        assert!(obj.has_field("range"));
        assert!(obj.has_field("join"));
    }
}
