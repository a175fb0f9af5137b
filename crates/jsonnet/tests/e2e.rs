//! End-to-end scenarios and testable properties from spec.md §8, driven
//! entirely through the public embedding API (`jsonnet::evaluate`).

use jsonnet::{EvalOptions, InMemoryResolver};
use pretty_assertions::assert_eq;

fn run(src: &str) -> String {
    jsonnet::evaluate(src, "<test>", EvalOptions::default()).unwrap_or_else(|e| panic!("evaluation failed: {e}"))
}

fn run_err(src: &str) -> String {
    jsonnet::evaluate(src, "<test>", EvalOptions::default()).expect_err("expected evaluation to fail").to_string()
}

#[test]
fn scenario_plain_object() {
    assert_eq!(run("{ a: 1, b: 2 }"), "{\n   \"a\": 1,\n   \"b\": 2\n}");
}

#[test]
fn scenario_default_parameters() {
    assert_eq!(run("local f(x=10) = x*x; [f(), f(3)]"), "[\n   100,\n   9\n]");
}

#[test]
fn scenario_plus_inheritance_additive_field() {
    assert_eq!(run("{ a: 1 } + { a+: 2 }"), "{\n   \"a\": 3\n}");
}

#[test]
fn scenario_self_reference() {
    assert_eq!(run("{ x: self.y, y: 1 }"), "{\n   \"x\": 1,\n   \"y\": 1\n}");
}

#[test]
fn scenario_late_binding_of_self() {
    assert_eq!(run("local A = { f: 1, g: self.f }; local B = A + { f: 2 }; B.g"), "2");
}

#[test]
fn scenario_super() {
    assert_eq!(run("local A = { f: 1 }; local B = A + { f+: super.f + 10 }; B.f"), "11");
}

#[test]
fn json_round_trip() {
    let docs = [
        r#"{"a":1,"b":[1,2,3],"c":null,"d":true,"e":"hi"}"#,
        r#"[1,2,[3,4],{"x":1}]"#,
        "42",
        "\"a string\"",
        "null",
        "false",
    ];
    for doc in docs {
        let out = run(doc);
        let expected: serde_json::Value = serde_json::from_str(doc).unwrap();
        let actual: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(actual, expected, "round trip failed for {doc}");
    }
}

#[test]
fn determinism() {
    let src = "{ a: [1,2,3], b: { c: 1, d: 2 } + { d: 3 } }";
    assert_eq!(run(src), run(src));
}

#[test]
fn laziness_unused_error_field_does_not_fail() {
    assert_eq!(run(r#"{ a: 1, b: error "x" }.a"#), "1");
}

#[test]
fn laziness_unused_array_error_element_does_not_fail() {
    assert_eq!(run(r#"[1, error "boom", 3][0]"#), "1");
}

#[test]
fn inheritance_associativity() {
    let left = run("(({ a: 1 } + { b: 2 }) + { c: 3 })");
    let right = run("({ a: 1 } + ({ b: 2 } + { c: 3 }))");
    assert_eq!(left, right);
}

#[test]
fn hidden_field_discipline() {
    assert_eq!(run("std.objectHas({ a: 1, b:: 2 }, 'b')"), "false");
    assert_eq!(run("std.objectHasAll({ a: 1, b:: 2 }, 'b')"), "true");
    assert_eq!(run("std.objectHas({ a: 1, b:: 2 }, 'nope')"), "false");
}

#[test]
fn hidden_fields_omitted_from_manifestation() {
    assert_eq!(run("{ a: 1, b:: 2 }"), "{\n   \"a\": 1\n}");
}

#[test]
fn equality_ignores_hidden_fields() {
    assert_eq!(run("{ a: 1, b:: 2 } == { a: 1 }"), "true");
}

#[test]
fn equality_is_structural_over_arrays_and_objects() {
    assert_eq!(run("[1, { a: 1 }, [2, 3]] == [1, { a: 1 }, [2, 3]]"), "true");
    assert_eq!(run("[1, 2] == [1, 3]"), "false");
}

#[test]
fn import_is_resolved_through_the_configured_resolver() {
    let mut resolver = InMemoryResolver::new();
    resolver.insert("lib.jsonnet", "{ greeting: 'hi' }");
    let options = EvalOptions { import_resolver: Box::new(resolver), ..EvalOptions::default() };
    let out = jsonnet::evaluate("(import 'lib.jsonnet').greeting", "<test>", options).unwrap();
    assert_eq!(out, "\"hi\"");
}

#[test]
fn ext_var_is_visible_via_std_extvar() {
    let options = EvalOptions { ext_vars: vec![("who".to_string(), "world".to_string())], ..EvalOptions::default() };
    let out = jsonnet::evaluate("'hello ' + std.extVar('who')", "<test>", options).unwrap();
    assert_eq!(out, "\"hello world\"");
}

#[test]
fn top_level_string_argument_applies_to_function_entry_point() {
    let options = EvalOptions { tla_vars: vec![("name".to_string(), "Ada".to_string())], ..EvalOptions::default() };
    let out = jsonnet::evaluate("function(name) 'hi ' + name", "<test>", options).unwrap();
    assert_eq!(out, "\"hi Ada\"");
}

#[test]
fn string_output_mode_requires_a_string_result() {
    let options = EvalOptions { string_output: true, ..EvalOptions::default() };
    let out = jsonnet::evaluate("'just text'", "<test>", options).unwrap();
    assert_eq!(out, "just text");

    let options = EvalOptions { string_output: true, ..EvalOptions::default() };
    let err = jsonnet::evaluate("{ a: 1 }", "<test>", options).unwrap_err();
    assert!(err.to_string().contains("string"));
}

#[test]
fn infinite_recursion_is_caught_as_a_runtime_error() {
    let message = run_err("local f(x) = f(x) + 1; f(0)");
    assert!(message.to_lowercase().contains("recursion") || message.to_lowercase().contains("stack"), "got: {message}");
}

#[test]
fn format_builtin_covers_common_conversions() {
    assert_eq!(run("std.format('%d', 5)"), "\"5\"");
    assert_eq!(run("std.format('%05.2f', 3.14159)"), "\"03.14\"");
    assert_eq!(run("std.format('%-5s|', 'ab')"), "\"ab   |\"");
    assert_eq!(run("std.format('%s and %s', ['x', 'y'])"), "\"x and y\"");
}

#[test]
fn std_builtin_coverage() {
    assert_eq!(run("std.flatMap(function(x) [x, x], [1, 2])"), "[\n   1,\n   1,\n   2,\n   2\n]");
    assert_eq!(run("std.startsWith('hello', 'he')"), "true");
    assert_eq!(run("std.endsWith('hello', 'lo')"), "true");
    assert_eq!(run("std.parseInt('42')"), "42");
    assert_eq!(run("std.isEven(4)"), "true");
    assert_eq!(run("std.isOdd(4)"), "false");
    assert_eq!(run("std.range(1, 3)"), "[\n   1,\n   2,\n   3\n]");
    assert_eq!(run("std.join(',', ['a','b','c'])"), "\"a,b,c\"");
}
