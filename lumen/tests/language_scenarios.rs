//! End-to-end scenarios: compile source to bytecode, execute it on a fresh
//! VM, and compare the captured `print` output byte for byte.

use lumen::api::run_output;
use pretty_assertions::assert_eq;

#[test]
fn test_arithmetic() {
    assert_eq!(run_output("{ print(1 + 2 * 3) }").unwrap(), "7\n");
}

#[test]
fn test_string_interpolation() {
    assert_eq!(
        run_output(r#"{ var x := 3; print("x is ${x + 1}") }"#).unwrap(),
        "x is 4\n"
    );
}

#[test]
fn test_conditional() {
    assert_eq!(
        run_output(r#"{ var a := 10; print(if (a > 5) "big" else "small") }"#).unwrap(),
        "big\n"
    );
}

#[test]
fn test_while_counting() {
    assert_eq!(
        run_output("{ var i := 0; while (i < 3) { print(i); i := i + 1 } }").unwrap(),
        "0\n1\n2\n"
    );
}

#[test]
fn test_for_over_range() {
    assert_eq!(
        run_output("{ for (var k in iterator(1..3)) print(k) }").unwrap(),
        "1\n2\n3\n"
    );
}

#[test]
fn test_object_and_field() {
    assert_eq!(
        run_output("{ constant p := $[x: 10, y: 20]; print(p.x + p.y) }").unwrap(),
        "30\n"
    );
}

#[test]
fn test_user_function() {
    assert_eq!(
        run_output("{ function sq(n: Number): Number := n*n; print(sq(4)) }").unwrap(),
        "16\n"
    );
}

// ==================== Beyond the core scenarios ====================

#[test]
fn test_negative_and_fractional_numbers() {
    assert_eq!(run_output("{ print(-3 + 1) }").unwrap(), "-2\n");
    assert_eq!(run_output("{ print(10 / 4) }").unwrap(), "2.500000\n");
}

#[test]
fn test_string_concatenation() {
    assert_eq!(
        run_output(r#"{ print("foo" + "bar") }"#).unwrap(),
        "foobar\n"
    );
}

#[test]
fn test_string_length_and_tostring() {
    assert_eq!(
        run_output(r#"{ print(length("hello")) }"#).unwrap(),
        "5\n"
    );
    assert_eq!(run_output("{ print(toString(true)) }").unwrap(), "true\n");
}

#[test]
fn test_method_call_sugar() {
    assert_eq!(run_output(r#"{ print("hello".length()) }"#).unwrap(), "5\n");
}

#[test]
fn test_runtime_object_fields() {
    assert_eq!(
        run_output("{ var p := $[x: 1 + 1, y: 4]; print(p.x * p.y) }").unwrap(),
        "8\n"
    );
}

#[test]
fn test_object_spread_override() {
    assert_eq!(
        run_output("{ var p := $[x: 1, y: 2]; var q := $[..p, y: 9]; print(q.x + q.y) }")
            .unwrap(),
        "10\n"
    );
}

#[test]
fn test_object_shorthand() {
    assert_eq!(
        run_output("{ var x := 5; var p := $[x]; print(p.x) }").unwrap(),
        "5\n"
    );
}

#[test]
fn test_type_alias() {
    assert_eq!(
        run_output("{ type Meters := Number; var d: Meters := 7; print(d) }").unwrap(),
        "7\n"
    );
}

#[test]
fn test_user_defined_operator_overload() {
    // user functions named after operators participate in operator
    // resolution
    assert_eq!(
        run_output(
            "{ function add(a: Boolean, b: Boolean): Number := if (a) 1 else if (b) 1 else 0; print(true + false) }"
        )
        .unwrap(),
        "1\n"
    );
}

#[test]
fn test_recursion() {
    assert_eq!(
        run_output(
            "{ function fac(n: Number): Number := if (n < 2) 1 else n * fac(n - 1); print(fac(5)) }"
        )
        .unwrap(),
        "120\n"
    );
}

#[test]
fn test_nested_function_calls() {
    assert_eq!(
        run_output(
            "{ function inc(n: Number): Number := n + 1; function twice(n: Number): Number := inc(inc(n)); print(twice(5)) }"
        )
        .unwrap(),
        "7\n"
    );
}

#[test]
fn test_constants_fold_into_call_sites() {
    assert_eq!(
        run_output("{ constant tau := 2 * 3.25; print(tau + 0.5) }").unwrap(),
        "7\n"
    );
}

#[test]
fn test_nested_interpolation() {
    assert_eq!(
        run_output(r#"{ var a := 1; print("a${"b${a}c"}d") }"#).unwrap(),
        "ab1cd\n"
    );
}

#[test]
fn test_booleans_and_comparisons() {
    assert_eq!(
        run_output("{ print(1 <= 2); print(2 == 3); print(!false) }").unwrap(),
        "true\nfalse\ntrue\n"
    );
}

#[test]
fn test_string_equality() {
    assert_eq!(
        run_output(r#"{ print("a" == "a"); print("a" != "b") }"#).unwrap(),
        "true\ntrue\n"
    );
}

#[test]
fn test_descending_range_is_empty() {
    assert_eq!(
        run_output(r#"{ for (var k in iterator(3..1)) print(k); print("done") }"#).unwrap(),
        "done\n"
    );
}

#[test]
fn test_scopes_are_expressions() {
    assert_eq!(
        run_output("{ var x := { var a := 2; a * 3 }; print(x) }").unwrap(),
        "6\n"
    );
}

#[test]
fn test_while_with_compound_condition() {
    assert_eq!(
        run_output(
            "{ var i := 0; var go := true; while (go && i < 10) { i := i + 2; go := i < 5 }; print(i) }"
        )
        .unwrap(),
        "6\n"
    );
}

#[test]
fn test_comments_are_skipped() {
    assert_eq!(
        run_output("{ # leading note\n print(1) # trailing\n }").unwrap(),
        "1\n"
    );
}
