mod common;

use common::{run, run_err, run_value};

use boa_lang::Value;

#[test]
fn zero_parameter_function() {
    let src = "fn answer():\n    42\nprint(answer())\n";
    assert_eq!(run(src), "42\n");
}

#[test]
fn implicit_return_is_the_last_statement_value() {
    let src = "fn f():\n    1\n    2\n    3\nprint(f())\n";
    assert_eq!(run(src), "3\n");
}

#[test]
fn implicit_return_through_if() {
    let src = "fn sign(n):\n    if n < 0:\n        0 - 1\n    elif n == 0:\n        0\n    else:\n        1\nprint(sign(0 - 9), sign(0), sign(9))\n";
    assert_eq!(run(src), "-1 0 1\n");
}

#[test]
fn explicit_ret_without_value_yields_none() {
    let src = "fn f():\n    ret\nprint(f())\n";
    assert_eq!(run(src), "none\n");
}

#[test]
fn ret_short_circuits_the_body() {
    let src = "fn f():\n    ret 1\n    print(\"unreachable\")\nprint(f())\n";
    assert_eq!(run(src), "1\n");
}

#[test]
fn arguments_evaluate_left_to_right() {
    let src = "\
log = []
fn note(v):
    append(log, v)
    v
fn three(a, b, c):
    a + b + c
three(note(1), note(2), note(3))
print(log)
";
    assert_eq!(run(src), "[1, 2, 3]\n");
}

#[test]
fn recursion_fibonacci() {
    let src = "fn fib(n):\n    if n < 2:\n        n\n    else:\n        fib(n - 1) + fib(n - 2)\nprint(fib(10))\n";
    assert_eq!(run(src), "55\n");
}

#[test]
fn mutual_recursion() {
    let src = "\
fn is_even(n):
    if n == 0:
        true
    else:
        is_odd(n - 1)
fn is_odd(n):
    if n == 0:
        false
    else:
        is_even(n - 1)
print(is_even(10), is_odd(7))
";
    assert_eq!(run(src), "true true\n");
}

#[test]
fn functions_are_values() {
    let src = "fn double(x):\n    x * 2\nf = double\nprint(f(21))\n";
    assert_eq!(run(src), "42\n");
}

#[test]
fn function_display() {
    let src = "fn f():\n    pass\nprint(f)\n";
    assert_eq!(run(src), "<function f>\n");
}

#[test]
fn fn_def_statement_value_is_the_function() {
    match run_value("fn f():\n    pass\n") {
        Value::Function(func) => assert_eq!(func.name.as_ref(), "f"),
        other => panic!("expected function value, got {:?}", other),
    }
}

#[test]
fn closures_capture_by_reference() {
    let src = "\
x = 10
fn get_x():
    x
x = 20
print(get_x())
";
    assert_eq!(run(src), "20\n");
}

#[test]
fn nested_closure_mutation_is_observable_after_return() {
    let src = "\
fn make_counter():
    count = 0
    fn bump():
        count = count + 1
        count
    bump
c = make_counter()
c()
c()
print(c())
";
    assert_eq!(run(src), "3\n");
}

#[test]
fn parameters_shadow_outer_bindings() {
    let src = "x = 1\nfn f(x):\n    x * 10\nprint(f(5))\nprint(x)\n";
    assert_eq!(run(src), "50\n1\n");
}

#[test]
fn assignment_in_function_updates_enclosing_binding() {
    let src = "x = 1\nfn f():\n    x = 2\n    x\nprint(f())\nprint(x)\n";
    assert_eq!(run(src), "2\n2\n");
}

#[test]
fn fresh_names_stay_local_to_the_call_frame() {
    let src = "fn f():\n    local = 9\n    local\nf()\nprint(type(local))\n";
    let err = run_err(src);
    assert!(err.to_string().contains("Undefined variable 'local'"));
}

#[test]
fn arity_must_match_exactly() {
    let err = run_err("fn f(a, b):\n    a\nf(1)\n");
    assert_eq!(
        err.to_string(),
        "RuntimeError: Function 'f' expected 2 arguments, got 1 at line 3, column 2"
    );
    let err = run_err("fn f(a):\n    a\nf(1, 2)\n");
    assert!(err.to_string().contains("expected 1 arguments, got 2"));
}

#[test]
fn builtins_are_callable_values() {
    let src = "p = print\np(\"via alias\")\n";
    assert_eq!(run(src), "via alias\n");
}

#[test]
fn higher_order_functions() {
    let src = "\
fn apply_twice(f, x):
    f(f(x))
fn inc(n):
    n + 1
print(apply_twice(inc, 5))
";
    assert_eq!(run(src), "7\n");
}

#[test]
fn function_defined_inside_if_block() {
    let src = "if true:\n    fn g():\n        \"made it\"\nprint(g())\n";
    assert_eq!(run(src), "made it\n");
}
