mod common;

use common::{run, run_err, run_value};

use boa_lang::Value;

#[test]
fn addition_coercion_table() {
    assert_eq!(run_value("1 + 2\n"), Value::Int(3));
    assert_eq!(run_value("1 + 2.5\n"), Value::Float(3.5));
    assert_eq!(run_value("1.5 + 2\n"), Value::Float(3.5));
    assert_eq!(run("print(\"a\" + \"b\")\n"), "ab\n");
    assert_eq!(run("print([1] + [2, 3])\n"), "[1, 2, 3]\n");
}

#[test]
fn list_addition_builds_a_new_list() {
    let src = "a = [1]\nb = [2]\nc = a + b\nappend(a, 9)\nprint(c)\n";
    assert_eq!(run(src), "[1, 2]\n");
}

#[test]
fn subtraction_and_multiplication() {
    assert_eq!(run_value("7 - 2\n"), Value::Int(5));
    assert_eq!(run_value("7 - 0.5\n"), Value::Float(6.5));
    assert_eq!(run_value("6 * 7\n"), Value::Int(42));
    assert_eq!(run("print(\"ab\" * 3)\n"), "ababab\n");
    assert_eq!(run("print(\"ab\" * 0)\n"), "\n");
}

#[test]
fn int_division_truncates_toward_zero() {
    assert_eq!(run_value("7 / 2\n"), Value::Int(3));
    assert_eq!(run_value("0 - 7 / 2\n"), Value::Int(-3));
    assert_eq!(run_value("(0 - 7) / 2\n"), Value::Int(-3));
}

#[test]
fn mixed_division_is_floating() {
    assert_eq!(run_value("7.5 / 2\n"), Value::Float(3.75));
    assert_eq!(run_value("1 / 0.5\n"), Value::Float(2.0));
}

#[test]
fn modulo_sign_follows_dividend() {
    assert_eq!(run_value("7 % 3\n"), Value::Int(1));
    assert_eq!(run_value("(0 - 7) % 3\n"), Value::Int(-1));
    assert_eq!(run_value("7 % (0 - 3)\n"), Value::Int(1));
    assert_eq!(run_value("7.5 % 2\n"), Value::Float(1.5));
}

#[test]
fn power_operator() {
    assert_eq!(run_value("2 ** 10\n"), Value::Int(1024));
    assert_eq!(run_value("2 ** 0\n"), Value::Int(1));
    assert_eq!(run_value("(0 - 2) ** 3\n"), Value::Int(-8));
    assert_eq!(run_value("2 ** -2\n"), Value::Float(0.25));
    assert_eq!(run_value("2.5 ** 2\n"), Value::Float(6.25));
}

#[test]
fn power_is_right_associative() {
    assert_eq!(run_value("2 ** 3 ** 2\n"), Value::Int(512));
}

#[test]
fn power_identity_against_repeated_product() {
    for n in 0..12 {
        let product = (0..n).fold(1i64, |acc, _| acc * 3);
        assert_eq!(run_value(&format!("3 ** {}\n", n)), Value::Int(product));
    }
}

#[test]
fn comparison_operators() {
    assert_eq!(run("print(1 < 2, 2 <= 2, 3 > 2, 3 >= 4)\n"), "true true true false\n");
    assert_eq!(run("print(\"a\" < \"b\", \"b\" < \"ab\")\n"), "true false\n");
}

#[test]
fn equality_is_structural_for_scalars() {
    assert_eq!(run("print(none == none)\n"), "true\n");
    assert_eq!(run("print(true == true, true == 1)\n"), "true false\n");
    assert_eq!(run("print(1 == 1.0, 2.5 == 2.5)\n"), "true true\n");
    assert_eq!(run("print(\"x\" == \"x\", \"x\" == \"y\")\n"), "true false\n");
    assert_eq!(run("print([1, 2] == [1, 2])\n"), "false\n");
}

#[test]
fn truthiness_triad() {
    for v in ["none", "true", "false", "0", "3", "0.0", "\"\"", "\"x\"", "[]", "[1]", "{}"] {
        let src = format!("x = {}\nprint(type(not x))\n", v);
        assert_eq!(run(&src), "bool\n", "not {} should be a bool", v);
    }
    // v and v / v or v preserve truthiness
    assert_eq!(run("x = 0\nprint(not (x and x), not (x or x))\n"), "true true\n");
    assert_eq!(run("x = 3\nprint(not (x and x), not (x or x))\n"), "false false\n");
}

#[test]
fn short_circuit_identity_is_observable() {
    let src = "log = []\nfn effect(v):\n    append(log, v)\n    v\nfalse and effect(1)\ntrue or effect(2)\ntrue and effect(3)\nprint(log)\n";
    assert_eq!(run(src), "[3]\n");
}

#[test]
fn and_or_return_the_deciding_operand() {
    assert_eq!(run("print(1 and \"x\")\n"), "x\n");
    assert_eq!(run("print(0 and \"x\")\n"), "0\n");
    assert_eq!(run("print(\"\" or [1])\n"), "[1]\n");
    assert_eq!(run("print(7 or 9)\n"), "7\n");
}

#[test]
fn not_uses_truthiness() {
    assert_eq!(run("print(not 0, not 1, not \"\", not [1])\n"), "true false true false\n");
}

#[test]
fn unsupported_operand_combinations_fail() {
    assert!(run_err("\"a\" - \"b\"\n").to_string().contains("Cannot subtract"));
    assert!(run_err("[1] * [2]\n").to_string().contains("Cannot multiply"));
    assert!(run_err("none + 1\n").to_string().contains("Cannot add none and int"));
    assert!(run_err("true ** true\n").to_string().contains("Cannot exponentiate bool"));
    assert!(run_err("1 < \"a\"\n").to_string().contains("Cannot compare int and string"));
}

#[test]
fn division_and_modulo_by_zero() {
    assert!(run_err("1 / 0\n").to_string().contains("Division by zero"));
    assert!(run_err("1 / 0.0\n").to_string().contains("Division by zero"));
    assert!(run_err("1 % 0\n").to_string().contains("Modulo by zero"));
    assert!(run_err("1.5 % 0\n").to_string().contains("Modulo by zero"));
}
