use veld_core::{parse, EvalOptions, Interpreter, RuntimeError};

fn evaluate_with(source: &'static str, options: EvalOptions) -> Result<String, RuntimeError> {
    let expr = parse(source, "<test>")
        .unwrap_or_else(|err| panic!("expected '{}' to parse, but got: {}", source, err));
    Interpreter::new(options).run(&expr)
}

fn assert_evaluates_to(source: &'static str, expected: &'static str) {
    match evaluate_with(source, EvalOptions::default()) {
        Ok(output) => assert_eq!(output, expected, "evaluating '{}'", source),
        Err(err) => panic!("expected '{}' to evaluate, but got: {}", source, err),
    }
}

fn assert_runtime_error(source: &'static str, expected_message: &'static str) -> RuntimeError {
    match evaluate_with(source, EvalOptions::default()) {
        Ok(output) => panic!(
            "expected '{}' to fail at runtime, but got {}",
            source, output
        ),
        Err(err) => {
            assert_eq!(err.message, expected_message, "evaluating '{}'", source);
            err
        }
    }
}

#[test]
fn literals_evaluate() {
    assert_evaluates_to("null", "null");
    assert_evaluates_to("true", "true");
    assert_evaluates_to("1 + 1", "2");
    assert_evaluates_to("2.5 * 2", "5");
    assert_evaluates_to("\"a\" + \"b\"", "\"ab\"");
    assert_evaluates_to("[1, \"two\", [3]]", "[1, \"two\", [3]]");
}

#[test]
fn arithmetic_and_comparison_evaluate() {
    assert_evaluates_to("7 % 3", "1");
    assert_evaluates_to("1 < 2 && 2 <= 2", "true");
    assert_evaluates_to("\"abc\" < \"abd\"", "true");
    assert_evaluates_to("[1, 2] == [1, 2]", "true");
    assert_evaluates_to("[1, 2] != [1, 3]", "true");
    assert_evaluates_to("-(2 + 3)", "-5");
    assert_evaluates_to("!false", "true");
}

#[test]
fn conditionals_evaluate() {
    assert_evaluates_to("if 1 < 2 then \"yes\" else \"no\"", "\"yes\"");
    assert_evaluates_to("if false then 1", "null");
}

#[test]
fn short_circuit_skips_the_right_operand() {
    assert_evaluates_to("false && error \"unreachable\"", "false");
    assert_evaluates_to("true || error \"unreachable\"", "true");
}

#[test]
fn locals_bind_and_shadow() {
    assert_evaluates_to("local a = 1; local b = a + 1; [a, b]", "[1, 2]");
    assert_evaluates_to("local a = 1, b = a + 1; [a, b]", "[1, 2]");
    // A nested `local` shadows for its own value expressions too, so the
    // inner `a` sees itself, not the outer binding.
    assert_runtime_error(
        "local a = 1; local a = a + 1; a",
        "local \"a\" used before its value is initialized",
    );
}

#[test]
fn functions_capture_their_environment() {
    assert_evaluates_to(
        "local make = function(n) function(m) n + m; make(10)(5)",
        "15",
    );
}

#[test]
fn recursion_through_local_works() {
    assert_evaluates_to(
        "local f = function(n) if n == 0 then 1 else n * f(n - 1); f(5)",
        "120",
    );
}

#[test]
fn mutual_recursion_through_local_works() {
    assert_evaluates_to(
        "local even = function(n) if n == 0 then true else odd(n - 1),
               odd = function(n) if n == 0 then false else even(n - 1);
         even(10)",
        "true",
    );
}

#[test]
fn forward_reference_to_a_non_function_bind_is_an_error() {
    assert_runtime_error(
        "local a = b, b = 1; a",
        "local \"b\" used before its value is initialized",
    );
}

#[test]
fn indexing_evaluates() {
    assert_evaluates_to("[10, 20, 30][1]", "20");
    assert_evaluates_to("\"hello\"[1]", "\"e\"");
    assert_runtime_error("[1][5]", "array index 5 out of bounds (length 1)");
    assert_runtime_error("[1][0.5]", "index must be a non-negative integer");
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    assert_runtime_error("1 / 0", "division by zero");
    assert_runtime_error("1 % 0", "division by zero");
}

#[test]
fn type_errors_are_runtime_errors() {
    assert_runtime_error("1 + \"x\"", "operator + cannot be applied to number and string");
    assert_runtime_error("null(1)", "can only call functions, got null");
    assert_runtime_error(
        "(function(a) a)(1, 2)",
        "function expected 1 argument(s), got 2",
    );
    assert_runtime_error(
        "if 1 then 2",
        "condition must be a boolean, got number",
    );
}

#[test]
fn manifesting_a_function_is_a_runtime_error() {
    assert_runtime_error("function(x) x", "couldn't manifest function in output");
}

#[test]
fn error_expression_raises_with_its_message() {
    assert_runtime_error("error \"boom\"", "boom");
    assert_runtime_error("error 42", "42");
}

#[test]
fn error_inside_nested_calls_names_the_enclosing_functions() {
    let err = assert_runtime_error(
        "local inner = function() error \"boom\",
               outer = function() inner();
         outer()",
        "boom",
    );
    let names: Vec<&str> = err.stack.iter().map(|frame| frame.name.as_str()).collect();
    // Outermost call first, then the failing expression's own frame.
    assert_eq!(names, vec!["function <outer>", "function <inner>", ""]);
}

#[test]
fn exceeding_max_stack_is_a_runtime_error() {
    let options = EvalOptions {
        max_stack: 5,
        ..EvalOptions::default()
    };
    let err = evaluate_with("local f = function(n) f(n + 1); f(0)", options)
        .expect_err("unbounded recursion should hit the stack limit");
    assert_eq!(err.message, "Max stack frames exceeded.");
    // Five call frames, plus the frame for the failing call expression.
    assert_eq!(err.stack.len(), 6);
}

#[test]
fn recursion_just_under_the_stack_limit_succeeds() {
    let options = EvalOptions {
        max_stack: 20,
        ..EvalOptions::default()
    };
    let result = evaluate_with(
        "local f = function(n) if n == 0 then 0 else f(n - 1); f(19)",
        options,
    );
    assert_eq!(result.unwrap(), "0");
}

#[test]
fn a_tiny_gc_threshold_forces_collections_mid_run() {
    let source = "local f = function(n) if n == 0 then 0 else (local unused = [n]; f(n - 1)); f(200)";
    let expr = parse(source, "<test>").expect("source should parse");
    let mut interpreter = Interpreter::new(EvalOptions {
        gc_min_objects: 1,
        gc_growth_trigger: 1.0,
        ..EvalOptions::default()
    });
    let output = interpreter.run(&expr).expect("program should evaluate");
    assert_eq!(output, "0");
    assert!(
        interpreter.gc_collections() > 0,
        "expected at least one collection, got {}",
        interpreter.gc_collections()
    );
}

#[test]
fn argument_closures_survive_call_environment_allocation() {
    // The argument is a closure whose environment is only reachable
    // through the evaluated argument value while the call environment is
    // being allocated. An eager collector must still treat it as live.
    let source = "(function(g) g(0))(local y = 7; function(x) y)";
    let expr = parse(source, "<test>").expect("source should parse");
    let mut interpreter = Interpreter::new(EvalOptions {
        gc_min_objects: 1,
        gc_growth_trigger: 0.0,
        ..EvalOptions::default()
    });
    assert_eq!(interpreter.run(&expr).expect("program should evaluate"), "7");
}

#[test]
fn deep_recursion_at_the_default_limit_succeeds() {
    // A recursion depth just under the default limit must evaluate, not
    // exhaust the native stack.
    assert_evaluates_to(
        "local f = function(n) if n == 0 then 0 else f(n - 1); f(499)",
        "0",
    );
}

#[test]
fn unbounded_recursion_at_defaults_reports_the_limit() {
    let err = evaluate_with("local f = function(n) f(n + 1); f(0)", EvalOptions::default())
        .expect_err("unbounded recursion should hit the stack limit");
    assert_eq!(err.message, "Max stack frames exceeded.");
}

#[test]
fn closures_survive_collections() {
    // The adder closure's environment is only reachable through the
    // returned value while the second argument expression runs.
    let source = "local make = function(n) function(m) n + m;
                  local add = make(40);
                  add(1 + 1)";
    let expr = parse(source, "<test>").expect("source should parse");
    let mut interpreter = Interpreter::new(EvalOptions {
        gc_min_objects: 1,
        gc_growth_trigger: 1.0,
        ..EvalOptions::default()
    });
    assert_eq!(interpreter.run(&expr).expect("program should evaluate"), "42");
}

#[test]
fn runtime_error_frames_carry_call_site_locations() {
    let err = assert_runtime_error("local f = function() error \"x\"; f()", "x");
    assert_eq!(err.stack.len(), 2);
    assert_eq!(err.stack[0].location, "<test>:1:34");
    assert_eq!(err.stack[0].name, "function <f>");
}
