use veld_core::{analyze, parse, unparse, EvalOptions, Interpreter};

use crate::{args::ExecutionRequest, diagnostics::Diagnostic, input::SourceText};

/// Runs one request through parse → (unparse | analyze → evaluate) and
/// returns the text to print on success. The first failing stage wins;
/// nothing is retried.
pub fn run(request: &ExecutionRequest, source: &SourceText) -> Result<String, Diagnostic> {
    let expr = parse(&source.text, &source.origin)?;

    if request.debug_ast {
        return Ok(unparse(&expr));
    }

    analyze(&expr)?;

    let options = EvalOptions {
        max_stack: request.max_stack,
        gc_min_objects: request.gc_min_objects,
        gc_growth_trigger: request.gc_growth_trigger,
    };
    let output = Interpreter::new(options).run(&expr)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::run;
    use crate::{
        args::{ExecutionRequest, InputSource},
        diagnostics::Diagnostic,
        input::SourceText,
    };

    fn request() -> ExecutionRequest {
        ExecutionRequest {
            input: InputSource::Stdin,
            max_stack: 500,
            gc_min_objects: 1000,
            gc_growth_trigger: 2.0,
            debug_ast: false,
        }
    }

    fn source(text: &str) -> SourceText {
        SourceText::new("<test>", text)
    }

    #[test]
    fn evaluation_prints_the_manifested_value() {
        assert_eq!(run(&request(), &source("1+1")), Ok("2".to_string()));
    }

    #[test]
    fn debug_ast_unparses_without_evaluating() {
        let request = ExecutionRequest {
            debug_ast: true,
            ..request()
        };
        // `error` would raise if this were evaluated.
        assert_eq!(
            run(&request, &source("error \"boom\"")),
            Ok("error \"boom\"".to_string())
        );
    }

    #[test]
    fn debug_ast_applies_to_literal_code_too() {
        // --exec only changes where the text comes from; --debug-ast still
        // short-circuits after parse.
        let request = ExecutionRequest {
            input: InputSource::LiteralCode("1   +   1".to_string()),
            debug_ast: true,
            ..request()
        };
        let source = SourceText::new("<cmdline>", "1   +   1");
        assert_eq!(run(&request, &source), Ok("(1 + 1)".to_string()));
    }

    #[test]
    fn parse_failures_become_static_diagnostics() {
        match run(&request(), &source("1 +")) {
            Err(Diagnostic::Static(err)) => {
                assert_eq!(err.message, "expected an expression, got end of input");
            }
            other => panic!("expected a static diagnostic, got {:?}", other),
        }
    }

    #[test]
    fn analysis_failures_become_static_diagnostics() {
        match run(&request(), &source("nope")) {
            Err(Diagnostic::Static(err)) => {
                assert_eq!(err.message, "unknown variable: nope");
            }
            other => panic!("expected a static diagnostic, got {:?}", other),
        }
    }

    #[test]
    fn debug_ast_skips_analysis() {
        let request = ExecutionRequest {
            debug_ast: true,
            ..request()
        };
        assert_eq!(run(&request, &source("nope")), Ok("nope".to_string()));
    }

    #[test]
    fn runtime_failures_become_runtime_diagnostics() {
        match run(&request(), &source("1/0")) {
            Err(Diagnostic::Runtime(err)) => {
                assert_eq!(err.message, "division by zero");
            }
            other => panic!("expected a runtime diagnostic, got {:?}", other),
        }
    }

    #[test]
    fn the_stack_limit_reaches_the_evaluator() {
        let request = ExecutionRequest {
            max_stack: 3,
            ..request()
        };
        match run(&request, &source("local f = function(n) f(n); f(0)")) {
            Err(Diagnostic::Runtime(err)) => {
                assert_eq!(err.message, "Max stack frames exceeded.");
            }
            other => panic!("expected a runtime diagnostic, got {:?}", other),
        }
    }
}
