/// Compile-time diagnostics and runtime failures
use bfit::preprocessor::MemoryResolver;
use bfit::runtime::DEFAULT_MAX_STEPS;
use bfit::{CompileOptions, Compiler, Error, ErrorSeverity, Interpreter, RunOptions};

fn compile_err(source: &str) -> Error {
    Compiler::new(CompileOptions::default())
        .compile(source)
        .unwrap_err()
}

#[test]
fn test_lexical_error_position() {
    let err = compile_err("void main() {\n    int a = 1 @ 2;\n}");
    assert!(matches!(err, Error::LexicalError { line: 2, .. }), "{:?}", err);
    assert_eq!(err.classify(), ErrorSeverity::Fatal);
}

#[test]
fn test_syntax_error_position() {
    let err = compile_err("void main() {\n    int a = 1\n    printint(a);\n}");
    assert!(matches!(err, Error::SyntaxError { line: 3, .. }), "{:?}", err);
    assert_eq!(err.span().map(|span| span.line), Some(3));
}

#[test]
fn test_unexpected_end_of_file() {
    assert_eq!(compile_err("void main() { int a = 1;"), Error::UnexpectedEof);
}

#[test]
fn test_semantic_errors() {
    for source in [
        "void main() { printint(b); }",
        "void main() { int a; int a; }",
        "void main() { struct Missing m; }",
        "struct P { int x; }; void main() { struct P p; p.z = 1; }",
        "void main() { int a = 1; a.x = 2; }",
        "int f(int n) { return f(n - 1); } void main() { f(3); }",
        "int g = readint(); void main() { }",
    ] {
        assert!(
            matches!(compile_err(source), Error::SemanticError { .. }),
            "{}",
            source
        );
    }
}

#[test]
fn test_loop_break_and_continue_unsupported() {
    for source in [
        "void main() { while (1) { break; } }",
        "void main() { int i; for (i = 0; i < 3; i++) { continue; } }",
    ] {
        assert!(
            matches!(compile_err(source), Error::Unsupported { .. }),
            "{}",
            source
        );
    }
}

#[test]
fn test_missing_include() {
    let err = Compiler::new(CompileOptions::default())
        .compile_with("#include <nothing.h>\nvoid main() {}", &MemoryResolver::new())
        .unwrap_err();
    assert!(matches!(err, Error::IncludeError { .. }));
}

#[test]
fn test_runtime_division_by_zero_hangs_after_message() {
    let compiled = Compiler::new(CompileOptions::default())
        .compile("void main() { int a = 5; int b = 0; print(\"go \"); printint(a / b); }")
        .unwrap();
    let err = Interpreter::new(&compiled.code)
        .unwrap()
        .run(b"", &RunOptions::with_max_steps(200_000))
        .unwrap_err();
    assert_eq!(err.classify(), ErrorSeverity::Recoverable);
    match err {
        Error::ExecutionLimitExceeded { limit, output } => {
            assert_eq!(limit, 200_000);
            assert_eq!(output, b"go Error - Division by zero\n");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_interpreter_errors() {
    assert!(matches!(
        Interpreter::new("+[>+"),
        Err(Error::UnmatchedBracket { .. })
    ));
    assert!(matches!(
        Interpreter::new("+]"),
        Err(Error::UnmatchedBracket { .. })
    ));
    let underflow = Interpreter::new(">><<<").unwrap().run(b"", &RunOptions::default());
    assert!(matches!(underflow, Err(Error::TapeUnderflow { .. })));
    let spin = Interpreter::new("+[]")
        .unwrap()
        .run(b"", &RunOptions::with_max_steps(1000));
    assert!(matches!(spin, Err(Error::ExecutionLimitExceeded { limit: 1000, .. })));
    assert!(DEFAULT_MAX_STEPS > 1000);
}
