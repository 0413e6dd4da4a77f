//! Function lowering and the calling convention
//!
//! A call at offset P uses this activation layout:
//!
//! ```text
//! P        return value, zeroed by the caller
//! P+1..    parameters, in order
//! ...      locals of the callee
//! ```
//!
//! The caller zeroes P, evaluates the arguments into the following cells,
//! moves the head back to P and splices in the callee. User functions are
//! lowered afresh for every call site, against a frame stack that holds only
//! the globals, so every call gets its own absolute cell layout. The callee
//! ends with the head on P.

use super::context::{Callable, CompilationContext};
use super::fragment::Fragment;
use super::frame::{FrameAllocator, Variable};
use super::Warning;
use crate::error::{Error, Result};
use crate::lexer::Span;
use crate::parser::{Expression, FunctionDef, ReturnKind, Statement};
use tracing::{debug, warn};

/// Lowering state for one function activation
pub(super) struct Lowerer<'c> {
    pub(super) ctx: &'c CompilationContext,
    pub(super) frames: FrameAllocator,
    pub(super) return_kind: ReturnKind,
    /// Absolute cell of this activation's return value
    pub(super) return_cell: usize,
    /// Functions currently being lowered, outermost first
    call_stack: Vec<String>,
    pub(super) annotate: bool,
    pub(super) warnings: Vec<Warning>,
}

impl<'c> Lowerer<'c> {
    /// Lowering state for an activation whose return cell is `return_cell`
    pub(super) fn new(
        ctx: &'c CompilationContext,
        return_kind: ReturnKind,
        return_cell: usize,
        annotate: bool,
    ) -> Self {
        Lowerer {
            ctx,
            frames: FrameAllocator::with_globals(ctx.globals()),
            return_kind,
            return_cell,
            call_stack: Vec::new(),
            annotate,
            warnings: Vec::new(),
        }
    }

    /// Records a non-fatal diagnostic
    pub(super) fn warn(&mut self, span: Span, message: impl Into<String>) {
        let warning = Warning {
            span,
            message: message.into(),
        };
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Emits a call to `name` with its return cell at `at`; the head ends
    /// on `at + 1` with the returned value in `at`.
    pub(super) fn lower_call(
        &mut self,
        name: &str,
        args: &[Expression],
        span: Span,
        at: usize,
    ) -> Result<Fragment> {
        let callable = self
            .ctx
            .function(name)
            .cloned()
            .ok_or_else(|| Error::semantic(span, format!("Undefined function '{}'", name)))?;

        if args.len() != callable.arity() {
            return Err(Error::semantic(
                span,
                format!(
                    "Function '{}' expects {} argument(s), got {}",
                    name,
                    callable.arity(),
                    args.len()
                ),
            ));
        }

        let mut code = Fragment::raw("[-]>");
        for (i, arg) in args.iter().enumerate() {
            code.push(&self.lower_expr(arg, at + 1 + i)?);
        }
        code = code.left(args.len() + 1);

        let body = match callable {
            Callable::Library(function) => function.body(),
            Callable::User(def) => self.lower_callee(&def, span, at)?,
        };
        Ok(code.then(&body).right(1))
    }

    /// Lowers the body of `def` for an activation at `at`
    fn lower_callee(&mut self, def: &FunctionDef, span: Span, at: usize) -> Result<Fragment> {
        if self.call_stack.iter().any(|active| active == &def.name) {
            return Err(Error::semantic(
                span,
                format!(
                    "Recursive call to '{}' is not supported: calls are expanded inline",
                    def.name
                ),
            ));
        }
        debug!(
            function = %def.name,
            return_cell = at,
            depth = self.call_stack.len(),
            "Lowering call site"
        );

        let mut callee = Lowerer::new(self.ctx, def.return_kind, at, self.annotate);
        callee.call_stack = self.call_stack.clone();
        callee.call_stack.push(def.name.clone());

        let code = callee.lower_function_body(def);
        self.warnings.append(&mut callee.warnings);
        code
    }

    fn lower_function_body(&mut self, def: &FunctionDef) -> Result<Fragment> {
        self.frames.enter_scope_at(self.return_cell + 1);
        for param in &def.params {
            self.frames.declare(Variable::scalar(&param.name), param.span)?;
        }

        let mut code = Fragment::new();
        if self.annotate {
            code = code.comment(&format!("call {}", def.name));
        }
        code = code.right(1 + def.params.len());
        code.push(&self.lower_statements(&def.body)?);

        let claimed = self.frames.exit_scope();
        let mut code = code.left(claimed).left(1);
        if self.annotate {
            code = code.comment(&format!("end {}", def.name));
        }
        Ok(code)
    }

    /// Lowers statements in order in the current frame
    pub(super) fn lower_statements(&mut self, statements: &[Statement]) -> Result<Fragment> {
        let mut code = Fragment::new();
        for (i, statement) in statements.iter().enumerate() {
            if let Statement::Return { span, .. } = statement {
                let rest = &statements[i + 1..];
                if rest.iter().any(|s| *s != Statement::Empty) {
                    self.warn(
                        *span,
                        "Statements after 'return' still run; 'return' only sets the result",
                    );
                }
            }
            code.push(&self.lower_statement(statement)?);
        }
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use crate::compiler::{CompileOptions, Compiler};
    use crate::runtime::{Interpreter, RunOptions};
    use crate::Error;

    fn run(source: &str) -> Vec<u8> {
        let result = Compiler::new(CompileOptions::default()).compile(source).unwrap();
        Interpreter::new(&result.code)
            .unwrap()
            .run(b"", &RunOptions::default())
            .unwrap()
            .output
    }

    fn compile_err(source: &str) -> Error {
        Compiler::new(CompileOptions::default())
            .compile(source)
            .unwrap_err()
    }

    #[test]
    fn test_call_with_arguments() {
        let source = "int add3(int a, int b, int c) { return a + b + c; }
                      void main() { printint(add3(1, 2, 3)); }";
        assert_eq!(run(source), b"6");
    }

    #[test]
    fn test_nested_calls_share_nothing() {
        let source = "int twice(int x) { int y = x * 2; return y; }
                      void main() { int a = twice(twice(3)); printint(a); printint(twice(a)); }";
        assert_eq!(run(source), b"1224");
    }

    #[test]
    fn test_globals_visible_in_callee() {
        let source = "int counter = 10;
                      void bump() { counter += 5; }
                      void main() { bump(); bump(); printint(counter); }";
        assert_eq!(run(source), b"20");
    }

    #[test]
    fn test_recursion_rejected() {
        let direct = "int f(int n) { return f(n); } void main() { f(1); }";
        let indirect = "int f(int n) { return g(n); } int g(int n) { return f(n); } void main() { g(1); }";
        for source in [direct, indirect] {
            match compile_err(source) {
                Error::SemanticError { message, .. } => assert!(message.contains("Recursive")),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_arity_and_unknown_function() {
        assert!(matches!(
            compile_err("int f(int a) { return a; } void main() { f(1, 2); }"),
            Error::SemanticError { .. }
        ));
        assert!(matches!(
            compile_err("void main() { nowhere(); }"),
            Error::SemanticError { .. }
        ));
    }

    #[test]
    fn test_return_does_not_stop_execution() {
        let source = "int f() { return 1; print(\"after\"); } void main() { printint(f()); }";
        let result = Compiler::new(CompileOptions::default()).compile(source).unwrap();
        assert_eq!(result.warnings.len(), 1);
        let output = Interpreter::new(&result.code)
            .unwrap()
            .run(b"", &RunOptions::default())
            .unwrap()
            .output;
        assert_eq!(output, b"after1");
    }

    #[test]
    fn test_void_return_value_rejected() {
        assert!(matches!(
            compile_err("void f() { return 3; } void main() { f(); }"),
            Error::SemanticError { .. }
        ));
    }
}
