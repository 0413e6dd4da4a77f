//! Definitions phase
//!
//! Collects struct layouts, global variables and function definitions once,
//! before any code is generated. Lowering only ever reads from the resulting
//! context.

use super::fragment::Fragment;
use super::frame::{FrameAllocator, Variable};
use super::init::{flatten, CellInit};
use super::library::LibraryFunction;
use super::optimizer::fold_constant;
use super::primitives::set_cell_value;
use super::structs::{ElementType, StructType};
use crate::error::{Error, Result};
use crate::parser::{FunctionDef, Program, ReturnKind};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Anything a call expression can name
#[derive(Debug, Clone)]
pub enum Callable {
    /// Built-in with a fixed body
    Library(LibraryFunction),
    /// Source-level function, lowered afresh at every call site
    User(Arc<FunctionDef>),
}

impl Callable {
    /// Number of parameters
    pub fn arity(&self) -> usize {
        match self {
            Callable::Library(function) => function.arity(),
            Callable::User(def) => def.params.len(),
        }
    }

    /// Declared return kind
    pub fn return_kind(&self) -> ReturnKind {
        match self {
            Callable::Library(function) => function.return_kind(),
            Callable::User(def) => def.return_kind,
        }
    }
}

/// Read-only registries shared by every function lowering
#[derive(Debug, Clone, Default)]
pub struct CompilationContext {
    structs: HashMap<String, Arc<StructType>>,
    globals: Vec<Variable>,
    globals_size: usize,
    global_init: Fragment,
    functions: HashMap<String, Callable>,
}

impl CompilationContext {
    /// Registers the built-ins, then every struct, global and function of
    /// `program`
    pub fn from_program(program: &Program) -> Result<Self> {
        let mut ctx = CompilationContext::default();
        for function in LibraryFunction::ALL {
            ctx.functions
                .insert(function.name().to_string(), Callable::Library(function));
        }

        for def in &program.structs {
            if ctx.structs.contains_key(&def.name) {
                return Err(Error::semantic(
                    def.span,
                    format!("Struct '{}' is already defined", def.name),
                ));
            }
            let layout = StructType::from_def(def, &ctx.structs)?;
            debug!(name = %def.name, size = layout.size(), "Registered struct");
            ctx.structs.insert(def.name.clone(), Arc::new(layout));
        }

        ctx.layout_globals(program)?;

        for def in &program.functions {
            if ctx.functions.contains_key(&def.name) {
                return Err(Error::semantic(
                    def.span,
                    format!("Function '{}' is already defined", def.name),
                ));
            }
            let mut seen: Vec<&str> = Vec::with_capacity(def.params.len());
            for param in &def.params {
                if seen.contains(&param.name.as_str()) {
                    return Err(Error::semantic(
                        param.span,
                        format!("Parameter '{}' is already defined", param.name),
                    ));
                }
                seen.push(&param.name);
            }
            ctx.functions
                .insert(def.name.clone(), Callable::User(Arc::new(def.clone())));
        }

        Ok(ctx)
    }

    /// Places globals from cell 0 upwards and builds the code that writes
    /// their initial values onto a fresh tape.
    fn layout_globals(&mut self, program: &Program) -> Result<()> {
        let mut frames = FrameAllocator::new();
        let mut init = Fragment::new();

        for decl in &program.globals {
            let ty = ElementType::resolve(&decl.ty, &self.structs, decl.span)?;
            let var = frames.declare(
                Variable::new(&decl.name, ty, decl.dimensions.clone()),
                decl.span,
            )?;

            match &decl.initializer {
                None => init = init.right(var.size()),
                Some(initializer) => {
                    let cells = flatten(
                        initializer,
                        &var.dimensions,
                        var.ty.size(),
                        &var.name,
                        decl.span,
                    )?;
                    for cell in cells {
                        let value = match cell {
                            CellInit::Byte(byte) => byte as i64,
                            CellInit::Expr(expr) => fold_constant(expr).ok_or_else(|| {
                                Error::semantic(
                                    expr.span,
                                    format!("Global '{}' must be initialized with constants", var.name),
                                )
                            })?,
                        };
                        // counter cell is still untouched
                        init = init.then(&set_cell_value(value, 0, false)).right(1);
                    }
                }
            }
            debug!(name = %var.name, cell = var.cell(), size = var.size(), "Placed global");
            self.globals.push(var);
        }

        self.globals_size = frames.current_offset();
        self.global_init = init;
        Ok(())
    }

    /// Global variables with their cells assigned
    pub fn globals(&self) -> &[Variable] {
        &self.globals
    }

    /// Cells occupied by globals; locals of `main` start here
    pub fn globals_size(&self) -> usize {
        self.globals_size
    }

    /// Code that initializes the globals, leaving the head on
    /// [`globals_size`](Self::globals_size)
    pub fn global_init(&self) -> &Fragment {
        &self.global_init
    }

    /// Registered struct layouts by name
    pub fn structs(&self) -> &HashMap<String, Arc<StructType>> {
        &self.structs
    }

    /// Looks up a callable by name
    pub fn function(&self, name: &str) -> Option<&Callable> {
        self.functions.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Scanner;
    use crate::parser::SourceParser;

    fn context(source: &str) -> Result<CompilationContext> {
        let tokens = Scanner::new(source).scan_tokens()?;
        let program = SourceParser::new(tokens).parse()?;
        CompilationContext::from_program(&program)
    }

    #[test]
    fn test_builtins_and_user_functions() {
        let ctx = context("int twice(int x) { return x + x; } void main() {}").unwrap();
        assert_eq!(ctx.function("twice").map(Callable::arity), Some(1));
        assert_eq!(ctx.function("printint").map(Callable::arity), Some(1));
        assert!(ctx.function("missing").is_none());
    }

    #[test]
    fn test_duplicates_rejected() {
        for source in [
            "void f() {} void f() {}",
            "void printint(int x) {}",
            "struct S { int a; }; struct S { int b; };",
            "void f(int a, int a) {}",
        ] {
            assert!(
                matches!(context(source), Err(Error::SemanticError { .. })),
                "{}",
                source
            );
        }
    }

    #[test]
    fn test_global_layout() {
        let ctx = context("int a = 3; int t[3] = {1, 2}; int b; void main() {}").unwrap();
        let cells: Vec<usize> = ctx.globals().iter().map(|g| g.cell()).collect();
        assert_eq!(cells, vec![0, 1, 4]);
        assert_eq!(ctx.globals_size(), 5);
        assert_eq!(ctx.global_init().as_str(), "+++>+>++>>>");
    }

    #[test]
    fn test_global_initializer_must_be_constant() {
        assert!(matches!(
            context("int a = 1; int b = a; void main() {}"),
            Err(Error::SemanticError { .. })
        ));
    }

    #[test]
    fn test_struct_layouts() {
        let ctx = context("struct P { int x; int y[3]; }; struct Q { struct P p; int t; };").unwrap();
        assert_eq!(ctx.structs()["P"].size(), 4);
        assert_eq!(ctx.structs()["Q"].size(), 5);
    }
}
