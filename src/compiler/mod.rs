//! # bfit Compiler - C-like source to tape-machine code
//!
//! This module lowers a parsed program into a string over the eight
//! instructions `> < + - . , [ ]`.
//!
//! ## Architecture
//!
//! ```text
//! Source → Tokens → #include expansion → AST → Fold constants
//!        → Definitions (structs, globals, functions) → Lowering → Code
//! ```
//!
//! Every variable gets a fixed cell when it is declared, so the emitted code
//! never computes an address at runtime. An expression lowered at offset P
//! leaves its value in P and the head on P+1; statements leave the head on
//! the next free cell. Function calls are expanded inline at every call site.
//!
//! ## Usage
//!
//! ```
//! use bfit::compiler::{CompileOptions, Compiler};
//!
//! let compiler = Compiler::new(CompileOptions::default());
//! let result = compiler.compile("void main() { print(\"hi\"); }")?;
//! assert!(result.code.contains('.'));
//! # Ok::<(), bfit::Error>(())
//! ```

mod branch;
mod context;
mod expr;
mod fragment;
mod frame;
mod function;
mod init;
mod library;
pub mod optimizer;
pub mod primitives;
mod stmt;
mod structs;

pub use context::{Callable, CompilationContext};
pub use fragment::{Fragment, INSTRUCTIONS};
pub use frame::{FrameAllocator, Variable};
pub use library::LibraryFunction;
pub use optimizer::Optimizer;
pub use structs::{ElementType, Field, StructType};

use crate::error::{Error, Result};
use crate::lexer::{Scanner, Span};
use crate::minify::minify;
use crate::parser::{Program, ReturnKind, SourceParser};
use crate::preprocessor::{FileResolver, IncludeResolver, Preprocessor};
use function::Lowerer;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Compilation options
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Fold constants and print constant integers as text
    pub optimize: bool,
    /// Emit a comment line per statement
    pub annotate: bool,
    /// Strip everything that is not an instruction
    pub minify: bool,
    /// Directories searched for `#include <...>`
    pub include_paths: Vec<PathBuf>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            optimize: true,
            annotate: false,
            minify: false,
            include_paths: Vec::new(),
        }
    }
}

/// Non-fatal diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Warning {
    /// Where in the source it applies
    pub span: Span,
    /// What is suspicious
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Warning at {}: {}", self.span, self.message)
    }
}

/// Compilation result with metadata
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// Program text
    pub code: String,
    /// Cells taken by globals, counted from cell 0
    pub globals_size: usize,
    /// Warnings generated during compilation, each reported once
    pub warnings: Vec<Warning>,
}

/// Compiler from source text to tape-machine code
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    /// Create a new compiler with options
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Compiles source text; local includes resolve against the working directory
    pub fn compile(&self, source: &str) -> Result<CompileResult> {
        let resolver = FileResolver::new(self.options.include_paths.clone());
        self.compile_with(source, &resolver)
    }

    /// Compiles a file; local includes resolve against its directory
    pub fn compile_file(&self, path: &Path) -> Result<CompileResult> {
        let (source, resolver) = self.read_source(path)?;
        self.compile_with(&source, &resolver)
    }

    /// Compiles source text, reading includes through `resolver`
    pub fn compile_with(&self, source: &str, resolver: &dyn IncludeResolver) -> Result<CompileResult> {
        let program = self.parse_with(source, resolver)?;
        self.compile_program(program)
    }

    /// Parses a file into its syntax tree without generating code
    pub fn parse_file(&self, path: &Path) -> Result<Program> {
        let (source, resolver) = self.read_source(path)?;
        self.parse_with(&source, &resolver)
    }

    /// Tokenizes, expands includes and parses
    pub fn parse_with(&self, source: &str, resolver: &dyn IncludeResolver) -> Result<Program> {
        let tokens = Scanner::new(source).scan_tokens()?;
        let tokens = Preprocessor::new(resolver).expand(tokens)?;
        debug!(tokens = tokens.len(), "Expanded includes");
        let program = SourceParser::new(tokens).parse()?;
        debug!(
            structs = program.structs.len(),
            globals = program.globals.len(),
            functions = program.functions.len(),
            "Parsed program"
        );
        Ok(program)
    }

    /// Generates code for an already parsed program
    pub fn compile_program(&self, mut program: Program) -> Result<CompileResult> {
        if self.options.optimize {
            Optimizer::new(2).optimize(&mut program);
        }

        let ctx = CompilationContext::from_program(&program)?;
        let main = program
            .functions
            .iter()
            .find(|f| f.name == "main")
            .ok_or_else(|| Error::semantic(Span::new(1, 1), "No 'main' function"))?;
        if !main.params.is_empty() {
            return Err(Error::semantic(main.span, "'main' must not take parameters"));
        }

        let start = ctx.globals_size();
        let mut lowerer = Lowerer::new(&ctx, ReturnKind::Void, start, self.options.annotate);
        let mut code = ctx.global_init().clone();
        code.push(&lowerer.lower_call("main", &[], main.span, start)?);

        let mut seen = HashSet::new();
        let warnings: Vec<Warning> = lowerer
            .warnings
            .into_iter()
            .filter(|warning| seen.insert(warning.clone()))
            .collect();

        let code = if self.options.minify {
            minify(code.as_str())
        } else {
            code.into_string()
        };
        info!(
            instructions = code.len(),
            globals = start,
            warnings = warnings.len(),
            "Compiled program"
        );

        Ok(CompileResult {
            code,
            globals_size: start,
            warnings,
        })
    }

    fn read_source(&self, path: &Path) -> Result<(String, FileResolver)> {
        let source = std::fs::read_to_string(path).map_err(|e| Error::IncludeError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let mut resolver = FileResolver::new(self.options.include_paths.clone());
        if let Some(dir) = path.parent() {
            resolver = resolver.with_root_dir(dir);
        }
        Ok((source, resolver))
    }
}

/// Lowers a standalone expression over literals and built-ins with its
/// result in cell `at`, without folding it first.
pub fn lower_expression_at(source: &str, at: usize) -> Result<Fragment> {
    let tokens = Scanner::new(source).scan_tokens()?;
    let expr = SourceParser::new(tokens).parse_standalone_expression()?;
    let ctx = CompilationContext::from_program(&Program::default())?;
    let mut lowerer = Lowerer::new(&ctx, ReturnKind::Void, 0, false);
    lowerer.frames.enter_scope_at(at);
    lowerer.lower_expr(&expr, at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessor::MemoryResolver;
    use crate::runtime::{Interpreter, RunOptions};

    fn run(result: &CompileResult, input: &[u8]) -> Vec<u8> {
        Interpreter::new(&result.code)
            .unwrap()
            .run(input, &RunOptions::default())
            .unwrap()
            .output
    }

    #[test]
    fn test_main_is_required() {
        let compiler = Compiler::new(CompileOptions::default());
        assert!(matches!(
            compiler.compile("int helper() { return 1; }"),
            Err(Error::SemanticError { .. })
        ));
        assert!(matches!(
            compiler.compile("void main(int x) { }"),
            Err(Error::SemanticError { .. })
        ));
    }

    #[test]
    fn test_include_through_resolver() {
        let resolver = MemoryResolver::new().with_file("square.h", "int square(int x) { return x * x; }");
        let source = "#include \"square.h\"\nvoid main() { printint(square(12)); }";
        let result = Compiler::new(CompileOptions::default())
            .compile_with(source, &resolver)
            .unwrap();
        assert_eq!(run(&result, b""), b"144");
    }

    #[test]
    fn test_annotate_and_minify() {
        let source = "void main() { int x = 2; printint(x); }";
        let annotated = Compiler::new(CompileOptions {
            annotate: true,
            ..CompileOptions::default()
        })
        .compile(source)
        .unwrap();
        assert!(annotated.code.contains("declare x"));

        let minified = Compiler::new(CompileOptions {
            annotate: true,
            minify: true,
            ..CompileOptions::default()
        })
        .compile(source)
        .unwrap();
        assert!(minified.code.chars().all(|c| "<>+-.,[]".contains(c)));
        assert_eq!(run(&annotated, b""), run(&minified, b""));
    }

    #[test]
    fn test_optimization_preserves_output() {
        let source = "int g = 3 * 4; void main() { printint(g + 2 * 5); printint(7 * 6); }";
        let optimized = Compiler::new(CompileOptions::default()).compile(source).unwrap();
        let plain = Compiler::new(CompileOptions {
            optimize: false,
            ..CompileOptions::default()
        })
        .compile(source)
        .unwrap();
        assert_eq!(run(&optimized, b""), b"2242");
        assert_eq!(run(&plain, b""), b"2242");
        assert!(optimized.code.len() < plain.code.len());
    }

    #[test]
    fn test_warnings_reported_once_per_site() {
        let source = "int f() { return 1; return 2; } void main() { f(); f(); }";
        let result = Compiler::new(CompileOptions::default()).compile(source).unwrap();
        assert_eq!(result.warnings.len(), 1);
    }
}
