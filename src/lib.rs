//! # bfit - a C-like language for the Brainfuck machine
//!
//! bfit compiles a small C-like language (integers, fixed-size arrays,
//! structs, functions, `if`/`while`/`for`/`switch`) into a program over the
//! eight instructions `> < + - . , [ ]` for a machine with 8-bit wrapping
//! cells.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! bfit = "1.0.0"
//! ```
//!
//! ### Compile and run
//!
//! ```rust
//! use bfit::{CompileOptions, Compiler, Interpreter, RunOptions};
//!
//! # fn main() -> bfit::Result<()> {
//! let source = r#"
//!     int factorial(int n) {
//!         int acc = 1;
//!         while (n > 1) {
//!             acc *= n;
//!             n--;
//!         }
//!         return acc;
//!     }
//!
//!     void main() {
//!         printint(factorial(5));
//!     }
//! "#;
//!
//! let compiled = Compiler::new(CompileOptions::default()).compile(source)?;
//! let result = Interpreter::new(&compiled.code)?.run(b"", &RunOptions::default())?;
//! assert_eq!(result.output, b"120");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Source → Scanner → Tokens → Preprocessor → SourceParser → AST
//!        → Optimizer → CompilationContext → Lowering → Code
//! ```
//!
//! - [`Scanner`] - regex-driven tokenizer
//! - [`preprocessor`] - `#include` expansion at the token level
//! - [`SourceParser`] - recursive descent parser producing [`Program`]
//! - [`Compiler`] - constant folding, layout and code generation
//! - [`Interpreter`] - reference machine used by the test suite and the CLI
//!
//! All values are bytes: arithmetic wraps modulo 256 and comparisons are
//! unsigned. Recursion is rejected because every call is expanded inline.

#![warn(missing_docs)]

/// Current version of bfit
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod compiler;
pub mod error;
pub mod lexer;
pub mod minify;
pub mod parser;
pub mod preprocessor;
pub mod runtime;

pub use compiler::{CompileOptions, CompileResult, Compiler, Warning};
pub use error::{Error, ErrorSeverity, Result};
pub use lexer::{Scanner, Span, Token, TokenKind};
pub use parser::{Expression, Program, SourceParser, Statement};
pub use runtime::{Interpreter, RunOptions, RunResult};
