//! Error types for the bfit compiler and tape interpreter

use crate::lexer::Span;
use thiserror::Error;

/// Compiler and interpreter errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Front-end errors
    /// Character sequence the tokenizer has no rule for
    ///
    /// **Triggered by:** Stray characters such as `@` or `$`, unterminated literals
    #[error("Lexical error at line {line}, column {col}: {message}")]
    LexicalError {
        /// Line number where error occurred
        line: usize,
        /// Column number where error occurred
        col: usize,
        /// Error description
        message: String,
    },

    /// Syntax error encountered during parsing
    ///
    /// **Triggered by:** Token sequences the grammar rejects
    /// **Example:** `int main( { }` (missing closing parenthesis)
    #[error("Syntax error at line {line}, column {col}: {message}")]
    SyntaxError {
        /// Line number where error occurred
        line: usize,
        /// Column number where error occurred
        col: usize,
        /// Error description
        message: String,
    },

    /// Unexpected end of file during parsing
    #[error("Unexpected end of file")]
    UnexpectedEof,

    /// An `#include` directive could not be resolved
    #[error("Cannot include '{path}': {message}")]
    IncludeError {
        /// Path as written in the directive
        path: String,
        /// Reason the file could not be read
        message: String,
    },

    // Lowering errors
    /// Program is well formed but meaningless
    ///
    /// **Triggered by:** Undefined or redefined names, wrong argument counts,
    /// literal division by zero, `++` on something that is not a variable
    #[error("Semantic error at line {line}, column {col}: {message}")]
    SemanticError {
        /// Line number where error occurred
        line: usize,
        /// Column number where error occurred
        col: usize,
        /// Error description
        message: String,
    },

    /// Construct the code generator deliberately does not lower
    ///
    /// **Triggered by:** `continue`, or `break` outside a switch case
    #[error("Unsupported at line {line}, column {col}: {feature}")]
    Unsupported {
        /// Line number where error occurred
        line: usize,
        /// Column number where error occurred
        col: usize,
        /// The construct that was rejected
        feature: String,
    },

    // Interpreter errors
    /// `[` or `]` without a partner
    #[error("Unmatched bracket at instruction {position}")]
    UnmatchedBracket {
        /// Index of the offending instruction in the program text
        position: usize,
    },

    /// The head moved left of cell 0
    #[error("Head moved left of cell 0 at instruction {position}")]
    TapeUnderflow {
        /// Index of the offending instruction in the program text
        position: usize,
    },

    /// Execution ran out of its step budget
    ///
    /// Programs that divide by a zero divisor at runtime print a diagnostic and
    /// spin forever; this is how the interpreter reports them.
    #[error("Execution limit exceeded (max: {limit} steps)")]
    ExecutionLimitExceeded {
        /// Step budget that was exhausted
        limit: u64,
        /// Bytes written before the budget ran out
        output: Vec<u8>,
    },
}

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// The source program must be fixed
    Fatal,
    /// A rerun with a larger budget may succeed
    Recoverable,
}

impl Error {
    /// Create a lexical error at the given position
    pub fn lexical(span: Span, msg: impl Into<String>) -> Self {
        Error::LexicalError {
            line: span.line,
            col: span.column,
            message: msg.into(),
        }
    }

    /// Create a syntax error at the given position
    pub fn syntax(span: Span, msg: impl Into<String>) -> Self {
        Error::SyntaxError {
            line: span.line,
            col: span.column,
            message: msg.into(),
        }
    }

    /// Create a semantic error at the given position
    pub fn semantic(span: Span, msg: impl Into<String>) -> Self {
        Error::SemanticError {
            line: span.line,
            col: span.column,
            message: msg.into(),
        }
    }

    /// Create an "unsupported construct" error at the given position
    pub fn unsupported(span: Span, feature: impl Into<String>) -> Self {
        Error::Unsupported {
            line: span.line,
            col: span.column,
            feature: feature.into(),
        }
    }

    /// Classify error severity
    pub fn classify(&self) -> ErrorSeverity {
        match self {
            Error::ExecutionLimitExceeded { .. } => ErrorSeverity::Recoverable,
            _ => ErrorSeverity::Fatal,
        }
    }

    /// Source position the error refers to, if any
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::LexicalError { line, col, .. }
            | Error::SyntaxError { line, col, .. }
            | Error::SemanticError { line, col, .. }
            | Error::Unsupported { line, col, .. } => Some(Span::new(*line, *col)),
            _ => None,
        }
    }
}

/// Result type for bfit operations
pub type Result<T> = std::result::Result<T, Error>;
