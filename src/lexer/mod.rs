//! Lexical analysis
//!
//! Converts source text into a stream of tokens with a table of regex rules:
//! the longest match wins and ties go to the rule listed first.

mod scanner;
mod token;

pub use scanner::Scanner;
pub use token::{Span, Token, TokenKind};
