//! Comment stripping for compiled programs

use crate::compiler::INSTRUCTIONS;

/// Drops every character that is not one of the eight instructions
pub fn minify(code: &str) -> String {
    code.chars()
        .filter(|c| INSTRUCTIONS.contains(c))
        .collect()
}
