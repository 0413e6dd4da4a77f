//! Append-only instruction buffer

use std::fmt;

/// The eight instructions of the target machine
pub const INSTRUCTIONS: &[char] = &['>', '<', '+', '-', '.', ',', '[', ']'];

/// A run of target-machine instructions
///
/// Fragments only grow. Composition is plain concatenation, so a fragment that
/// leaves the head at a known offset can be followed by another that expects
/// the head there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    code: String,
}

impl Fragment {
    /// Empty fragment
    pub fn new() -> Self {
        Fragment::default()
    }

    /// Fragment from raw instruction text
    pub fn raw(code: impl Into<String>) -> Self {
        Fragment { code: code.into() }
    }

    /// Move the head `n` cells right
    pub fn right(mut self, n: usize) -> Self {
        self.push_repeated('>', n);
        self
    }

    /// Move the head `n` cells left
    pub fn left(mut self, n: usize) -> Self {
        self.push_repeated('<', n);
        self
    }

    /// Move the head by a signed distance
    pub fn shift(self, delta: isize) -> Self {
        if delta >= 0 {
            self.right(delta as usize)
        } else {
            self.left(delta.unsigned_abs())
        }
    }

    /// Add `n` to the current cell
    pub fn inc(mut self, n: usize) -> Self {
        self.push_repeated('+', n);
        self
    }

    /// Subtract `n` from the current cell
    pub fn dec(mut self, n: usize) -> Self {
        self.push_repeated('-', n);
        self
    }

    /// `[-]`
    pub fn clear(self) -> Self {
        self.op("[-]")
    }

    /// Append literal instruction text
    pub fn op(mut self, code: &str) -> Self {
        self.code.push_str(code);
        self
    }

    /// Append another fragment
    pub fn then(mut self, other: &Fragment) -> Self {
        self.code.push_str(&other.code);
        self
    }

    /// `[` body `]`
    pub fn repeat(self, body: &Fragment) -> Self {
        self.op("[").then(body).op("]")
    }

    /// Append a comment; instruction characters are dropped from it
    pub fn comment(mut self, text: &str) -> Self {
        self.code.push('\n');
        self.code
            .extend(text.chars().filter(|c| !INSTRUCTIONS.contains(c) && *c != '\n'));
        self.code.push('\n');
        self
    }

    /// Append another fragment in place
    pub fn push(&mut self, other: &Fragment) {
        self.code.push_str(&other.code);
    }

    /// Append literal instruction text in place
    pub fn push_str(&mut self, code: &str) {
        self.code.push_str(code);
    }

    /// Number of instructions, ignoring comment text
    pub fn instruction_count(&self) -> usize {
        self.code.chars().filter(|c| INSTRUCTIONS.contains(c)).count()
    }

    /// Length of the underlying text
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// True if nothing has been appended
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Instruction text
    pub fn as_str(&self) -> &str {
        &self.code
    }

    /// Consumes the fragment, returning its text
    pub fn into_string(self) -> String {
        self.code
    }

    fn push_repeated(&mut self, c: char, n: usize) {
        self.code.extend(std::iter::repeat(c).take(n));
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

impl From<Fragment> for String {
    fn from(fragment: Fragment) -> Self {
        fragment.code
    }
}
