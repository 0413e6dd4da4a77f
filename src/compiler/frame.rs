//! Compile-time tape allocation
//!
//! Every variable gets a fixed cell offset when it is declared. Frames form a
//! stack: entering a scope starts a frame at the enclosing frame's next free
//! offset, and leaving it hands those cells back without clearing them. Code
//! generated later must therefore zero any cell before relying on its value.

use super::structs::ElementType;
use crate::error::{Error, Result};
use crate::lexer::Span;
use std::collections::HashMap;

/// A declared (or about to be declared) variable
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Source name
    pub name: String,
    /// Element type
    pub ty: ElementType,
    /// Array dimensions, empty for scalars
    pub dimensions: Vec<usize>,
    /// First cell, set by [`FrameAllocator::declare`]
    pub cell_index: Option<usize>,
}

impl Variable {
    /// An undeclared variable
    pub fn new(name: impl Into<String>, ty: ElementType, dimensions: Vec<usize>) -> Self {
        Variable {
            name: name.into(),
            ty,
            dimensions,
            cell_index: None,
        }
    }

    /// An undeclared single-cell `int`
    pub fn scalar(name: impl Into<String>) -> Self {
        Variable::new(name, ElementType::Int, Vec::new())
    }

    /// Total cells occupied
    pub fn size(&self) -> usize {
        self.dimensions.iter().product::<usize>() * self.ty.size()
    }

    /// True for a plain one-cell `int`
    pub fn is_scalar(&self) -> bool {
        self.dimensions.is_empty() && self.ty == ElementType::Int
    }

    /// First cell of a declared variable
    pub fn cell(&self) -> usize {
        self.cell_index.unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
struct Frame {
    start: usize,
    next_free: usize,
    symbols: HashMap<String, Variable>,
}

impl Frame {
    fn at(offset: usize) -> Self {
        Frame {
            start: offset,
            next_free: offset,
            symbols: HashMap::new(),
        }
    }
}

/// Stack of frames mapping names to cell offsets
#[derive(Debug, Clone)]
pub struct FrameAllocator {
    frames: Vec<Frame>,
}

impl Default for FrameAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAllocator {
    /// Creates an allocator whose outermost frame starts at cell 0
    pub fn new() -> Self {
        FrameAllocator {
            frames: vec![Frame::at(0)],
        }
    }

    /// Creates an allocator whose outermost frame already holds `globals`
    pub fn with_globals<'a>(globals: impl IntoIterator<Item = &'a Variable>) -> Self {
        let mut base = Frame::at(0);
        for var in globals {
            let end = var.cell() + var.size();
            base.next_free = base.next_free.max(end);
            base.symbols.insert(var.name.clone(), var.clone());
        }
        FrameAllocator { frames: vec![base] }
    }

    /// Pushes a frame starting at the current offset
    pub fn enter_scope(&mut self) {
        let offset = self.current_offset();
        self.frames.push(Frame::at(offset));
    }

    /// Pushes a frame starting at `offset`, which must not be below the current offset
    pub fn enter_scope_at(&mut self, offset: usize) {
        debug_assert!(offset >= self.current_offset());
        self.frames.push(Frame::at(offset));
    }

    /// Pops the innermost frame and returns how many cells it had claimed
    pub fn exit_scope(&mut self) -> usize {
        if self.frames.len() > 1 {
            self.frames
                .pop()
                .map_or(0, |frame| frame.next_free - frame.start)
        } else {
            0
        }
    }

    /// Declares `var` in the innermost frame and returns it with its cell assigned
    ///
    /// Shadowing a name from an outer frame is allowed; redeclaring a name in
    /// the same frame is not.
    pub fn declare(&mut self, mut var: Variable, span: Span) -> Result<Variable> {
        let frame = self.innermost_mut();
        if frame.symbols.contains_key(&var.name) {
            return Err(Error::semantic(
                span,
                format!("Variable '{}' is already defined in this scope", var.name),
            ));
        }
        var.cell_index = Some(frame.next_free);
        frame.next_free += var.size();
        frame.symbols.insert(var.name.clone(), var.clone());
        Ok(var)
    }

    /// Finds the innermost variable called `name`
    pub fn lookup(&self, name: &str, span: Span) -> Result<&Variable> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.symbols.get(name))
            .ok_or_else(|| Error::semantic(span, format!("Undefined variable '{}'", name)))
    }

    /// Next free cell
    pub fn current_offset(&self) -> usize {
        self.frames.last().map_or(0, |frame| frame.next_free)
    }

    /// Cells claimed so far by the innermost frame
    pub fn scope_size(&self) -> usize {
        self.frames
            .last()
            .map_or(0, |frame| frame.next_free - frame.start)
    }

    /// Claims `count` unnamed scratch cells and returns the first one
    pub fn reserve(&mut self, count: usize) -> usize {
        let frame = self.innermost_mut();
        let first = frame.next_free;
        frame.next_free += count;
        first
    }

    /// Returns scratch cells claimed by [`reserve`](Self::reserve)
    pub fn release(&mut self, count: usize) {
        let frame = self.innermost_mut();
        debug_assert!(frame.next_free >= frame.start + count);
        frame.next_free -= count;
    }

    /// Number of frames on the stack
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn innermost_mut(&mut self) -> &mut Frame {
        if self.frames.is_empty() {
            self.frames.push(Frame::at(0));
        }
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::new(1, 1)
    }

    #[test]
    fn test_declare_assigns_consecutive_cells() {
        let mut frames = FrameAllocator::new();
        let a = frames.declare(Variable::scalar("a"), span()).unwrap();
        let arr = frames
            .declare(Variable::new("arr", ElementType::Int, vec![2, 3]), span())
            .unwrap();
        let b = frames.declare(Variable::scalar("b"), span()).unwrap();
        assert_eq!(a.cell_index, Some(0));
        assert_eq!(arr.cell_index, Some(1));
        assert_eq!(b.cell_index, Some(7));
        assert_eq!(frames.current_offset(), 8);
    }

    #[test]
    fn test_shadowing_and_rollback() {
        let mut frames = FrameAllocator::new();
        frames.declare(Variable::scalar("x"), span()).unwrap();
        frames.enter_scope();
        let inner = frames.declare(Variable::scalar("x"), span()).unwrap();
        assert_eq!(inner.cell_index, Some(1));
        assert_eq!(frames.lookup("x", span()).unwrap().cell(), 1);
        assert_eq!(frames.exit_scope(), 1);
        assert_eq!(frames.lookup("x", span()).unwrap().cell(), 0);
        assert_eq!(frames.current_offset(), 1);
    }

    #[test]
    fn test_redeclaration_in_same_frame() {
        let mut frames = FrameAllocator::new();
        frames.declare(Variable::scalar("x"), span()).unwrap();
        let err = frames.declare(Variable::scalar("x"), span()).unwrap_err();
        assert!(matches!(err, Error::SemanticError { .. }));
    }

    #[test]
    fn test_undefined_lookup() {
        let frames = FrameAllocator::new();
        assert!(matches!(
            frames.lookup("ghost", span()),
            Err(Error::SemanticError { .. })
        ));
    }

    #[test]
    fn test_scratch_cells() {
        let mut frames = FrameAllocator::new();
        frames.declare(Variable::scalar("x"), span()).unwrap();
        assert_eq!(frames.reserve(2), 1);
        assert_eq!(frames.current_offset(), 3);
        frames.release(2);
        let y = frames.declare(Variable::scalar("y"), span()).unwrap();
        assert_eq!(y.cell(), 1);
        assert_eq!(frames.current_offset(), 2);
    }

    #[test]
    fn test_globals_frame() {
        let mut g = Variable::scalar("g");
        g.cell_index = Some(0);
        let mut table = Variable::new("table", ElementType::Int, vec![4]);
        table.cell_index = Some(1);
        let mut frames = FrameAllocator::with_globals([&g, &table]);
        assert_eq!(frames.current_offset(), 5);
        frames.enter_scope_at(9);
        let local = frames.declare(Variable::scalar("g"), span()).unwrap();
        assert_eq!(local.cell(), 9);
        assert_eq!(frames.exit_scope(), 1);
        assert_eq!(frames.lookup("table", span()).unwrap().cell(), 1);
    }
}
