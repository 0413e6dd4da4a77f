//! Built-in functions with hand-written bodies
//!
//! Each body starts and ends on the call's return cell, with the arguments in
//! the cells that follow it.

use super::fragment::Fragment;
use crate::parser::ReturnKind;

/// A function every program can call without defining it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryFunction {
    /// `int readint()`: decimal digits up to a newline
    ReadInt,
    /// `void printint(int x)`: decimal without leading zeros
    PrintInt,
    /// `int readchar()`
    ReadChar,
    /// `void printchar(int c)`
    PrintChar,
}

impl LibraryFunction {
    /// All built-ins
    pub const ALL: [LibraryFunction; 4] = [
        LibraryFunction::ReadInt,
        LibraryFunction::PrintInt,
        LibraryFunction::ReadChar,
        LibraryFunction::PrintChar,
    ];

    /// Name used at call sites
    pub fn name(self) -> &'static str {
        match self {
            LibraryFunction::ReadInt => "readint",
            LibraryFunction::PrintInt => "printint",
            LibraryFunction::ReadChar => "readchar",
            LibraryFunction::PrintChar => "printchar",
        }
    }

    /// Looks a built-in up by name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Number of arguments
    pub fn arity(self) -> usize {
        match self {
            LibraryFunction::ReadInt | LibraryFunction::ReadChar => 0,
            LibraryFunction::PrintInt | LibraryFunction::PrintChar => 1,
        }
    }

    /// Whether a value comes back
    pub fn return_kind(self) -> ReturnKind {
        match self {
            LibraryFunction::ReadInt | LibraryFunction::ReadChar => ReturnKind::Int,
            LibraryFunction::PrintInt | LibraryFunction::PrintChar => ReturnKind::Void,
        }
    }

    /// Body spliced in at the call site
    pub fn body(self) -> Fragment {
        match self {
            // digits accumulate in the return cell, newline ends the number
            LibraryFunction::ReadInt => Fragment::raw("[-]>[-]>>[-]+[[-]<,----------[>+<<<[>+<-]>[<++++++++++>-]>")
                .dec(38)
                .op("[<<+>>-]]>]<<<"),
            LibraryFunction::PrintInt => Fragment::new()
                .right(1)
                .op(&">[-]".repeat(8))
                .left(8)
                .op(">++++++++++<[->-[>+>>]>[+[<+>-]>+>>]<<<<<]>[-]>>>++++++++++<[->-[>+>>]>[+[<+>-]>+>>]<<<<<]>[-]>>[>++++++[<++++++++>-]<.<<+>+>[-]]<[<[>-<-]++++++[>++++++++<-]>.[-]]<<++++++[<++++++++>-]<.[-]<<<"),
            LibraryFunction::ReadChar => Fragment::raw(","),
            LibraryFunction::PrintChar => Fragment::raw(">.<"),
        }
    }
}
