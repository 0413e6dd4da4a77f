use crate::lexer::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Complete translation unit after include expansion
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    /// Struct type definitions, in source order
    pub structs: Vec<StructDef>,
    /// Global variable declarations, in source order
    pub globals: Vec<Declaration>,
    /// Function definitions, in source order
    pub functions: Vec<FunctionDef>,
}

/// Element type named in a declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeName {
    /// `int`, `bool` or `char`; all occupy one cell
    Int,
    /// `struct Name`
    Struct(String),
}

/// What a function hands back to its caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnKind {
    /// `void`
    Void,
    /// `int` (or an alias)
    Int,
}

/// `struct Name { ... };`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    /// Type name
    pub name: String,
    /// Fields in layout order
    pub fields: Vec<FieldDef>,
    /// Position of the `struct` keyword
    pub span: Span,
}

/// One field of a struct definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field element type
    pub ty: TypeName,
    /// Field name
    pub name: String,
    /// Array dimensions, empty for scalars
    pub dimensions: Vec<usize>,
    /// Position of the field name
    pub span: Span,
}

/// Variable declaration, local or global
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    /// Element type
    pub ty: TypeName,
    /// Variable name
    pub name: String,
    /// Array dimensions, empty for scalars
    pub dimensions: Vec<usize>,
    /// Optional initial value
    pub initializer: Option<Initializer>,
    /// Position of the variable name
    pub span: Span,
}

/// Right-hand side of `=` in a declaration or whole-array assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Initializer {
    /// Single expression
    Expr(Expression),
    /// Brace-enclosed list, possibly nested for multi-dimensional arrays
    List(Vec<Initializer>, Span),
    /// String literal, stored one byte per element
    String(String, Span),
}

/// Function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    /// Declared return kind
    pub return_kind: ReturnKind,
    /// Function name
    pub name: String,
    /// Parameter names; every parameter is a scalar `int`
    pub params: Vec<Parameter>,
    /// Statements of the body
    pub body: Vec<Statement>,
    /// Position of the function name
    pub span: Span,
}

/// Function parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Position of the parameter name
    pub span: Span,
}

/// Statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// Local variable declaration
    Declaration(Declaration),

    /// Expression evaluated for its side effects
    Expression(Expression),

    /// `print("text");`
    Print {
        /// Bytes to write
        text: String,
        /// Position of `print`
        span: Span,
    },

    /// `{ ... }` with its own scope
    Block {
        /// Statements inside the braces
        body: Vec<Statement>,
        /// Position of `{`
        span: Span,
    },

    /// If statement
    If {
        /// Condition expression to evaluate
        condition: Expression,
        /// Statement to execute if condition is nonzero
        then_branch: Box<Statement>,
        /// Optional statement to execute otherwise
        else_branch: Option<Box<Statement>>,
        /// Position of `if`
        span: Span,
    },

    /// While loop
    While {
        /// Loop condition expression
        condition: Expression,
        /// Loop body
        body: Box<Statement>,
        /// Position of `while`
        span: Span,
    },

    /// `do body while (condition);`
    DoWhile {
        /// Loop body, runs at least once
        body: Box<Statement>,
        /// Loop condition expression
        condition: Expression,
        /// Position of `do`
        span: Span,
    },

    /// `for (init; condition; step) body`
    For {
        /// Declaration or expression statement run once
        init: Option<Box<Statement>>,
        /// Loop condition; absent means always true
        condition: Option<Expression>,
        /// Expression evaluated after each iteration
        step: Option<Expression>,
        /// Loop body
        body: Box<Statement>,
        /// Position of `for`
        span: Span,
    },

    /// Switch statement
    Switch {
        /// Controlling expression, evaluated once
        value: Expression,
        /// Case arms in declaration order
        cases: Vec<SwitchCase>,
        /// Position of `switch`
        span: Span,
    },

    /// `return;` or `return expr;`
    Return {
        /// Returned value
        value: Option<Expression>,
        /// Position of `return`
        span: Span,
    },

    /// `break;`
    Break {
        /// Position of `break`
        span: Span,
    },

    /// `continue;`
    Continue {
        /// Position of `continue`
        span: Span,
    },

    /// Lone `;`
    Empty,
}

/// One `case`/`default` arm of a switch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// Matched constant, or `default`
    pub label: CaseLabel,
    /// Statements up to the first case-level `break`
    pub body: Vec<Statement>,
    /// Whether the arm ends with `break` (otherwise it falls through)
    pub has_break: bool,
    /// Statements written after the `break`; never executed
    pub unreachable: Vec<Statement>,
    /// Position of `case`/`default`
    pub span: Span,
}

/// Label of a switch arm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CaseLabel {
    /// `case <constant>:`
    Value(Expression),
    /// `default:`
    Default,
}

/// Expression with its source position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    /// What the expression computes
    pub kind: ExprKind,
    /// Position of the first token
    pub span: Span,
}

impl Expression {
    /// Creates an expression node
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expression { kind, span }
    }

    /// Integer literal node
    pub fn number(value: i64, span: Span) -> Self {
        Expression::new(ExprKind::Number(value), span)
    }

    /// Value of a literal node, if this is one
    pub fn literal_value(&self) -> Option<i64> {
        match self.kind {
            ExprKind::Number(n) => Some(n),
            ExprKind::Char(c) => Some(c as i64),
            ExprKind::Bool(b) => Some(b as i64),
            _ => None,
        }
    }
}

/// Expression variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// Integer literal
    Number(i64),
    /// Character literal
    Char(u8),
    /// `true` / `false`
    Bool(bool),

    /// Variable, array element or struct field
    Access(Access),

    /// Binary operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expression>,
        /// Right operand
        right: Box<Expression>,
    },

    /// Prefix `!`, `~` or `-`
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expression>,
    },

    /// `++`, `--`, `**`, `//`, `%%` in prefix or postfix position
    Update {
        /// Operator
        op: UpdateOp,
        /// True when written before the operand
        prefix: bool,
        /// Operand; must name a cell
        target: Box<Expression>,
    },

    /// `target = value` or `target op= value`
    Assign {
        /// Destination; must name a cell
        target: Box<Expression>,
        /// Operator of a compound assignment
        op: Option<BinaryOp>,
        /// Assigned expression
        value: Box<Expression>,
    },

    /// `array = { ... }` or `array = "..."`
    ArrayAssign {
        /// Destination array
        target: Box<Expression>,
        /// New contents
        value: Box<Initializer>,
    },

    /// Function call
    Call {
        /// Callee name
        name: String,
        /// Arguments, evaluated left to right
        args: Vec<Expression>,
    },
}

/// Named storage followed by indexing and field selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Access {
    /// Variable name
    pub name: String,
    /// `[index]` and `.field` selectors, in source order
    pub path: Vec<Accessor>,
}

/// One selector in an access path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Accessor {
    /// `[expr]`
    Index(Expression),
    /// `.name`
    Field(String),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Less,
    /// `<=`
    LessEq,
    /// `>`
    Greater,
    /// `>=`
    GreaterEq,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `&&`
    And,
    /// `||`
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        f.write_str(s)
    }
}

/// Prefix operators that produce a new value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `~`
    BitNot,
    /// `-`, lowered as `0 - x`
    Negate,
}

/// Operators that read and rewrite a cell in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOp {
    /// `++`
    Increment,
    /// `--`
    Decrement,
    /// `**`: multiply by one, leaves the operand as is
    MulOne,
    /// `//`: divide by one, leaves the operand as is
    DivOne,
    /// `%%`: modulo one, resets the operand to zero
    ModOne,
}

impl fmt::Display for UpdateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UpdateOp::Increment => "++",
            UpdateOp::Decrement => "--",
            UpdateOp::MulOne => "**",
            UpdateOp::DivOne => "//",
            UpdateOp::ModOne => "%%",
        };
        f.write_str(s)
    }
}
