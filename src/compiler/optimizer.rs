//! # AST Optimizer
//!
//! Source-level passes run before lowering:
//! - Constant folding with 8-bit cell semantics
//! - `printint(<constant>)` rewritten to a `print` of its digits
//!
//! Nothing here touches the emitted instruction stream; the lowering engine
//! stays a pure function of the tree it is handed.

use super::primitives::{wrap, CELL_BITS};
use crate::parser::{
    Accessor, BinaryOp, CaseLabel, Declaration, ExprKind, Expression, Initializer, Program,
    Statement, UnaryOp,
};
use tracing::debug;

/// Optimizer with configurable optimization level
pub struct Optimizer {
    level: u8,
    folded: usize,
}

impl Optimizer {
    /// Create a new optimizer with the specified optimization level (0-2)
    pub fn new(level: u8) -> Self {
        Self { level, folded: 0 }
    }

    /// Run all optimization passes
    pub fn optimize(&mut self, program: &mut Program) {
        if self.level >= 1 {
            for global in &mut program.globals {
                self.fold_declaration(global);
            }
            for function in &mut program.functions {
                self.fold_statements(&mut function.body);
            }
        }

        if self.level >= 2 {
            for function in &mut program.functions {
                print_constant_ints(&mut function.body);
            }
        }

        debug!(level = self.level, folded = self.folded, "Optimized program");
    }

    /// Number of expression nodes replaced by constants so far
    pub fn folded(&self) -> usize {
        self.folded
    }

    fn fold_statements(&mut self, statements: &mut [Statement]) {
        for statement in statements {
            self.fold_statement(statement);
        }
    }

    fn fold_statement(&mut self, statement: &mut Statement) {
        match statement {
            Statement::Declaration(decl) => self.fold_declaration(decl),
            Statement::Expression(expr) => self.fold_expression(expr),
            Statement::Block { body, .. } => self.fold_statements(body),
            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.fold_expression(condition);
                self.fold_statement(then_branch);
                if let Some(else_branch) = else_branch {
                    self.fold_statement(else_branch);
                }
            }
            Statement::While { condition, body, .. } | Statement::DoWhile { body, condition, .. } => {
                self.fold_expression(condition);
                self.fold_statement(body);
            }
            Statement::For {
                init,
                condition,
                step,
                body,
                ..
            } => {
                if let Some(init) = init {
                    self.fold_statement(init);
                }
                if let Some(condition) = condition {
                    self.fold_expression(condition);
                }
                if let Some(step) = step {
                    self.fold_expression(step);
                }
                self.fold_statement(body);
            }
            Statement::Switch { value, cases, .. } => {
                self.fold_expression(value);
                for case in cases {
                    if let CaseLabel::Value(label) = &mut case.label {
                        self.fold_expression(label);
                    }
                    self.fold_statements(&mut case.body);
                    self.fold_statements(&mut case.unreachable);
                }
            }
            Statement::Return {
                value: Some(value), ..
            } => self.fold_expression(value),
            Statement::Return { value: None, .. }
            | Statement::Print { .. }
            | Statement::Break { .. }
            | Statement::Continue { .. }
            | Statement::Empty => {}
        }
    }

    fn fold_declaration(&mut self, decl: &mut Declaration) {
        if let Some(init) = &mut decl.initializer {
            self.fold_initializer(init);
        }
    }

    fn fold_initializer(&mut self, init: &mut Initializer) {
        match init {
            Initializer::Expr(expr) => self.fold_expression(expr),
            Initializer::List(items, _) => {
                for item in items {
                    self.fold_initializer(item);
                }
            }
            Initializer::String(..) => {}
        }
    }

    /// Folds children first, then replaces this node if it became constant
    fn fold_expression(&mut self, expr: &mut Expression) {
        match &mut expr.kind {
            ExprKind::Number(_) | ExprKind::Char(_) | ExprKind::Bool(_) => return,
            ExprKind::Access(access) => {
                for accessor in &mut access.path {
                    if let Accessor::Index(index) = accessor {
                        self.fold_expression(index);
                    }
                }
                return;
            }
            ExprKind::Binary { left, right, .. } => {
                self.fold_expression(left);
                self.fold_expression(right);
            }
            ExprKind::Unary { operand, .. } => self.fold_expression(operand),
            ExprKind::Update { target, .. } => {
                self.fold_expression(target);
                return;
            }
            ExprKind::Assign { target, value, .. } => {
                self.fold_expression(target);
                self.fold_expression(value);
                return;
            }
            ExprKind::ArrayAssign { target, value } => {
                self.fold_expression(target);
                self.fold_initializer(value);
                return;
            }
            ExprKind::Call { args, .. } => {
                for arg in args {
                    self.fold_expression(arg);
                }
                return;
            }
        }

        if let Some(value) = fold_constant(expr) {
            expr.kind = ExprKind::Number(value);
            self.folded += 1;
        }
    }
}

/// Evaluates `expr` if it is built from literals only.
///
/// Results are reduced to a cell value. Division or modulo by zero is never
/// folded, so the lowering engine can still report it.
pub fn fold_constant(expr: &Expression) -> Option<i64> {
    match &expr.kind {
        ExprKind::Number(_) | ExprKind::Char(_) | ExprKind::Bool(_) => {
            expr.literal_value().map(wrap)
        }
        ExprKind::Unary { op, operand } => {
            let value = fold_constant(operand)?;
            Some(match op {
                UnaryOp::Not => (value == 0) as i64,
                UnaryOp::BitNot => 255 - value,
                UnaryOp::Negate => wrap(-value),
            })
        }
        ExprKind::Binary { op, left, right } => {
            let a = fold_constant(left)?;
            let b = fold_constant(right)?;
            let value = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div if b != 0 => a / b,
                BinaryOp::Mod if b != 0 => a % b,
                BinaryOp::Div | BinaryOp::Mod => return None,
                BinaryOp::Eq => (a == b) as i64,
                BinaryOp::NotEq => (a != b) as i64,
                BinaryOp::Less => (a < b) as i64,
                BinaryOp::LessEq => (a <= b) as i64,
                BinaryOp::Greater => (a > b) as i64,
                BinaryOp::GreaterEq => (a >= b) as i64,
                BinaryOp::BitAnd => a & b,
                BinaryOp::BitOr => a | b,
                BinaryOp::BitXor => a ^ b,
                BinaryOp::Shl if b >= CELL_BITS as i64 => 0,
                BinaryOp::Shl => a << b,
                BinaryOp::Shr if b >= CELL_BITS as i64 => 0,
                BinaryOp::Shr => a >> b,
                BinaryOp::And => (a != 0 && b != 0) as i64,
                BinaryOp::Or => (a != 0 || b != 0) as i64,
            };
            Some(wrap(value))
        }
        _ => None,
    }
}

/// Replaces `printint(<constant>);` statements with `print("<digits>");`
fn print_constant_ints(statements: &mut [Statement]) {
    for statement in statements {
        match statement {
            Statement::Expression(Expression {
                kind: ExprKind::Call { name, args },
                span,
            }) if name == "printint" && args.len() == 1 => {
                if let Some(value) = fold_constant(&args[0]) {
                    *statement = Statement::Print {
                        text: value.to_string(),
                        span: *span,
                    };
                }
            }
            Statement::Block { body, .. } => print_constant_ints(body),
            Statement::If {
                then_branch,
                else_branch,
                ..
            } => {
                print_constant_ints(std::slice::from_mut(then_branch.as_mut()));
                if let Some(else_branch) = else_branch {
                    print_constant_ints(std::slice::from_mut(else_branch.as_mut()));
                }
            }
            Statement::While { body, .. }
            | Statement::DoWhile { body, .. }
            | Statement::For { body, .. } => {
                print_constant_ints(std::slice::from_mut(body.as_mut()))
            }
            Statement::Switch { cases, .. } => {
                for case in cases {
                    print_constant_ints(&mut case.body);
                }
            }
            _ => {}
        }
    }
}
