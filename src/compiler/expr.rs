//! Expression lowering
//!
//! `lower_expr(node, P)` returns a fragment that starts with the head on P,
//! leaves the node's value in P and ends with the head on P+1. Cells below P
//! are only ever read through the fixed offsets of variables.

use super::branch;
use super::fragment::Fragment;
use super::function::Lowerer;
use super::init::{flatten, CellInit};
use super::optimizer::fold_constant;
use super::primitives::{self, BitKernel, Update};
use super::structs::ElementType;
use crate::error::{Error, Result};
use crate::lexer::Span;
use crate::parser::{
    Access, Accessor, BinaryOp, ExprKind, Expression, Initializer, UnaryOp, UpdateOp,
};

/// Cells an index walk can reach past the base of a variable
const WALK_REACH: usize = 256;

/// Storage an access path resolves to
#[derive(Debug, Clone)]
pub(super) struct Place {
    /// First cell, including every statically known offset
    pub base: usize,
    /// Cell offset from `base` that is only known at runtime
    pub index: Option<Expression>,
    /// Element type of the selected storage
    pub ty: ElementType,
    /// Remaining dimensions, empty once fully indexed
    pub dimensions: Vec<usize>,
}

impl Place {
    fn is_scalar(&self) -> bool {
        self.dimensions.is_empty() && self.ty == ElementType::Int
    }

    fn size(&self) -> usize {
        self.dimensions.iter().product::<usize>() * self.ty.size()
    }
}

impl Lowerer<'_> {
    /// Lowers `expr` with its result in cell `at`
    pub(super) fn lower_expr(&mut self, expr: &Expression, at: usize) -> Result<Fragment> {
        match &expr.kind {
            ExprKind::Number(_) | ExprKind::Char(_) | ExprKind::Bool(_) => {
                Ok(primitives::literal(expr.literal_value().unwrap_or_default()))
            }
            ExprKind::Access(access) => self.lower_read(access, expr.span, at),
            ExprKind::Binary { op, left, right } => {
                self.lower_binary(*op, left, right, expr.span, at)
            }
            ExprKind::Unary { op, operand } => self.lower_unary(*op, operand, at),
            ExprKind::Update { op, prefix, target } => {
                self.lower_update(*op, *prefix, target, at)
            }
            ExprKind::Assign { target, op, value } => match op {
                None => self.lower_assign(target, value, at),
                Some(op) => {
                    let combined = Expression::new(
                        ExprKind::Binary {
                            op: *op,
                            left: target.clone(),
                            right: value.clone(),
                        },
                        expr.span,
                    );
                    self.lower_assign(target, &combined, at)
                }
            },
            ExprKind::ArrayAssign { target, value } => self.lower_array_assign(target, value, at),
            ExprKind::Call { name, args } => self.lower_call(name, args, expr.span, at),
        }
    }

    fn lower_binary(
        &mut self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        span: Span,
        at: usize,
    ) -> Result<Fragment> {
        let operator = match op {
            BinaryOp::And => {
                let left = self.lower_expr(left, at)?;
                let right = self.lower_expr(right, at + 2)?;
                return Ok(branch::and_then(&left, &right));
            }
            BinaryOp::Or => {
                let left = self.lower_expr(left, at)?;
                let right = self.lower_expr(right, at + 3)?;
                return Ok(branch::or_else(&left, &right));
            }
            BinaryOp::Add => primitives::add(),
            BinaryOp::Sub => primitives::subtract(),
            BinaryOp::Mul => primitives::multiply(),
            BinaryOp::Div | BinaryOp::Mod => {
                let divisor = fold_constant(right);
                if divisor == Some(0) {
                    return Err(Error::semantic(span, "Division by zero"));
                }
                let check_zero = divisor.is_none();
                if op == BinaryOp::Div {
                    primitives::divide(check_zero)
                } else {
                    primitives::modulo(check_zero)
                }
            }
            BinaryOp::Eq => primitives::equal(),
            BinaryOp::NotEq => primitives::not_equal(),
            BinaryOp::Less => primitives::less(),
            BinaryOp::LessEq => primitives::less_equal(),
            BinaryOp::Greater => primitives::greater(),
            BinaryOp::GreaterEq => primitives::greater_equal(),
            BinaryOp::BitAnd => primitives::bitwise(BitKernel::And),
            BinaryOp::BitOr => primitives::bitwise(BitKernel::Or),
            BinaryOp::BitXor => primitives::bitwise(BitKernel::Xor),
            BinaryOp::Shl => primitives::shift_left(),
            BinaryOp::Shr => primitives::shift_right(),
        };

        Ok(self
            .lower_expr(left, at)?
            .then(&self.lower_expr(right, at + 1)?)
            .left(2)
            .then(&operator))
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: &Expression, at: usize) -> Result<Fragment> {
        let code = match op {
            UnaryOp::Negate => primitives::literal(0)
                .then(&self.lower_expr(operand, at + 1)?)
                .left(2)
                .then(&primitives::subtract()),
            UnaryOp::Not => self
                .lower_expr(operand, at)?
                .left(1)
                .then(&primitives::logical_not()),
            UnaryOp::BitNot => self
                .lower_expr(operand, at)?
                .left(1)
                .then(&primitives::bitwise_not()),
        };
        Ok(code)
    }

    fn lower_read(&mut self, access: &Access, span: Span, at: usize) -> Result<Fragment> {
        let place = self.resolve_place(access, span)?;
        if !place.is_scalar() {
            return Err(Error::semantic(
                span,
                format!("'{}' is not a single value and cannot be read as one", access.name),
            ));
        }

        match &place.index {
            None => Ok(primitives::copy_from_offset(distance(at, place.base))),
            Some(index) => Ok(self
                .lower_expr(index, at)?
                .then(&primitives::walk_right())
                .then(&primitives::copy_from_offset(distance(at + 2, place.base)))
                .op("<[<<+>>-]<")
                .then(&primitives::walk_left_carrying())),
        }
    }

    fn lower_assign(&mut self, target: &Expression, value: &Expression, at: usize) -> Result<Fragment> {
        let (access, span) = assignable(target, "assignment")?;
        let place = self.resolve_place(access, span)?;
        if !place.is_scalar() {
            return Err(Error::semantic(
                span,
                format!(
                    "Cannot assign a single value to '{}'; use a brace list or a string",
                    access.name
                ),
            ));
        }

        match &place.index {
            None => Ok(self
                .lower_expr(value, at)?
                .left(1)
                .then(&primitives::copy_to_offset(distance(at, place.base)))
                .right(1)),
            Some(index) => Ok(self
                .lower_expr(index, at)?
                .op("[-]>")
                .then(&self.lower_expr(value, at + 2)?)
                .then(&primitives::walk_right_carrying())
                .then(&primitives::copy_to_offset(distance(at + 2, place.base)))
                .op("[<<+>>-]<")
                .then(&primitives::walk_left_carrying())),
        }
    }

    fn lower_update(
        &mut self,
        op: UpdateOp,
        prefix: bool,
        target: &Expression,
        at: usize,
    ) -> Result<Fragment> {
        let (access, span) = assignable(target, &op.to_string())?;
        let place = self.resolve_place(access, span)?;
        if !place.is_scalar() {
            return Err(Error::semantic(
                span,
                format!("Operand of '{}' must be a single value", op),
            ));
        }

        let update = match op {
            UpdateOp::Increment => Update::Increment,
            UpdateOp::Decrement => Update::Decrement,
            UpdateOp::MulOne | UpdateOp::DivOne => Update::Keep,
            UpdateOp::ModOne => Update::Reset,
        };
        let apply = |offset| {
            if prefix {
                primitives::prefix_update(update, offset)
            } else {
                primitives::postfix_update(update, offset)
            }
        };

        match &place.index {
            None => Ok(apply(distance(at, place.base))),
            Some(index) => Ok(self
                .lower_expr(index, at)?
                .then(&primitives::walk_right())
                .then(&apply(distance(at + 2, place.base)))
                .op("<[<<+>>-]<")
                .then(&primitives::walk_left_carrying())),
        }
    }

    /// `array = {...}` / `array = "..."`: writes every cell of the target,
    /// zero padded. The expression's own value is 0.
    fn lower_array_assign(
        &mut self,
        target: &Expression,
        value: &Initializer,
        at: usize,
    ) -> Result<Fragment> {
        let (access, span) = assignable(target, "assignment")?;
        let place = self.resolve_place(access, span)?;
        if place.index.is_some() {
            return Err(Error::semantic(
                span,
                format!("Whole-array assignment to '{}' needs constant indices", access.name),
            ));
        }

        let cells = flatten(value, &place.dimensions, place.ty.size(), &access.name, span)?;
        debug_assert_eq!(cells.len(), place.size());

        let mut code = Fragment::new();
        for (offset, cell) in cells.into_iter().enumerate() {
            let element = match cell {
                CellInit::Byte(byte) => primitives::literal(byte as i64),
                CellInit::Expr(expr) => self.lower_expr(expr, at)?,
            };
            code = code
                .then(&element)
                .left(1)
                .then(&primitives::move_to_offset(distance(at, place.base + offset)));
        }
        Ok(code.clear().right(1))
    }

    /// Folds an access path into a base cell plus an optional runtime offset
    pub(super) fn resolve_place(&mut self, access: &Access, span: Span) -> Result<Place> {
        let var = self.frames.lookup(&access.name, span)?;
        let var_size = var.size();
        let mut place = Place {
            base: var.cell(),
            index: None,
            ty: var.ty.clone(),
            dimensions: var.dimensions.clone(),
        };

        let mut path = access.path.iter().peekable();
        while let Some(accessor) = path.next() {
            match accessor {
                Accessor::Field(field_name) => {
                    let layout = match (&place.ty, place.dimensions.is_empty()) {
                        (ElementType::Struct(layout), true) => layout.clone(),
                        (ElementType::Struct(_), false) => {
                            return Err(Error::semantic(
                                span,
                                format!("'{}' is an array; index it before selecting '.{}'", access.name, field_name),
                            ))
                        }
                        (ElementType::Int, _) => {
                            return Err(Error::semantic(
                                span,
                                format!("'{}' has no field '{}'", access.name, field_name),
                            ))
                        }
                    };
                    let field = layout.field(field_name).ok_or_else(|| {
                        Error::semantic(
                            span,
                            format!("Struct '{}' has no field '{}'", layout.name, field_name),
                        )
                    })?;
                    place.base += field.offset;
                    place.ty = field.ty.clone();
                    place.dimensions = field.dimensions.clone();
                }
                Accessor::Index(first) => {
                    let mut indices = vec![first];
                    while let Some(Accessor::Index(next)) = path.peek().copied() {
                        indices.push(next);
                        path.next();
                    }
                    apply_indices(&mut place, &indices, &access.name, span)?;
                }
            }
        }

        if place.index.is_some() && var_size > WALK_REACH {
            self.warn(
                span,
                format!(
                    "'{}' spans {} cells; a runtime index only reaches the first {}",
                    access.name, var_size, WALK_REACH
                ),
            );
        }
        Ok(place)
    }
}

/// Narrows `place` by one group of `[...]` selectors
fn apply_indices(place: &mut Place, indices: &[&Expression], name: &str, span: Span) -> Result<()> {
    if place.dimensions.is_empty() {
        return Err(Error::semantic(span, format!("'{}' is not an array", name)));
    }

    let element = place.ty.size();
    let dims = std::mem::take(&mut place.dimensions);
    let (bounds, strides): (Vec<usize>, Vec<usize>) = if indices.len() == dims.len() {
        let strides = (0..dims.len())
            .map(|i| dims[i + 1..].iter().product::<usize>() * element)
            .collect();
        (dims.clone(), strides)
    } else if indices.len() == 1 {
        (vec![dims.iter().product()], vec![element])
    } else {
        return Err(Error::semantic(
            span,
            format!(
                "'{}' has {} dimension(s) but {} index(es) were given",
                name,
                dims.len(),
                indices.len()
            ),
        ));
    };

    for ((index, bound), stride) in indices.iter().zip(bounds).zip(strides) {
        match fold_constant(index) {
            Some(value) => {
                if value >= bound as i64 {
                    return Err(Error::semantic(
                        index.span,
                        format!("Index {} is out of bounds for '{}' (length {})", value, name, bound),
                    ));
                }
                place.base += value as usize * stride;
            }
            None => {
                let term = scaled(index, stride);
                place.index = Some(match place.index.take() {
                    None => term,
                    Some(previous) => binary(BinaryOp::Add, previous, term),
                });
            }
        }
    }
    Ok(())
}

fn scaled(index: &Expression, stride: usize) -> Expression {
    if stride == 1 {
        index.clone()
    } else {
        binary(
            BinaryOp::Mul,
            index.clone(),
            Expression::number(stride as i64, index.span),
        )
    }
}

fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    let span = left.span;
    Expression::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

/// The access path of something that can be written to
fn assignable<'e>(target: &'e Expression, what: &str) -> Result<(&'e Access, Span)> {
    match &target.kind {
        ExprKind::Access(access) => Ok((access, target.span)),
        _ => Err(Error::semantic(
            target.span,
            format!("Operand of {} must be a variable, array element or field", what),
        )),
    }
}

/// Cells from `cell` up to the head at `at`
fn distance(at: usize, cell: usize) -> usize {
    debug_assert!(cell <= at, "cell {} lies above the head at {}", cell, at);
    at - cell
}
