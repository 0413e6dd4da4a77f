use super::ast::*;
use crate::error::{Error, Result};
use crate::lexer::{Token, TokenKind};

/// Recursive-descent parser for the C-like source language
pub struct SourceParser {
    tokens: Vec<Token>,
    current: usize,
}

impl SourceParser {
    /// Creates a parser over an include-expanded token stream
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)) {
            let (line, column) = tokens.last().map_or((1, 1), |t| (t.line, t.column));
            tokens.push(Token::new(TokenKind::Eof, String::new(), line, column));
        }
        SourceParser { tokens, current: 0 }
    }

    /// Parses a whole translation unit
    pub fn parse(&mut self) -> Result<Program> {
        let mut program = Program::default();

        while !self.is_at_end() {
            match &self.peek().kind {
                TokenKind::Struct if self.is_struct_definition() => {
                    program.structs.push(self.parse_struct_def()?);
                }
                TokenKind::Void => program.functions.push(self.parse_function()?),
                TokenKind::Int if self.is_function_start() => {
                    program.functions.push(self.parse_function()?);
                }
                TokenKind::Int | TokenKind::Struct => {
                    program.globals.push(self.parse_declaration()?);
                }
                TokenKind::Include { path, .. } => {
                    return Err(self.syntax_error(format!(
                        "Include of '{}' was not expanded before parsing",
                        path
                    )))
                }
                other => {
                    return Err(self.syntax_error(format!(
                        "Expected a function, struct or global declaration, got '{}'",
                        other
                    )))
                }
            }
        }

        Ok(program)
    }

    /// Parses a single expression that must span the whole token stream
    pub fn parse_standalone_expression(&mut self) -> Result<Expression> {
        let expr = self.parse_expression()?;
        if !self.is_at_end() {
            return Err(self.syntax_error(format!(
                "Unexpected '{}' after expression",
                self.peek().kind
            )));
        }
        Ok(expr)
    }

    // ------------------------------------------------------------------
    // Top level
    // ------------------------------------------------------------------

    fn is_struct_definition(&self) -> bool {
        matches!(self.peek_at(1).kind, TokenKind::Identifier(_))
            && matches!(self.peek_at(2).kind, TokenKind::LeftBrace)
    }

    fn is_function_start(&self) -> bool {
        matches!(self.peek_at(1).kind, TokenKind::Identifier(_))
            && matches!(self.peek_at(2).kind, TokenKind::LeftParen)
    }

    fn parse_struct_def(&mut self) -> Result<StructDef> {
        let span = self.consume(TokenKind::Struct)?.span();
        let name = self.expect_identifier()?;
        self.consume(TokenKind::LeftBrace)?;

        let mut fields = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            let ty = self.parse_type_name()?;
            let field_span = self.peek().span();
            let field_name = self.expect_identifier()?;
            let dimensions = self.parse_dimensions()?;
            self.consume(TokenKind::Semicolon)?;
            fields.push(FieldDef {
                ty,
                name: field_name,
                dimensions,
                span: field_span,
            });
        }

        self.consume(TokenKind::RightBrace)?;
        self.consume(TokenKind::Semicolon)?;
        Ok(StructDef { name, fields, span })
    }

    fn parse_function(&mut self) -> Result<FunctionDef> {
        let return_kind = match self.advance().kind {
            TokenKind::Void => ReturnKind::Void,
            _ => ReturnKind::Int,
        };
        let span = self.peek().span();
        let name = self.expect_identifier()?;

        self.consume(TokenKind::LeftParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                if !self.check(&TokenKind::Int) {
                    return Err(self.syntax_error("Function parameters must be declared as int"));
                }
                self.advance();
                let param_span = self.peek().span();
                let param_name = self.expect_identifier()?;
                params.push(Parameter {
                    name: param_name,
                    span: param_span,
                });
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen)?;

        self.consume(TokenKind::LeftBrace)?;
        let body = self.parse_block_body()?;

        Ok(FunctionDef {
            return_kind,
            name,
            params,
            body,
            span,
        })
    }

    fn parse_type_name(&mut self) -> Result<TypeName> {
        match self.peek().kind {
            TokenKind::Int => {
                self.advance();
                Ok(TypeName::Int)
            }
            TokenKind::Struct => {
                self.advance();
                Ok(TypeName::Struct(self.expect_identifier()?))
            }
            _ => Err(self.syntax_error(format!("Expected a type, got '{}'", self.peek().kind))),
        }
    }

    fn parse_dimensions(&mut self) -> Result<Vec<usize>> {
        let mut dimensions = Vec::new();
        while self.match_token(&TokenKind::LeftBracket) {
            let token = self.advance();
            match token.kind {
                TokenKind::Number(n) if n > 0 => dimensions.push(n as usize),
                _ => {
                    return Err(Error::syntax(
                        token.span(),
                        "Array dimension must be a positive integer literal",
                    ))
                }
            }
            self.consume(TokenKind::RightBracket)?;
        }
        Ok(dimensions)
    }

    /// `type name dims? (= initializer)? ;`
    fn parse_declaration(&mut self) -> Result<Declaration> {
        let ty = self.parse_type_name()?;
        let span = self.peek().span();
        let name = self.expect_identifier()?;
        let dimensions = self.parse_dimensions()?;

        let initializer = if self.match_token(&TokenKind::Assign) {
            Some(self.parse_initializer()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon)?;

        Ok(Declaration {
            ty,
            name,
            dimensions,
            initializer,
            span,
        })
    }

    fn parse_initializer(&mut self) -> Result<Initializer> {
        let span = self.peek().span();
        match &self.peek().kind {
            TokenKind::LeftBrace => {
                self.advance();
                let mut items = Vec::new();
                if !self.check(&TokenKind::RightBrace) {
                    loop {
                        items.push(self.parse_initializer()?);
                        if !self.match_token(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.consume(TokenKind::RightBrace)?;
                Ok(Initializer::List(items, span))
            }
            TokenKind::String(text) => {
                let text = text.clone();
                self.advance();
                Ok(Initializer::String(text, span))
            }
            _ => Ok(Initializer::Expr(self.parse_assignment()?)),
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// Statements up to and including the closing `}`
    fn parse_block_body(&mut self) -> Result<Vec<Statement>> {
        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            if self.is_at_end() {
                return Err(Error::UnexpectedEof);
            }
            body.push(self.parse_statement()?);
        }
        self.consume(TokenKind::RightBrace)?;
        Ok(body)
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        let span = self.peek().span();
        match self.peek().kind {
            TokenKind::LeftBrace => {
                self.advance();
                Ok(Statement::Block {
                    body: self.parse_block_body()?,
                    span,
                })
            }
            TokenKind::Int | TokenKind::Struct => {
                Ok(Statement::Declaration(self.parse_declaration()?))
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => {
                self.advance();
                let condition = self.parse_parenthesized()?;
                let body = Box::new(self.parse_statement()?);
                Ok(Statement::While {
                    condition,
                    body,
                    span,
                })
            }
            TokenKind::Do => {
                self.advance();
                let body = Box::new(self.parse_statement()?);
                self.consume(TokenKind::While)?;
                let condition = self.parse_parenthesized()?;
                self.consume(TokenKind::Semicolon)?;
                Ok(Statement::DoWhile {
                    body,
                    condition,
                    span,
                })
            }
            TokenKind::For => self.parse_for(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Return => {
                self.advance();
                let value = if self.check(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.consume(TokenKind::Semicolon)?;
                Ok(Statement::Return { value, span })
            }
            TokenKind::Break => {
                self.advance();
                self.consume(TokenKind::Semicolon)?;
                Ok(Statement::Break { span })
            }
            TokenKind::Continue => {
                self.advance();
                self.consume(TokenKind::Semicolon)?;
                Ok(Statement::Continue { span })
            }
            TokenKind::Print => {
                self.advance();
                self.consume(TokenKind::LeftParen)?;
                let token = self.advance();
                let text = match token.kind {
                    TokenKind::String(text) => text,
                    _ => return Err(Error::syntax(token.span(), "print expects a string literal")),
                };
                self.consume(TokenKind::RightParen)?;
                self.consume(TokenKind::Semicolon)?;
                Ok(Statement::Print { text, span })
            }
            TokenKind::Semicolon => {
                self.advance();
                Ok(Statement::Empty)
            }
            TokenKind::Eof => Err(Error::UnexpectedEof),
            _ => {
                let expr = self.parse_expression()?;
                self.consume(TokenKind::Semicolon)?;
                Ok(Statement::Expression(expr))
            }
        }
    }

    fn parse_if(&mut self) -> Result<Statement> {
        let span = self.consume(TokenKind::If)?.span();
        let condition = self.parse_parenthesized()?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.match_token(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
            span,
        })
    }

    fn parse_for(&mut self) -> Result<Statement> {
        let span = self.consume(TokenKind::For)?.span();
        self.consume(TokenKind::LeftParen)?;

        let init = match self.peek().kind {
            TokenKind::Semicolon => {
                self.advance();
                None
            }
            TokenKind::Int | TokenKind::Struct => {
                Some(Box::new(Statement::Declaration(self.parse_declaration()?)))
            }
            _ => {
                let expr = self.parse_expression()?;
                self.consume(TokenKind::Semicolon)?;
                Some(Box::new(Statement::Expression(expr)))
            }
        };

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(TokenKind::Semicolon)?;

        let step = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(TokenKind::RightParen)?;

        let body = Box::new(self.parse_statement()?);
        Ok(Statement::For {
            init,
            condition,
            step,
            body,
            span,
        })
    }

    fn parse_switch(&mut self) -> Result<Statement> {
        let span = self.consume(TokenKind::Switch)?.span();
        let value = self.parse_parenthesized()?;
        self.consume(TokenKind::LeftBrace)?;

        let mut cases = Vec::new();
        while !self.match_token(&TokenKind::RightBrace) {
            let case_span = self.peek().span();
            let label = match self.advance().kind {
                TokenKind::Case => CaseLabel::Value(self.parse_expression()?),
                TokenKind::Default => CaseLabel::Default,
                TokenKind::Eof => return Err(Error::UnexpectedEof),
                other => {
                    return Err(Error::syntax(
                        case_span,
                        format!("Expected 'case' or 'default', got '{}'", other),
                    ))
                }
            };
            self.consume(TokenKind::Colon)?;

            let mut body = Vec::new();
            let mut unreachable = Vec::new();
            let mut has_break = false;
            while !matches!(
                self.peek().kind,
                TokenKind::Case | TokenKind::Default | TokenKind::RightBrace | TokenKind::Eof
            ) {
                let statement = self.parse_statement()?;
                if has_break {
                    unreachable.push(statement);
                } else if matches!(statement, Statement::Break { .. }) {
                    has_break = true;
                } else {
                    body.push(statement);
                }
            }

            cases.push(SwitchCase {
                label,
                body,
                has_break,
                unreachable,
                span: case_span,
            });
        }

        Ok(Statement::Switch { value, cases, span })
    }

    fn parse_parenthesized(&mut self) -> Result<Expression> {
        self.consume(TokenKind::LeftParen)?;
        let expr = self.parse_expression()?;
        self.consume(TokenKind::RightParen)?;
        Ok(expr)
    }

    // ------------------------------------------------------------------
    // Expressions, lowest precedence first
    // ------------------------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expression> {
        let target = self.parse_binary(0)?;

        let op = match &self.peek().kind {
            TokenKind::Assign => None,
            TokenKind::CompoundAssign(op) => Some(compound_operator(op)),
            _ => return Ok(target),
        };
        let span = target.span;
        self.advance();

        let is_array_value = op.is_none()
            && matches!(
                self.peek().kind,
                TokenKind::LeftBrace | TokenKind::String(_)
            );
        if is_array_value {
            let value = self.parse_initializer()?;
            return Ok(Expression::new(
                ExprKind::ArrayAssign {
                    target: Box::new(target),
                    value: Box::new(value),
                },
                span,
            ));
        }

        let value = self.parse_assignment()?;
        Ok(Expression::new(
            ExprKind::Assign {
                target: Box::new(target),
                op,
                value: Box::new(value),
            },
            span,
        ))
    }

    /// Binary levels from `||` down to multiplicative, driven by [`binary_level`]
    fn parse_binary(&mut self, level: usize) -> Result<Expression> {
        if level == BINARY_LEVELS {
            return self.parse_unary();
        }

        let mut left = self.parse_binary(level + 1)?;
        while let Some(op) = binary_level(&self.peek().kind, level) {
            self.advance();
            let right = self.parse_binary(level + 1)?;
            let span = left.span;
            left = Expression::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
            if level == RELATIONAL_LEVEL {
                break;
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        let span = self.peek().span();
        let unary = match self.peek().kind {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Minus => Some(UnaryOp::Negate),
            _ => None,
        };
        if let Some(op) = unary {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expression::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            ));
        }

        if let Some(op) = update_operator(&self.peek().kind) {
            self.advance();
            let target = self.parse_postfix()?;
            return Ok(Expression::new(
                ExprKind::Update {
                    op,
                    prefix: true,
                    target: Box::new(target),
                },
                span,
            ));
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expression> {
        let mut expr = self.parse_primary()?;
        while let Some(op) = update_operator(&self.peek().kind) {
            self.advance();
            let span = expr.span;
            expr = Expression::new(
                ExprKind::Update {
                    op,
                    prefix: false,
                    target: Box::new(expr),
                },
                span,
            );
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        let token = self.advance();
        let span = token.span();

        let kind = match token.kind {
            TokenKind::Number(n) => ExprKind::Number(n),
            TokenKind::Char(c) => ExprKind::Char(c),
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::LeftParen => {
                let inner = self.parse_expression()?;
                self.consume(TokenKind::RightParen)?;
                return Ok(inner);
            }
            TokenKind::Identifier(name) if self.check(&TokenKind::LeftParen) => {
                self.advance();
                let mut args = Vec::new();
                if !self.check(&TokenKind::RightParen) {
                    loop {
                        args.push(self.parse_expression()?);
                        if !self.match_token(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.consume(TokenKind::RightParen)?;
                ExprKind::Call { name, args }
            }
            TokenKind::Identifier(name) => {
                let mut path = Vec::new();
                loop {
                    if self.match_token(&TokenKind::LeftBracket) {
                        path.push(Accessor::Index(self.parse_expression()?));
                        self.consume(TokenKind::RightBracket)?;
                    } else if self.match_token(&TokenKind::Dot) {
                        path.push(Accessor::Field(self.expect_identifier()?));
                    } else {
                        break;
                    }
                }
                ExprKind::Access(Access { name, path })
            }
            TokenKind::String(_) => {
                return Err(Error::syntax(
                    span,
                    "String literals are only allowed in print and array initializers",
                ))
            }
            TokenKind::Eof => return Err(Error::UnexpectedEof),
            other => {
                return Err(Error::syntax(
                    span,
                    format!("Expected an expression, got '{}'", other),
                ))
            }
        };

        Ok(Expression::new(kind, span))
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_at(&self, distance: usize) -> &Token {
        let index = (self.current + distance).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
            self.tokens[self.current - 1].clone()
        } else {
            self.peek().clone()
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind) -> Result<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else if self.is_at_end() {
            Err(Error::UnexpectedEof)
        } else {
            Err(self.syntax_error(format!(
                "Expected '{}', got '{}'",
                kind,
                self.peek().kind
            )))
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match &self.peek().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            TokenKind::Eof => Err(Error::UnexpectedEof),
            other => Err(self.syntax_error(format!("Expected identifier, got '{}'", other))),
        }
    }

    fn syntax_error(&self, message: impl Into<String>) -> Error {
        Error::syntax(self.peek().span(), message)
    }
}

const BINARY_LEVELS: usize = 9;
const RELATIONAL_LEVEL: usize = 5;

/// Operator table: 0 `||`, 1 `&&`, 2 `|`, 3 `^`, 4 `&`, 5 relational, 6 shift,
/// 7 additive, 8 multiplicative
fn binary_level(kind: &TokenKind, level: usize) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::OrOr => BinaryOp::Or,
        TokenKind::AndAnd => BinaryOp::And,
        TokenKind::Pipe => BinaryOp::BitOr,
        TokenKind::Caret => BinaryOp::BitXor,
        TokenKind::Ampersand => BinaryOp::BitAnd,
        TokenKind::EqualEqual => BinaryOp::Eq,
        TokenKind::BangEqual => BinaryOp::NotEq,
        TokenKind::Less => BinaryOp::Less,
        TokenKind::LessEqual => BinaryOp::LessEq,
        TokenKind::Greater => BinaryOp::Greater,
        TokenKind::GreaterEqual => BinaryOp::GreaterEq,
        TokenKind::ShiftLeft => BinaryOp::Shl,
        TokenKind::ShiftRight => BinaryOp::Shr,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Mod,
        _ => return None,
    };
    let op_level = match op {
        BinaryOp::Or => 0,
        BinaryOp::And => 1,
        BinaryOp::BitOr => 2,
        BinaryOp::BitXor => 3,
        BinaryOp::BitAnd => 4,
        BinaryOp::Eq
        | BinaryOp::NotEq
        | BinaryOp::Less
        | BinaryOp::LessEq
        | BinaryOp::Greater
        | BinaryOp::GreaterEq => RELATIONAL_LEVEL,
        BinaryOp::Shl | BinaryOp::Shr => 6,
        BinaryOp::Add | BinaryOp::Sub => 7,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 8,
    };
    (op_level == level).then_some(op)
}

fn compound_operator(kind: &TokenKind) -> BinaryOp {
    match kind {
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Mod,
        TokenKind::ShiftLeft => BinaryOp::Shl,
        TokenKind::ShiftRight => BinaryOp::Shr,
        TokenKind::Ampersand => BinaryOp::BitAnd,
        TokenKind::Pipe => BinaryOp::BitOr,
        TokenKind::Caret => BinaryOp::BitXor,
        _ => BinaryOp::Add,
    }
}

fn update_operator(kind: &TokenKind) -> Option<UpdateOp> {
    match kind {
        TokenKind::PlusPlus => Some(UpdateOp::Increment),
        TokenKind::MinusMinus => Some(UpdateOp::Decrement),
        TokenKind::StarStar => Some(UpdateOp::MulOne),
        TokenKind::SlashSlash => Some(UpdateOp::DivOne),
        TokenKind::PercentPercent => Some(UpdateOp::ModOne),
        _ => None,
    }
}
