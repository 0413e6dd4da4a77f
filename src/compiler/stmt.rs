//! Statement and control-flow lowering
//!
//! Between statements the head rests on the frame allocator's current offset.
//! Declarations move it right by the size of what they declare; leaving a
//! scope moves it back by everything the scope claimed.

use super::branch;
use super::fragment::Fragment;
use super::frame::Variable;
use super::function::Lowerer;
use super::init::{flatten, CellInit};
use super::optimizer::fold_constant;
use super::primitives;
use super::structs::ElementType;
use crate::error::{Error, Result};
use crate::lexer::Span;
use crate::parser::{
    CaseLabel, Declaration, Expression, ReturnKind, Statement, SwitchCase,
};

/// Case labels that share one emitted body
#[derive(Debug, Default)]
struct CaseGroup {
    values: Vec<i64>,
    has_default: bool,
    /// Index of the case whose body the group runs first
    body_start: usize,
}

impl Lowerer<'_> {
    /// Lowers one statement with the head on the current offset
    pub(super) fn lower_statement(&mut self, statement: &Statement) -> Result<Fragment> {
        let at = self.frames.current_offset();
        let mut code = Fragment::new();
        if self.annotate {
            if let Some(note) = annotation(statement) {
                code = code.comment(&note);
            }
        }

        let lowered = match statement {
            Statement::Declaration(decl) => self.lower_declaration(decl)?,
            Statement::Expression(expr) => self.lower_expr(expr, at)?.left(1),
            Statement::Print { text, .. } => {
                primitives::print_string(&primitives::string_bytes(text))
            }
            Statement::Block { body, .. } => self.lower_block(body)?,
            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => self.lower_if(condition, then_branch, else_branch.as_deref())?,
            Statement::While {
                condition, body, ..
            } => {
                let condition = self.lower_expr(condition, at)?;
                let body = self.lower_scoped(body)?;
                condition
                    .clone()
                    .op("<[")
                    .then(&body)
                    .then(&condition)
                    .op("<]")
            }
            Statement::DoWhile {
                body, condition, ..
            } => {
                let body = self.lower_scoped(body)?;
                let condition = self.lower_expr(condition, at)?;
                Fragment::raw("[-]+[").then(&body).then(&condition).op("<]")
            }
            Statement::For {
                init,
                condition,
                step,
                body,
                ..
            } => self.lower_for(init.as_deref(), condition.as_ref(), step.as_ref(), body)?,
            Statement::Switch { value, cases, span } => self.lower_switch(value, cases, *span)?,
            Statement::Return { value, span } => self.lower_return(value.as_ref(), *span, at)?,
            Statement::Break { span } => {
                return Err(Error::unsupported(
                    *span,
                    "'break' is only supported directly inside a switch case",
                ))
            }
            Statement::Continue { span } => {
                return Err(Error::unsupported(*span, "'continue' is not supported"))
            }
            Statement::Empty => Fragment::new(),
        };
        Ok(code.then(&lowered))
    }

    /// Declares the variable, writing its initial value if it has one.
    /// The head ends just past the new variable.
    fn lower_declaration(&mut self, decl: &Declaration) -> Result<Fragment> {
        let ty = ElementType::resolve(&decl.ty, self.ctx.structs(), decl.span)?;
        let var = Variable::new(&decl.name, ty, decl.dimensions.clone());
        let at = self.frames.current_offset();

        // declared only after its initializer: `int x = x;` reads the outer x
        let code = match &decl.initializer {
            None => Fragment::new().right(var.size()),
            Some(init) => {
                let cells = flatten(init, &var.dimensions, var.ty.size(), &var.name, decl.span)?;
                let mut code = Fragment::new();
                for (offset, cell) in cells.into_iter().enumerate() {
                    code.push(&match cell {
                        CellInit::Byte(byte) => primitives::literal(byte as i64),
                        CellInit::Expr(expr) => self.lower_expr(expr, at + offset)?,
                    });
                }
                code
            }
        };

        self.frames.declare(var, decl.span)?;
        Ok(code)
    }

    fn lower_block(&mut self, body: &[Statement]) -> Result<Fragment> {
        self.frames.enter_scope();
        let code = self.lower_statements(body)?;
        let claimed = self.frames.exit_scope();
        Ok(code.left(claimed))
    }

    /// Lowers a branch or loop body in a scope of its own
    fn lower_scoped(&mut self, statement: &Statement) -> Result<Fragment> {
        self.frames.enter_scope();
        let code = self.lower_statement(statement)?;
        let claimed = self.frames.exit_scope();
        Ok(code.left(claimed))
    }

    fn lower_if(
        &mut self,
        condition: &Expression,
        then_branch: &Statement,
        else_branch: Option<&Statement>,
    ) -> Result<Fragment> {
        let at = self.frames.current_offset();
        let condition = self.lower_expr(condition, at)?;

        // condition and else guards
        self.frames.reserve(2);
        let then_arm = self.lower_scoped(then_branch)?;
        let else_arm = else_branch
            .map(|statement| self.lower_scoped(statement))
            .transpose()?;
        self.frames.release(2);

        Ok(branch::if_else(&condition, &then_arm, else_arm.as_ref()))
    }

    /// `{ init; while (condition) { body step } }`
    fn lower_for(
        &mut self,
        init: Option<&Statement>,
        condition: Option<&Expression>,
        step: Option<&Expression>,
        body: &Statement,
    ) -> Result<Fragment> {
        self.frames.enter_scope();
        let mut code = Fragment::new();
        if let Some(init) = init {
            if let Statement::Declaration(decl) = init {
                if decl.initializer.is_none() {
                    self.warn(
                        decl.span,
                        format!("Loop variable '{}' is declared without a value", decl.name),
                    );
                }
            }
            code.push(&self.lower_statement(init)?);
        }

        let at = self.frames.current_offset();
        let condition = match condition {
            Some(condition) => self.lower_expr(condition, at)?,
            None => primitives::literal(1),
        };
        let body = self.lower_scoped(body)?;
        let step = match step {
            Some(step) => self.lower_expr(step, at)?.left(1),
            None => Fragment::new(),
        };

        let claimed = self.frames.exit_scope();
        Ok(code
            .then(&condition)
            .op("<[")
            .then(&body)
            .then(&step)
            .then(&condition)
            .op("<]")
            .left(claimed))
    }

    fn lower_return(&mut self, value: Option<&Expression>, span: Span, at: usize) -> Result<Fragment> {
        match (value, self.return_kind) {
            (None, _) => Ok(Fragment::new()),
            (Some(_), ReturnKind::Void) => Err(Error::semantic(
                span,
                "A void function cannot return a value",
            )),
            (Some(value), ReturnKind::Int) => Ok(self
                .lower_expr(value, at)?
                .left(1)
                .then(&primitives::move_to_offset(at - self.return_cell))),
        }
    }

    /// Lowers a switch with this tape layout, P being the current offset:
    ///
    /// ```text
    /// P    1 until some arm runs
    /// P+1  controlling value
    /// P+2  "this group matched" flag
    /// P+3  case bodies run from here
    /// ```
    ///
    /// Groups are tested in reverse declaration order. Each test copies the
    /// value to P+3, subtracts the label and raises the flag if nothing is
    /// left. A body that falls through is emitted again as part of every
    /// group that reaches it.
    fn lower_switch(&mut self, value: &Expression, cases: &[SwitchCase], span: Span) -> Result<Fragment> {
        let groups = self.group_cases(cases, span)?;
        let at = self.frames.current_offset();

        let value = self.lower_expr(value, at + 1)?;
        self.frames.reserve(3);

        let mut code = Fragment::raw("[-]+>").then(&value);
        let mut default_arm = None;
        for group in groups.iter().rev() {
            let body = self.lower_case_body(&cases[group.body_start..])?;
            if group.has_default {
                default_arm = Some(body);
                continue;
            }

            code = code.clear();
            for &label in &group.values {
                code = code
                    .op(">")
                    .then(&primitives::copy_from_offset(2))
                    .op("<")
                    .then(&primitives::set_cell_value(0, label, true))
                    .op(">[-]+<[[-]>-<]>[-<<+>>]<<");
            }
            code = code.then(&branch::run_case(&body, 2));
        }

        code = match default_arm {
            Some(body) => code.op("<<[->>>").then(&body).op("<<<]"),
            None => code.op("<<[-]"),
        };

        // checked for errors, never emitted
        for case in cases {
            for statement in &case.unreachable {
                self.lower_scoped(statement)?;
            }
        }

        self.frames.release(3);
        Ok(code)
    }

    /// Validates the labels and merges consecutive labels that share a body
    fn group_cases(&mut self, cases: &[SwitchCase], span: Span) -> Result<Vec<CaseGroup>> {
        let mut seen: Vec<i64> = Vec::new();
        let mut has_default = false;
        let mut groups = Vec::new();
        let mut pending = CaseGroup::default();

        for (i, case) in cases.iter().enumerate() {
            match &case.label {
                CaseLabel::Default => {
                    if has_default {
                        return Err(Error::semantic(case.span, "Duplicate default label"));
                    }
                    has_default = true;
                    pending.has_default = true;
                }
                CaseLabel::Value(label) => {
                    let value = fold_constant(label).ok_or_else(|| {
                        Error::semantic(label.span, "Case label must be a constant")
                    })?;
                    if seen.contains(&value) {
                        return Err(Error::semantic(
                            label.span,
                            format!("Duplicate case value {}", value),
                        ));
                    }
                    seen.push(value);
                    pending.values.push(value);
                }
            }

            if let Some(Statement::Declaration(decl)) = case
                .body
                .iter()
                .find(|statement| matches!(statement, Statement::Declaration(_)))
            {
                return Err(Error::semantic(
                    decl.span,
                    format!(
                        "Declaration of '{}' directly inside a case; wrap it in braces",
                        decl.name
                    ),
                ));
            }
            if !case.unreachable.is_empty() {
                self.warn(case.span, "Statements after 'break' are never executed");
            }

            if !case.body.is_empty() || case.has_break || i + 1 == cases.len() {
                pending.body_start = i;
                groups.push(std::mem::take(&mut pending));
            }
        }

        if cases.is_empty() {
            self.warn(span, "Switch without cases");
        }
        Ok(groups)
    }

    /// Bodies from the first case on, through the first one ending in `break`
    fn lower_case_body(&mut self, cases: &[SwitchCase]) -> Result<Fragment> {
        self.frames.enter_scope();
        let mut code = Fragment::new();
        for case in cases {
            code.push(&self.lower_statements(&case.body)?);
            if case.has_break {
                break;
            }
        }
        let claimed = self.frames.exit_scope();
        Ok(code.left(claimed))
    }
}

/// Comment text for a statement in annotated output
fn annotation(statement: &Statement) -> Option<String> {
    let note = match statement {
        Statement::Declaration(decl) => format!("{}: declare {}", decl.span.line, decl.name),
        Statement::Expression(expr) => format!("{}: expression", expr.span.line),
        Statement::Print { span, .. } => format!("{}: print", span.line),
        Statement::If { span, .. } => format!("{}: if", span.line),
        Statement::While { span, .. } => format!("{}: while", span.line),
        Statement::DoWhile { span, .. } => format!("{}: do while", span.line),
        Statement::For { span, .. } => format!("{}: for", span.line),
        Statement::Switch { span, .. } => format!("{}: switch", span.line),
        Statement::Return { span, .. } => format!("{}: return", span.line),
        Statement::Block { .. }
        | Statement::Break { .. }
        | Statement::Continue { .. }
        | Statement::Empty => return None,
    };
    Some(note)
}

#[cfg(test)]
mod tests {
    use crate::compiler::{CompileOptions, Compiler};
    use crate::runtime::{Interpreter, RunOptions};
    use crate::Error;

    fn run(body: &str) -> Vec<u8> {
        let source = format!("void main() {{ {} }}", body);
        let result = Compiler::new(CompileOptions::default())
            .compile(&source)
            .unwrap();
        Interpreter::new(&result.code)
            .unwrap()
            .run(b"", &RunOptions::default())
            .unwrap()
            .output
    }

    fn compile_err(body: &str) -> Error {
        Compiler::new(CompileOptions::default())
            .compile(&format!("void main() {{ {} }}", body))
            .unwrap_err()
    }

    #[test]
    fn test_if_else_chain() {
        let body = "int i; for (i = 0; i < 4; i++) {
                        if (i == 0) print(\"a\"); else if (i == 1) print(\"b\"); else print(\"c\");
                    }";
        assert_eq!(run(body), b"abcc");
    }

    #[test]
    fn test_loops() {
        assert_eq!(run("int i = 3; while (i) { printint(i); i--; }"), b"321");
        assert_eq!(run("int i = 0; do { printint(i); } while (i);"), b"0");
        assert_eq!(run("for (int i = 0; i < 3; i++) { int sq = i * i; printint(sq); }"), b"014");
    }

    #[test]
    fn test_scopes_release_cells() {
        let body = "int a = 1; { int b = 2; { int c = 3; a = a + b + c; } } int d = 4; printint(a + d);";
        assert_eq!(run(body), b"10");
    }

    #[test]
    fn test_shadowing() {
        assert_eq!(run("int x = 1; { int x = x + 5; printint(x); } printint(x);"), b"61");
    }

    #[test]
    fn test_switch_fall_through_and_default() {
        let switch = "switch (x) { case 1: print(\"a\"); case 2: print(\"b\"); break; default: print(\"c\"); }";
        for (x, expected) in [(1, &b"ab"[..]), (2, b"b"), (5, b"c")] {
            assert_eq!(run(&format!("int x = {}; {}", x, switch)), expected);
        }
    }

    #[test]
    fn test_switch_shared_labels() {
        let switch = "switch (x) { case 1: case 3: print(\"odd\"); break; case 2: default: print(\"other\"); }";
        for (x, expected) in [(1, &b"odd"[..]), (3, b"odd"), (2, b"other"), (9, b"other")] {
            assert_eq!(run(&format!("int x = {}; {}", x, switch)), expected);
        }
    }

    #[test]
    fn test_switch_errors() {
        for body in [
            "switch (1) { case 1: break; case 1: break; }",
            "switch (1) { case 1: break; case 257: break; }",
            "switch (1) { default: break; default: break; }",
            "switch (1) { case 1: int y = 2; break; }",
        ] {
            assert!(matches!(compile_err(body), Error::SemanticError { .. }), "{}", body);
        }
    }

    #[test]
    fn test_unreachable_case_statements_warn() {
        let source = "void main() { switch (1) { case 1: break; print(\"never\"); } }";
        let result = Compiler::new(CompileOptions::default()).compile(source).unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert!(!result.code.contains('.'));
    }

    #[test]
    fn test_break_and_continue_unsupported() {
        assert!(matches!(
            compile_err("while (1) { break; }"),
            Error::Unsupported { .. }
        ));
        assert!(matches!(
            compile_err("for (;;) { continue; }"),
            Error::Unsupported { .. }
        ));
        assert!(matches!(
            compile_err("switch (1) { case 1: if (1) { break; } }"),
            Error::Unsupported { .. }
        ));
    }

    #[test]
    fn test_for_without_initial_value_warns() {
        let source = "void main() { for (int i; i < 2; i++) { } }";
        let result = Compiler::new(CompileOptions::default()).compile(source).unwrap();
        assert_eq!(result.warnings.len(), 1);
    }
}
