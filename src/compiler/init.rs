//! Flattening of brace lists and string literals into per-cell values

use super::primitives::string_bytes;
use crate::error::{Error, Result};
use crate::lexer::Span;
use crate::parser::{Expression, Initializer};

/// What one cell of an initialized region starts out as
#[derive(Debug, Clone, PartialEq)]
pub(super) enum CellInit<'a> {
    /// Value of an expression
    Expr(&'a Expression),
    /// Fixed byte, from a string literal or padding
    Byte(u8),
}

/// Lays `init` out over a region of `dimensions` elements of `element_size`
/// cells each. Nested lists fill one row each and short lists are zero
/// padded, so the result always covers the whole region.
pub(super) fn flatten<'a>(
    init: &'a Initializer,
    dimensions: &[usize],
    element_size: usize,
    name: &str,
    span: Span,
) -> Result<Vec<CellInit<'a>>> {
    let capacity = dimensions.iter().product::<usize>() * element_size;
    if let Initializer::Expr(expr) = init {
        if capacity != 1 {
            return Err(Error::semantic(
                expr.span,
                format!("'{}' needs a brace list or a string to initialize it", name),
            ));
        }
        return Ok(vec![CellInit::Expr(expr)]);
    }

    let mut cells = Vec::with_capacity(capacity);
    flatten_into(init, dimensions, element_size, true, name, span, &mut cells)?;
    Ok(cells)
}

fn flatten_into<'a>(
    init: &'a Initializer,
    dimensions: &[usize],
    element_size: usize,
    pad: bool,
    name: &str,
    span: Span,
    out: &mut Vec<CellInit<'a>>,
) -> Result<()> {
    let capacity = dimensions.iter().product::<usize>() * element_size;
    let start = out.len();

    match init {
        Initializer::Expr(expr) => out.push(CellInit::Expr(expr)),
        Initializer::String(text, _) => {
            out.extend(string_bytes(text).into_iter().map(CellInit::Byte));
        }
        Initializer::List(items, _) => {
            for item in items {
                match (item, dimensions.split_first()) {
                    (Initializer::List(..), Some((_, rows))) => {
                        flatten_into(item, rows, element_size, true, name, span, out)?
                    }
                    (Initializer::List(..), None) => {
                        flatten_into(item, &[], element_size, false, name, span, out)?
                    }
                    _ => flatten_into(item, &[], 1, false, name, span, out)?,
                }
            }
        }
    }

    let written = out.len() - start;
    if written > capacity {
        return Err(Error::semantic(
            span,
            format!(
                "Too many initial values for '{}' ({} given, room for {})",
                name, written, capacity
            ),
        ));
    }
    if pad {
        out.resize(start + capacity, CellInit::Byte(0));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Scanner;
    use crate::parser::{Declaration, SourceParser, Statement};

    fn declaration(source: &str) -> Declaration {
        let tokens = Scanner::new(&format!("void main() {{ {} }}", source))
            .scan_tokens()
            .unwrap();
        let program = SourceParser::new(tokens).parse().unwrap();
        match program.functions[0].body[0].clone() {
            Statement::Declaration(decl) => decl,
            other => panic!("not a declaration: {:?}", other),
        }
    }

    fn bytes(cells: &[CellInit]) -> Vec<Option<u8>> {
        cells
            .iter()
            .map(|cell| match cell {
                CellInit::Byte(b) => Some(*b),
                CellInit::Expr(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_nested_rows_are_padded() {
        let decl = declaration("int m[2][3] = {{1}, {4, 5}};");
        let init = decl.initializer.as_ref().unwrap();
        let cells = flatten(init, &decl.dimensions, 1, &decl.name, decl.span).unwrap();
        assert_eq!(
            bytes(&cells),
            vec![None, Some(0), Some(0), None, None, Some(0)]
        );
    }

    #[test]
    fn test_string_fills_and_pads() {
        let decl = declaration("int s[4] = \"hi\";");
        let init = decl.initializer.as_ref().unwrap();
        let cells = flatten(init, &decl.dimensions, 1, &decl.name, decl.span).unwrap();
        assert_eq!(bytes(&cells), vec![Some(b'h'), Some(b'i'), Some(0), Some(0)]);
    }

    #[test]
    fn test_overflow_and_scalar_mismatch() {
        let decl = declaration("int a[2] = {1, 2, 3};");
        let init = decl.initializer.as_ref().unwrap();
        assert!(flatten(init, &decl.dimensions, 1, &decl.name, decl.span).is_err());

        let decl = declaration("int a[2] = 7;");
        let init = decl.initializer.as_ref().unwrap();
        assert!(flatten(init, &decl.dimensions, 1, &decl.name, decl.span).is_err());
    }
}
