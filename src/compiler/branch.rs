//! Conditional emission
//!
//! The target machine only has "repeat while nonzero". Every conditional in
//! the compiler is built here from a guard cell whose loop body runs at most
//! once: the body clears the guard before the closing bracket. Each helper
//! guarantees that exactly one arm runs and that its guard cells end at zero.

use super::fragment::Fragment;

/// Runs `inner` only if the head's cell is zero.
///
/// The tested cell is destroyed. `temp_offset` cells to the right is a flag
/// that must lie beyond anything `inner` touches. `inner` starts and must end
/// on the tested cell, which holds zero while it runs.
pub fn if_zero(inner: &Fragment, temp_offset: usize) -> Fragment {
    let t = temp_offset;
    Fragment::new()
        .right(t)
        .op("[-]+")
        .left(t)
        .op("[")
        .right(t)
        .op("-")
        .left(t)
        .op("[-]]")
        .right(t)
        .op("[")
        .left(t)
        .then(inner)
        .right(t)
        .op("-]")
        .left(t)
}

/// `if (condition) then_arm [else else_arm]`
///
/// `condition` must be lowered at P (value in P, head ends on P+1); both
/// arms must be lowered at P+2 and end there. P holds the condition guard and
/// P+1 the "run the else arm" guard. The head ends on P with both guards at
/// zero.
pub fn if_else(condition: &Fragment, then_arm: &Fragment, else_arm: Option<&Fragment>) -> Fragment {
    let mut code = condition.clone();
    if else_arm.is_some() {
        code.push_str("[-]+");
    }

    code.push_str("<[>");
    if else_arm.is_some() {
        code.push_str("-");
    }
    code.push_str(">");
    code.push(then_arm);
    code.push_str("<<[-]]");

    if let Some(else_arm) = else_arm {
        code.push_str(">[>");
        code.push(else_arm);
        code.push_str("<-]<");
    }
    code
}

/// Short-circuit `left && right`.
///
/// `left` is lowered at P, `right` at P+2; the result (0 or 1) lands in P and
/// the head ends on P+1. `right` only runs when `left` is nonzero.
pub fn and_then(left: &Fragment, right: &Fragment) -> Fragment {
    left.clone()
        .op("[-]<[[-]>>")
        .then(right)
        .op("<[[-]<+>]<<]>[<+>-]")
}

/// Short-circuit `left || right`.
///
/// `left` is lowered at P, `right` at P+3; the result (0 or 1) lands in P and
/// the head ends on P+1. `right` only runs when `left` is zero.
pub fn or_else(left: &Fragment, right: &Fragment) -> Fragment {
    left.clone()
        .op("[-]+>[-]<<[[-]>->+<<]>[->>")
        .then(right)
        .op("<[[-]<+>]<<]>[<<+>>-]<")
}

/// Runs `body` once when the switch-case flag at the head is nonzero.
///
/// The flag is cleared, `not_matched_offset` cells to the left is cleared as
/// well, and `body` runs at the cell right of the flag and must end there.
/// The head ends on the flag.
pub fn run_case(body: &Fragment, not_matched_offset: usize) -> Fragment {
    Fragment::new()
        .op("[-")
        .left(not_matched_offset)
        .op("[-]")
        .right(not_matched_offset)
        .right(1)
        .then(body)
        .left(1)
        .op("]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{Interpreter, RunOptions};

    fn run(code: &Fragment) -> (Vec<u8>, usize, Vec<u8>) {
        let result = Interpreter::new(code.as_str())
            .unwrap()
            .run(b"", &RunOptions::default())
            .unwrap();
        (result.tape, result.head, result.output)
    }

    #[test]
    fn test_if_zero() {
        let inner = Fragment::raw(">>+++<<");
        let (tape, head, _) = run(&Fragment::new().then(&if_zero(&inner, 1)));
        assert_eq!((tape[2], head), (3, 0));

        let (tape, head, _) = run(&Fragment::raw("+").then(&if_zero(&inner, 1)));
        assert_eq!(tape.get(2).copied().unwrap_or(0), 0);
        assert_eq!((tape[0], tape[1], head), (0, 0, 0));
    }

    #[test]
    fn test_if_else_runs_exactly_one_arm() {
        // arms print 'T' / 'F' from cell P+2
        let then_arm = Fragment::new().then(&super::super::primitives::print_string(b"T"));
        let else_arm = Fragment::new().then(&super::super::primitives::print_string(b"F"));
        for (cond, expected) in [("[-]+>", b"T"), ("[-]>", b"F")] {
            let code = if_else(&Fragment::raw(cond), &then_arm, Some(&else_arm));
            let (tape, head, output) = run(&code);
            assert_eq!(output, expected);
            assert_eq!((tape[0], tape[1], head), (0, 0, 0));
        }
    }

    #[test]
    fn test_short_circuit() {
        let truthy = Fragment::raw("[-]+++>");
        let falsy = Fragment::raw("[-]>");
        // right operand prints 'R' and yields 5
        let noisy = super::super::primitives::print_string(b"R")
            .op("[-]+++++>");
        let cases = [
            (and_then(&truthy, &noisy), 1, b"R".to_vec()),
            (and_then(&falsy, &noisy), 0, vec![]),
            (or_else(&truthy, &noisy), 1, vec![]),
            (or_else(&falsy, &noisy), 1, b"R".to_vec()),
            (or_else(&falsy, &falsy), 0, vec![]),
        ];
        for (code, value, output) in cases {
            let (tape, head, out) = run(&code);
            assert_eq!(tape[0], value, "{}", code);
            assert_eq!(head, 1);
            assert_eq!(out, output);
            assert!(tape[1..].iter().take(3).all(|&c| c == 0), "{:?}", tape);
        }
    }
}
