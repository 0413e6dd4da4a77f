//! Fragment-generating algorithms built from the single loop primitive
//!
//! Unless stated otherwise, a binary primitive starts with the head on its
//! first operand at offset P, finds the second operand at P+1, leaves the
//! result in P, zeroes every other cell it touched and ends with the head on
//! P+1. Nothing below P is read or written.

use super::branch;
use super::fragment::Fragment;

/// Width of one cell in bits
pub const CELL_BITS: u32 = 8;

/// Number of distinct cell values
pub const CELL_MODULUS: i64 = 1 << CELL_BITS;

/// Message printed before a program hangs on a zero divisor
pub const DIVISION_BY_ZERO_MESSAGE: &str = "Error - Division by zero\n";

/// Reduces a value to what a cell can hold
pub fn wrap(value: i64) -> i64 {
    value.rem_euclid(CELL_MODULUS)
}

/// Changes the current cell from `previous` to `new`.
///
/// Chooses the shortest of a plain run of `+`/`-` (in either direction
/// around the wrap) and a factored loop `>+^a[<±^b>-]<±^c` that uses the
/// next cell as a counter. With `zero_next` the counter cell is cleared
/// first; without it, the caller guarantees it already holds zero. The head
/// ends where it started.
pub fn set_cell_value(new: i64, previous: i64, zero_next: bool) -> Fragment {
    let delta = wrap(new - previous);
    let mut best = Fragment::new().inc(delta as usize);

    for offset in [delta, delta - CELL_MODULUS] {
        let candidates = [Some(run_of(offset)), factored(offset, zero_next)];
        for candidate in candidates.into_iter().flatten() {
            if candidate.instruction_count() < best.instruction_count() {
                best = candidate;
            }
        }
    }
    best
}

fn run_of(offset: i64) -> Fragment {
    if offset >= 0 {
        Fragment::new().inc(offset as usize)
    } else {
        Fragment::new().dec(offset.unsigned_abs() as usize)
    }
}

/// Finds `a*b + c == n` minimizing `a + b + |c|`
fn best_factors(n: i64) -> Option<(i64, i64, i64)> {
    let mut best: Option<(i64, i64, i64)> = None;
    let cost = |(a, b, c): (i64, i64, i64)| a + b + c.abs();

    for a in 2..=n / 2 {
        for b in [n / a, n / a + 1] {
            if b < 2 {
                continue;
            }
            let candidate = (a, b, n - a * b);
            if best.map_or(true, |current| cost(candidate) < cost(current)) {
                best = Some(candidate);
            }
        }
    }
    best
}

fn factored(offset: i64, zero_next: bool) -> Option<Fragment> {
    let (a, b, c) = best_factors(offset.abs())?;
    let (step, back) = if offset > 0 { ('+', '-') } else { ('-', '+') };

    let mut code = Fragment::new().right(1);
    if zero_next {
        code = code.clear();
    }
    let body = Fragment::new().left(1).op(&step.to_string().repeat(b as usize)).right(1).dec(1);
    let tail = if c >= 0 { step } else { back };
    Some(
        code.inc(a as usize)
            .repeat(&body)
            .left(1)
            .op(&tail.to_string().repeat(c.unsigned_abs() as usize)),
    )
}

/// Writes `value` into the current cell and steps right
pub fn literal(value: i64) -> Fragment {
    Fragment::new()
        .clear()
        .then(&set_cell_value(wrap(value), 0, true))
        .right(1)
}

/// Copies the cell `offset` to the left of the head into the head's cell.
///
/// The source is restored; the cell right of the head is used as scratch and
/// left at zero. Head ends one cell right.
pub fn copy_from_offset(offset: usize) -> Fragment {
    let back = offset + 1;
    Fragment::new()
        .op("[-]>[-]")
        .left(back)
        .op("[")
        .right(offset)
        .op("+>+")
        .left(back)
        .op("-]")
        .right(back)
        .op("[")
        .left(back)
        .op("+")
        .right(back)
        .op("-]")
}

/// Copies the head's cell into the cell `offset` to the left. Head stays put.
pub fn copy_to_offset(offset: usize) -> Fragment {
    Fragment::new()
        .op(">[-]")
        .left(offset + 1)
        .clear()
        .right(offset)
        .op("[>+")
        .left(offset + 1)
        .op("+")
        .right(offset)
        .op("-]>[<+>-]<")
}

/// Moves the head's cell into the cell `offset` to the left, overwriting it.
/// The source ends at zero; the head stays put.
pub fn move_to_offset(offset: usize) -> Fragment {
    Fragment::new()
        .left(offset)
        .clear()
        .right(offset)
        .op("[")
        .left(offset)
        .op("+")
        .right(offset)
        .op("-]")
}

/// `a + b`
pub fn add() -> Fragment {
    Fragment::raw(">[<+>-]")
}

/// `a - b`
pub fn subtract() -> Fragment {
    Fragment::raw(">[<->-]")
}

/// `a * b`: repeated addition, drains `a` into a counter two cells right
pub fn multiply() -> Fragment {
    Fragment::raw(">>[-]>[-]<<<[>>>+<<<-]>>>[<<[<+>>+<-]>[<+>-]>-]<<[-]")
}

/// Long division by repeated subtraction.
///
/// Cells `a b w x y z` become `0 (b - a%b) (a%b) (a/b) 0 0`; the head ends on
/// `a`. With `check_zero` the divisor is tested first and a zero divisor
/// prints [`DIVISION_BY_ZERO_MESSAGE`] and hangs.
fn divmod(check_zero: bool) -> Fragment {
    let mut code = Fragment::new();
    if check_zero {
        let hang = print_string(DIVISION_BY_ZERO_MESSAGE.as_bytes()).op("[]");
        code = code
            .op(">>[-]>[-]<<[>+>+<<-]>[<+>-]>")
            .then(&branch::if_zero(&hang, 1))
            .op("<<<");
    }

    let found_multiple = Fragment::raw("<+<[-<+>]>>");
    code.op(">>[-]>[-]>[-]>[-]<<<<<")
        .op("[->->+<[->>>+>+<<<<]>>>>[-<<<<+>>>>]<")
        .then(&branch::if_zero(&found_multiple, 1))
        .op("<<<<]")
}

/// `a / b`
pub fn divide(check_zero: bool) -> Fragment {
    divmod(check_zero).op(">>>[<<<+>>>-]<<[-]>[-]<")
}

/// `a % b`
pub fn modulo(check_zero: bool) -> Fragment {
    divmod(check_zero).op(">>[<<+>>-]<[-]>>[-]<<")
}

/// `a == b`
pub fn equal() -> Fragment {
    Fragment::raw("[->-<]+>[<->[-]]")
}

/// `a != b`
pub fn not_equal() -> Fragment {
    Fragment::raw("[->-<]>[<+>[-]]")
}

/// `a < b`
pub fn less() -> Fragment {
    Fragment::raw(">>[-]>[-]<<[>[-]<<[>>+>+<<<-]>>[<<+>>-]+>[[-]<-<<->>>]<<-]<[-]>>[<<+>>-]<")
}

/// `a > b`, the mirror of [`less`]
pub fn greater() -> Fragment {
    Fragment::raw(">>[-]>[-]<<<[>>[-]<[>+>+<<-]>[<+>-]+>[[-]<-<->>]<<<-]>>[<<+>>-]<[-]")
}

/// `a <= b`
pub fn less_equal() -> Fragment {
    Fragment::raw(">>[-]+>[-]<<<[>>[-]<[>+>+<<-]>[<+>-]>[[-]<+<->>]<<<-]>>[<<+>>-]<[-]")
}

/// `a >= b`, the mirror of [`less_equal`]
pub fn greater_equal() -> Fragment {
    Fragment::raw(">>[-]+>[-]<<[>[-]<<[>>+>+<<<-]>>[<<+>>-]>[[-]<+<<->>>]<<-]<[-]>>[<<+>>-]<")
}

/// `a << b`: doubles `a`, `b` times
pub fn shift_left() -> Fragment {
    Fragment::raw(">>[-]<[<[>>+<<-]>>[<<++>>-]<-]")
}

/// `a >> b`: halves `a`, `b` times
pub fn shift_right() -> Fragment {
    Fragment::new()
        .right(1)
        .op(&">[-]".repeat(4))
        .left(4)
        .op("[>++<<[->>-[>>+>+<<<-]>>>[<<<+>>>-]<-[<+<++>>+]<<<<]>>>[<<<+>>>-]<[-]<-]")
}

/// Per-bit combination used by [`bitwise`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitKernel {
    /// `&`
    And,
    /// `|`
    Or,
    /// `^`
    Xor,
}

impl BitKernel {
    fn code(self) -> &'static str {
        match self {
            BitKernel::And => "[->[-<<+>>]<]>[-]",
            BitKernel::Or => "[>+<-]>[[-]<<+>>]",
            BitKernel::Xor => "[>-<-]>[[-]<<+>>]",
        }
    }
}

/// Bit-serial AND/OR/XOR.
///
/// Scratch layout from P: `a b c w x y z bit1 bitcounter res`. Each of the
/// [`CELL_BITS`] rounds splits the low bit off both operands by halving,
/// combines the two bits with the kernel and adds the result, shifted by the
/// round number, into `res`.
pub fn bitwise(kernel: BitKernel) -> Fragment {
    let bits = CELL_BITS as usize;
    Fragment::new()
        .right(7)
        .clear()
        .right(1)
        .op(">[-]<")
        .clear()
        .dec(bits)
        .op("[")
        .inc(bits)
        .op("<")
        .op(&"<[-]".repeat(5))
        .op("++<<")
        // halve a, low bit into bit1
        .op("[->>-[>+>>+<<<-]>[<+>-]>>>>+<<-[<+<<++>>>>>--<<+]<<<<<]")
        .op(">>>>[<<<<+>>>>-]<<[-]++<")
        // halve b, low bit into z
        .op("[->-[>+>>+<<<-]>[<+>-]>>>+<-[>--<<+<<++>>>+]<<<<]")
        .op(">>>[<<<+>>>-]>>")
        .op(kernel.code())
        // y <<= round, res += y
        .op(">[<+<+>>-]<[>+<-]<[<[<+>-]<[>++<-]>>-]<[>>>>+<<<<-]>>>")
        .dec(bits - 1)
        .op("]")
        .op(">[<<<<<<<<<+>>>>>>>>>-]")
        .left(7)
        .clear()
        .left(1)
}

/// `!a`: 1 if zero, else 0. Starts on `a`, ends one right.
pub fn logical_not() -> Fragment {
    Fragment::raw(">[-]+<[>-<[-]]>[<+>-]")
}

/// `~a`: `255 - a`. Starts on `a`, ends one right.
pub fn bitwise_not() -> Fragment {
    Fragment::raw(">[-]<[>+<-]>+[<->-]")
}

/// How an update operator changes its operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    /// Add one
    Increment,
    /// Subtract one
    Decrement,
    /// Leave as is
    Keep,
    /// Set to zero
    Reset,
}

impl Update {
    fn op(self) -> &'static str {
        match self {
            Update::Increment => "+",
            Update::Decrement => "-",
            Update::Keep | Update::Reset => "",
        }
    }
}

/// Prefix update of the cell `offset` left of the head; the new value lands
/// in the head's cell and the head steps right.
pub fn prefix_update(update: Update, offset: usize) -> Fragment {
    match update {
        Update::Reset => Fragment::new()
            .clear()
            .left(offset)
            .clear()
            .right(offset)
            .right(1),
        _ => {
            let back = offset + 1;
            Fragment::new()
                .op("[-]>[-]")
                .left(back)
                .op(update.op())
                .op("[")
                .right(offset)
                .op("+>+")
                .left(back)
                .op("-]")
                .right(back)
                .op("[")
                .left(back)
                .op("+")
                .right(back)
                .op("-]")
        }
    }
}

/// Postfix update of the cell `offset` left of the head; the old value lands
/// in the head's cell and the head steps right.
pub fn postfix_update(update: Update, offset: usize) -> Fragment {
    match update {
        Update::Reset => Fragment::new()
            .clear()
            .left(offset)
            .op("[")
            .right(offset)
            .op("+")
            .left(offset)
            .op("-]")
            .right(offset)
            .right(1),
        _ => {
            let back = offset + 1;
            Fragment::new()
                .op("[-]>[-]")
                .left(back)
                .op("[")
                .right(offset)
                .op("+>+")
                .left(back)
                .op("-]")
                .right(back)
                .op(update.op())
                .op("[")
                .left(back)
                .op("+")
                .right(back)
                .op("-]")
        }
    }
}

/// Prints `bytes`, building each from the previous one. Uses the head's cell
/// and the next one; the head ends where it started.
pub fn print_string(bytes: &[u8]) -> Fragment {
    let mut code = Fragment::raw("[-]>[-]<");
    let mut previous = 0;
    for &byte in bytes {
        code.push(&set_cell_value(byte as i64, previous, false));
        code.push_str(".");
        previous = byte as i64;
    }
    code
}

/// Bytes a string literal stands for: characters up to U+00FF are one byte
/// each, anything else is UTF-8 encoded.
pub fn string_bytes(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for c in text.chars() {
        match u8::try_from(c as u32) {
            Ok(byte) => bytes.push(byte),
            Err(_) => bytes.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes()),
        }
    }
    bytes
}

/// Walks right by the index held in P.
///
/// Expects the index in P with the head on P+1. Afterwards, with `i` the
/// index, cells `P..P+i` are zero, `P+i+1` holds `i` and the head is on
/// `P+i+2`, so an offset computed for logical position P+2 reaches the
/// element `i` cells past the array base.
pub fn walk_right() -> Fragment {
    Fragment::raw("[-]<[>>[-]+<[>+<-]<-[>+<-]>]>>")
}

/// Like [`walk_right`], carrying a value along.
///
/// Expects the index in P, zero in P+1, the value in P+2 and the head on
/// P+3. Afterwards the value sits on the head at logical P+2.
pub fn walk_right_carrying() -> Fragment {
    Fragment::raw("<<<[>>>[-]<[>+<-]<+[>+<-]<-[>+<-]>]>>")
}

/// Walks back after [`walk_right`], carrying the value in the cell left of
/// the counter. Ends with the value in P and the head on P+1.
pub fn walk_left_carrying() -> Fragment {
    Fragment::raw("[<[<+>-]>-[<+>-]<]")
}
