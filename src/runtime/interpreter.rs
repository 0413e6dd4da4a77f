use crate::error::{Error, Result};
use tracing::debug;

/// Default step budget for [`RunOptions`]
pub const DEFAULT_MAX_STEPS: u64 = 50_000_000;

/// Execution settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Folded instructions executed before giving up
    pub max_steps: u64,
    /// Cell the head starts on
    pub start_cell: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            max_steps: DEFAULT_MAX_STEPS,
            start_cell: 0,
        }
    }
}

impl RunOptions {
    /// Default options with a different step budget
    pub fn with_max_steps(max_steps: u64) -> Self {
        RunOptions {
            max_steps,
            ..Self::default()
        }
    }

    /// Starts the head on `cell` instead of cell 0
    pub fn starting_at(mut self, cell: usize) -> Self {
        self.start_cell = cell;
        self
    }
}

/// What a finished run left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Bytes written by `.`
    pub output: Vec<u8>,
    /// Every cell touched so far, from cell 0
    pub tape: Vec<u8>,
    /// Final head position
    pub head: usize,
    /// Folded instructions executed
    pub steps: u64,
    /// Lowest cell the head ever stood on
    pub lowest_cell: usize,
}

/// Run-length folded instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Move(isize),
    Add(u8),
    Output,
    Input,
    /// Jump past the matching `Close` when the cell is zero
    Open(usize),
    /// Jump back past the matching `Open` when the cell is nonzero
    Close(usize),
}

/// Reference interpreter for compiled programs
///
/// The tape starts with one zeroed cell and grows to the right on demand.
/// Moving left of cell 0 is an error rather than a wrap.
#[derive(Debug, Clone)]
pub struct Interpreter {
    ops: Vec<Op>,
    /// Index in the source text of each op, for error reporting
    positions: Vec<usize>,
}

impl Interpreter {
    /// Folds `code` into ops and matches its brackets. Characters outside the
    /// instruction set are ignored.
    pub fn new(code: &str) -> Result<Self> {
        let mut ops: Vec<Op> = Vec::new();
        let mut positions = Vec::new();
        let mut open = Vec::new();

        for (position, c) in code.chars().enumerate() {
            match c {
                '>' | '<' => {
                    let delta = if c == '>' { 1 } else { -1 };
                    if let Some(Op::Move(n)) = ops.last_mut() {
                        *n += delta;
                        continue;
                    }
                    ops.push(Op::Move(delta));
                }
                '+' | '-' => {
                    let delta: u8 = if c == '+' { 1 } else { 255 };
                    if let Some(Op::Add(n)) = ops.last_mut() {
                        *n = n.wrapping_add(delta);
                        continue;
                    }
                    ops.push(Op::Add(delta));
                }
                '.' => ops.push(Op::Output),
                ',' => ops.push(Op::Input),
                '[' => {
                    open.push(ops.len());
                    ops.push(Op::Open(0));
                }
                ']' => {
                    let start = open.pop().ok_or(Error::UnmatchedBracket { position })?;
                    let end = ops.len();
                    ops[start] = Op::Open(end);
                    ops.push(Op::Close(start));
                }
                _ => continue,
            }
            positions.push(position);
        }

        if let Some(&start) = open.last() {
            return Err(Error::UnmatchedBracket {
                position: positions[start],
            });
        }

        Ok(Interpreter { ops, positions })
    }

    /// Number of folded ops
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True for a program with no instructions
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Runs the program on a fresh tape, feeding it `input`
    pub fn run(&self, input: &[u8], options: &RunOptions) -> Result<RunResult> {
        let mut tape = vec![0u8; options.start_cell + 1];
        let mut head = options.start_cell;
        let mut lowest_cell = head;
        let mut input = input.iter();
        let mut output = Vec::new();
        let mut steps: u64 = 0;
        let mut pc = 0;

        while pc < self.ops.len() {
            if steps >= options.max_steps {
                debug!(steps, output_len = output.len(), "Step budget exhausted");
                return Err(Error::ExecutionLimitExceeded {
                    limit: options.max_steps,
                    output,
                });
            }
            steps += 1;

            match self.ops[pc] {
                Op::Move(delta) => {
                    let target = head as isize + delta;
                    if target < 0 {
                        return Err(Error::TapeUnderflow {
                            position: self.positions[pc],
                        });
                    }
                    head = target as usize;
                    if head >= tape.len() {
                        tape.resize(head + 1, 0);
                    }
                    lowest_cell = lowest_cell.min(head);
                }
                Op::Add(n) => tape[head] = tape[head].wrapping_add(n),
                Op::Output => output.push(tape[head]),
                Op::Input => tape[head] = input.next().copied().unwrap_or(0),
                Op::Open(end) => {
                    if tape[head] == 0 {
                        pc = end;
                    }
                }
                Op::Close(start) => {
                    if tape[head] != 0 {
                        pc = start;
                    }
                }
            }
            pc += 1;
        }

        Ok(RunResult {
            output,
            tape,
            head,
            steps,
            lowest_cell,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(code: &str, input: &[u8]) -> RunResult {
        Interpreter::new(code)
            .unwrap()
            .run(input, &RunOptions::default())
            .unwrap()
    }

    #[test]
    fn test_hello() {
        let code = "++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.";
        assert_eq!(run(code, b"").output, b"Hello");
    }

    #[test]
    fn test_folding_and_wrap() {
        let interp = Interpreter::new("+++-->><").unwrap();
        assert_eq!(interp.len(), 2);
        let result = interp.run(b"", &RunOptions::default()).unwrap();
        assert_eq!((result.tape[0], result.head), (1, 1));
        assert_eq!(run("-", b"").tape[0], 255);
    }

    #[test]
    fn test_input_and_eof() {
        let result = run(",>,>+,", b"A");
        assert_eq!(&result.tape[..3], &[b'A', 0, 0]);
    }

    #[test]
    fn test_comments_ignored() {
        assert_eq!(run("x = 1\n+ done", b"").tape[0], 1);
    }

    #[test]
    fn test_unmatched_brackets() {
        assert_eq!(
            Interpreter::new("+]").unwrap_err(),
            Error::UnmatchedBracket { position: 1 }
        );
        assert_eq!(
            Interpreter::new("a[[]").unwrap_err(),
            Error::UnmatchedBracket { position: 1 }
        );
    }

    #[test]
    fn test_tape_underflow() {
        let err = Interpreter::new("><<")
            .unwrap()
            .run(b"", &RunOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::TapeUnderflow { .. }));
    }

    #[test]
    fn test_step_budget_keeps_partial_output() {
        let err = Interpreter::new("+.[]")
            .unwrap()
            .run(b"", &RunOptions::with_max_steps(1_000))
            .unwrap_err();
        assert_eq!(
            err,
            Error::ExecutionLimitExceeded {
                limit: 1_000,
                output: vec![1],
            }
        );
    }

    #[test]
    fn test_start_cell_and_lowest() {
        let options = RunOptions::default().starting_at(5);
        let result = Interpreter::new("<<+>>>").unwrap().run(b"", &options).unwrap();
        assert_eq!((result.head, result.lowest_cell, result.tape[3]), (6, 3, 1));
    }
}
