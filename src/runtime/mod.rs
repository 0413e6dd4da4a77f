//! Reference tape-machine interpreter used to run compiled programs

mod interpreter;

pub use interpreter::{Interpreter, RunOptions, RunResult, DEFAULT_MAX_STEPS};
