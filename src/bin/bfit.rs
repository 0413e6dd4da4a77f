use anyhow::{Context, Result};
use bfit::runtime::DEFAULT_MAX_STEPS;
use bfit::{CompileOptions, Compiler, Interpreter, RunOptions};
use clap::Parser as ClapParser;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Source file to compile
    input: PathBuf,

    /// Write the program here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run the program after compiling, feeding it stdin
    #[arg(short, long)]
    run: bool,

    /// Strip comments and whitespace from the program
    #[arg(short, long)]
    minify: bool,

    /// Directory searched for `#include <...>` (repeatable)
    #[arg(short = 'I', long = "include")]
    include_paths: Vec<PathBuf>,

    /// Skip constant folding
    #[arg(long)]
    no_optimize: bool,

    /// Emit a comment line before each statement
    #[arg(long)]
    annotate: bool,

    /// Print the parsed syntax tree as JSON and stop
    #[arg(long)]
    emit_ast: bool,

    /// Step budget when running
    #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
    max_steps: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let compiler = Compiler::new(CompileOptions {
        optimize: !cli.no_optimize,
        annotate: cli.annotate,
        minify: cli.minify,
        include_paths: cli.include_paths.clone(),
    });

    if cli.emit_ast {
        let program = compiler
            .parse_file(&cli.input)
            .with_context(|| format!("Failed to parse {}", cli.input.display()))?;
        println!("{}", serde_json::to_string_pretty(&program)?);
        return Ok(());
    }

    let compiled = compiler
        .compile_file(&cli.input)
        .with_context(|| format!("Failed to compile {}", cli.input.display()))?;
    for warning in &compiled.warnings {
        eprintln!("{}", warning);
    }

    if cli.run {
        let mut input = Vec::new();
        io::stdin().read_to_end(&mut input)?;
        let result = Interpreter::new(&compiled.code)?
            .run(&input, &RunOptions::with_max_steps(cli.max_steps))
            .context("Program did not finish")?;
        io::stdout().write_all(&result.output)?;
        return Ok(());
    }

    match &cli.output {
        Some(path) => fs::write(path, &compiled.code)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", compiled.code),
    }
    Ok(())
}
