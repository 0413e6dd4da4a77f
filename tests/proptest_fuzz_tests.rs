//! Property-based tests for the bfit lexer, parser and code generator
//!
//! These tests use proptest to generate random inputs and verify that:
//! 1. The scanner and parser never panic on arbitrary input
//! 2. Generated fragments compute the same values as 8-bit arithmetic
//! 3. Fragments stay inside the cells they were given

use bfit::compiler::primitives::set_cell_value;
use bfit::compiler::{lower_expression_at, ElementType, FrameAllocator, Variable};
use bfit::{Interpreter, RunOptions, Scanner, SourceParser, Span};
use proptest::prelude::*;

// =============================================================================
// STRATEGY GENERATORS
// =============================================================================

/// Random strings that might break the scanner
fn arbitrary_source_string() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"[\x00-\x7F]{0,300}").unwrap()
}

/// Sequences of real tokens in random order
fn token_soup() -> impl Strategy<Value = String> {
    let token = prop_oneof![
        Just("int".to_string()),
        Just("void".to_string()),
        Just("struct".to_string()),
        Just("if".to_string()),
        Just("else".to_string()),
        Just("while".to_string()),
        Just("for".to_string()),
        Just("switch".to_string()),
        Just("case".to_string()),
        Just("return".to_string()),
        Just("(".to_string()),
        Just(")".to_string()),
        Just("{".to_string()),
        Just("}".to_string()),
        Just("[".to_string()),
        Just("]".to_string()),
        Just(";".to_string()),
        Just(",".to_string()),
        Just(":".to_string()),
        Just("=".to_string()),
        Just("+=".to_string()),
        Just("++".to_string()),
        Just("+".to_string()),
        Just("*".to_string()),
        Just("<".to_string()),
        Just("&&".to_string()),
        Just(".".to_string()),
        (0u16..300).prop_map(|n| n.to_string()),
        "[a-z][a-z0-9_]{0,6}".prop_map(|s| s),
        r#""[a-z ]{0,8}""#.prop_map(|s| s),
    ];
    prop::collection::vec(token, 0..40).prop_map(|tokens| tokens.join(" "))
}

/// Fully parenthesized expressions over byte literals with their 8-bit value
fn byte_expression() -> impl Strategy<Value = (String, u8)> {
    let leaf = any::<u8>().prop_map(|v| (v.to_string(), v));
    leaf.prop_recursive(3, 12, 2, |inner| {
        let op = prop_oneof![
            Just("+"),
            Just("-"),
            Just("*"),
            Just("&"),
            Just("|"),
            Just("^"),
            Just("=="),
            Just("<"),
            Just(">="),
        ];
        (inner.clone(), op, inner).prop_map(|((ls, lv), op, (rs, rv))| {
            let value = match op {
                "+" => lv.wrapping_add(rv),
                "-" => lv.wrapping_sub(rv),
                "*" => lv.wrapping_mul(rv),
                "&" => lv & rv,
                "|" => lv | rv,
                "^" => lv ^ rv,
                "==" => (lv == rv) as u8,
                "<" => (lv < rv) as u8,
                _ => (lv >= rv) as u8,
            };
            (format!("({} {} {})", ls, op, rs), value)
        })
    })
}

fn run_at(code: &str, at: usize) -> bfit::RunResult {
    Interpreter::new(code)
        .unwrap()
        .run(b"", &RunOptions::default().starting_at(at))
        .unwrap()
}

// =============================================================================
// FRONT END FUZZ TESTS
// =============================================================================

proptest! {
    /// The scanner returns a result for any input
    #[test]
    fn scanner_never_panics(source in arbitrary_source_string()) {
        let _ = Scanner::new(&source).scan_tokens();
    }

    /// The parser returns a result for any token sequence
    #[test]
    fn parser_never_panics(source in token_soup()) {
        if let Ok(tokens) = Scanner::new(&source).scan_tokens() {
            let _ = SourceParser::new(tokens).parse();
        }
    }

    /// Deep parenthesization parses
    #[test]
    fn parser_handles_deep_nesting(depth in 1usize..60) {
        let source = format!("{}1 + 2{}", "(".repeat(depth), ")".repeat(depth));
        let tokens = Scanner::new(&source).scan_tokens().unwrap();
        prop_assert!(SourceParser::new(tokens).parse_standalone_expression().is_ok());
    }
}

// =============================================================================
// CODE GENERATION PROPERTIES
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Setting a cell reaches the target from any previous value, restores
    /// the scratch cell and never costs more than a plain run
    #[test]
    fn value_set_is_exact(previous in any::<u8>(), target in any::<u8>()) {
        let change = set_cell_value(target as i64, previous as i64, true);
        let code = format!("{}{}", "+".repeat(previous as usize), change.as_str());
        let result = run_at(&code, 0);

        prop_assert_eq!(result.tape[0], target);
        prop_assert_eq!(result.tape.get(1).copied().unwrap_or(0), 0);
        prop_assert_eq!(result.head, 0);

        let delta = target.wrapping_sub(previous) as usize;
        prop_assert!(change.instruction_count() <= delta.min(256 - delta));
    }

    /// Division and modulo agree with integer arithmetic for every nonzero divisor
    #[test]
    fn divmod_matches_integer_arithmetic(a in any::<u8>(), b in 1u8..=255) {
        let quotient = lower_expression_at(&format!("{} / {}", a, b), 0).unwrap();
        prop_assert_eq!(run_at(quotient.as_str(), 0).tape[0], a / b);

        let remainder = lower_expression_at(&format!("{} % {}", a, b), 0).unwrap();
        prop_assert_eq!(run_at(remainder.as_str(), 0).tape[0], a % b);
    }

    /// An expression lowered at any offset computes its value there, ends one
    /// cell right and never touches a cell below it
    #[test]
    fn expression_fragment_is_local((source, value) in byte_expression(), at in 0usize..24) {
        let code = lower_expression_at(&source, at).unwrap();
        let result = run_at(code.as_str(), at);

        prop_assert_eq!(result.tape[at], value, "{}", source);
        prop_assert_eq!(result.head, at + 1);
        prop_assert!(result.lowest_cell >= at);
    }

    /// Leaving a scope returns every cell it claimed
    #[test]
    fn scope_exit_rolls_back(
        outer in 0usize..16,
        sizes in prop::collection::vec(1usize..20, 0..8),
    ) {
        let span = Span::new(1, 1);
        let mut frames = FrameAllocator::new();
        frames
            .declare(Variable::new("outer", ElementType::Int, vec![outer.max(1)]), span)
            .unwrap();
        let before = frames.current_offset();

        frames.enter_scope();
        for (i, size) in sizes.iter().enumerate() {
            let var = frames
                .declare(Variable::new(format!("v{}", i), ElementType::Int, vec![*size]), span)
                .unwrap();
            prop_assert!(var.cell() >= before);
        }
        let claimed = frames.exit_scope();

        prop_assert_eq!(claimed, sizes.iter().sum::<usize>());
        prop_assert_eq!(frames.current_offset(), before);
        prop_assert!(frames.lookup("outer", span).is_ok());
        prop_assert!(sizes.is_empty() || frames.lookup("v0", span).is_err());
    }
}
