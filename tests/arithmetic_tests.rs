/// Arithmetic, comparison and I/O built-ins, compiled and run end to end
use bfit::{CompileOptions, Compiler, Interpreter, RunOptions};

fn run_with(source: &str, input: &[u8], optimize: bool) -> Vec<u8> {
    let compiled = Compiler::new(CompileOptions {
        optimize,
        ..CompileOptions::default()
    })
    .compile(source)
    .unwrap();
    Interpreter::new(&compiled.code)
        .unwrap()
        .run(input, &RunOptions::default())
        .unwrap()
        .output
}

fn run_main(body: &str) -> Vec<u8> {
    let source = format!("void main() {{ {} }}", body);
    let optimized = run_with(&source, b"", true);
    let plain = run_with(&source, b"", false);
    assert_eq!(optimized, plain, "folding changed the output of {}", body);
    optimized
}

#[test]
fn test_wrapping_arithmetic() {
    assert_eq!(run_main("printint(200 + 100);"), b"44");
    assert_eq!(run_main("printint(3 - 5);"), b"254");
    assert_eq!(run_main("int a = 16; int b = 17; printint(a * b);"), b"16");
    assert_eq!(run_main("int a = 255; a++; printint(a);"), b"0");
}

#[test]
fn test_division_and_modulo() {
    assert_eq!(run_main("int a = 100; int b = 7; printint(a / b); printint(a % b);"), b"142");
    assert_eq!(run_main("int a = 6; int b = 9; printint(a / b); printint(a % b);"), b"06");
    assert_eq!(run_main("int a = 255; printint(a / 1); printint(a % 16);"), b"25515");
}

#[test]
fn test_comparisons_are_unsigned() {
    let body = "int a = 3; int b = 250;
                printint(a < b); printint(a > b); printint(a <= 3);
                printint(b >= 251); printint(a == 3); printint(a != 3);";
    assert_eq!(run_main(body), b"101010");
}

#[test]
fn test_logical_operators() {
    assert_eq!(run_main("printint(!0); printint(2 && 3); printint(0 || 0);"), b"110");
    assert_eq!(run_main("int a = 4; printint(a > 2 && a < 9); printint(a == 1 || a == 4);"), b"11");
}

#[test]
fn test_bitwise_operators() {
    let body = "int a = 200; int b = 3;
                printint(a >> b); printint(b << 5); printint(a & 15); printint(a ^ 255);";
    assert_eq!(run_main(body), b"2596855");
}

#[test]
fn test_literals() {
    assert_eq!(run_main("printint(0x1F);"), b"31");
    assert_eq!(run_main("printchar('A' + 2);"), b"C");
    assert_eq!(run_main("printint(true + true);"), b"2");
    assert_eq!(run_main("print(\"tab\\there\\n\");"), b"tab\there\n");
}

#[test]
fn test_compound_assignment() {
    let body = "int a = 10; a += 5; a -= 3; a *= 2; a /= 4; a %= 4; a <<= 3; a |= 1; a ^= 3; printint(a);";
    // 10 +5 =15, -3 =12, *2 =24, /4 =6, %4 =2, <<3 =16, |1 =17, ^3 =18
    assert_eq!(run_main(body), b"18");
}

#[test]
fn test_read_and_print_builtins() {
    let source = "void main() { int x = readint(); int y = readint(); printint(x + y); }";
    assert_eq!(run_with(source, b"12\n30\n", true), b"42");

    let source = "void main() { int c = readchar(); printchar(c + 1); }";
    assert_eq!(run_with(source, b"a", true), b"b");
}

#[test]
fn test_readchar_at_end_of_input_is_zero() {
    let source = "void main() { int c = readchar(); printint(c); }";
    assert_eq!(run_with(source, b"", true), b"0");
}

#[test]
fn test_fizzbuzz() {
    let source = r#"
        void main() {
            for (int i = 1; i <= 15; i++) {
                if (i % 15 == 0) print("FizzBuzz");
                else if (i % 3 == 0) print("Fizz");
                else if (i % 5 == 0) print("Buzz");
                else printint(i);
            }
        }
    "#;
    assert_eq!(
        run_with(source, b"", true),
        b"12Fizz4BuzzFizz78FizzBuzz11Fizz1314FizzBuzz"
    );
}
