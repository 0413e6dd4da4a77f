/// Arrays, structs and their initializers, with constant and runtime indices
use bfit::{CompileOptions, Compiler, Error, Interpreter, RunOptions};

fn run(source: &str) -> Vec<u8> {
    let compiled = Compiler::new(CompileOptions::default())
        .compile(source)
        .unwrap();
    Interpreter::new(&compiled.code)
        .unwrap()
        .run(b"", &RunOptions::default())
        .unwrap()
        .output
}

fn run_main(body: &str) -> Vec<u8> {
    run(&format!("void main() {{ {} }}", body))
}

#[test]
fn test_runtime_index_read_and_write() {
    let body = "int a[5];
                for (int i = 0; i < 5; i++) a[i] = i * i;
                int i = 5;
                while (i) { i--; printint(a[i]); }";
    assert_eq!(run_main(body), b"169410");
}

#[test]
fn test_runtime_index_update() {
    let body = "int hist[4];
                int data[6] = {1, 3, 1, 0, 1, 3};
                for (int i = 0; i < 6; i++) hist[data[i]]++;
                for (int i = 0; i < 4; i++) printint(hist[i]);";
    assert_eq!(run_main(body), b"1302");
}

#[test]
fn test_two_dimensional_arrays() {
    let body = "int m[3][3];
                for (int i = 0; i < 3; i++) { for (int j = 0; j < 3; j++) m[i][j] = i * 3 + j; }
                printint(m[2][1]); printint(m[1][2]);
                int j = 2; printint(m[0][j]);";
    assert_eq!(run_main(body), b"752");
}

#[test]
fn test_nested_brace_initializer() {
    let body = "int t[2][3] = {{1, 2}, {4, 5, 6}};
                printint(t[0][2]); printint(t[1][0]); printint(t[4]);";
    assert_eq!(run_main(body), b"045");
}

#[test]
fn test_string_initializer_is_zero_terminated() {
    let body = "int s[8] = \"hello\";
                int i = 0;
                while (s[i]) { printchar(s[i]); i++; }
                printint(i);";
    assert_eq!(run_main(body), b"hello5");
}

#[test]
fn test_whole_array_assignment() {
    let body = "int a[3] = {1, 1, 1}; a = {7, 8}; printint(a[0] + a[1] + a[2]);
                a = \"hi\"; printchar(a[0]); printchar(a[1]); printint(a[2]);";
    assert_eq!(run_main(body), b"15hi0");
}

#[test]
fn test_struct_fields() {
    let source = "struct Point { int x; int y; };
                  void main() {
                      struct Point p;
                      p.x = 3; p.y = 4;
                      printint(p.x * p.x + p.y * p.y);
                      struct Point q = {5, 6};
                      printint(q.y - q.x);
                  }";
    assert_eq!(run(source), b"251");
}

#[test]
fn test_array_of_structs_with_runtime_index() {
    let source = "struct Point { int x; int y; };
                  void main() {
                      struct Point ps[3];
                      for (int i = 0; i < 3; i++) { ps[i].x = i; ps[i].y = i * 10; }
                      int sum = 0;
                      for (int i = 0; i < 3; i++) sum += ps[i].x + ps[i].y;
                      printint(sum);
                  }";
    assert_eq!(run(source), b"33");
}

#[test]
fn test_nested_struct_with_array_field() {
    let source = "struct Buf { int len; int data[4]; };
                  struct Pair { struct Buf left; struct Buf right; };
                  void main() {
                      struct Pair pair;
                      for (int i = 0; i < 4; i++) { pair.left.data[i] = i + 1; pair.right.data[i] = 10; }
                      pair.left.len = 4;
                      int total = 0;
                      for (int i = 0; i < pair.left.len; i++) total += pair.left.data[i] * pair.right.data[i];
                      printint(total);
                  }";
    assert_eq!(run(source), b"100");
}

#[test]
fn test_global_table_lookup() {
    let source = "int table[4] = {10, 20, 30, 40};
                  void main() { int i = 3; printint(table[i]); table[i - 2] = 1; printint(table[1]); }";
    assert_eq!(run(source), b"401");
}

#[test]
fn test_constant_index_out_of_bounds() {
    let result = Compiler::new(CompileOptions::default())
        .compile("void main() { int a[4]; a[2 + 2] = 1; }");
    match result {
        Err(Error::SemanticError { message, .. }) => assert!(message.contains("out of bounds")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_too_many_initial_values() {
    let result = Compiler::new(CompileOptions::default())
        .compile("void main() { int a[2] = {1, 2, 3}; }");
    assert!(matches!(result, Err(Error::SemanticError { .. })));
}

#[test]
fn test_large_array_runtime_index_warns() {
    let compiled = Compiler::new(CompileOptions::default())
        .compile("void main() { int big[300]; int i = 1; big[i] = 2; }")
        .unwrap();
    assert_eq!(compiled.warnings.len(), 1);
    assert!(compiled.warnings[0].message.contains("big"));
}
