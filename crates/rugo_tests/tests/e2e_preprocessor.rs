//! E2E: preprocessor properties across whole programs.

mod common;

use common::preprocess;
use rugo_base::LineMap;
use rugo_language::parse_program;

#[test]
fn every_output_line_has_a_map_entry() {
    let src = "\
# a comment
msg = <<~EOS
  hello
  world
EOS
puts msg if msg != \"\"
h = {a: 1, b: 2}
xs = [1, 2, 3]
total = 0
for x in xs
  total += x
end
";
    let out = preprocess(src);
    assert_eq!(out.line_map.len(), out.text.lines().count());
    assert!(out.line_map.is_monotone());
    let total_lines = src.lines().count() as u32;
    for (_, orig) in out.line_map.iter() {
        assert!(orig >= 1 && orig <= total_lines);
    }
}

#[test]
fn expansion_lines_share_the_source_line() {
    let src = "a = 1\nputs a if a > 0\n";
    let out = preprocess(src);
    // The postfix-if expands into three lines, all mapping to line 2.
    let from_line_2 = out.line_map.iter().filter(|&(_, o)| o == 2).count();
    assert_eq!(from_line_2, 3);
}

#[test]
fn parsed_statement_lines_stay_within_source() {
    let src = "x = try conv_like() or 0\nputs x\n";
    let out = preprocess(src);
    let program = parse_program("test.rugo", &out.text, &out.line_map).unwrap();
    for stmt in &program.stmts {
        assert!(stmt.line() >= 1);
        assert!(stmt.line() <= src.lines().count() as u32);
    }
}

#[test]
fn colon_shorthand_is_idempotent() {
    let once = preprocess("h = {name: \"x\", n: 2}\n");
    let twice = preprocess(&once.text);
    assert_eq!(once.text, twice.text);
}

#[test]
fn strip_comments_twice_is_noop() {
    let once = preprocess("a = 1 # one\nb = 2\n");
    let twice = preprocess(&once.text);
    assert_eq!(once.text, twice.text);
}

#[test]
fn shell_fallback_scenario() {
    let out = preprocess("ls -la\n");
    assert_eq!(out.text.trim(), "__shell(\"ls -la\")");
}

#[test]
fn destructuring_shares_origin_line() {
    let out = preprocess("a, b, f = parts()\n");
    assert!(out.text.contains("__destr0 = parts()"));
    assert!(out.text.contains("a = __destr0[0]"));
    assert!(out.text.contains("f = __destr0[2]"));
    for (_, orig) in out.line_map.iter() {
        assert_eq!(orig, 1);
    }
}

#[test]
fn struct_lowering_produces_tagged_constructor() {
    let src = "struct Dog\n  name\nend\nd = Dog(\"Rex\")\n";
    let out = preprocess(src);
    assert!(out.text.contains("def Dog(name)"));
    assert!(out
        .text
        .contains("return {\"__type__\" => \"Dog\", \"name\" => name}"));
    assert_eq!(out.structs[0].name, "Dog");
    assert_eq!(out.structs[0].fields, vec!["name"]);
}

#[test]
fn preprocessor_failures_carry_original_lines() {
    let err = rugo_preproc::preprocess("t.rugo", "ok = 1\nx = \"unterminated\n").unwrap_err();
    assert_eq!(err.line, 2);

    let err = rugo_preproc::preprocess("t.rugo", "a = 1; b = 2\n").unwrap_err();
    assert_eq!(err.line, 1);

    let err = rugo_preproc::preprocess("t.rugo", "h = {1: \"x\"}\n").unwrap_err();
    assert!(err.to_string().contains("=>"));
}

#[test]
fn identity_map_survives_plain_programs() {
    let src = "a = 1\nb = 2\nputs(a)\n";
    let out = preprocess(src);
    let expected = LineMap::identity(3);
    assert_eq!(out.line_map, expected);
}
