//! # rugo-preproc
//!
//! The rugo preprocessor: a multi-pass, line-level rewriter that turns
//! surface syntax into the canonical form the parser understands, while
//! keeping a [`LineMap`] from every output line back to the original
//! source line.
//!
//! # Pass order
//!
//! ```text
//! raw text
//!   1. heredoc expansion          (heredoc)
//!   2. comment strip              (strip)
//!   3. user-semicolon rejection   (strip)
//!   4. trailing-comma rejection   (strip)
//!   5. hash colon-shorthand       (strip)
//!   6. compound assignment        (sugar)
//!   7. destructuring              (sugar)
//!   8. def-parens normalization   (sugar)
//!   9. postfix if                 (sugar)
//!  10. backtick expansion         (sugar)
//!  11. do/end → fn                (blocks)
//!  12. try sugar                  (blocks)
//!  13. spawn one-liner            (blocks)
//!  14. inline-fn expansion        (blocks)
//!  15. line classification        (lines)  ← shell fallback, pipes
//!  16. struct lowering            (structs)
//!  17. bare append                (sugar)
//!  18. separator insertion        (sugar)
//! canonical text + line map + struct descriptors
//! ```
//!
//! The try/spawn one-liners (12, 13) are rewritten before `do`/`end`
//! matching (11) executes so every block head is already canonical when
//! `end`s are counted; the emitted text is identical either way.
//!
//! # Line-map discipline
//!
//! Internally the text is a vector of [`Line`]s, each carrying the 1-based
//! original line it came from. A pass that expands one line into many
//! stamps every new line with the source line's origin; a pass that drops
//! lines simply drops them. The final map is read off the vector, so the
//! discipline cannot be violated by forgetting a bookkeeping call.
//!
//! # Example
//!
//! ```
//! let out = rugo_preproc::preprocess("demo.rugo", "x = try conv.to_i(\"4\") or 0\n").unwrap();
//! assert!(out.text.contains("or _err"));
//! assert_eq!(out.line_map.lookup(0), 1);
//! ```

pub mod keywords;
pub mod scan;

mod blocks;
mod heredoc;
mod lines;
mod strip;
mod structs;
mod sugar;

use rugo_base::{LineMap, Result, StructDescriptor};

/// One line of working text with its original 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub orig: u32,
}

/// Everything the preprocessor produces for one source file.
#[derive(Debug, Clone)]
pub struct PreprocessOutput {
    /// Canonical text, newline-terminated.
    pub text: String,
    /// Maps 0-based canonical lines to 1-based original lines.
    pub line_map: LineMap,
    /// Structs lowered out of the file.
    pub structs: Vec<StructDescriptor>,
}

/// Runs every pass over `raw` and returns the canonical form.
///
/// `path` is used verbatim in diagnostics.
pub fn preprocess(path: &str, raw: &str) -> Result<PreprocessOutput> {
    let lines: Vec<Line> = raw
        .lines()
        .enumerate()
        .map(|(i, text)| Line {
            text: text.to_string(),
            orig: i as u32 + 1,
        })
        .collect();

    let lines = heredoc::expand_heredocs(lines, path)?;
    let lines = strip::strip_comments(lines, path)?;
    strip::reject_user_semicolons(&lines, path)?;
    strip::reject_trailing_commas(&lines, path)?;
    let lines = strip::colon_shorthand(lines, path)?;
    let lines = sugar::expand_compound_assign(lines);
    let mut destructure_counter = 0;
    let lines = sugar::expand_destructuring(lines, &mut destructure_counter);
    let lines = sugar::normalize_def_parens(lines, path)?;
    let lines = sugar::expand_postfix_if(lines);
    let lines = sugar::expand_backticks(lines);
    let lines = blocks::expand_try_sugar(lines, path)?;
    let lines = blocks::expand_spawn_oneliner(lines);
    let lines = blocks::expand_do_end(lines, path)?;
    let lines = blocks::expand_inline_fn(lines);
    let lines = lines::classify_lines(lines, path)?;
    let (lines, structs) = structs::lower_structs(lines, path)?;
    let lines = sugar::rewrite_bare_append(lines);
    let lines = sugar::insert_separators(lines);

    let mut text = String::new();
    let mut line_map = LineMap::new();
    for line in &lines {
        text.push_str(&line.text);
        text.push('\n');
        line_map.push(line.orig);
    }
    debug_assert!(line_map.is_monotone());
    log::debug!(
        "{}: preprocessed {} raw lines into {} canonical lines",
        path,
        raw.lines().count(),
        line_map.len()
    );

    Ok(PreprocessOutput {
        text,
        line_map,
        structs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pp(src: &str) -> PreprocessOutput {
        preprocess("test.rugo", src).unwrap()
    }

    #[test]
    fn shell_fallback_end_to_end() {
        let out = pp("ls -la\n");
        assert_eq!(out.text, "__shell(\"ls -la\")\n");
        assert_eq!(out.line_map.lookup(0), 1);
    }

    #[test]
    fn try_fallback_end_to_end() {
        let out = pp("use \"conv\"\nx = try conv.to_i(\"abc\") or 0\nputs x\n");
        let lines: Vec<&str> = out.text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "use \"conv\"",
                "x = try",
                "  conv.to_i(\"abc\")",
                "or _err",
                "  0",
                "end",
                "puts(x)"
            ]
        );
        // Every expanded line points at original line 2.
        for i in 1..=5 {
            assert_eq!(out.line_map.lookup(i), 2);
        }
        assert_eq!(out.line_map.lookup(6), 3);
    }

    #[test]
    fn struct_scenario_end_to_end() {
        let src = "struct Dog\n  name\nend\ndef Dog.bark()\n  return self.name + \" woof\"\nend\nd = Dog(\"Rex\")\nputs(d.bark())\n";
        let out = pp(src);
        assert!(out.text.contains("def Dog(name)"));
        assert!(out.text.contains("\"__type__\" => \"Dog\""));
        assert!(out.text.contains("def bark(self)"));
        assert_eq!(out.structs.len(), 1);
        assert_eq!(out.structs[0].methods, vec!["bark"]);
    }

    #[test]
    fn parallel_error_scenario_preprocesses() {
        let src = "try parallel\n  1\n  raise \"boom\"\nend or err\n  puts err\nend\n";
        let out = pp(src);
        let lines: Vec<&str> = out.text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "try",
                "parallel",
                "  1",
                "  raise(\"boom\")",
                "end",
                "or err",
                "  puts(err)",
                "end"
            ]
        );
    }

    #[test]
    fn preprocessor_idempotent_modulo_separators() {
        let src = "x = 5\nputs x if x > 1\nh = {a: 1}\n";
        let once = pp(src);
        let stripped: String = once
            .text
            .lines()
            .map(|l| l.replace(';', ""))
            .collect::<Vec<_>>()
            .join("\n")
            + "\n";
        let twice = preprocess("test.rugo", &stripped).unwrap();
        let strip_again: String = twice
            .text
            .lines()
            .map(|l| l.replace(';', ""))
            .collect::<Vec<_>>()
            .join("\n")
            + "\n";
        assert_eq!(stripped, strip_again);
    }

    #[test]
    fn line_map_covers_every_output_line() {
        let src = "a = 1\n# comment\nb = a + 1 if a > 0\n";
        let out = pp(src);
        assert_eq!(out.line_map.len(), out.text.lines().count());
        assert!(out.line_map.is_monotone());
        // Postfix-if expansion lines all come from line 3.
        let count_from_3 = out.line_map.iter().filter(|&(_, o)| o == 3).count();
        assert_eq!(count_from_3, 3);
    }

    #[test]
    fn heredoc_then_shell_still_classifies() {
        let src = "msg = <<~EOS\n  hello\nEOS\necho #{msg}\n";
        let out = pp(src);
        assert!(out.text.contains("msg = \"hello\""));
        assert!(out.text.contains("__shell(\"echo #{msg}\")"));
    }
}
