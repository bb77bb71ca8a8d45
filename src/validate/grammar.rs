//! Full-grammar syntax check.
//!
//! The hand-written passes in [`lexer`](super::lexer), [`blocks`](super::blocks)
//! and [`scene`](super::scene) only look at statement structure.  Acceptance
//! needs the whole Python grammar, expressions included, so the source is
//! first run through `rustpython-parser`.  Nothing is executed.

use rustpython_parser::{ast, Parse};

use super::lexer::SyntaxIssue;

const SOURCE_PATH: &str = "<generated>";

/// Parse `source` as a Python module, discarding the tree.
pub fn check_syntax(source: &str) -> Result<(), SyntaxIssue> {
    ast::Suite::parse(source, SOURCE_PATH)
        .map(|_| ())
        .map_err(|e| {
            let offset = usize::from(e.offset).min(source.len());
            SyntaxIssue::new(line_of(source, offset), e.error.to_string())
        })
}

/// 1-based line containing byte `offset`.
fn line_of(source: &str, offset: usize) -> usize {
    source.as_bytes()[..offset]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_with_body(body: &str) -> String {
        format!("class A(Scene):\n    def construct(self):\n        {body}\n")
    }

    #[test]
    fn accepts_full_expressions() {
        let src = scene_with_body(
            "self.play(*[FadeIn(m, shift=UP * 0.5) for m in (a, b) if m], run_time=2)",
        );
        assert!(check_syntax(&src).is_ok());
        assert!(check_syntax("x = lambda v: {k: v for k in range(3)}\n").is_ok());
    }

    #[test]
    fn rejects_expression_level_errors() {
        for body in ["x = = 1", "self.play(Create(Circle()) +)", "return return"] {
            let err = check_syntax(&scene_with_body(body)).unwrap_err();
            assert_eq!(err.line, 3, "body: {body}");
        }
    }

    #[test]
    fn line_counts_from_one() {
        assert_eq!(line_of("a\nb\nc", 0), 1);
        assert_eq!(line_of("a\nb\nc", 4), 3);
    }
}
