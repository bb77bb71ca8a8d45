//! Declaration parser for the subset of Python that generated scenes use.
//!
//! Grammar handled (on logical lines produced by the lexer):
//!
//! ```text
//! class_header := "class" NAME [ "(" base ("," base)* [","] ")" ] ":" [inline-body]
//! base         := dotted-name [ "[" ... "]" ] | NAME "=" expr      (keywords ignored)
//! def_header   := ["async"] "def" NAME "(" ... ")" [ "->" expr ] ":" [inline-body]
//! ```
//!
//! Methods of a class are the `def` headers sitting exactly at the first
//! indentation level of the class body.

use super::blocks::has_top_level_colon;
use super::lexer::{is_ident_char, logical_lines, LogicalLine, SyntaxIssue};

/// Entry point used when the source declares no scene class.
pub const DEFAULT_ENTRY_POINT: &str = "MyScene";

/// Method the renderer invokes on the scene.
pub const ENTRY_METHOD: &str = "construct";

/// A parsed `class` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    pub name: String,
    /// Base expressions as written, keyword arguments removed.
    pub bases: Vec<String>,
    /// Line of the `class` header.
    pub line: usize,
    /// Names of methods defined directly in the class body.
    pub methods: Vec<String>,
}

impl ClassDecl {
    /// `true` when one of the bases names a scene type.
    pub fn is_scene(&self) -> bool {
        self.bases.iter().any(|b| is_scene_base(b))
    }

    pub fn defines(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == method)
    }
}

/// `Scene`, `ThreeDScene`, `manim.MovingCameraScene`, `Scene[T]` …
pub fn is_scene_base(base: &str) -> bool {
    let base = base.split('[').next().unwrap_or(base).trim();
    let last = base.rsplit('.').next().unwrap_or(base);
    last.ends_with("Scene")
}

/// Parse every class declaration in `lines`, validating each `class` and
/// `def` header along the way.
pub fn parse_declarations(lines: &[LogicalLine]) -> Result<Vec<ClassDecl>, SyntaxIssue> {
    let mut classes = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        match line.first_word() {
            "class" => {
                let (name, bases) = parse_class_header(line)?;
                let methods = collect_methods(&lines[idx + 1..], line.indent)?;
                classes.push(ClassDecl {
                    name,
                    bases,
                    line: line.number,
                    methods,
                });
            }
            "def" | "async" => {
                def_name(line)?;
            }
            _ => {}
        }
    }

    Ok(classes)
}

/// Resolve the render entry point for `source`.
///
/// Prefers the first scene class that defines `construct`, then the first
/// scene class at all, then [`DEFAULT_ENTRY_POINT`].  Source that does not
/// lex resolves to the default.
pub fn entry_point(source: &str) -> String {
    let Ok(lines) = logical_lines(source) else {
        return DEFAULT_ENTRY_POINT.to_string();
    };
    let Ok(classes) = parse_declarations(&lines) else {
        return DEFAULT_ENTRY_POINT.to_string();
    };
    select_entry_point(&classes)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| DEFAULT_ENTRY_POINT.to_string())
}

pub(crate) fn select_entry_point(classes: &[ClassDecl]) -> Option<&ClassDecl> {
    classes
        .iter()
        .find(|c| c.is_scene() && c.defines(ENTRY_METHOD))
        .or_else(|| classes.iter().find(|c| c.is_scene()))
}

fn parse_identifier(s: &str) -> Option<(&str, &str)> {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c == '_' || c.is_alphabetic() => {}
        _ => return None,
    }
    let end = chars
        .find(|(_, c)| !is_ident_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    Some((&s[..end], &s[end..]))
}

fn parse_class_header(line: &LogicalLine) -> Result<(String, Vec<String>), SyntaxIssue> {
    let invalid = || SyntaxIssue::new(line.number, "invalid class declaration");

    let rest = line.text["class".len()..].trim_start();
    let (name, rest) = parse_identifier(rest).ok_or_else(invalid)?;
    let rest = rest.trim_start();

    let (bases, rest) = if let Some(inner) = rest.strip_prefix('(') {
        let close = matching_paren(inner).ok_or_else(invalid)?;
        (split_bases(&inner[..close]), inner[close + 1..].trim_start())
    } else {
        (Vec::new(), rest)
    };

    if !rest.starts_with(':') {
        return Err(SyntaxIssue::new(line.number, "expected ':'"));
    }
    Ok((name.to_string(), bases))
}

fn def_name(line: &LogicalLine) -> Result<String, SyntaxIssue> {
    let invalid = || SyntaxIssue::new(line.number, "invalid function definition");

    let mut rest = line.text.as_str();
    if let Some(after_async) = rest.strip_prefix("async") {
        rest = after_async.trim_start();
        if !rest.starts_with("def") {
            // `async for` / `async with`
            return Ok(String::new());
        }
    }
    let rest = rest["def".len()..].trim_start();
    let (name, rest) = parse_identifier(rest).ok_or_else(invalid)?;
    let inner = rest.trim_start().strip_prefix('(').ok_or_else(invalid)?;
    let close = matching_paren(inner).ok_or_else(invalid)?;
    if !has_top_level_colon(&inner[close + 1..]) {
        return Err(SyntaxIssue::new(line.number, "expected ':'"));
    }
    Ok(name.to_string())
}

fn collect_methods(body: &[LogicalLine], class_indent: usize) -> Result<Vec<String>, SyntaxIssue> {
    let Some(first) = body.first().filter(|l| l.indent > class_indent) else {
        return Ok(Vec::new());
    };
    let level = first.indent;

    let mut methods = Vec::new();
    for line in body.iter().take_while(|l| l.indent > class_indent) {
        if line.indent == level && matches!(line.first_word(), "def" | "async") {
            let name = def_name(line)?;
            if !name.is_empty() {
                methods.push(name);
            }
        }
    }
    Ok(methods)
}

/// Index of the `)` closing an already-opened `(` in `s`.
fn matching_paren(s: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth -= 1;
                if depth == 0 {
                    return if c == ')' { Some(i) } else { None };
                }
            }
            _ => {}
        }
    }
    None
}

fn split_bases(list: &str) -> Vec<String> {
    let mut bases = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in list.chars() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                push_base(&mut bases, &current);
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    push_base(&mut bases, &current);
    bases
}

fn push_base(bases: &mut Vec<String>, raw: &str) {
    let raw = raw.trim();
    // keyword arguments such as `metaclass=Meta`
    if raw.is_empty() || raw.contains('=') {
        return;
    }
    bases.push(raw.to_string());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(src: &str) -> Vec<ClassDecl> {
        parse_declarations(&logical_lines(src).unwrap()).unwrap()
    }

    #[test]
    fn parses_scene_class_with_methods() {
        let src = "\
from manim import *

class Intro(Scene):
    def construct(self):
        self.play(Write(Text(\"hi\")))

    def helper(self, x: int) -> int:
        def inner():
            pass
        return x
";
        let decls = classes(src);
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "Intro");
        assert_eq!(decls[0].bases, vec!["Scene"]);
        assert_eq!(decls[0].methods, vec!["construct", "helper"]);
        assert!(decls[0].is_scene());
    }

    #[test]
    fn recognises_scene_family_bases() {
        assert!(is_scene_base("Scene"));
        assert!(is_scene_base("ThreeDScene"));
        assert!(is_scene_base("manim.MovingCameraScene"));
        assert!(!is_scene_base("Mobject"));
        assert!(!is_scene_base("SceneHelper"));
    }

    #[test]
    fn ignores_keyword_bases() {
        let decls = classes("class A(Base, metaclass=Meta):\n    pass\n");
        assert_eq!(decls[0].bases, vec!["Base"]);
    }

    #[test]
    fn class_without_bases() {
        let decls = classes("class Plain:\n    x = 1\n");
        assert!(decls[0].bases.is_empty());
        assert!(!decls[0].is_scene());
    }

    #[test]
    fn rejects_malformed_class_header() {
        let lines = logical_lines("class 1Bad(Scene):\n    pass\n").unwrap();
        let err = parse_declarations(&lines).unwrap_err();
        assert_eq!(err.message, "invalid class declaration");
    }

    #[test]
    fn rejects_malformed_def_header() {
        let lines = logical_lines("def broken:\n    pass\n").unwrap();
        let err = parse_declarations(&lines).unwrap_err();
        assert_eq!(err.message, "invalid function definition");
    }

    #[test]
    fn entry_point_prefers_scene_with_construct() {
        let src = "\
class Helper(Scene):
    pass

class Main(ThreeDScene):
    def construct(self):
        pass
";
        assert_eq!(entry_point(src), "Main");
    }

    #[test]
    fn entry_point_falls_back_to_default() {
        assert_eq!(entry_point("x = 1\n"), DEFAULT_ENTRY_POINT);
        assert_eq!(entry_point("class Foo(Bar):\n    pass\n"), DEFAULT_ENTRY_POINT);
        assert_eq!(entry_point("print('unterminated\n"), DEFAULT_ENTRY_POINT);
    }

    #[test]
    fn async_for_is_not_a_method() {
        let src = "\
class A(Scene):
    async def construct(self):
        async for x in y:
            pass
";
        assert_eq!(classes(src)[0].methods, vec!["construct"]);
    }
}
