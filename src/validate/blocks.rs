//! Indentation and compound-statement checks over logical lines.

use super::lexer::{LogicalLine, SyntaxIssue};

/// Keywords that may introduce an indented block.
const BLOCK_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "for", "while", "try", "except", "finally", "with", "def", "class",
    "async", "match", "case",
];

/// Hard keywords whose statement is always compound and therefore must
/// contain a `:` somewhere at bracket depth zero.
const COLON_REQUIRED: &[&str] = &[
    "if", "elif", "else", "for", "while", "try", "except", "finally", "with", "def", "class",
];

/// Verify the block structure of `lines`.
///
/// Rejects unexpected indents, inconsistent dedents, block headers that are
/// not followed by an indented body, and `:`-terminated lines that do not
/// start with a compound keyword.
pub fn check_blocks(lines: &[LogicalLine]) -> Result<(), SyntaxIssue> {
    let mut stack: Vec<usize> = vec![0];
    let mut pending_header: Option<usize> = None;

    for line in lines {
        let top = stack.last().copied().unwrap_or(0);

        if let Some(header_line) = pending_header.take() {
            if line.indent <= top {
                return Err(SyntaxIssue::new(
                    line.number,
                    format!("expected an indented block after line {header_line}"),
                ));
            }
            stack.push(line.indent);
        } else if line.indent > top {
            return Err(SyntaxIssue::new(line.number, "unexpected indent"));
        } else if line.indent < top {
            while stack.last().is_some_and(|&w| w > line.indent) {
                stack.pop();
            }
            if stack.last().copied() != Some(line.indent) {
                return Err(SyntaxIssue::new(
                    line.number,
                    "unindent does not match any outer indentation level",
                ));
            }
        }

        let keyword = line.first_word();
        if COLON_REQUIRED.contains(&keyword) && !has_top_level_colon(&line.text) {
            return Err(SyntaxIssue::new(line.number, "expected ':'"));
        }

        if line.text.ends_with(':') {
            if !BLOCK_KEYWORDS.contains(&keyword) {
                return Err(SyntaxIssue::new(line.number, "invalid syntax"));
            }
            pending_header = Some(line.number);
        }
    }

    if let Some(header_line) = pending_header {
        return Err(SyntaxIssue::new(
            header_line,
            format!("expected an indented block after line {header_line}"),
        ));
    }

    Ok(())
}

/// `true` when `text` contains a `:` outside any brackets.
pub(crate) fn has_top_level_colon(text: &str) -> bool {
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::lexer::logical_lines;

    fn check(src: &str) -> Result<(), SyntaxIssue> {
        check_blocks(&logical_lines(src).unwrap())
    }

    #[test]
    fn accepts_nested_blocks() {
        let src = "\
class A:
    def f(self):
        if True:
            pass
        else:
            return 1
    x = 2
y = 3
";
        assert!(check(src).is_ok());
    }

    #[test]
    fn accepts_inline_body() {
        assert!(check("if x: pass\nclass A: pass\n").is_ok());
    }

    #[test]
    fn rejects_unexpected_indent() {
        let err = check("x = 1\n    y = 2\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.message, "unexpected indent");
    }

    #[test]
    fn rejects_missing_block() {
        let err = check("def f():\nreturn 1\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("expected an indented block"));
    }

    #[test]
    fn rejects_header_at_end_of_file() {
        let err = check("x = 1\nwhile True:\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn rejects_inconsistent_dedent() {
        let err = check("if x:\n        a = 1\n    b = 2\n").unwrap_err();
        assert!(err.message.contains("unindent"));
    }

    #[test]
    fn rejects_missing_colon() {
        let err = check("class A(Scene)\n    pass\n").unwrap_err();
        assert_eq!(err.message, "expected ':'");
    }

    #[test]
    fn rejects_colon_line_without_keyword() {
        let err = check("hello world:\n    pass\n").unwrap_err();
        assert_eq!(err.message, "invalid syntax");
    }

    #[test]
    fn slice_colon_is_not_top_level() {
        assert!(!has_top_level_colon("x = a[1:2]"));
        assert!(has_top_level_colon("for i in a[1:2]: pass"));
    }
}
