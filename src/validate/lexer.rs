//! Line-structure lexer for generated Python source.
//!
//! This is not a full tokenizer.  It understands exactly as much of Python's
//! lexical grammar as is needed to split a file into *logical lines*:
//!
//! * string literals of any prefix, single or triple quoted, with escapes;
//! * `#` comments;
//! * bracket nesting across physical lines (`()`, `[]`, `{}`);
//! * explicit `\` line continuations.
//!
//! Each [`LogicalLine`] carries the indentation width of its first physical
//! line and its text with comments removed and string contents collapsed to
//! `""`, so later passes can look at keywords, colons and brackets without
//! being fooled by quoted text.

use thiserror::Error;

/// Tab stops follow CPython's tokenizer.
const TAB_WIDTH: usize = 8;

/// A complete Python statement line (possibly spanning several physical
/// lines).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// 1-based number of the physical line the statement starts on.
    pub number: usize,
    /// Indentation width in columns (tabs expanded to multiples of 8).
    pub indent: usize,
    /// Statement text, trimmed, comments stripped, strings collapsed.
    pub text: String,
}

impl LogicalLine {
    /// The leading identifier of the statement (`"class"`, `"def"`, `"x"` …).
    pub fn first_word(&self) -> &str {
        let end = self
            .text
            .char_indices()
            .find(|(_, c)| !is_ident_char(*c))
            .map(|(i, _)| i)
            .unwrap_or(self.text.len());
        &self.text[..end]
    }
}

/// A structural error located at a physical line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct SyntaxIssue {
    pub line: usize,
    pub message: String,
}

impl SyntaxIssue {
    pub(crate) fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn closing_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Split `source` into logical lines, rejecting unterminated strings,
/// unbalanced brackets and stray continuation characters.
pub fn logical_lines(source: &str) -> Result<Vec<LogicalLine>, SyntaxIssue> {
    let normalized = source.replace("\r\n", "\n");
    let chars: Vec<char> = normalized.chars().collect();
    let n = chars.len();

    let mut lines = Vec::new();
    let mut text = String::new();
    let mut brackets: Vec<(char, usize)> = Vec::new();
    let mut line = 1;
    let mut start_line = 1;
    let mut indent = 0;
    let mut continued = false;
    let mut at_line_start = true;
    let mut i = 0;

    while i < n {
        if at_line_start {
            let mut width = 0;
            while i < n && matches!(chars[i], ' ' | '\t' | '\x0c') {
                width = match chars[i] {
                    '\t' => (width / TAB_WIDTH + 1) * TAB_WIDTH,
                    '\x0c' => 0,
                    _ => width + 1,
                };
                i += 1;
            }
            at_line_start = false;
            if brackets.is_empty() && text.trim().is_empty() {
                indent = width;
                start_line = line;
            }
            continue;
        }

        let c = chars[i];
        match c {
            '#' => {
                while i < n && chars[i] != '\n' {
                    i += 1;
                }
            }
            '\n' => {
                if brackets.is_empty() && !continued {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        lines.push(LogicalLine {
                            number: start_line,
                            indent,
                            text: trimmed.to_string(),
                        });
                    }
                    text.clear();
                } else {
                    text.push(' ');
                }
                continued = false;
                at_line_start = true;
                line += 1;
                i += 1;
            }
            '\\' => {
                if i + 1 < n && chars[i + 1] == '\n' {
                    continued = true;
                    i += 1;
                } else {
                    return Err(SyntaxIssue::new(
                        line,
                        "unexpected character after line continuation character",
                    ));
                }
            }
            '\'' | '"' => {
                i = skip_string(&chars, i, &mut line)?;
                text.push_str("\"\"");
            }
            '(' | '[' | '{' => {
                brackets.push((c, line));
                text.push(c);
                i += 1;
            }
            ')' | ']' | '}' => {
                match brackets.pop() {
                    Some((open, _)) if closing_for(open) == c => {}
                    Some((open, _)) => {
                        return Err(SyntaxIssue::new(
                            line,
                            format!("closing parenthesis '{c}' does not match opening parenthesis '{open}'"),
                        ));
                    }
                    None => {
                        return Err(SyntaxIssue::new(line, format!("unmatched '{c}'")));
                    }
                }
                text.push(c);
                i += 1;
            }
            _ => {
                text.push(c);
                i += 1;
            }
        }
    }

    if let Some((open, opened_at)) = brackets.last() {
        return Err(SyntaxIssue::new(
            *opened_at,
            format!("'{open}' was never closed"),
        ));
    }
    if continued {
        return Err(SyntaxIssue::new(line, "unexpected EOF after line continuation"));
    }
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        lines.push(LogicalLine {
            number: start_line,
            indent,
            text: trimmed.to_string(),
        });
    }

    Ok(lines)
}

/// Skip the string literal whose opening quote is at `start`; returns the
/// index just past the closing quote.
fn skip_string(chars: &[char], start: usize, line: &mut usize) -> Result<usize, SyntaxIssue> {
    let quote = chars[start];
    let opened_at = *line;
    let triple = start + 2 < chars.len() && chars[start + 1] == quote && chars[start + 2] == quote;
    let mut i = start + if triple { 3 } else { 1 };

    loop {
        if i >= chars.len() {
            let what = if triple {
                "unterminated triple-quoted string literal"
            } else {
                "unterminated string literal"
            };
            return Err(SyntaxIssue::new(opened_at, what));
        }
        match chars[i] {
            '\\' => {
                if i + 1 < chars.len() && chars[i + 1] == '\n' {
                    *line += 1;
                }
                i += 2;
            }
            '\n' => {
                if !triple {
                    return Err(SyntaxIssue::new(opened_at, "unterminated string literal"));
                }
                *line += 1;
                i += 1;
            }
            c if c == quote => {
                if !triple {
                    return Ok(i + 1);
                }
                if i + 2 < chars.len() && chars[i + 1] == quote && chars[i + 2] == quote {
                    return Ok(i + 3);
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(src: &str) -> Vec<String> {
        logical_lines(src)
            .unwrap()
            .into_iter()
            .map(|l| l.text)
            .collect()
    }

    #[test]
    fn splits_simple_statements() {
        let lines = logical_lines("x = 1\n\n# comment\ny = 2\n").unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[1].number, 4);
        assert_eq!(lines[1].text, "y = 2");
    }

    #[test]
    fn records_indentation_with_tabs() {
        let lines = logical_lines("if x:\n\tpass\n").unwrap();
        assert_eq!(lines[1].indent, 8);
    }

    #[test]
    fn joins_bracketed_continuation() {
        let lines = logical_lines("f(a,\n  b)\nz = 3\n").unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "f(a, b)");
        assert_eq!(lines[1].number, 3);
    }

    #[test]
    fn joins_backslash_continuation() {
        assert_eq!(texts("x = 1 + \\\n    2\n"), vec!["x = 1 +  2"]);
    }

    #[test]
    fn collapses_strings_and_comments() {
        assert_eq!(
            texts("print('a: # b')  # trailing: comment\n"),
            vec!["print(\"\")"]
        );
    }

    #[test]
    fn triple_quoted_strings_span_lines() {
        let lines = logical_lines("s = \"\"\"one\ntwo ' \"\n\"\"\"\nt = 1\n").unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].number, 4);
    }

    #[test]
    fn escaped_quote_does_not_close_string() {
        assert_eq!(texts("s = 'it\\'s'\n"), vec!["s = \"\""]);
    }

    #[test]
    fn rejects_unterminated_string() {
        let err = logical_lines("x = 'oops\ny = 2\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn rejects_unterminated_triple_string() {
        let err = logical_lines("x = \"\"\"never closed\n").unwrap_err();
        assert!(err.message.contains("triple-quoted"));
    }

    #[test]
    fn rejects_unclosed_bracket() {
        let err = logical_lines("foo(1,\n2\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("never closed"));
    }

    #[test]
    fn rejects_mismatched_bracket() {
        let err = logical_lines("foo(1]\n").unwrap_err();
        assert!(err.message.contains("does not match"));
    }

    #[test]
    fn rejects_stray_closing_bracket() {
        let err = logical_lines("x = 1)\n").unwrap_err();
        assert_eq!(err.message, "unmatched ')'");
    }

    #[test]
    fn rejects_garbage_after_backslash() {
        let err = logical_lines("x = 1 \\ 2\n").unwrap_err();
        assert!(err.message.contains("continuation"));
    }

    #[test]
    fn first_word_stops_at_punctuation() {
        let lines = logical_lines("class A(Scene):\n    pass\n").unwrap();
        assert_eq!(lines[0].first_word(), "class");
        assert_eq!(lines[1].first_word(), "pass");
    }
}
