//! Pull the code payload out of a model's free-form answer.

const FENCE: &str = "```";
const PYTHON_FENCE: &str = "```python";

/// Extract code from `raw`.
///
/// Prefers a block opened with ```` ```python ````, then any fenced block
/// (its info string, if any, is skipped).  Without a closed fence the whole
/// answer is returned trimmed.
pub fn extract_code(raw: &str) -> String {
    if let Some(code) = fenced_after(raw, PYTHON_FENCE, false) {
        log::debug!("extract: python fence, {} -> {} chars", raw.len(), code.len());
        return code;
    }
    if let Some(code) = fenced_after(raw, FENCE, true) {
        log::debug!("extract: generic fence, {} -> {} chars", raw.len(), code.len());
        return code;
    }
    log::debug!("extract: no fence, returning whole answer");
    raw.trim().to_string()
}

fn fenced_after(raw: &str, opener: &str, skip_info: bool) -> Option<String> {
    let start = raw.find(opener)? + opener.len();
    let mut body = &raw[start..];
    if skip_info {
        // "```py\n..." or "```\n...": drop the rest of the opening line.
        if let Some(nl) = body.find('\n') {
            if !body[..nl].trim().contains(char::is_whitespace) {
                body = &body[nl + 1..];
            }
        }
    }
    let end = body.find(FENCE)?;
    Some(body[..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_python_fence() {
        assert_eq!(extract_code("Here:\n```python\nprint(1)\n```\nDone"), "print(1)");
    }

    #[test]
    fn no_fence_returns_trimmed_input() {
        assert_eq!(extract_code("  x = 1\ny = 2\n "), "x = 1\ny = 2");
    }

    #[test]
    fn python_fence_preferred_over_earlier_generic_fence() {
        let raw = "```\nshell stuff\n```\nand\n```python\nclass A: pass\n```";
        assert_eq!(extract_code(raw), "class A: pass");
    }

    #[test]
    fn generic_fence_skips_info_string() {
        assert_eq!(extract_code("```py\nprint(2)\n```"), "print(2)");
        assert_eq!(extract_code("```\nprint(3)\n```"), "print(3)");
    }

    #[test]
    fn unclosed_fence_falls_back_to_whole_text() {
        assert_eq!(extract_code("```python\nprint(1)"), "```python\nprint(1)");
    }
}
