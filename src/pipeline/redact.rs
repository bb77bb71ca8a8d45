//! Scrub outward-facing error messages.
//!
//! Configured credentials, bearer tokens, URLs with embedded userinfo and
//! key-shaped tokens are masked, as is the absolute form of each configured
//! directory, before a message leaves the pipeline.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::config::Secret;

static URL_WITH_CREDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(https?://)[^:@\s/]+:[^@\s/]+@").expect("valid URL credential pattern")
});

static BEARER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(bearer\s+)\S+").expect("valid bearer pattern"));

static SK_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bsk-[A-Za-z0-9_-]{8,}").expect("valid sk- key pattern"));

/// 32+ alphanumerics with no separators.  Only masked when letters and
/// digits are mixed, so identifiers like `TransformSquareToCircle_…` or
/// `create_rotating_polygon_with_labels` survive.
static LONG_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9]{32,}\b").expect("valid token pattern"));

const KEY_MASK: &str = "[REDACTED_KEY]";

#[derive(Debug, Clone, Default)]
pub struct Redactor {
    /// Resolved at redaction time: directories usually do not exist yet
    /// when the pipeline is built.
    roots: Vec<(PathBuf, String)>,
    secrets: Vec<Secret>,
}

impl Redactor {
    /// Mask each `(dir, label)` root wherever its absolute path appears.
    pub fn new<'a>(roots: impl IntoIterator<Item = (&'a Path, &'a str)>) -> Self {
        Self {
            roots: roots
                .into_iter()
                .map(|(dir, label)| (dir.to_path_buf(), label.to_string()))
                .collect(),
            secrets: Vec::new(),
        }
    }

    /// Also mask these exact credential values.
    pub fn with_secrets<'a>(mut self, secrets: impl IntoIterator<Item = &'a Secret>) -> Self {
        self.secrets
            .extend(secrets.into_iter().filter(|s| !s.is_blank()).cloned());
        self
    }

    pub fn redact(&self, message: &str) -> String {
        let mut text = message.to_string();
        for secret in &self.secrets {
            text = text.replace(secret.expose().trim(), KEY_MASK);
        }
        for (path, label) in self.resolved_roots() {
            text = text.replace(path.as_str(), &label);
        }
        let text = URL_WITH_CREDS.replace_all(&text, "$1[REDACTED]@");
        let text = BEARER.replace_all(&text, "${1}[REDACTED]");
        let text = SK_KEY.replace_all(&text, KEY_MASK);
        LONG_TOKEN
            .replace_all(&text, |caps: &Captures| {
                let token = &caps[0];
                if looks_like_key(token) {
                    KEY_MASK.to_string()
                } else {
                    token.to_string()
                }
            })
            .into_owned()
    }

    /// `(absolute path text, label)`, longest path first.
    fn resolved_roots(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = Vec::new();
        for (dir, label) in &self.roots {
            for form in absolute_forms(dir) {
                if !out.iter().any(|(p, _)| *p == form) {
                    out.push((form, label.clone()));
                }
            }
        }
        out.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        out
    }
}

fn looks_like_key(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit()) && token.chars().any(|c| c.is_ascii_alphabetic())
}

fn absolute_forms(dir: &Path) -> Vec<String> {
    let mut forms = Vec::new();
    if let Ok(canonical) = dir.canonicalize() {
        forms.push(canonical.to_string_lossy().into_owned());
    }
    if dir.is_absolute() {
        forms.push(dir.to_string_lossy().into_owned());
    } else if let Ok(cwd) = std::env::current_dir() {
        forms.push(cwd.join(dir).to_string_lossy().into_owned());
    }
    // A bare "/" or empty string would shred every message.
    forms.retain(|f| f.len() > 1);
    forms
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn masks_keys_and_credentials() {
        let r = Redactor::default();
        let msg = "auth failed for sk-abcdef123456 via https://user:pw@api.example.com \
                   with Authorization: Bearer tok.en";
        let out = r.redact(msg);
        assert!(!out.contains("sk-abcdef123456"));
        assert!(!out.contains("user:pw"));
        assert!(!out.contains("tok.en"));
        assert!(out.contains("[REDACTED_KEY]"));
        assert!(out.contains("https://[REDACTED]@api.example.com"));
    }

    #[test]
    fn long_tokens_keep_surrounding_text() {
        let key = "a1B2c3D4".repeat(5);
        let out = Redactor::default().redact(&format!("key={key}; retry"));
        assert_eq!(out, "key=[REDACTED_KEY]; retry");
    }

    #[test]
    fn configured_secrets_are_masked_verbatim() {
        let secret = Secret::new("plainwordsecret");
        let r = Redactor::default().with_secrets([&secret, &Secret::new("  ")]);
        assert_eq!(r.redact("rejected key plainwordsecret"), "rejected key [REDACTED_KEY]");
        assert_eq!(r.redact("nothing here"), "nothing here");
    }

    #[test]
    fn long_identifiers_survive() {
        let r = Redactor::default();
        for msg in [
            "renderer reported success but no output video was found for \
             TransformSquareToCircle_1760912345678_3",
            "NameError: name 'create_rotating_polygon_with_labels' is not defined",
            "no scene named TransformSquareIntoCircleWithLabelsScene",
        ] {
            assert_eq!(r.redact(msg), msg);
        }
    }

    #[test]
    fn ordinary_messages_pass_through() {
        let msg = "renderer exited with status 1: NameError: name 'Circl' is not defined";
        assert_eq!(Redactor::default().redact(msg), msg);
    }

    #[test]
    fn masks_directory_roots() {
        let dir = tempdir().unwrap();
        let scratch = dir.path().join("temp");
        std::fs::create_dir_all(&scratch).unwrap();
        let r = Redactor::new([(scratch.as_path(), "<scratch>")]);

        let abs = scratch.canonicalize().unwrap().join("manim_temp_1_1.py");
        let msg = format!("File \"{}\", line 3", abs.display());
        let out = r.redact(&msg);
        assert!(out.starts_with("File \"<scratch>"), "{out}");
        assert!(out.contains("manim_temp_1_1.py"));
    }

    #[cfg(unix)]
    #[test]
    fn roots_created_later_resolve_through_symlinks() {
        let dir = tempdir().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir(&real).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let scratch = link.join("temp");
        let r = Redactor::new([(scratch.as_path(), "<scratch>")]);
        std::fs::create_dir(&scratch).unwrap();

        let canonical = scratch.canonicalize().unwrap().join("manim_temp_1_1.py");
        let out = r.redact(&format!("File \"{}\"", canonical.display()));
        assert_eq!(out, "File \"<scratch>/manim_temp_1_1.py\"");
    }
}
