//! Log redaction for identifiers and key material.
//!
//! Every formatted log line passes through [`SanitizingMakeWriter`] before
//! it reaches the sink. Redacted categories:
//! - assessment ids (UUIDs)
//! - record numbers and contact details
//! - signing seeds and verifying keys (base64/hex with a key-like label)
//!
//! Clinical values are never logged by the application; this layer is the
//! backstop for anything that slips through in error messages.
//!
//! Input longer than `NEPHRO_SANITIZE_MAX_BYTES` (default 16 KiB) is cut at
//! a character boundary and tagged `[TRUNCATED]`.

use std::io::Write;
use std::sync::OnceLock;

use regex::{Regex, RegexSet};
use tracing_subscriber::fmt::MakeWriter;

const DEFAULT_MAX_BYTES: usize = 16 * 1024;
const TRUNCATED_TAG: &str = " [TRUNCATED]";

/// (pattern, replacement), applied in order.
const RULES: &[(&str, &str)] = &[
    (
        r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b",
        "[REDACTED-ID]",
    ),
    (r"(?i)\bMRN[:#\s]?\s*\d{6,10}\b", "[REDACTED-MRN]"),
    (
        r"(?i)\b[a-z0-9][a-z0-9._%+-]{0,63}@(?:[a-z0-9-]{1,63}\.)+[a-z]{2,}\b",
        "[REDACTED-EMAIL]",
    ),
    (
        r"\b(?:\+?\d{1,3}[-.\s])?\(?\d{3}\)?[-.\s]\d{3}[-.\s]\d{4}\b",
        "[REDACTED-PHONE]",
    ),
    (
        r"(?i)\b(?:seed|secret|private[_-]?key|pubkey|public[_-]?key|signature|sig|key)\b\s*[:=]\s*(?:[A-Za-z0-9+/]{32,}={0,2}|[0-9a-fA-F]{32,})",
        "[REDACTED-KEY]",
    ),
    (r"\b[0-9a-fA-F]{40,}\b", "[REDACTED-HEX]"),
];

struct Redactor {
    any: RegexSet,
    rules: Vec<(Regex, &'static str)>,
}

impl Redactor {
    fn get() -> &'static Self {
        static REDACTOR: OnceLock<Redactor> = OnceLock::new();
        REDACTOR.get_or_init(|| {
            let any = RegexSet::new(RULES.iter().map(|(p, _)| *p)).expect("static patterns");
            let rules = RULES
                .iter()
                .map(|(p, r)| (Regex::new(p).expect("static pattern"), *r))
                .collect();
            Self { any, rules }
        })
    }

    fn redact(&self, text: &str) -> String {
        let hits = self.any.matches(text);
        if !hits.matched_any() {
            return text.to_string();
        }
        let mut out = text.to_string();
        for idx in hits.iter() {
            let (regex, replacement) = &self.rules[idx];
            out = regex.replace_all(&out, *replacement).into_owned();
        }
        out
    }
}

fn max_bytes() -> usize {
    std::env::var("NEPHRO_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_MAX_BYTES)
}

fn cut(input: &str, limit: usize) -> Option<&str> {
    if input.len() <= limit {
        return None;
    }
    let mut end = limit;
    while !input.is_char_boundary(end) {
        end -= 1;
    }
    Some(&input[..end])
}

/// Redact identifiers and key material from `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_bytes())
}

fn sanitize_with_limit(input: &str, limit: usize) -> String {
    match cut(input, limit) {
        Some(prefix) => {
            let mut out = Redactor::get().redact(prefix);
            out.push_str(TRUNCATED_TAG);
            out
        }
        None => Redactor::get().redact(input),
    }
}

/// Whether `input` contains anything [`sanitize`] would redact.
#[must_use]
pub fn contains_pii(input: &str) -> bool {
    let limit = max_bytes();
    let text = cut(input, limit).unwrap_or(input);
    Redactor::get().any.is_match(text)
}

/// `MakeWriter` wrapper that redacts each formatted line.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter {
            inner: self.inner.make_writer(),
            pending: Vec::new(),
        }
    }
}

/// Line-buffering writer produced by [`SanitizingMakeWriter`].
pub struct SanitizingWriter<W: Write> {
    inner: W,
    pending: Vec<u8>,
}

impl<W: Write> SanitizingWriter<W> {
    fn emit(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let text = String::from_utf8_lossy(bytes);
        self.inner.write_all(sanitize(&text).as_bytes())
    }

    fn drain_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.emit(&line)?;
        }
        Ok(())
    }
}

impl<W: Write> Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.drain_lines()?;

        // A single line with no newline must not grow without bound.
        if self.pending.len() > max_bytes().saturating_mul(2) {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest)?;
            self.inner.write_all(b"\n")?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.drain_lines()?;
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest)?;
        }
        self.inner.flush()
    }
}

impl<W: Write> Drop for SanitizingWriter<W> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_redacts_assessment_id() {
        let out = sanitize("assessment 550e8400-e29b-41d4-a716-446655440000 stored");
        assert_eq!(out, "assessment [REDACTED-ID] stored");
    }

    #[test]
    fn test_redacts_contact_details() {
        let out = sanitize("contact nurse@clinic.example.org or 555-123-4567");
        assert!(out.contains("[REDACTED-EMAIL]"));
        assert!(out.contains("[REDACTED-PHONE]"));
        assert!(!out.contains("clinic.example"));
    }

    #[test]
    fn test_redacts_mrn() {
        assert!(sanitize("MRN: 12345678").contains("[REDACTED-MRN]"));
    }

    #[test]
    fn test_redacts_labelled_key_material() {
        let out = sanitize("seed=QWxhZGRpbjpvcGVuIHNlc2FtZSB3aXRoIGxvbmcgc2VjcmV0IHZhbHVl");
        assert!(out.contains("[REDACTED-KEY]"));
        assert!(!out.contains("QWxhZGRp"));

        let digest = "a".repeat(64);
        assert!(sanitize(&format!("sha256 {digest}")).contains("[REDACTED-HEX]"));
    }

    #[test]
    fn test_clinical_log_lines_pass_through() {
        let line = "Assessment complete (risk_code=2, classes=3)";
        assert_eq!(sanitize(line), line);
        assert!(!contains_pii(line));
    }

    #[test]
    fn test_truncates_at_char_boundary() {
        let out = sanitize_with_limit("αβγδεζ", 5);
        assert_eq!(out, format!("αβ{TRUNCATED_TAG}"));
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("lock").extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Capture;
        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_writer_redacts_split_writes() {
        let sink = Capture::default();
        let make = SanitizingMakeWriter::new(sink.clone());
        {
            let mut w = make.make_writer();
            w.write_all(b"id 550e8400-e29b-41d4-").expect("write");
            w.write_all(b"a716-446655440000 done\ntail").expect("write");
        }
        let written = String::from_utf8(sink.0.lock().expect("lock").clone()).expect("utf8");
        assert_eq!(written, "id [REDACTED-ID] done\ntail");
    }
}
