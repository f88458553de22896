//! Log sanitization for unpublished sequence data.
//!
//! Sequences typed into the form may belong to structures that are not yet
//! deposited. Formatted log lines pass through `SanitizingMakeWriter`, which
//! redacts:
//! - `sequence=...` / `sequence: ...` key/value pairs
//! - FASTA records (`>header` followed by residue lines)
//! - bare runs of 20 or more one-letter residue codes
//!
//! The primary protection is still to never log the sequence; this writer
//! catches what slips through.
//!
//! Input is capped per call (`XTALCLASS_SANITIZE_MAX_BYTES`, default 16 KiB)
//! so a single enormous line cannot stall the logging thread.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

static SEQUENCE_PATTERNS: OnceLock<SequencePatterns> = OnceLock::new();

const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

/// Shortest bare residue run treated as a sequence. Long enough to leave class
/// labels such as OXIDOREDUCTASE alone.
const MIN_RESIDUE_RUN: usize = 20;

struct Redaction {
    regex: Regex,
    replacement: &'static str,
}

struct SequencePatterns {
    set: RegexSet,
    redactions: Vec<Redaction>,
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }

    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn max_sanitize_bytes() -> usize {
    std::env::var("XTALCLASS_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

fn get_patterns() -> &'static SequencePatterns {
    SEQUENCE_PATTERNS.get_or_init(|| {
        // Order matters: key/value and FASTA forms are replaced before bare runs.
        let rules: Vec<(String, &'static str)> = vec![
            (
                r#"(?i)\bsequence\b\s*[:=]\s*"?[^",\s}]+"?"#.to_string(),
                "sequence=[REDACTED-SEQUENCE]",
            ),
            (
                r"(?m)^>[^\n]*\n(?:[A-Za-z*\-]+\n?)+".to_string(),
                "[REDACTED-FASTA]\n",
            ),
            (
                format!(r"\b[ACDEFGHIKLMNPQRSTVWYBXZUO]{{{MIN_RESIDUE_RUN},}}\b"),
                "[REDACTED-SEQUENCE]",
            ),
        ];

        let set = RegexSet::new(rules.iter().map(|(p, _)| p.as_str())).expect("Valid regex set");
        let redactions = rules
            .into_iter()
            .map(|(pattern, replacement)| Redaction {
                regex: Regex::new(&pattern).expect("Valid regex"),
                replacement,
            })
            .collect();

        SequencePatterns { set, redactions }
    })
}

/// Redact sequence data from a string.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = get_patterns();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();
    for idx in patterns.set.matches(prefix).into_iter() {
        let redaction = &patterns.redactions[idx];
        result = redaction
            .regex
            .replace_all(&result, redaction.replacement)
            .into_owned();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
        if input.ends_with('\n') {
            result.push('\n');
        }
    }
    result
}

/// Check if a string looks like it carries sequence data.
#[must_use]
pub fn contains_sequence(input: &str) -> bool {
    let (prefix, _) = truncate_to_char_boundary(input, max_sanitize_bytes());
    get_patterns().set.is_match(prefix)
}

/// A `tracing_subscriber` writer wrapper that sanitizes each formatted log line
/// before it reaches the underlying sink.
#[derive(Debug)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<M: Clone> Clone for SanitizingMakeWriter<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Line-buffering writer produced by `SanitizingMakeWriter`.
pub struct SanitizingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }

    fn write_sanitized(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let text = String::from_utf8_lossy(bytes);
        if text.len() <= max_sanitize_bytes() && !contains_sequence(&text) {
            return self.inner.write_all(text.as_bytes());
        }
        self.inner.write_all(sanitize(&text).as_bytes())
    }

    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.write_sanitized(&line)?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // A line without newline that keeps growing is flushed as-is (sanitize caps it).
        let hard_cap = max_sanitize_bytes().saturating_mul(2);
        if self.buffer.len() > hard_cap {
            let pending = std::mem::take(&mut self.buffer);
            self.write_sanitized(&pending)?;
            self.inner.write_all(b"\n")?;
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;
        if !self.buffer.is_empty() {
            let pending = std::mem::take(&mut self.buffer);
            self.write_sanitized(&pending)?;
        }
        self.inner.flush()
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LYSOZYME: &str = "KVFGRCELAAAMKRHGLDNYRGYSLGNWVCAAKFESNFNTQATNRNTDGSTDYGILQINSRWWCNDGRTPGSRNLCNIPCSALLSSDITASVNCAKKIVSDGNGMNAWVAWRNRCKGTDVQAWIRGCRL";

    #[test]
    fn test_sanitize_bare_sequence() {
        let input = format!("submitted {LYSOZYME} for prediction");
        let sanitized = sanitize(&input);
        assert!(sanitized.contains("[REDACTED-SEQUENCE]"));
        assert!(!sanitized.contains("KVFGRCELAAAM"));
    }

    #[test]
    fn test_sanitize_key_value_sequence() {
        let sanitized = sanitize("encode failed sequence=\"MKT\" chainId=Z");
        assert!(sanitized.contains("sequence=[REDACTED-SEQUENCE]"));
        assert!(sanitized.contains("chainId=Z"));
        assert!(!sanitized.contains("MKT"));
    }

    #[test]
    fn test_sanitize_fasta_record() {
        let input = format!(">1LYZ:A|PDBID|CHAIN|SEQUENCE\n{LYSOZYME}\n");
        let sanitized = sanitize(&input);
        assert!(sanitized.contains("[REDACTED-FASTA]"));
        assert!(!sanitized.contains("1LYZ"));
    }

    #[test]
    fn test_class_labels_and_columns_survive() {
        let line = "Predicted OXIDOREDUCTASE via classifier (crystallizationMethod=Batch)";
        assert_eq!(sanitize(line), line);
        assert!(!contains_sequence(line));
        assert!(contains_sequence(LYSOZYME));
    }

    #[test]
    fn test_sanitize_truncates_large_inputs() {
        let sanitized = sanitize_with_limit("résumé of a long line", 2);
        assert!(sanitized.ends_with("[TRUNCATED]"));
    }

    #[test]
    fn test_truncation_keeps_line_break() {
        let sanitized = sanitize_with_limit("first log line that is long\n", 16);
        assert_eq!(sanitized, "first log line t [TRUNCATED]\n");

        let second = sanitize_with_limit("second\n", 16);
        assert_eq!(format!("{sanitized}{second}").lines().count(), 2);
    }

    #[test]
    fn test_writer_passes_clean_lines_through() {
        let mut out = Vec::new();
        {
            let mut writer = SanitizingWriter::new(&mut out);
            writeln!(writer, "Prediction complete: code=0, label=HYDROLASE").expect("write");
            writeln!(writer, "got {LYSOZYME}").expect("write");
        }
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(
            text,
            "Prediction complete: code=0, label=HYDROLASE\ngot [REDACTED-SEQUENCE]\n"
        );
    }

    #[test]
    fn test_writer_sanitizes_per_line() {
        let mut out = Vec::new();
        {
            let mut writer = SanitizingWriter::new(&mut out);
            write!(writer, "first {LYSOZYME}").expect("write");
            writeln!(writer, " end").expect("write");
            writer.flush().expect("flush");
        }
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text, "first [REDACTED-SEQUENCE] end\n");
    }
}
