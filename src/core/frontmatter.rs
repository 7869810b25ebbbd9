//! Minimal front-matter extraction for article documents.
//!
//! A document may open with a header block delimited by two lines containing
//! exactly `---`. The block is scanned line by line for `key: value` pairs;
//! anything else inside it is ignored. This is not a YAML parser: nested
//! structures, lists and multi-line values are not supported and will either
//! be skipped or captured as their literal first line.
//!
//! Extraction never fails. A header that is opened but never closed degrades
//! to "no metadata, whole input is body" and is reported through
//! [`ExtractOutcome::Unterminated`] so callers can log it.
use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

const DELIMITER: &str = "---";

/// Value of the `show` key that hides an article.
pub const HIDDEN_MARKER: &str = "false";

static KEY_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+):\s*(.*)$").expect("front-matter key/value pattern is valid"));

/// Flat string-to-string metadata read from a document header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    entries: BTreeMap<String, String>,
}

impl FrontMatter {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// An article is hidden only when `show` is the exact string `false`.
    /// `False`, `0`, `no` and an absent key all leave it visible.
    pub fn is_hidden(&self) -> bool {
        self.get("show") == Some(HIDDEN_MARKER)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FrontMatter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// How the header region of a document was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// A complete header block was found and scanned.
    Parsed,
    /// The document does not start with a delimiter line.
    Absent,
    /// An opening delimiter was found without a matching closing line.
    Unterminated,
}

/// Result of [`extract`]: metadata plus the remaining body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction<'a> {
    pub metadata: FrontMatter,
    pub body: &'a str,
    pub outcome: ExtractOutcome,
}

impl<'a> Extraction<'a> {
    fn fallback(text: &'a str, outcome: ExtractOutcome) -> Self {
        Self {
            metadata: FrontMatter::default(),
            body: text,
            outcome,
        }
    }
}

fn is_delimiter(line: &str) -> bool {
    line.strip_suffix('\r').unwrap_or(line) == DELIMITER
}

/// Split `text` into front matter and body.
pub fn extract(text: &str) -> Extraction<'_> {
    let mut lines = text.split_inclusive('\n');

    match lines.next() {
        Some(first) if is_delimiter(first.trim_end_matches('\n')) => {}
        _ => return Extraction::fallback(text, ExtractOutcome::Absent),
    }

    let header_start = text.find('\n').map_or(text.len(), |i| i + 1);
    let mut offset = header_start;

    for line in lines {
        let line_end = offset + line.len();
        if is_delimiter(line.trim_end_matches('\n')) {
            let header = &text[header_start..offset];
            return Extraction {
                metadata: parse_header(header),
                body: text[line_end..].trim(),
                outcome: ExtractOutcome::Parsed,
            };
        }
        offset = line_end;
    }

    Extraction::fallback(text, ExtractOutcome::Unterminated)
}

/// Scan a header block for `key: value` lines.
pub fn parse_header(block: &str) -> FrontMatter {
    block
        .lines()
        .filter_map(|line| {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let caps = KEY_VALUE.captures(line)?;
            let key = caps.get(1)?.as_str().to_string();
            let value = unquote(caps.get(2)?.as_str().trim()).to_string();
            Some((key, value))
        })
        .collect()
}

/// Remove one layer of matching single or double quotes.
fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_header_and_body() {
        let text = "---\ntitle: Hello\ndate: 2024-05-01\n---\n\n# Heading\n\nBody text.\n";
        let extraction = extract(text);

        assert_eq!(extraction.outcome, ExtractOutcome::Parsed);
        assert_eq!(extraction.metadata.get("title"), Some("Hello"));
        assert_eq!(extraction.metadata.get("date"), Some("2024-05-01"));
        assert_eq!(extraction.metadata.len(), 2);
        assert_eq!(extraction.body, "# Heading\n\nBody text.");
    }

    #[test]
    fn test_no_header_leaves_text_untouched() {
        let text = "# Just markdown\n\ntitle: not metadata\n";
        let extraction = extract(text);

        assert_eq!(extraction.outcome, ExtractOutcome::Absent);
        assert!(extraction.metadata.is_empty());
        assert_eq!(extraction.body, text);
    }

    #[test]
    fn test_unterminated_header_falls_back() {
        let text = "---\ntitle: Broken\nno closing line here\n";
        let extraction = extract(text);

        assert_eq!(extraction.outcome, ExtractOutcome::Unterminated);
        assert!(extraction.metadata.is_empty());
        assert_eq!(extraction.body, text);
    }

    #[test]
    fn test_delimiter_must_be_exact() {
        let text = "--- \ntitle: x\n---\nbody";
        assert_eq!(extract(text).outcome, ExtractOutcome::Absent);

        let text = " ---\ntitle: x\n---\nbody";
        assert_eq!(extract(text).outcome, ExtractOutcome::Absent);
    }

    #[test]
    fn test_crlf_documents() {
        let text = "---\r\ntitle: Windows\r\n---\r\nBody\r\n";
        let extraction = extract(text);

        assert_eq!(extraction.outcome, ExtractOutcome::Parsed);
        assert_eq!(extraction.metadata.get("title"), Some("Windows"));
        assert_eq!(extraction.body, "Body");
    }

    #[test]
    fn test_empty_header_block() {
        let extraction = extract("---\n---\nbody");
        assert_eq!(extraction.outcome, ExtractOutcome::Parsed);
        assert!(extraction.metadata.is_empty());
        assert_eq!(extraction.body, "body");
    }

    #[test]
    fn test_quote_stripping() {
        let fm = parse_header("a: \"hello\"\nb: 'hello'\nc: \"mixed'\nd: it's \"fine\"\ne: \"\"");
        assert_eq!(fm.get("a"), Some("hello"));
        assert_eq!(fm.get("b"), Some("hello"));
        assert_eq!(fm.get("c"), Some("\"mixed'"));
        assert_eq!(fm.get("d"), Some("it's \"fine\""));
        assert_eq!(fm.get("e"), Some(""));
    }

    #[test]
    fn test_only_one_layer_of_quotes_removed() {
        let fm = parse_header("title: \"'nested'\"");
        assert_eq!(fm.get("title"), Some("'nested'"));
    }

    #[test]
    fn test_non_matching_lines_are_ignored() {
        let fm = parse_header("tags:\n  - rust\n  - web\n# comment\nnot a pair\nkey-with-dash: x\ntitle: ok");
        assert_eq!(fm.get("tags"), Some(""));
        assert_eq!(fm.get("title"), Some("ok"));
        assert_eq!(fm.get("key-with-dash"), None);
        assert_eq!(fm.len(), 2);
    }

    #[test]
    fn test_value_keeps_inner_colons() {
        let fm = parse_header("url: https://example.com/a:b");
        assert_eq!(fm.get("url"), Some("https://example.com/a:b"));
    }

    #[test]
    fn test_visibility_is_exact_string_match() {
        let hidden: FrontMatter = [("show", "false")].into_iter().collect();
        assert!(hidden.is_hidden());

        for value in ["true", "False", "0", "no", ""] {
            let fm: FrontMatter = [("show", value)].into_iter().collect();
            assert!(!fm.is_hidden(), "show: {value:?} must stay visible");
        }

        assert!(!FrontMatter::default().is_hidden());
    }

    #[test]
    fn test_quoted_false_hides() {
        let extraction = extract("---\nshow: \"false\"\n---\n");
        assert!(extraction.metadata.is_hidden());
    }
}
