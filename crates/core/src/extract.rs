use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::field::Field;
use crate::record::FieldRecord;

// ── Patterns ──────────────────────────────────────────────────────────────────
//
// Applied to the whitespace-joined OCR text. Every pattern takes the leftmost
// match. `CERTIFICATE_ID_PATTERN` accepts a bare "ID" anchor, so the first
// ID-like token on the page wins even when a later "Certificate ID" exists.

pub const ROLL_NO_PATTERN: &str = r"(?i)(?:Roll\s*Number|Roll\s*No)\s*[:\s]*(\S+)";
pub const CERTIFICATE_ID_PATTERN: &str = r"(?i)(?:Certificate\s*ID|Cert\s*ID|ID\s*)\s*[:\s]*(\S+)";
pub const GRADE_PATTERN: &str = r"(?i)(?:Grade\s*[-\s:]*|with\s*Grade\s*[-\s:]*)\s*(\S)";
pub const COURSE_PATTERN: &str = r"(?is)completed the course of\s*(.*?)\s*(?:authorized by|with Grade)";
pub const COURSE_QUALIFIER_PATTERN: &str =
    r"(?i)(?:an\s+online\s+non-credit\s+course|a\s+non-credit\s+course)";
pub const COURSE_FALLBACK_PATTERN: &str = r"(?i)course of\s*([A-Z0-9\s]+)";

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_roll_no, ROLL_NO_PATTERN);
re!(re_certificate_id, CERTIFICATE_ID_PATTERN);
re!(re_grade, GRADE_PATTERN);
re!(re_course, COURSE_PATTERN);
re!(re_course_qualifier, COURSE_QUALIFIER_PATTERN);
re!(re_course_fallback, COURSE_FALLBACK_PATTERN);

// ── Keyword sets ──────────────────────────────────────────────────────────────

pub const ISSUER_KEYWORDS: &[&str] = &["Institute", "University", "Technology"];
pub const ISSUER_CONTINUATION_MARKERS: &[&str] = &["of", "technology"];
pub const HOLDER_EXCLUDED_WORDS: &[&str] = &["course", "roll", "id", "successfully"];

/// Tunables for the line-oriented heuristics (issuer and holder name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRules {
    /// Case-sensitive substrings that mark the first issuer line.
    pub issuer_keywords: Vec<String>,
    /// Lower-case substrings a continuation line must contain one of.
    pub continuation_markers: Vec<String>,
    pub continuation_max_tokens: usize,
    pub continuation_max_lines: usize,
    pub holder_min_tokens: usize,
    /// Lower-case substrings that disqualify a holder-name candidate.
    pub holder_excluded_words: Vec<String>,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        let owned = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect();
        Self {
            issuer_keywords: owned(ISSUER_KEYWORDS),
            continuation_markers: owned(ISSUER_CONTINUATION_MARKERS),
            continuation_max_tokens: 4,
            continuation_max_lines: 2,
            holder_min_tokens: 2,
            holder_excluded_words: owned(HOLDER_EXCLUDED_WORDS),
        }
    }
}

// ── OCR input ─────────────────────────────────────────────────────────────────

/// Ordered, trimmed, non-empty text fragments from an OCR engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcrLines {
    lines: Vec<String>,
}

impl OcrLines {
    /// Keep fragment order; trim each and drop the blank ones.
    pub fn from_fragments<S, I>(fragments: I) -> Self
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S>,
    {
        let lines = fragments
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self { lines }
    }

    /// Split engine output that arrives as one newline-separated blob.
    pub fn from_text(text: &str) -> Self {
        Self::from_fragments(text.lines())
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// All lines joined with single spaces.
    pub fn full_text(&self) -> String {
        self.lines.join(" ")
    }
}

// ── Extraction ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    rules: ExtractionRules,
}

impl Extractor {
    pub fn new(rules: ExtractionRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ExtractionRules {
        &self.rules
    }

    pub fn extract_lines(&self, ocr: &OcrLines) -> FieldRecord {
        self.extract(ocr.lines(), &ocr.full_text())
    }

    /// Parse OCR output into a record. Never fails; unmatched fields stay absent.
    pub fn extract<S: AsRef<str>>(&self, lines: &[S], full_text: &str) -> FieldRecord {
        let mut record = FieldRecord::default();

        let holder_start = match self.issuer_name(lines) {
            Some((name, end)) => {
                record.set(Field::UniversityName, &name);
                end
            }
            None => 0,
        };

        if let Some(holder) = self.holder_name(lines, holder_start) {
            record.set(Field::HolderName, holder);
        }
        if let Some(roll) = capture(re_roll_no(), full_text) {
            record.set(Field::RollNo, roll);
        }
        if let Some(id) = capture(re_certificate_id(), full_text) {
            record.set(Field::CertificateId, id);
        }
        if let Some(grade) = capture(re_grade(), full_text) {
            record.set(Field::Grade, grade);
        }
        if let Some(course) = course(full_text) {
            record.set(Field::Course, &course);
        }

        record
    }

    /// Returns the issuer name and the index just past its last line.
    fn issuer_name<S: AsRef<str>>(&self, lines: &[S]) -> Option<(String, usize)> {
        let start = lines.iter().position(|line| {
            let line = line.as_ref();
            self.rules.issuer_keywords.iter().any(|k| line.contains(k.as_str()))
        })?;

        let mut parts = vec![lines[start].as_ref().trim()];
        let mut end = start + 1;
        let window_end = (start + 1 + self.rules.continuation_max_lines).min(lines.len());
        for line in &lines[start + 1..window_end] {
            let line = line.as_ref().trim();
            if !self.is_issuer_continuation(line) {
                break;
            }
            parts.push(line);
            end += 1;
        }

        Some((parts.join(" "), end))
    }

    fn is_issuer_continuation(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        line.split_whitespace().count() <= self.rules.continuation_max_tokens
            && self
                .rules
                .continuation_markers
                .iter()
                .any(|m| lower.contains(m.as_str()))
    }

    fn holder_name<'a, S: AsRef<str>>(&self, lines: &'a [S], start: usize) -> Option<&'a str> {
        lines.iter().skip(start).map(AsRef::as_ref).find(|line| {
            let lower = line.to_lowercase();
            line.split_whitespace().count() >= self.rules.holder_min_tokens
                && !self
                    .rules
                    .holder_excluded_words
                    .iter()
                    .any(|w| lower.contains(w.as_str()))
        })
    }
}

/// Extract with the stock rules.
pub fn extract_fields<S: AsRef<str>>(lines: &[S], full_text: &str) -> FieldRecord {
    Extractor::default().extract(lines, full_text)
}

fn capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)?.get(1).map(|m| m.as_str())
}

// A primary match is final even when stripping the qualifier empties it;
// the fallback only runs when the primary pattern does not match at all.
fn course(text: &str) -> Option<String> {
    if let Some(span) = capture(re_course(), text) {
        let cleaned = re_course_qualifier().replace_all(span, "");
        let cleaned = cleaned.trim();
        return (!cleaned.is_empty()).then(|| cleaned.to_string());
    }
    capture(re_course_fallback(), text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
