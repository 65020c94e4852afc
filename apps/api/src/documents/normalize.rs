//! Text cleanup applied to every extracted document before it reaches a prompt.
//!
//! `normalize` is pure, infallible and idempotent.

use serde::Serialize;

use crate::documents::{DocumentFormat, ExtractedText};

/// Headings longer than this are treated as ordinary lines.
const MAX_HEADING_CHARS: usize = 60;
const MAX_HEADING_WORDS: usize = 6;

/// Extracted text after cleanup. Only constructible through [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedText {
    text: String,
    source: DocumentFormat,
}

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> DocumentFormat {
        self.source
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

pub fn normalize(extracted: &ExtractedText) -> NormalizedText {
    NormalizedText {
        text: normalize_str(&extracted.text),
        source: extracted.source,
    }
}

pub fn normalize_str(input: &str) -> String {
    let unified = input.replace("\r\n", "\n").replace('\r', "\n");
    let cleaned: String = unified
        .chars()
        .filter(|&c| c == '\n' || c == '\t' || !(c.is_control() || c == '\u{FEFF}'))
        .collect();

    let mut lines: Vec<String> = Vec::new();
    for line in cleaned.split('\n').map(collapse_line) {
        if line.is_empty() {
            // At most one blank line, never a leading one.
            if lines.last().is_some_and(|l| !l.is_empty()) {
                lines.push(line);
            }
            continue;
        }
        if is_section_heading(&line) && lines.last().is_some_and(|l| !l.is_empty()) {
            lines.push(String::new());
        }
        lines.push(line);
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// Collapses runs of two or more whitespace characters into a single space and
/// trims the line. A lone tab stays a tab.
fn collapse_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut run = String::new();
    for c in line.trim().chars() {
        if c.is_whitespace() {
            run.push(c);
            continue;
        }
        flush_whitespace(&mut out, &mut run);
        out.push(c);
    }
    out
}

fn flush_whitespace(out: &mut String, run: &mut String) {
    match run.chars().count() {
        0 => {}
        1 => out.push_str(run),
        _ => out.push(' '),
    }
    run.clear();
}

/// "EXPERIENCE", "Skills:", "Nice to have:". Short lines that open a section.
fn is_section_heading(line: &str) -> bool {
    if line.chars().count() > MAX_HEADING_CHARS {
        return false;
    }
    if line.split_whitespace().count() > MAX_HEADING_WORDS {
        return false;
    }
    if !line.chars().next().is_some_and(char::is_alphabetic) {
        return false;
    }
    let has_letters = line.chars().any(char::is_alphabetic);
    let all_caps = has_letters
        && line
            .chars()
            .filter(|c| c.is_alphabetic())
            .all(char::is_uppercase);
    let colon_label = line.ends_with(':') && line.matches(':').count() == 1 && has_letters;
    all_caps || colon_label
}
