//! Tolerant parser for the completion's plain-text brief.
//!
//! Expected shape (see `prompts::output_format_spec`):
//!
//! ```text
//! SKILL GAPS:
//! - item
//! PREDICTED QUESTIONS:
//! 1. item
//! TALKING POINTS:
//! * item
//! ```
//!
//! Headers match case-insensitively with Markdown decoration, numbering, a trailing
//! parenthetical and punctuation variance tolerated. A missing required section
//! becomes an empty list and marks the brief partial. Output without any required
//! section header is rejected.

use thiserror::Error;
use tracing::{debug, warn};

use crate::brief::models::{Brief, BriefSection};

const EXCERPT_CHARS: usize = 120;

const BULLETS: &[char] = &['-', '*', '+', '•', '–', '—', '·', '▪', '►'];

/// Items that only say the section is empty.
const PLACEHOLDER_ITEMS: &[&str] = &["none", "n/a", "na", "nil", "nothing", "-"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("completion output contains no recognizable section headers")]
pub struct UnparsableResponseError {
    /// Start of the rejected output, for logs.
    pub excerpt: String,
}

pub fn parse(raw: &str) -> Result<Brief, UnparsableResponseError> {
    let mut brief = Brief::default();
    let mut seen: Vec<BriefSection> = Vec::new();
    let mut current: Option<BriefSection> = None;
    let mut item_open = false;
    let mut ignored = 0usize;

    for line in raw.lines().map(str::trim) {
        if line.is_empty() {
            item_open = false;
            continue;
        }
        if line.starts_with("```") {
            continue;
        }

        if let Some((section, inline)) = match_header(line) {
            if !seen.contains(&section) {
                seen.push(section);
            }
            current = Some(section);
            item_open = false;
            if let Some(item) = inline.filter(|i| !is_placeholder(i)) {
                brief.section_mut(section).push(item.to_string());
                item_open = true;
            }
            continue;
        }

        let Some(section) = current else {
            // Preamble before the first header.
            continue;
        };

        if let Some(item) = strip_item_marker(line) {
            // A bare marker or a placeholder closes the item without adding one.
            if item.is_empty() || is_placeholder(item) {
                item_open = false;
            } else {
                brief.section_mut(section).push(item.to_string());
                item_open = true;
            }
        } else if item_open {
            if let Some(last) = brief.section_mut(section).last_mut() {
                last.push(' ');
                last.push_str(line);
            }
        } else if section.is_prose() {
            brief.section_mut(section).push(line.to_string());
            item_open = true;
        } else {
            ignored += 1;
        }
    }

    if !seen.iter().any(BriefSection::is_required) {
        return Err(UnparsableResponseError {
            excerpt: raw.trim().chars().take(EXCERPT_CHARS).collect(),
        });
    }

    brief.missing_sections = BriefSection::REQUIRED
        .into_iter()
        .filter(|s| !seen.contains(s))
        .collect();
    brief.partial = !brief.missing_sections.is_empty();

    if ignored > 0 {
        debug!("Ignored {ignored} unmarked lines outside list items");
    }
    if brief.partial {
        warn!("Brief is partial; missing sections: {:?}", brief.missing_sections);
    }

    Ok(brief)
}

/// Recognizes a section header line. Returns the section and any item text that
/// followed the header on the same line ("Skill Gaps: Kubernetes").
fn match_header(line: &str) -> Option<(BriefSection, Option<&str>)> {
    if line.starts_with(BULLETS) && strip_item_marker(line).is_some() {
        return None;
    }
    let (label, rest) = match line.split_once(':') {
        Some((label, rest)) => (label, Some(rest)),
        None => (line, None),
    };
    let (key, numbered) = header_key(label)?;
    let section = lookup_section(&key)?;
    let inline = rest
        .map(|r| r.trim_matches(|c: char| c.is_whitespace() || c == '*' || c == '_' || c == '#'))
        .filter(|r| !r.is_empty());
    // "1. Questions: how do you handle ambiguity?" is a list item.
    if numbered && inline.is_some() && !line.starts_with('#') {
        return None;
    }
    Some((section, inline))
}

/// Reduces a header candidate to lowercase alphanumeric words, and reports whether
/// it carried a list number. Labels with anything beyond plain-label punctuation
/// (quotes, braces) are not headers.
fn header_key(label: &str) -> Option<(String, bool)> {
    let trimmed = label.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '#' | '*' | '_' | '>' | '=' | '[' | ']')
    });
    let (stripped, numbered) = match strip_numbering(trimmed) {
        Some(rest) => (rest, true),
        None => (trimmed, false),
    };
    let stripped = strip_parenthetical(stripped);
    let plain = stripped
        .chars()
        .all(|c| c.is_alphanumeric() || c.is_whitespace() || "&-/_().".contains(c));
    if !plain {
        return None;
    }
    let key = stripped
        .replace('&', " and ")
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Some((key, numbered))
}

/// "Predicted Questions (6-10)" → "Predicted Questions".
fn strip_parenthetical(label: &str) -> &str {
    let head = label
        .strip_suffix(')')
        .and_then(|inner| inner.rfind('('))
        .map(|open| label[..open].trim_end());
    match head {
        Some(head) if !head.is_empty() => head,
        _ => label,
    }
}

fn lookup_section(key: &str) -> Option<BriefSection> {
    BriefSection::ALL
        .into_iter()
        .find(|s| s.aliases().contains(&key))
}

/// Strips a leading bullet or list number. `None` when the line has no marker.
fn strip_item_marker(line: &str) -> Option<&str> {
    let mut chars = line.chars();
    let first = chars.next()?;
    if BULLETS.contains(&first) {
        let rest = chars.as_str();
        // "**Bold**" and "---" are decoration, not bullets. A lone marker is an empty item.
        if first != '•' && !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            return None;
        }
        return Some(rest.trim());
    }
    strip_numbering(line)
}

/// "1. x", "12) x", "(3) x", "a) x", "(b) x" → "x".
fn strip_numbering(line: &str) -> Option<&str> {
    let (inner, rest) = if let Some(after_paren) = line.strip_prefix('(') {
        let (inner, rest) = after_paren.split_once(')')?;
        (inner, rest)
    } else {
        let end = line.find(['.', ')'])?;
        let rest = &line[end + 1..];
        if line[end..].starts_with('.') && !rest.starts_with(char::is_whitespace) {
            // "3.5 years" is not a list number.
            return None;
        }
        (&line[..end], rest)
    };

    let is_number =
        !inner.is_empty() && inner.len() <= 3 && inner.chars().all(|c| c.is_ascii_digit());
    let is_letter = inner.len() == 1 && inner.chars().all(|c| c.is_ascii_lowercase());
    let letter_ok = is_letter && (line.starts_with('(') || line[inner.len()..].starts_with(')'));
    if !(is_number || letter_ok) {
        return None;
    }
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

fn is_placeholder(item: &str) -> bool {
    let key = item.trim_end_matches(['.', '!']).trim().to_lowercase();
    PLACEHOLDER_ITEMS.contains(&key.as_str())
}
