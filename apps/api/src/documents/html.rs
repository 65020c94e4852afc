//! HTML to plain text.
//!
//! html5ever (through `scraper`) never rejects input, so this cannot fail.
//! Script-like subtrees are dropped, inline whitespace collapses to one space,
//! and block elements end their line.
//!
//! `html_main_text` is for pages fetched from the web: it also drops site chrome
//! and reads only `<main>` (or the first `<article>`) when the page has one.

use scraper::{ElementRef, Html, Node, Selector};

/// Subtrees whose text is never user-visible content.
const DISCARDED: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Navigation and page chrome around a posting.
const BOILERPLATE: &[&str] = &["nav", "footer", "header", "aside", "form"];

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "details", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table",
    "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Past this nesting depth the remaining subtree is flattened instead of walked.
const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Everything,
    MainContent,
}

impl Scope {
    fn discards(self, name: &str) -> bool {
        DISCARDED.contains(&name) || (self == Scope::MainContent && BOILERPLATE.contains(&name))
    }
}

pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut writer = TextWriter::default();
    walk(document.root_element(), Scope::Everything, &mut writer, 0);
    writer.finish()
}

/// Visible text of a page's main content, without navigation or footer chrome.
pub fn html_main_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = first_match(&document, "main")
        .or_else(|| first_match(&document, "article"))
        .unwrap_or_else(|| document.root_element());
    let mut writer = TextWriter::default();
    walk(root, Scope::MainContent, &mut writer, 0);
    writer.finish()
}

fn first_match<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

fn walk(element: ElementRef<'_>, scope: Scope, writer: &mut TextWriter, depth: usize) {
    let name = element.value().name();
    if scope.discards(name) {
        return;
    }
    if name == "br" {
        writer.line_break();
        return;
    }

    let is_block = BLOCK_ELEMENTS.contains(&name);
    if is_block {
        writer.end_line();
    }

    if depth >= MAX_DEPTH {
        for text in element.text() {
            writer.push_text(text);
        }
    } else {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => writer.push_text(text),
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        walk(child_el, scope, writer, depth + 1);
                    }
                }
                _ => {}
            }
        }
    }

    if is_block {
        writer.end_line();
    }
}

#[derive(Default)]
struct TextWriter {
    out: String,
    pending_space: bool,
}

impl TextWriter {
    fn push_text(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                self.pending_space = true;
                continue;
            }
            if self.pending_space && !self.at_line_start() {
                self.out.push(' ');
            }
            self.pending_space = false;
            self.out.push(c);
        }
    }

    fn end_line(&mut self) {
        self.pending_space = false;
        if !self.at_line_start() {
            self.out.push('\n');
        }
    }

    fn line_break(&mut self) {
        self.pending_space = false;
        self.out.push('\n');
    }

    fn at_line_start(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    fn finish(self) -> String {
        self.out
    }
}
