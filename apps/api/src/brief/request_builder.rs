//! Builds the completion prompt from a normalized JD / CV pair.
//!
//! Layout: preamble, delimited JD, delimited CV, output-format spec.
//! Document text is concatenated, never template-substituted, and any run of
//! three or more `<` or `>` in it is broken up, so content can neither fake a
//! delimiter nor expand a placeholder.

use serde::Serialize;
use thiserror::Error;

use crate::brief::prompts::{
    output_format_spec, BRIEF_PREAMBLE, BRIEF_SYSTEM, CV_CLOSE, CV_OPEN, JD_CLOSE, JD_OPEN,
};
use crate::documents::NormalizedText;
use crate::llm_client::CompletionPrompt;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} is empty after normalization", describe(.jd_empty, .cv_empty))]
pub struct EmptyInputError {
    pub jd_empty: bool,
    pub cv_empty: bool,
}

fn describe(jd_empty: &bool, cv_empty: &bool) -> &'static str {
    match (*jd_empty, *cv_empty) {
        (true, true) => "job description and CV",
        (true, false) => "job description",
        _ => "CV",
    }
}

/// A ready-to-send prompt plus the inputs it was built from.
#[derive(Debug, Clone, Serialize)]
pub struct BriefRequest {
    pub jd_text: NormalizedText,
    pub cv_text: NormalizedText,
    pub system: &'static str,
    pub prompt: String,
}

impl BriefRequest {
    pub fn as_prompt(&self) -> CompletionPrompt<'_> {
        CompletionPrompt {
            system: self.system,
            user: &self.prompt,
        }
    }
}

pub fn build(jd: &NormalizedText, cv: &NormalizedText) -> Result<BriefRequest, EmptyInputError> {
    if jd.is_empty() || cv.is_empty() {
        return Err(EmptyInputError {
            jd_empty: jd.is_empty(),
            cv_empty: cv.is_empty(),
        });
    }

    let jd_body = neutralize_delimiters(jd.as_str());
    let cv_body = neutralize_delimiters(cv.as_str());
    let format_spec = output_format_spec();

    let mut prompt = String::with_capacity(
        BRIEF_PREAMBLE.len() + jd_body.len() + cv_body.len() + format_spec.len() + 128,
    );
    prompt.push_str(BRIEF_PREAMBLE);
    push_section(&mut prompt, JD_OPEN, &jd_body, JD_CLOSE);
    push_section(&mut prompt, CV_OPEN, &cv_body, CV_CLOSE);
    prompt.push_str("\n\n");
    prompt.push_str(&format_spec);

    Ok(BriefRequest {
        jd_text: jd.clone(),
        cv_text: cv.clone(),
        system: BRIEF_SYSTEM,
        prompt,
    })
}

fn push_section(prompt: &mut String, open: &str, body: &str, close: &str) {
    prompt.push_str("\n\n");
    prompt.push_str(open);
    prompt.push('\n');
    prompt.push_str(body);
    prompt.push('\n');
    prompt.push_str(close);
}

/// Inserts a space before any `<` or `>` that would be the third in a row.
fn neutralize_delimiters(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;
    let mut run = 0usize;
    for c in text.chars() {
        if c == '<' || c == '>' {
            run = if prev == Some(c) { run + 1 } else { 1 };
            if run == 3 {
                out.push(' ');
                run = 1;
            }
        } else {
            run = 0;
        }
        out.push(c);
        prev = Some(c);
    }
    out
}
