use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::brief::parser::UnparsableResponseError;
use crate::brief::request_builder::EmptyInputError;
use crate::documents::fetch::FetchError;
use crate::documents::{DocumentRole, ExtractError};
use crate::llm_client::CompletionError;

/// Pipeline stage a failure originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", content = "document", rename_all = "snake_case")]
pub enum Stage {
    Fetch(DocumentRole),
    Extraction(DocumentRole),
    RequestBuild,
    Completion,
    Parsing,
}

impl Stage {
    /// Stable machine-readable name.
    pub fn code(&self) -> &'static str {
        match self {
            Stage::Fetch(_) => "fetch",
            Stage::Extraction(_) => "extraction",
            Stage::RequestBuild => "request_build",
            Stage::Completion => "completion",
            Stage::Parsing => "parsing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetch(role) => write!(f, "fetching the {role}"),
            Stage::Extraction(role) => write!(f, "extracting the {role}"),
            Stage::RequestBuild => f.write_str("building the completion request"),
            Stage::Completion => f.write_str("calling the completion service"),
            Stage::Parsing => f.write_str("parsing the completion output"),
        }
    }
}

/// Every terminal cause the pipeline can hit.
#[derive(Debug, Error)]
pub enum BriefError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("could not fetch document: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    EmptyInput(#[from] EmptyInputError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Unparsable(#[from] UnparsableResponseError),
}

/// The single error `generate_brief` surfaces: where it failed and why.
#[derive(Debug, Error)]
#[error("brief generation failed while {stage}: {source}")]
pub struct BriefGenerationFailed {
    pub stage: Stage,
    /// Completion attempts made before giving up (0 if the call was never reached).
    pub attempts: u32,
    #[source]
    pub source: BriefError,
}

impl BriefGenerationFailed {
    pub fn new(stage: Stage, source: impl Into<BriefError>) -> Self {
        Self {
            stage,
            attempts: 0,
            source: source.into(),
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}
