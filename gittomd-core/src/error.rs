//! Terminal conversion errors and their HTTP-style status classification.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::assemble::AssembleError;
use crate::contract::ListingError;
use crate::tree::TreeError;

static EMBEDDED_STATUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Status: (\d+)").expect("static regex is valid"));

/// Errors that end a conversion. Per-file fetch and cache failures never appear here.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Listing(#[from] ListingError),

    #[error("Error generating tree structure: {0}")]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

impl ConvertError {
    /// Status code for the error payload: 400 for bad identifiers, otherwise
    /// [`status_for_message`] over the rendered message.
    pub fn status(&self) -> u16 {
        match self {
            ConvertError::InvalidRequest(_) => 400,
            other => status_for_message(&other.to_string()),
        }
    }
}

/// Classify an upstream error message into a response status.
///
/// - 404: upstream not found, no default branch, empty repository
/// - 413: truncated tree
/// - 502: any other upstream 4xx/5xx (including 401/403)
/// - 500: everything else
///
/// Matching is on message text, so it depends on the wording produced by
/// [`ListingError`]'s `Display`.
pub fn status_for_message(message: &str) -> u16 {
    if message.contains("Status: 404")
        || message.contains("Could not determine default branch")
        || message.contains("empty repository")
        || message.contains("no commit history")
    {
        return 404;
    }
    if message.starts_with("Repository is too large") {
        return 413;
    }
    if message.contains("Status: 401") || message.contains("Status: 403") {
        return 502;
    }
    let upstream = EMBEDDED_STATUS
        .captures(message)
        .and_then(|caps| caps[1].parse::<u16>().ok());
    match upstream {
        Some(code) if code >= 400 => 502,
        _ => 500,
    }
}
