use thiserror::Error;

use crate::resolve::ElementMatch;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Navigation to '{url}' timed out after {ms}ms")]
    NavigationTimeout { url: String, ms: u64 },

    #[error("Evaluation failed: {message}")]
    Evaluation {
        message: String,
        /// Remote exception description/stack, when the page provided one.
        detail: Option<String>,
    },

    #[error("No element matches reference '{reference}'")]
    NotFound { reference: String },

    #[error("Reference '{reference}' is ambiguous: {} candidates", candidates.len())]
    Ambiguous {
        reference: String,
        candidates: Vec<ElementMatch>,
    },

    #[error(
        "Selector '{selector}' {} within {ms}ms",
        if *gone { "still present" } else { "did not appear" }
    )]
    SelectorTimeout {
        selector: String,
        gone: bool,
        ms: u64,
    },

    #[error(transparent)]
    Core(#[from] osprey_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
