pub mod gemini;
pub mod insights;
pub mod prompt;
pub mod retry;
pub mod sanitize;
pub mod validate;

pub use gemini::*;
pub use insights::*;
pub use prompt::*;
pub use retry::*;
pub use sanitize::*;
pub use validate::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Gemini API unreachable at {0}")]
    Connection(String),

    #[error("Gemini returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Empty completion from model")]
    EmptyCompletion,

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}
