use unveil_core::config::ConfigError;
use unveil_core::error::StageError;

/// Errors raised by page scripts.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// An element the page script writes into is missing from the document.
    #[error("element #{id} not found")]
    MissingElement { id: String },

    /// The embedded page config failed to parse or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The stage refused the operation.
    #[error(transparent)]
    Stage(#[from] StageError),
}

impl PageError {
    pub(crate) fn missing(id: &str) -> Self {
        PageError::MissingElement { id: id.to_string() }
    }
}
