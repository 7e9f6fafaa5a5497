use crate::prompt::MISSING_INPUT_MESSAGE;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    /// Neither log text nor an image was provided
    #[error("{}", MISSING_INPUT_MESSAGE)]
    MissingInput,

    #[error("An analysis is already running")]
    InProgress,

    #[error("Failed to read the attached image: {0}")]
    Attachment(String),

    /// The remote call failed; carries the full error chain
    #[error("{0}")]
    Remote(String),
}

impl AnalysisError {
    pub(crate) fn remote(error: &anyhow::Error) -> Self {
        AnalysisError::Remote(format!("{:#}", error))
    }
}
