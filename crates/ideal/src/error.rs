use crate::response::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum IdealError {
    #[error("XML parsing error: {0}")]
    Parse(String),
    #[error("missing required element: {0}")]
    MissingElement(String),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("Failed to unlock private key: {0}")]
    KeyUnlock(String),
    #[error("key error: {0}")]
    Key(String),
    #[error("certificate error: {0}")]
    Certificate(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Acquirer server error: {0}")]
    Server(String),
    #[error("Security error: {0}")]
    Security(String),
    #[error("{0}")]
    Response(ErrorResponse),
}

impl From<roxmltree::Error> for IdealError {
    fn from(error: roxmltree::Error) -> Self {
        Self::Parse(error.to_string())
    }
}

impl From<reqwest::Error> for IdealError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

impl IdealError {
    /// Errors raised by the acquirer itself rather than by this client or the network.
    pub fn is_acquirer_error(&self) -> bool {
        matches!(self, IdealError::Response(_) | IdealError::Server(_))
    }
}

pub type Result<T> = std::result::Result<T, IdealError>;
