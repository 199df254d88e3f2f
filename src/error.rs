use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    /// Broker answered with a non-success status. Aborts the whole fetch.
    #[error("Remote fetch error on page {page}: HTTP {status}: {message}")]
    RemoteFetch {
        page: usize,
        status: u16,
        message: String,
    },
    #[error("Transport error on page {page}: {message}")]
    Transport { page: usize, message: String },
    #[error("Could not decode orders on page {page}: {message}")]
    Decode { page: usize, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Parsing error: {0}")]
    ParsingError(#[from] toml::de::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl ReconcileError {
    /// Page index for errors raised while paginating the order endpoint.
    pub fn page(&self) -> Option<usize> {
        match self {
            ReconcileError::RemoteFetch { page, .. }
            | ReconcileError::Transport { page, .. }
            | ReconcileError::Decode { page, .. } => Some(*page),
            _ => None,
        }
    }
}
