use thiserror::Error;

#[derive(Error, Debug)]
pub enum PricelensError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Browser error: {0}")]
    Browser(String),

    /// The browser itself is gone (launch failure, closed connection).
    #[error("Browser session lost: {0}")]
    Session(String),

    #[error("Product page not found for code {0}")]
    NotFound(String),

    #[error("Browsing context {0} is not open")]
    UnknownContext(u64),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("{0}")]
    Other(String),
}

impl PricelensError {
    /// Whether the error leaves the run without a usable engine or sink.
    ///
    /// Anything fatal aborts the whole run; every other error is confined to
    /// the code, candidate or field that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PricelensError::Database(_)
                | PricelensError::Csv(_)
                | PricelensError::Io(_)
                | PricelensError::Session(_)
                | PricelensError::Sink(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PricelensError>;
