/// Outcome of a failed bibliographic lookup.
///
/// `NotFound` and `Transport` are expected and handled by the reference
/// fallback chain; `Fatal` is anything else and aborts the reshape.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no match")]
    NotFound,
    #[error("lookup failed: {0}")]
    Transport(String),
    #[error("resolver error: {0}")]
    Fatal(String),
}

impl ResolveError {
    /// Whether the reference fallback chain may absorb this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ResolveError::Fatal(_))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("lookup cache: {0}")]
    Cache(#[from] rusqlite::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
