//! Error taxonomy for the Nuvola client

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the client
///
/// Access-credential expiry never shows up here: it is renewed and the
/// request retried once before anything reaches the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Credentials were rejected or the user declined to log in again
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The remote answered with its error sentinel or an unusable body
    #[error("Remote error: {0}")]
    Remote(String),

    /// A response was missing fields the client relies on
    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    /// Neither a full-year window nor a current window exists
    #[error("No suitable time window found")]
    NoSuitableTimeWindow,

    /// The requested window is not one of the known windows
    #[error("Time window {0} is not one of the known time windows")]
    IncompatibleTimeWindow(i64),

    /// A snapshot does not have the expected structure
    #[error("Snapshot format error: {0}")]
    Format(String),

    /// A snapshot was written by a different format version
    #[error("Snapshot version {found} does not match running version {expected}")]
    VersionMismatch { found: u64, expected: u64 },

    /// The transport could not complete the request
    #[error("HTTP error: {0}")]
    Http(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Build an `UnexpectedShape` error for a record that failed to decode
    pub(crate) fn shape(what: &str, err: impl std::fmt::Display) -> Self {
        Error::UnexpectedShape(format!("{}: {}", what, err))
    }
}

impl From<ureq::Error> for Error {
    fn from(e: ureq::Error) -> Self {
        Error::Http(e.to_string())
    }
}
