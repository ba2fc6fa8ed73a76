//! Filesystem error types.

use std::io;
use thiserror::Error;

/// Error type shared by every backend and by the multiplexer.
#[derive(Debug, Error)]
pub enum FsError {
    /// The input is not a URI, or is missing a part the operation needs.
    #[error("malformed URI: {0}")]
    MalformedUri(String),

    /// Target path does not exist.
    #[error("no such file or directory: {0}")]
    PathNotFound(String),

    /// No registered backend claims the URI's scheme.
    #[error("no filesystem handles URI: {0}")]
    UnsupportedScheme(String),

    /// The external tool ran but reported a failure we don't recognize.
    ///
    /// `stderr` is kept verbatim for whoever has to triage it.
    #[error("command `{command}` exited with status {status}: {stderr}")]
    BackendCommand {
        command: String,
        status: i32,
        stderr: String,
    },

    /// The external tool could not be located or started.
    #[error("cannot start `{program}`: {source}")]
    BackendUnavailable {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The external tool succeeded but printed something we can't parse.
    #[error("unexpected output from `{command}`: {output:?}")]
    UnexpectedOutput { command: String, output: String },

    /// A single-pass stream was read after it finished.
    #[error("stream already closed")]
    StreamClosed,

    /// Invalid configuration.
    #[error("config: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl FsError {
    /// Create a MalformedUri error.
    pub fn malformed_uri(uri: impl Into<String>) -> Self {
        Self::MalformedUri(uri.into())
    }

    /// Create a PathNotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Create an UnsupportedScheme error.
    pub fn unsupported_scheme(uri: impl Into<String>) -> Self {
        Self::UnsupportedScheme(uri.into())
    }

    /// Create an UnexpectedOutput error.
    pub fn unexpected_output(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self::UnexpectedOutput {
            command: command.into(),
            output: output.into(),
        }
    }

    /// True for [`FsError::PathNotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PathNotFound(_))
    }
}

/// Convert FsError to std::io::Error for callers that speak io.
///
/// The FsError rides along inside, so converting back yields the original.
impl From<FsError> for io::Error {
    fn from(e: FsError) -> Self {
        match e {
            FsError::Io(e) => e,
            FsError::BackendUnavailable { source, .. } => source,
            other => {
                let kind = match &other {
                    FsError::PathNotFound(_) => io::ErrorKind::NotFound,
                    FsError::MalformedUri(_) => io::ErrorKind::InvalidInput,
                    FsError::UnsupportedScheme(_) => io::ErrorKind::Unsupported,
                    FsError::StreamClosed => io::ErrorKind::BrokenPipe,
                    _ => io::ErrorKind::Other,
                };
                io::Error::new(kind, other)
            }
        }
    }
}

/// Unwraps an FsError carried inside an io::Error; anything else is `Io`.
impl From<io::Error> for FsError {
    fn from(e: io::Error) -> Self {
        if !e.get_ref().is_some_and(|inner| inner.is::<FsError>()) {
            return Self::Io(e);
        }
        let kind = e.kind();
        match e.into_inner().map(|inner| inner.downcast::<FsError>()) {
            Some(Ok(inner)) => *inner,
            Some(Err(other)) => Self::Io(io::Error::new(kind, other)),
            None => Self::Io(kind.into()),
        }
    }
}

/// Filesystem result type.
pub type FsResult<T> = Result<T, FsError>;
