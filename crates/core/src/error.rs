use std::error::Error as StdError;
use std::fmt::{self, Display};

use scout_model::{ErrorKind as ModelErrorKind, ModelProviderError};

use crate::tool::{Error as ToolError, ErrorKind as ToolErrorKind};

type BoxError = Box<dyn StdError + Send + Sync>;

/// The kind of error that aborted a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The model provider failed or answered with garbage.
    Model(ModelErrorKind),
    /// A tool call failed.
    Tool(ToolErrorKind),
    /// The model kept asking for tools beyond the allowed round-trips.
    ToolRoundsExceeded,
    /// The event observer refused an event.
    Observer,
    /// The checkpoint store failed.
    Checkpoint,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Model(kind) => write!(f, "Model error ({kind})"),
            ErrorKind::Tool(kind) => write!(f, "Tool error ({kind})"),
            ErrorKind::ToolRoundsExceeded => {
                write!(f, "Too many tool round-trips")
            }
            ErrorKind::Observer => write!(f, "Observer error"),
            ErrorKind::Checkpoint => write!(f, "Checkpoint error"),
        }
    }
}

/// An error from the agent.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    reason: String,
    source: Option<BoxError>,
}

impl Error {
    #[inline]
    pub(crate) fn new<S: Into<String>>(kind: ErrorKind, reason: S) -> Self {
        Self {
            kind,
            reason: reason.into(),
            source: None,
        }
    }

    #[inline]
    pub(crate) fn with_source<E: Into<BoxError>>(mut self, source: E) -> Self {
        self.source = Some(source.into());
        self
    }

    pub(crate) fn model<E: ModelProviderError>(err: E) -> Self {
        Self::new(ErrorKind::Model(err.kind()), err.to_string())
            .with_source(err)
    }

    pub(crate) fn tool(err: ToolError) -> Self {
        Self::new(ErrorKind::Tool(err.kind()), err.reason())
    }

    pub(crate) fn observer<E: Into<BoxError>>(err: E) -> Self {
        let err = err.into();
        Self::new(ErrorKind::Observer, err.to_string()).with_source(err)
    }

    pub(crate) fn checkpoint<S: Into<String>>(reason: S) -> Self {
        Self::new(ErrorKind::Checkpoint, reason)
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human readable reason.
    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn StdError + 'static))
    }
}
