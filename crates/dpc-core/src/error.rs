use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DpcError {
    #[error("parse YAML")]
    Decode(#[from] serde_yaml::Error),

    #[error("parse YAML at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("file is not valid UTF-8")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("{0}")]
    Structure(String),

    #[error("{0}")]
    Type(String),

    #[error("job '{job}'")]
    Job {
        job: String,
        #[source]
        source: Box<DpcError>,
    },

    #[error("{}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: Box<DpcError>,
    },

    #[error("find workflow files: {0}")]
    Glob(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Coarse classification used by callers that only care about the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Decode,
    Structure,
    Type,
    Io,
}

impl DpcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DpcError::Decode(_) | DpcError::Syntax { .. } | DpcError::Encoding(_) => {
                ErrorKind::Decode
            }
            DpcError::Structure(_) => ErrorKind::Structure,
            DpcError::Type(_) => ErrorKind::Type,
            DpcError::Glob(_) | DpcError::Io(_) => ErrorKind::Io,
            DpcError::Job { source, .. } | DpcError::File { source, .. } => source.kind(),
        }
    }

    pub fn in_job(self, job: &str) -> Self {
        DpcError::Job {
            job: job.to_string(),
            source: Box::new(self),
        }
    }

    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        DpcError::File {
            path: path.into(),
            source: Box::new(self),
        }
    }

    pub(crate) fn structure(msg: impl Into<String>) -> Self {
        DpcError::Structure(msg.into())
    }

    pub(crate) fn type_error(msg: impl Into<String>) -> Self {
        DpcError::Type(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, DpcError>;
