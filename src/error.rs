use std::path::PathBuf;

/// Errors produced by the snippet store and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A required field is missing or empty.
    #[error("invalid snippet: {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: &'static str,
    },

    /// No snippet with this id is indexed.
    #[error("snippet with ID {0} not found")]
    NotFound(String),

    /// The file backing a record no longer exists.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The text does not start with a metadata block.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// The metadata block is opened but never closed.
    #[error("unterminated record: metadata block is not closed")]
    UnterminatedRecord,

    /// The metadata block is not well-formed or has unknown/mistyped fields.
    #[error("failed to parse metadata: {0}")]
    MetadataParse(#[source] serde_yaml::Error),

    /// The metadata could not be serialized.
    #[error("failed to encode metadata: {0}")]
    MetadataEncode(#[source] serde_yaml::Error),

    /// The index holds the id but no file on disk decodes to it.
    #[error("no record on disk holds snippet {0}")]
    MissingFile(String),

    /// Filesystem failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for both a missing snippet id and a missing file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_) | StoreError::FileNotFound(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
