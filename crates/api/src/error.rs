use postrepo_types::PostValidationError;

/// The three failure classes callers of a repository have to tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Decode,
    Source,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Post not found: {0}")]
    NotFound(i32),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Status code: {0}")]
    StatusCode(u16),

    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store closed")]
    StoreClosed,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Decode(_) => ErrorKind::Decode,
            Error::StatusCode(_)
            | Error::Reqwest(_)
            | Error::Database(_)
            | Error::UnsupportedSchemaVersion { .. }
            | Error::Io(_)
            | Error::StoreClosed => ErrorKind::Source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

impl From<PostValidationError> for Error {
    fn from(e: PostValidationError) -> Self {
        Error::Decode(e.to_string())
    }
}
