use thiserror::Error;

/// Result type for upload operations
pub type UploadResult<T> = Result<T, UploadError>;

/// Errors that can occur while moving content through the upload protocol
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Content type is required")]
    MissingContentType,

    #[error("Cannot upload empty content")]
    EmptyContent,

    #[error("Upload session not found: {id}")]
    NoSuchSession { id: String },

    #[error("Upload session already exists: {id}")]
    SessionExists { id: String },

    #[error("Invalid part number: {part_number}")]
    InvalidPartNumber { part_number: u32 },

    #[error("Part {part_number} was never uploaded")]
    MissingPart { part_number: u32 },

    #[error("Invalid content details: {message}")]
    InvalidDetails { message: String },

    #[error("Invalid upload state: {message}")]
    InvalidState { message: String },

    #[error("{endpoint} returned HTTP {status}")]
    Http { status: u16, endpoint: String },

    #[error("Transport error: {source}")]
    Transport {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Object storage error: {source}")]
    Storage {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Metadata store error: {source}")]
    Metadata {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{step} failed: {source} ({n} rollback failures)", n = .rollback_failures.len())]
    Commit {
        step: &'static str,
        #[source]
        source: Box<UploadError>,
        rollback_failures: Vec<UploadError>,
    },

    #[error("Upload cancelled")]
    Cancelled,

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl UploadError {
    /// Create a transport error from any error type
    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            source: Box::new(error),
        }
    }

    /// Create an object storage error from any error type
    pub fn storage<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(error),
        }
    }

    /// Create a metadata store error from any error type
    pub fn metadata<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Metadata {
            source: Box::new(error),
        }
    }

    /// Create a session not found error
    pub fn no_such_session<S: Into<String>>(id: S) -> Self {
        Self::NoSuchSession { id: id.into() }
    }

    /// Create an invalid details error
    pub fn invalid_details<S: Into<String>>(message: S) -> Self {
        Self::InvalidDetails {
            message: message.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state<S: Into<String>>(message: S) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// True for errors a caller can fix by changing the request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingContentType
                | Self::EmptyContent
                | Self::NoSuchSession { .. }
                | Self::InvalidPartNumber { .. }
                | Self::MissingPart { .. }
                | Self::InvalidDetails { .. }
        )
    }
}
