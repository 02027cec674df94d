use thiserror::Error;

/// Result type for protoscan operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for protoscan operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A whole snapshot could not be loaded (fatal to that level's pass only)
    #[error("Snapshot load error for level {level}: {message}")]
    SnapshotLoad { level: String, message: String },

    /// A single file of a snapshot could not be loaded or type-checked
    #[error("File load error in {file}: {message}")]
    FileLoad { file: String, message: String },

    /// Classification of a node failed unexpectedly
    #[error("Classification error: {0}")]
    Classify(String),

    /// No classification rule matched a candidate node
    #[error("Unclassifiable node: {0}")]
    Unclassifiable(String),

    /// Entry sink errors
    #[error("Sink error: {0}")]
    Sink(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Creates a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a snapshot load error
    pub fn snapshot_load(level: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SnapshotLoad {
            level: level.into(),
            message: message.into(),
        }
    }

    /// Creates a file load error
    pub fn file_load(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileLoad {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Creates a classification error
    pub fn classify(msg: impl Into<String>) -> Self {
        Self::Classify(msg.into())
    }

    /// Creates an unclassifiable-node error
    pub fn unclassifiable(msg: impl Into<String>) -> Self {
        Self::Unclassifiable(msg.into())
    }

    /// Creates a sink error
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Creates an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// True for the condition the correlator downgrades to a SKIP entry
    pub fn is_unclassifiable(&self) -> bool {
        matches!(self, Self::Unclassifiable(_))
    }

    /// Adds context to any error
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::with_context(context, e))
    }
}
