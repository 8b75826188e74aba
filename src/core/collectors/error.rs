use thiserror::Error;

/// Error type shared by every account-state collector.
///
/// None of these ever escape a poll: the snapshot builder downgrades each one
/// to an empty contribution and logs it.
#[derive(Error, Debug)]
pub enum CollectorError {
    /// A directory that should list one file per account is missing or unreadable.
    #[error("Failed to access directory {path}")]
    DirectoryAccess {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a file from disk.
    #[error("Failed to read file {path}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Content was present but could not be turned into the expected value.
    #[error("Failed to parse {metric} from {location}: {reason}")]
    ParseError {
        metric: String,
        location: String,
        reason: String,
    },

    /// An external command could not be launched.
    #[error("Command '{command}' failed: {source}")]
    CommandExecution {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Catch-all for errors that don't fit other variants.
    #[error("Other error: {0}")]
    Other(String),
}

impl CollectorError {
    pub(crate) fn directory(path: &std::path::Path, source: std::io::Error) -> Self {
        CollectorError::DirectoryAccess {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn file(path: &std::path::Path, source: std::io::Error) -> Self {
        CollectorError::FileRead {
            path: path.display().to_string(),
            source,
        }
    }
}
