use thiserror::Error;

/// votetrack error types
#[derive(Error, Debug)]
pub enum VotetrackError {
    /// Missing or invalid configuration (options, paths, keys)
    #[error("config error: {0}")]
    Config(String),

    /// Record store failure (unreadable table, broken snapshot)
    #[error("data source error: {0}")]
    DataSource(String),

    /// Failed to parse or serialize JSON
    #[error("parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Options file could not be locked or written
    #[error("options error: {0}")]
    Options(String),
}

/// Result type alias for votetrack
pub type Result<T> = std::result::Result<T, VotetrackError>;
