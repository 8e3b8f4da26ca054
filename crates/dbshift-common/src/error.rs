use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    /// The version table could not be created or read, or held a value that is
    /// not a valid schema version.
    #[error("bookkeeping error: {0}")]
    Bookkeeping(String),

    #[error("failed to begin transaction for v{version}: {message}")]
    Transaction { version: u32, message: String },

    /// A migration body failed. `version` is the version the step would have
    /// produced, so step index `version - 1`.
    #[error("migration to v{version} ({name}) failed: {message}")]
    StepExecution {
        version: u32,
        name: String,
        message: String,
    },

    #[error("failed to record schema version v{version}: {message}")]
    VersionWrite { version: u32, message: String },

    #[error("failed to commit upgrade to v{version}: {message}")]
    Commit { version: u32, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The target version of the step that failed, for errors raised inside the
    /// upgrade loop.
    pub fn failed_version(&self) -> Option<u32> {
        match self {
            Error::Transaction { version, .. }
            | Error::StepExecution { version, .. }
            | Error::VersionWrite { version, .. }
            | Error::Commit { version, .. } => Some(*version),
            _ => None,
        }
    }
}
