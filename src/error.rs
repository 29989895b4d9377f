use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/**
 * Bead error type - user facing diagnostics via miette
 *
 * Recoverable situations (junk files in a box, a vanished box directory)
 * never surface here; they degrade to empty or partial results instead.
 */
#[derive(Error, Debug, Diagnostic)]
pub enum BeadError {
    #[error("IO error: {0}")]
    #[diagnostic(code(bead::io_error))]
    Io(#[from] std::io::Error),

    #[error("Box \"{box_name}\": {message}")]
    #[diagnostic(
        code(bead::storage_error),
        help("Make sure the box directory exists and is a directory")
    )]
    Storage { box_name: String, message: String },

    #[error("Invalid archive {}: {reason}", path.display())]
    #[diagnostic(
        code(bead::invalid_archive),
        help("The archive is corrupt or was modified after it was frozen")
    )]
    InvalidArchive { path: PathBuf, reason: String },

    #[error("Not found: {0}")]
    #[diagnostic(code(bead::not_found))]
    NotFound(String),

    #[error("Invariant violated: {0}")]
    #[diagnostic(
        code(bead::invariant),
        help("This indicates corrupted box content, e.g. two different beads with the same freeze time")
    )]
    Invariant(String),

    #[error("Invalid sketch: {0}")]
    #[diagnostic(code(bead::invalid_sketch))]
    InvalidSketch(String),

    #[error("Invalid timestamp: {0}")]
    #[diagnostic(
        code(bead::timestamp_error),
        help("Use the compact form 20160704T162800000000+0200 or RFC 3339")
    )]
    Timestamp(String),

    #[error("Workspace error: {0}")]
    #[diagnostic(code(bead::workspace_error))]
    Workspace(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(bead::config_error))]
    Config(String),

    #[error("JSON error: {0}")]
    #[diagnostic(code(bead::json_error))]
    Json(#[from] serde_json::Error),

    #[error("Zip error: {0}")]
    #[diagnostic(code(bead::zip_error))]
    Zip(#[from] zip::result::ZipError),
}

impl BeadError {
    /**
     * Create a box storage error
     */
    pub fn storage_error(box_name: impl Into<String>, message: impl Into<String>) -> Self {
        BeadError::Storage {
            box_name: box_name.into(),
            message: message.into(),
        }
    }

    /**
     * Create an invalid archive error
     */
    pub fn invalid_archive(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        BeadError::InvalidArchive {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        BeadError::NotFound(message.into())
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        BeadError::Invariant(message.into())
    }

    pub fn workspace_error(message: impl Into<String>) -> Self {
        BeadError::Workspace(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BeadError::NotFound(_))
    }

    pub fn is_invalid_archive(&self) -> bool {
        matches!(self, BeadError::InvalidArchive { .. })
    }
}

impl From<config::ConfigError> for BeadError {
    fn from(error: config::ConfigError) -> Self {
        BeadError::Config(error.to_string())
    }
}

/**
 * Crate wide result type
 */
pub type Result<T> = std::result::Result<T, BeadError>;
