use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a run before the file system is touched.
#[derive(Debug, Error)]
pub enum RsrError {
    #[error("The directory '{}' does not exist.", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("Invalid regex pattern:\n\t{pattern}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Incompatible options: {0}")]
    IncompatibleOptions(String),
    #[error("Could not read the directory '{}'", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = RsrError> = std::result::Result<T, E>;
