use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error types for unasync operations
#[derive(Error, Debug)]
pub enum UnasyncError {
    /// A substitution key was supplied twice (built-in and override, or two overrides)
    #[error("Configuration error: duplicate substitution key '{key}'")]
    Configuration { key: String },

    /// `destination_for` was asked about a path outside the rule's source root
    #[error("Path {path} is not under rule source root {root}")]
    PathMismatch { path: PathBuf, root: PathBuf },

    /// Source bytes could not be decoded, or output could not be encoded back
    #[error("Encoding error in {path}: {message}")]
    Encoding { path: PathBuf, message: String },

    /// The lexer could not produce a token stream
    #[error("Tokenize error in {path} at line {line}: {message}")]
    Tokenize {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Filesystem failure while reading, creating directories or writing
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Configuration files could not be loaded or deserialized
    #[error("Config error: {0}")]
    Config(#[from] ::config::ConfigError),
}

impl UnasyncError {
    /// Create an I/O error tied to the path being worked on
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Create an encoding error for a file
    pub fn encoding(path: &Path, message: impl Into<String>) -> Self {
        Self::Encoding {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Result type for unasync operations
pub type Result<T> = std::result::Result<T, UnasyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_keeps_os_cause() {
        let err = UnasyncError::io(
            Path::new("/tmp/x.py"),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(
            err,
            UnasyncError::Io { ref source, .. } if source.kind() == io::ErrorKind::PermissionDenied
        ));
        assert!(err.to_string().contains("/tmp/x.py"));
    }

    #[test]
    fn configuration_error_names_key() {
        let err = UnasyncError::Configuration {
            key: "await".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Configuration error: duplicate substitution key 'await'"
        );
    }
}
