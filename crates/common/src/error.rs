//! Error types shared across AutoGain crates.

use std::path::PathBuf;

/// Top-level error type for AutoGain operations.
#[derive(Debug, thiserror::Error)]
pub enum AutogainError {
    #[error("Profile error: {message}")]
    Profile { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Learning error: {message}")]
    Learning { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using AutogainError.
pub type AutogainResult<T> = Result<T, AutogainError>;

impl AutogainError {
    pub fn profile(msg: impl Into<String>) -> Self {
        Self::Profile {
            message: msg.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage {
            message: msg.into(),
        }
    }

    pub fn learning(msg: impl Into<String>) -> Self {
        Self::Learning {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AutogainError::storage("disk full");
        assert_eq!(err.to_string(), "Storage error: disk full");

        let err = AutogainError::FileNotFound {
            path: PathBuf::from("/tmp/missing.csv"),
        };
        assert!(err.to_string().contains("/tmp/missing.csv"));
    }

    #[test]
    fn test_io_error_converts() {
        fn fails() -> AutogainResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(AutogainError::Io(_))));
    }
}
