use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Application #{index} not found ({len} on file)")]
    NotFound { index: usize, len: usize },

    #[error("Invalid application: {0}")]
    Invalid(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error in '{path}': {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

/// A single message that could not be read. Never aborts a scan.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("malformed message: {0}")]
    Parse(#[from] mailparse::MailParseError),
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to connect to {server}:{port}: {reason}")]
    Connect {
        server: String,
        port: u16,
        reason: String,
    },

    #[error("Login failed: {0}")]
    Login(imap::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("IMAP error: {0}")]
    Imap(#[from] imap::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
