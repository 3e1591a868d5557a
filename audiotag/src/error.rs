use thiserror::Error;

/// The taxonomy every parser and the dispatcher surface through. There is no
/// local recovery: a failure bubbles straight to the public `extract` entry
/// point carrying one of these kinds plus a human-readable message.
#[derive(Error, Debug)]
pub enum TagError {
    #[error("file not found: {0}")]
    FileMissing(String),

    #[error("i/o failure: {0}")]
    IoFailed(String),

    #[error("unsupported file extension: {0}")]
    UnsupportedFile(String),

    #[error("invalid container format: {0}")]
    FormatInvalid(String),

    #[error("unsupported tag version: {0}")]
    UnsupportedVersion(String),

    #[error("inconsistent unsynchronisation flags: {0}")]
    Inconsistency(String),
}

impl From<std::io::Error> for TagError {
    fn from(err: std::io::Error) -> Self {
        TagError::IoFailed(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for TagError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        TagError::FormatInvalid(format!("invalid utf-8 sequence: {err}"))
    }
}
