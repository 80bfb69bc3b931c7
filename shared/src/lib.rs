// shared/src/lib.rs

use std::time::Duration;

/// Workspace-wide error. Every variant maps to exactly one [`ErrorCode`],
/// so callers classify failures by matching instead of inspecting messages.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("not found")]
    NotFound,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("internal: {0}")]
    Internal(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("canceled")]
    Canceled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotFound,
    InvalidArgument,
    Internal,
    Unavailable,
    Canceled,
    DeadlineExceeded,
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::NotFound => ErrorCode::NotFound,
            Error::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Error::Internal(_) => ErrorCode::Internal,
            Error::Unavailable(_) => ErrorCode::Unavailable,
            Error::Canceled => ErrorCode::Canceled,
            Error::DeadlineExceeded => ErrorCode::DeadlineExceeded,
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Error::Unavailable(msg.into())
    }
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "not_found",
            ErrorCode::InvalidArgument => "invalid_argument",
            ErrorCode::Internal => "internal",
            ErrorCode::Unavailable => "unavailable",
            ErrorCode::Canceled => "canceled",
            ErrorCode::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TtlMs(pub u64);

impl TtlMs {
    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.0)
    }
}

pub mod config;
