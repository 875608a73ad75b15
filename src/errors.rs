use crate::models::EntryKind;
use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    #[error("{kind} value must be {rule}")]
    InvalidValue { kind: EntryKind, rule: &'static str },
    #[error("no {kind} entry at position {index}")]
    NoEntry { kind: EntryKind, index: usize },
    #[error("calculate {0} first")]
    NothingToSend(EntryKind),
}

#[derive(Debug, Error, PartialEq)]
pub enum TipError {
    #[error("invalid {}: must be a number of 0 or more", .fields.join(", "))]
    InvalidInput { fields: Vec<&'static str> },
    #[error("please enter valid percentages (0 or greater)")]
    InvalidPercent,
}

#[derive(Debug, Error, PartialEq)]
pub enum HoursError {
    #[error("invalid {field} time '{value}', expected HH:MM")]
    InvalidClock { field: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to encode {key}: {source}")]
    Encode {
        key: &'static str,
        source: serde_json::Error,
    },
    #[error("failed to write data file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize data file: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq)]
pub enum OfflineError {
    #[error("network request for {0} failed")]
    Network(String),
    #[error("precache of {url} returned status {status}")]
    BadStatus { url: String, status: u16 },
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        Self::internal(err)
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NoEntry { .. } => Self::not_found(err.to_string()),
            _ => Self::bad_request(err.to_string()),
        }
    }
}

impl From<TipError> for AppError {
    fn from(err: TipError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<HoursError> for AppError {
    fn from(err: HoursError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
