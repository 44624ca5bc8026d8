use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::store::StoreError;
use crate::workflow::{Action, LeaveStatus};

#[derive(Debug, Error)]
pub enum LeaveError {
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("insufficient balance: requested {requested} day(s), {remaining} remaining")]
    InsufficientBalance { requested: u32, remaining: i64 },

    #[error("{0}")]
    Unauthorized(String),

    #[error("cannot {action} a leave request that is {status}")]
    InvalidState { status: LeaveStatus, action: Action },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type LeaveResult<T> = Result<T, LeaveError>;

impl LeaveError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        LeaveError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LeaveError::Validation { .. } => "validation",
            LeaveError::InsufficientBalance { .. } => "balance",
            LeaveError::Unauthorized(_) => "authorization",
            LeaveError::InvalidState { .. } => "invalid_state",
            LeaveError::NotFound(_) => "not_found",
            LeaveError::Ledger(_) | LeaveError::Store(_) => "internal",
        }
    }
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::Validation { .. }
            | LeaveError::InsufficientBalance { .. }
            | LeaveError::InvalidState { .. } => StatusCode::BAD_REQUEST,
            LeaveError::Unauthorized(_) => StatusCode::FORBIDDEN,
            LeaveError::NotFound(_) => StatusCode::NOT_FOUND,
            LeaveError::Ledger(_) | LeaveError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };

        let mut body = json!({
            "kind": self.kind(),
            "message": message,
        });
        if let LeaveError::Validation { field, .. } = self {
            body["field"] = json!(field);
        }

        HttpResponse::build(status).json(json!({ "error": body }))
    }
}
