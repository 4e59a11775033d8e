//! Client-side error taxonomy.
//!
//! Every failure a caller can see is a [`ClientError`]. Failures that have to be
//! stored or shared (cache entries, coalesced readers) are summarized as a
//! cloneable [`ErrorInfo`].

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::models::Role;

/// Stable, machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Backend rejected the request (4xx)
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    UnprocessableEntity,
    TooManyRequests,

    // Backend failed (5xx)
    InternalError,
    ServiceUnavailable,
    ExternalServiceError,

    // Never reached or never understood the backend
    Network,
    InvalidResponse,
    ValidationError,
    Unauthenticated,
    PaymentFailed,
}

impl ErrorCode {
    /// Map an HTTP status to the closest error code
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => ErrorCode::BadRequest,
            StatusCode::UNAUTHORIZED => ErrorCode::Unauthorized,
            StatusCode::FORBIDDEN => ErrorCode::Forbidden,
            StatusCode::NOT_FOUND => ErrorCode::NotFound,
            StatusCode::CONFLICT => ErrorCode::Conflict,
            StatusCode::UNPROCESSABLE_ENTITY => ErrorCode::UnprocessableEntity,
            StatusCode::TOO_MANY_REQUESTS => ErrorCode::TooManyRequests,
            StatusCode::SERVICE_UNAVAILABLE => ErrorCode::ServiceUnavailable,
            StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT => {
                ErrorCode::ExternalServiceError
            }
            s if s.is_client_error() => ErrorCode::BadRequest,
            _ => ErrorCode::InternalError,
        }
    }

    /// Get the string representation of the error code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "bad_request",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::NotFound => "not_found",
            ErrorCode::Conflict => "conflict",
            ErrorCode::UnprocessableEntity => "unprocessable_entity",
            ErrorCode::TooManyRequests => "too_many_requests",
            ErrorCode::InternalError => "internal_error",
            ErrorCode::ServiceUnavailable => "service_unavailable",
            ErrorCode::ExternalServiceError => "external_service_error",
            ErrorCode::Network => "network",
            ErrorCode::InvalidResponse => "invalid_response",
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::Unauthenticated => "unauthenticated",
            ErrorCode::PaymentFailed => "payment_failed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-level validation failures, field name -> messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(HashMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn fields(&self) -> &HashMap<String, Vec<String>> {
        &self.0
    }

    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() == 1 {
            let message = self
                .0
                .values()
                .next()
                .and_then(|v| v.first())
                .map(String::as_str)
                .unwrap_or("Validation failed");
            f.write_str(message)
        } else {
            write!(f, "Validation failed for {} fields", self.0.len())
        }
    }
}

/// Step of the pay-then-book flow that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStep {
    VerifyPayment,
    Book,
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckoutStep::VerifyPayment => f.write_str("payment verification"),
            CheckoutStep::Book => f.write_str("booking"),
        }
    }
}

pub const CHECKOUT_FAILED_MESSAGE: &str =
    "Payment Failed! Please verify your payment details and try again";

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response
    #[error("Request failed: {0}")]
    Transport(String),

    /// No session token is available for an operation that needs one
    #[error("Authentication required. Log in first.")]
    Unauthenticated,

    /// The current session's role may not invoke this operation
    #[error("This action requires the {required} role")]
    Forbidden { required: Role },

    /// The backend answered with a non-success status
    #[error("Server returned error {status}: {message}")]
    Http {
        code: ErrorCode,
        status: u16,
        message: String,
    },

    /// The response body could not be parsed
    #[error("Failed to parse response: {0}")]
    Decode(String),

    /// Input was rejected before it reached the network
    #[error("{0}")]
    Validation(ValidationErrors),

    /// A multi-step checkout stopped; earlier steps are not rolled back
    #[error("{}", CHECKOUT_FAILED_MESSAGE)]
    Checkout { step: CheckoutStep, message: String },
}

impl ClientError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ClientError::Transport(_) => ErrorCode::Network,
            ClientError::Unauthenticated => ErrorCode::Unauthenticated,
            ClientError::Forbidden { .. } => ErrorCode::Forbidden,
            ClientError::Http { code, .. } => *code,
            ClientError::Decode(_) => ErrorCode::InvalidResponse,
            ClientError::Validation(_) => ErrorCode::ValidationError,
            ClientError::Checkout { .. } => ErrorCode::PaymentFailed,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn validation_field(field: &str, message: impl Into<String>) -> Self {
        let mut builder = ValidationErrorBuilder::new();
        builder.add(field, message);
        ClientError::Validation(ValidationErrors(builder.errors))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

/// Cloneable summary of a failed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub status: Option<u16>,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            status: None,
            message: message.into(),
        }
    }
}

impl From<&ClientError> for ErrorInfo {
    fn from(err: &ClientError) -> Self {
        Self {
            code: err.code(),
            status: err.status(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ErrorInfo {}

// -------------------------------------------------------------------------
// Builder for validation errors
// -------------------------------------------------------------------------

/// Builder for collecting multiple validation errors
#[derive(Debug, Default)]
pub struct ValidationErrorBuilder {
    errors: HashMap<String, Vec<String>>,
}

impl ValidationErrorBuilder {
    /// Create a new validation error builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation error for a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    /// Record the outcome of a single-field check
    pub fn check(&mut self, field: &str, result: Result<(), String>) -> &mut Self {
        if let Err(message) = result {
            self.add(field, message);
        }
        self
    }

    /// Check if there are any errors
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Build the error if there are any
    pub fn build(self) -> Option<ClientError> {
        if self.errors.is_empty() {
            None
        } else {
            Some(ClientError::Validation(ValidationErrors(self.errors)))
        }
    }

    /// Return Ok(()) if no errors, or Err(ClientError) if there are errors
    pub fn finish(self) -> Result<(), ClientError> {
        match self.build() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
