use thiserror::Error;

use crate::domain::entities::entitlement::IdentityConflict;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Too many requests. Please slow down.")]
    RateLimited,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Payment setup not verified: {0}")]
    SetupNotVerified(String),

    #[error("Billing identity conflict: {0}")]
    BillingIdentityConflict(String),

    #[error("Entitlement record changed concurrently")]
    VersionConflict,

    #[error("Billing provider error: {0}")]
    Provider(String),

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<IdentityConflict> for AppError {
    fn from(err: IdentityConflict) -> Self {
        AppError::BillingIdentityConflict(err.to_string())
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    DatabaseError,
    InvalidCredentials,
    InvalidSignature,
    RateLimited,
    InvalidInput,
    SetupNotVerified,
    BillingIdentityConflict,
    VersionConflict,
    ProviderError,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::SetupNotVerified => "SETUP_NOT_VERIFIED",
            ErrorCode::BillingIdentityConflict => "BILLING_IDENTITY_CONFLICT",
            ErrorCode::VersionConflict => "VERSION_CONFLICT",
            ErrorCode::ProviderError => "PROVIDER_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
