//! Error types for Sealkeeper
//!
//! Verification mismatches are not errors: they come back as `valid = false`
//! outcomes. Everything here is a definitive failure and is never retried.

/// Why a private key reveal was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DisclosureError {
    #[error("missing disclosure token")]
    MissingToken,

    #[error("private key was already disclosed")]
    AlreadyConsumed,

    #[error("invalid disclosure token")]
    InvalidToken,
}

/// Main error type for Sealkeeper operations
#[derive(Debug, thiserror::Error)]
pub enum CustodyError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Envelope could not be authenticated. Deliberately carries no detail:
    /// wrong key and corrupted ciphertext must look the same to callers.
    #[error("envelope integrity check failed")]
    Integrity,

    /// Principal has no key pair
    #[error("No key pair for principal {0}")]
    NoKeyPair(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Disclosure refused: {0}")]
    Disclosure(#[from] DisclosureError),

    /// Principal already has a key pair
    #[error("Key pair already exists for principal {0}")]
    KeyPairExists(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CustodyError {
    /// HTTP-equivalent status for the routing layer
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Config(_) => 500,
            Self::Integrity => 500,
            Self::NoKeyPair(_) => 404,
            Self::NotFound(_) => 404,
            Self::Disclosure(DisclosureError::MissingToken) => 400,
            Self::Disclosure(DisclosureError::AlreadyConsumed) => 410,
            Self::Disclosure(DisclosureError::InvalidToken) => 401,
            Self::KeyPairExists(_) => 409,
            Self::Conflict(_) => 409,
            Self::BadRequest(_) => 400,
            Self::Crypto(_) => 500,
            Self::Database(_) => 503,
            Self::Internal(_) => 500,
        }
    }

    /// Stable machine-readable code for API bodies
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration_error",
            Self::Integrity => "integrity_error",
            Self::NoKeyPair(_) => "keypair_not_found",
            Self::NotFound(_) => "not_found",
            Self::Disclosure(DisclosureError::MissingToken) => "missing_token",
            Self::Disclosure(DisclosureError::AlreadyConsumed) => "private_already_exported",
            Self::Disclosure(DisclosureError::InvalidToken) => "invalid_token",
            Self::KeyPairExists(_) => "keypair_already_exists",
            Self::Conflict(_) => "conflict",
            Self::BadRequest(_) => "bad_request",
            Self::Crypto(_) => "crypto_error",
            Self::Database(_) => "database_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Convert to status code and body tuple for an API response.
    ///
    /// Integrity and internal failures keep their detail server-side.
    pub fn into_status_code_and_body(self) -> (u16, String) {
        let status = self.status_code();
        let body = match &self {
            Self::Integrity | Self::Internal(_) | Self::Crypto(_) => {
                self.error_code().to_string()
            }
            _ => self.to_string(),
        };
        (status, body)
    }
}

// Implement From conversions for common error types

impl From<serde_json::Error> for CustodyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {}", err))
    }
}

impl From<mongodb::error::Error> for CustodyError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<tokio::task::JoinError> for CustodyError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("Blocking task failed: {}", err))
    }
}

/// Result type alias for Sealkeeper operations
pub type Result<T> = std::result::Result<T, CustodyError>;
