use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RatingError {
    #[error("Rating is required")]
    Missing,

    #[error("Rating must be a finite number")]
    NotFinite,

    #[error("Rating must be between 0.5 and 5 in 0.5 increments")]
    OutOfRange(f64),

    #[error("Rating must be between 0.5 and 5 in 0.5 increments")]
    NotHalfStep(f64),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Invalid issuer key")]
    InvalidKey,

    #[error("Signature verification failed")]
    BadSignature,

    #[error("Token expired")]
    Expired,
}

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hash(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}
