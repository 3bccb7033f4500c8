use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GuardError {
    #[error("session_timeout_minutes must be a positive number, got {0}")]
    InvalidSessionTimeout(f64),
}
