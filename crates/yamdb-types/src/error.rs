#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),
    #[error("Invalid token subject: {0}")]
    InvalidSubject(String),
}
