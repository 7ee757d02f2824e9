//! Error type shared by all collaborators.

use thiserror::Error;

/// Failure of an external call.
///
/// `Transient` and `Timeout` are worth retrying at the stage boundary;
/// `Permanent` means the input itself is unusable for this collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("transient collaborator failure: {0}")]
    Transient(String),

    #[error("permanent collaborator failure: {0}")]
    Permanent(String),

    #[error("collaborator call timed out after {0} ms")]
    Timeout(u64),

    #[error("collaborator call cancelled")]
    Cancelled,
}

impl CollaboratorError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transient(_) => "transient",
            Self::Permanent(_) => "permanent",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(CollaboratorError::transient("503").is_retryable());
        assert!(CollaboratorError::Timeout(500).is_retryable());
        assert!(!CollaboratorError::permanent("bad slide").is_retryable());
        assert!(!CollaboratorError::Cancelled.is_retryable());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            CollaboratorError::Timeout(250).to_string(),
            "collaborator call timed out after 250 ms"
        );
        assert_eq!(
            CollaboratorError::permanent("not configured").to_string(),
            "permanent collaborator failure: not configured"
        );
    }
}
