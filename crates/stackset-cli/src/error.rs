use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StackSetError>;

/// A failed call against CloudFormation or STS.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{action} failed: {message}")]
pub struct ProviderError {
    pub action: &'static str,
    pub message: String,
}

impl ProviderError {
    pub fn new(action: &'static str, message: impl Into<String>) -> Self {
        Self {
            action,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StackSetError {
    #[error("invalid stackset configuration: {0}")]
    InvalidDescriptor(String),

    #[error("caller identity unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("account number is unknown; cannot build the administration role ARN")]
    MissingAccountNumber,

    #[error("read template {}", path.display())]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{action} was not accepted: {reason}")]
    OperationSubmissionFailed { action: &'static str, reason: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
