use thiserror::Error;

use crate::domain::thread::BackingStore;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unsupported database type `{0}` (expected mongodb|postgres)")]
    UnsupportedBackingStore(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("validation failure: {0}")]
    Validation(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("{dependency} failure: {message}")]
    ExternalDependency { dependency: &'static str, message: String },
    #[error("agent did not reach a final answer within {max_steps} steps")]
    TurnCeilingExceeded { max_steps: usize },
    #[error("thread `{thread_id}` belongs to {pinned}, not {requested}")]
    ThreadStoreMismatch { thread_id: String, pinned: BackingStore, requested: BackingStore },
}

impl ApplicationError {
    pub fn dependency(dependency: &'static str, message: impl Into<String>) -> Self {
        Self::ExternalDependency { dependency, message: message.into() }
    }

    /// Stable machine-readable kind used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Domain(_) | Self::Validation(_) => "validation",
            Self::Configuration(_) => "configuration",
            Self::ExternalDependency { .. } => "external_dependency",
            Self::TurnCeilingExceeded { .. } => "turn_ceiling_exceeded",
            Self::ThreadStoreMismatch { .. } => "thread_store_mismatch",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String, user_message: &'static str },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Internal { user_message, .. } => user_message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. } | Self::Internal { correlation_id, .. } => {
                correlation_id
            }
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id: unassigned }
            }
            error @ (ApplicationError::Validation(_)
            | ApplicationError::ThreadStoreMismatch { .. }) => {
                Self::BadRequest { message: error.to_string(), correlation_id: unassigned }
            }
            error @ ApplicationError::Configuration(_) => Self::Internal {
                message: error.to_string(),
                correlation_id: unassigned,
                user_message: "The service is misconfigured for this request.",
            },
            error @ ApplicationError::ExternalDependency { .. } => Self::Internal {
                message: error.to_string(),
                correlation_id: unassigned,
                user_message: "An upstream dependency failed. Please retry shortly.",
            },
            error @ ApplicationError::TurnCeilingExceeded { .. } => Self::Internal {
                message: error.to_string(),
                correlation_id: unassigned,
                user_message: "The assistant could not reach an answer for this request.",
            },
        }
    }
}
