/// Coarse classification used by callers to pick a response status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed JSON or a missing required field.
    Validation,
    /// Well-formed input that cannot satisfy a resource construction rule.
    Construction,
    /// A fault in the composer itself. Details must not reach the caller.
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("invalid request body at {path}: {message}")]
    InvalidJson { path: String, message: String },
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Construction(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("composed message has unresolved references: {}", .0.join(", "))]
    DanglingReferences(Vec<String>),
    #[error("failed to render message: {0}")]
    Render(#[from] fhir::FhirError),
}

impl ComposeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ComposeError::InvalidJson { .. } | ComposeError::Validation(_) => ErrorKind::Validation,
            ComposeError::Construction(_) => ErrorKind::Construction,
            ComposeError::InvalidConfig(_)
            | ComposeError::DanglingReferences(_)
            | ComposeError::Render(_) => ErrorKind::Internal,
        }
    }
}

pub type ComposeResult<T> = std::result::Result<T, ComposeError>;
