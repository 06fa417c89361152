//! Error types for the Infra provider.

use thiserror::Error;

use crate::client::ApiError;
use crate::schema::Diagnostic;

/// Errors raised while serving a provider request.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested entity was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider is not (or not correctly) configured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A state or config document could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// The entity already exists.
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// The access key is missing, invalid, or lacks the needed privilege.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The Infra server could not be reached or failed.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The Infra server rejected the request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The operation is not supported for this type.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// Any other API failure.
    #[error("API error: {0}")]
    Api(String),

    /// Several independent problems found in one operation.
    #[error("{}", join_summaries(.0))]
    Diagnostics(Vec<Diagnostic>),
}

fn join_summaries(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.summary.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ProviderError {
    /// The message without its category prefix.
    pub fn message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Configuration(msg)
            | Self::UnknownResource(msg)
            | Self::AlreadyExists(msg)
            | Self::PermissionDenied(msg)
            | Self::Unavailable(msg)
            | Self::InvalidRequest(msg)
            | Self::Unimplemented(msg)
            | Self::Api(msg) => msg.clone(),
            Self::Serialization(err) => err.to_string(),
            Self::Transport(err) => err.to_string(),
            Self::Diagnostics(diagnostics) => join_summaries(diagnostics),
        }
    }

    /// Convert into host-visible error diagnostics.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        match self {
            Self::Diagnostics(diagnostics) => diagnostics,
            other => vec![Diagnostic::error(other.to_string())],
        }
    }
}

impl From<ApiError> for ProviderError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, message } => match status {
                404 => Self::NotFound(message),
                401 | 403 => Self::PermissionDenied(message),
                409 => Self::AlreadyExists(message),
                400 | 422 => Self::InvalidRequest(message),
                500..=599 => Self::Unavailable(message),
                _ => Self::Api(format!("{} ({})", message, status)),
            },
            ApiError::Network(e) => Self::Unavailable(e.to_string()),
            ApiError::Config(msg) => Self::Configuration(msg),
            other @ ApiError::Decode { .. } => Self::Api(other.to_string()),
        }
    }
}

impl From<crate::id::IdError> for ProviderError {
    fn from(err: crate::id::IdError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<crate::duration::DurationError> for ProviderError {
    fn from(err: crate::duration::DurationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<crate::pem::PemError> for ProviderError {
    fn from(err: crate::pem::PemError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        let msg = err.to_string();
        match err {
            ProviderError::NotFound(_) | ProviderError::UnknownResource(_) => {
                tonic::Status::not_found(msg)
            }
            ProviderError::Validation(_)
            | ProviderError::Serialization(_)
            | ProviderError::InvalidRequest(_)
            | ProviderError::Diagnostics(_) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(_) => tonic::Status::failed_precondition(msg),
            ProviderError::Transport(_) | ProviderError::Unavailable(_) => {
                tonic::Status::unavailable(msg)
            }
            ProviderError::AlreadyExists(_) => tonic::Status::already_exists(msg),
            ProviderError::PermissionDenied(_) => tonic::Status::permission_denied(msg),
            ProviderError::Unimplemented(_) => tonic::Status::unimplemented(msg),
            ProviderError::Api(_) => tonic::Status::internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> ProviderError {
        ApiError::Status {
            status,
            message: "boom".to_string(),
        }
        .into()
    }

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("user not found: a@b.co".to_string());
        assert_eq!(err.to_string(), "Resource not found: user not found: a@b.co");
        assert_eq!(err.message(), "user not found: a@b.co");

        let err = ProviderError::UnknownResource("infra_widget".to_string());
        assert_eq!(err.to_string(), "Unknown resource type: infra_widget");
    }

    #[test]
    fn test_api_status_mapping() {
        assert!(matches!(api(404), ProviderError::NotFound(_)));
        assert!(matches!(api(401), ProviderError::PermissionDenied(_)));
        assert!(matches!(api(403), ProviderError::PermissionDenied(_)));
        assert!(matches!(api(409), ProviderError::AlreadyExists(_)));
        assert!(matches!(api(400), ProviderError::InvalidRequest(_)));
        assert!(matches!(api(422), ProviderError::InvalidRequest(_)));
        assert!(matches!(api(502), ProviderError::Unavailable(_)));
        assert!(matches!(api(418), ProviderError::Api(_)));
    }

    #[test]
    fn test_error_to_status() {
        let cases = [
            (ProviderError::NotFound("x".into()), tonic::Code::NotFound),
            (ProviderError::Validation("x".into()), tonic::Code::InvalidArgument),
            (ProviderError::Configuration("x".into()), tonic::Code::FailedPrecondition),
            (ProviderError::AlreadyExists("x".into()), tonic::Code::AlreadyExists),
            (ProviderError::PermissionDenied("x".into()), tonic::Code::PermissionDenied),
            (ProviderError::Unavailable("x".into()), tonic::Code::Unavailable),
            (ProviderError::Unimplemented("x".into()), tonic::Code::Unimplemented),
            (ProviderError::Api("x".into()), tonic::Code::Internal),
        ];
        for (err, code) in cases {
            let status: tonic::Status = err.into();
            assert_eq!(status.code(), code);
        }
    }

    #[test]
    fn test_diagnostics_variant_expands() {
        let err = ProviderError::Diagnostics(vec![
            Diagnostic::error("user not found: a@b.co"),
            Diagnostic::error("group not found: devs"),
        ]);
        assert_eq!(
            err.to_string(),
            "user not found: a@b.co; group not found: devs"
        );
        assert_eq!(err.into_diagnostics().len(), 2);
    }

    #[test]
    fn test_id_error_is_validation() {
        let err: ProviderError = crate::id::Id::parse("0").unwrap_err().into();
        assert_eq!(
            err.to_string(),
            "Validation error: invalid base58: byte 0 is out of range"
        );
    }
}
