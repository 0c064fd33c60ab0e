use thiserror::Error;

use crate::api_client::ApiError;
use crate::upload::UploadError;

/// Client-level error type.
/// Every variant knows the message a user should see for it.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Upload(err) => {
                if !err.is_validation() {
                    tracing::error!("Resume read failed: {err}");
                }
                err.to_string()
            }
            AppError::Api(err) => {
                tracing::error!("API error: {err}");
                err.user_message()
            }
            AppError::Internal(err) => {
                tracing::error!("Internal error: {err:?}");
                "An internal error occurred".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::Operation;

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = AppError::from(UploadError::InvalidExtension);
        assert_eq!(err.user_message(), "Please upload a .tex file only");

        let err = AppError::Validation("Add a job description first".to_string());
        assert_eq!(err.user_message(), "Add a job description first");
    }

    #[test]
    fn test_server_detail_reaches_user() {
        let err = AppError::from(ApiError::Server {
            op: Operation::Compile,
            status: 422,
            detail: Some("Undefined control sequence".to_string()),
        });
        assert_eq!(err.user_message(), "Undefined control sequence");
    }

    #[test]
    fn test_internal_error_is_generic() {
        let err = AppError::from(anyhow::anyhow!("pool poisoned"));
        assert_eq!(err.user_message(), "An internal error occurred");
    }
}
