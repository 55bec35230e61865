use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

const RETRY_MESSAGE: &str = "Please try again.";

/// Everything that can go wrong between a user asking for content and the
/// content being handed back validated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Generation is not configured: {0}")]
    Configuration(String),
}

impl GenerationError {
    /// Text suitable for showing to the person who triggered the generation.
    ///
    /// Upstream, parsing and schema failures all look the same from the
    /// outside: something went wrong and a new attempt is the only remedy.
    pub fn user_message(&self, what: &str) -> String {
        match self {
            GenerationError::InvalidRequest(reason) => reason.clone(),
            GenerationError::Configuration(reason) => {
                format!("Generation is unavailable: {reason}")
            }
            GenerationError::Provider(_)
            | GenerationError::MalformedResponse(_)
            | GenerationError::SchemaMismatch(_) => {
                format!("Failed to generate {what}. {RETRY_MESSAGE}")
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stored payload could not be (de)serialized: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Stored row is corrupt: {0}")]
    Corrupt(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: String, value: String },
}

/// Error type returned by the HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Failed to save {0}")]
    SaveFailed(&'static str),

    #[error("Failed to load {0}")]
    LoadFailed(&'static str),

    #[error("{message}")]
    Generation {
        error: GenerationError,
        message: String,
    },
}

impl ApiError {
    pub fn generation(error: GenerationError, what: &str) -> Self {
        let message = error.user_message(what);
        ApiError::Generation { error, message }
    }

    pub fn saving(error: GatewayError, what: &'static str) -> Self {
        match error {
            GatewayError::Unauthorized => ApiError::Unauthorized,
            GatewayError::Persistence(_) => ApiError::SaveFailed(what),
        }
    }

    pub fn loading(error: GatewayError, what: &'static str) -> Self {
        match error {
            GatewayError::Unauthorized => ApiError::Unauthorized,
            GatewayError::Persistence(e) => {
                log::error!("Error loading {what}: {e}");
                ApiError::LoadFailed(what)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::SaveFailed(_) | ApiError::LoadFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Generation { error, .. } => match error {
                GenerationError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                GenerationError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
                GenerationError::Provider(_)
                | GenerationError::MalformedResponse(_)
                | GenerationError::SchemaMismatch(_) => StatusCode::BAD_GATEWAY,
            },
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_failures_share_one_user_message() {
        let expected = "Failed to generate questions. Please try again.";
        for error in [
            GenerationError::Provider("timeout".into()),
            GenerationError::MalformedResponse("no json".into()),
            GenerationError::SchemaMismatch("3 != 2".into()),
        ] {
            assert_eq!(error.user_message("questions"), expected);
        }
    }

    #[test]
    fn invalid_request_keeps_its_reason() {
        let error = GenerationError::InvalidRequest("Please enter a quiz topic".into());
        assert_eq!(error.user_message("questions"), "Please enter a quiz topic");
    }

    #[test]
    fn status_codes() {
        let cases = [
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ApiError::SaveFailed("quiz"), StatusCode::INTERNAL_SERVER_ERROR),
            (
                ApiError::generation(GenerationError::InvalidRequest("x".into()), "questions"),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::generation(GenerationError::Configuration("x".into()), "questions"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::generation(GenerationError::Provider("x".into()), "questions"),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
