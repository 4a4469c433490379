use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use dcfm_merge::MergeError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("missing required upload field '{0}'")]
    MissingField(&'static str),

    #[error("malformed multipart body: {0}")]
    Multipart(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Merge(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            Self::MissingField(_) | Self::Multipart(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "rejected request");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_fault() {
        let missing = ServerError::Merge(MergeError::MissingSheet {
            sheet: "Consensus".into(),
            source_name: "consensus".into(),
        });
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ServerError::MissingField("consensus").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServerError::Merge(MergeError::MissingTemplateSheet("DCF Model".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ServerError::Internal("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn message_names_the_sheet() {
        let err = ServerError::Merge(MergeError::MissingSheet {
            sheet: "Consensus".into(),
            source_name: "consensus".into(),
        });
        assert_eq!(err.to_string(), "'Consensus' sheet not found in the consensus file");
    }
}
