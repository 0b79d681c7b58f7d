use std::collections::BTreeMap;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::{Method, StatusCode};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error};

use crate::permissions::Denied;

pub type Error = anyhow::Error;
pub type Result<T, E = Error> = std::result::Result<T, E>;
pub type ApiResult<T> = std::result::Result<T, ApiError>;

const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Messages keyed by request field, serialized as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(|v| v.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Nested paths like `genre[1]` are reported under their top level field
fn top_level_field(path: &str) -> &str {
    let end = path.find(['.', '[']).unwrap_or(path.len());
    match &path[..end] {
        "" => NON_FIELD_ERRORS,
        field => field,
    }
}

impl From<&garde::Report> for FieldErrors {
    fn from(report: &garde::Report) -> Self {
        let mut errors = FieldErrors::new();
        for (path, error) in report.iter() {
            let path = path.to_string();
            errors.add(top_level_field(&path), error.message().to_string());
        }
        errors
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    #[error("Permission denied")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method {0} not allowed")]
    MethodNotAllowed(Method),

    #[error("Data access error: {0}")]
    DalError(yamdb_dal::Error),

    #[error("Token error: {0}")]
    TokenError(#[from] yamdb_auth::Error),

    #[error("Mail error: {0}")]
    MailError(#[from] crate::mail::MailError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl ApiError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation(FieldErrors::single(field, message))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::DalError(_)
            | ApiError::TokenError(_)
            | ApiError::MailError(_)
            | ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<yamdb_dal::Error> for ApiError {
    fn from(e: yamdb_dal::Error) -> Self {
        use yamdb_dal::Error as DalError;
        match e {
            DalError::RecordNotFound(what) => ApiError::NotFound(what),
            DalError::DatabaseError(yamdb_dal::SqlxError::RowNotFound) => {
                ApiError::NotFound("Record".to_string())
            }
            DalError::Duplicate { field } => {
                let message = format!("Record with this {field} already exists.");
                ApiError::field(field, message)
            }
            DalError::InvalidReference { field, value } => {
                ApiError::field(field, format!("Object with slug={value} does not exist."))
            }
            DalError::DuplicateReview => {
                ApiError::field(NON_FIELD_ERRORS, "You have already reviewed this title.")
            }
            DalError::InvalidCredentials => {
                ApiError::field("confirmation_code", "Invalid confirmation code.")
            }
            other => ApiError::DalError(other),
        }
    }
}

impl From<Denied> for ApiError {
    fn from(denied: Denied) -> Self {
        match denied {
            Denied::Unauthenticated => {
                ApiError::Unauthenticated("Authentication credentials were not provided.".into())
            }
            Denied::Forbidden => ApiError::Forbidden,
        }
    }
}

impl From<&garde::Report> for ApiError {
    fn from(report: &garde::Report) -> Self {
        ApiError::Validation(report.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {self}");
        } else {
            debug!("Request rejected: {self}");
        }
        match self {
            ApiError::Validation(errors) => (status, Json(errors)).into_response(),
            ApiError::BadRequest(detail)
            | ApiError::Unauthenticated(detail)
            | ApiError::NotFound(detail) => {
                let detail = if status == StatusCode::NOT_FOUND {
                    format!("{detail} not found.")
                } else {
                    detail
                };
                (status, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::Forbidden => (
                status,
                Json(json!({"detail": "You do not have permission to perform this action."})),
            )
                .into_response(),
            ApiError::MethodNotAllowed(method) => (
                status,
                Json(json!({ "detail": format!("Method \"{method}\" not allowed.") })),
            )
                .into_response(),
            _ => (status, Json(json!({"detail": "Internal server error"}))).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use garde::Validate;

    use super::*;

    #[derive(Validate)]
    struct Payload {
        #[garde(length(min = 1))]
        name: String,
        #[garde(inner(length(max = 3)))]
        tags: Vec<String>,
    }

    #[test]
    fn test_field_errors_from_report() {
        let payload = Payload {
            name: String::new(),
            tags: vec!["ok".into(), "too long".into()],
        };
        let report = payload.validate().unwrap_err();
        let errors = FieldErrors::from(&report);
        assert_eq!(errors.get("name").map(|m| m.len()), Some(1));
        assert_eq!(errors.get("tags").map(|m| m.len()), Some(1));
    }

    #[test]
    fn test_top_level_field() {
        assert_eq!(top_level_field("genre[1]"), "genre");
        assert_eq!(top_level_field("email"), "email");
        assert_eq!(top_level_field(""), NON_FIELD_ERRORS);
    }

    #[test]
    fn test_dal_error_mapping() {
        let err = ApiError::from(yamdb_dal::Error::DuplicateReview);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let err = ApiError::from(yamdb_dal::Error::RecordNotFound("Title".into()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        let err = ApiError::from(yamdb_dal::Error::Duplicate {
            field: "email".into(),
        });
        match err {
            ApiError::Validation(errors) => assert!(errors.get("email").is_some()),
            other => panic!("Unexpected error {other}"),
        }
        assert_eq!(
            ApiError::from(Denied::Unauthenticated).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(Denied::Forbidden).status(),
            StatusCode::FORBIDDEN
        );
    }
}
