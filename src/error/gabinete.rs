use axum::{Json, http::StatusCode, response::IntoResponse};
use gabinete_schema::ValidationError;
use serde::Serialize;
use serde_json::{Value, json};
use sqlx::error::ErrorKind;
use std::fmt;
use thiserror::Error as ThisError;

/// Which storage-engine constraint rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityKind {
    Unique,
    Check,
    ForeignKey,
    NotNull,
}

impl fmt::Display for IntegrityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IntegrityKind::Unique => "unique",
            IntegrityKind::Check => "check",
            IntegrityKind::ForeignKey => "foreign_key",
            IntegrityKind::NotNull => "not_null",
        })
    }
}

#[derive(Debug, ThisError)]
pub enum GabineteError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{kind} constraint `{constraint}` violated")]
    Integrity {
        kind: IntegrityKind,
        constraint: String,
        message: String,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl GabineteError {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        GabineteError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_integrity(&self) -> bool {
        matches!(self, GabineteError::Integrity { .. })
    }
}

impl From<sqlx::Error> for GabineteError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => GabineteError::not_found("record", "<unknown>"),
            sqlx::Error::Database(db) => {
                let message = db.message().to_string();
                match classify_constraint(db.kind(), &message) {
                    Some(kind) => GabineteError::Integrity {
                        kind,
                        constraint: db
                            .constraint()
                            .map(str::to_string)
                            .unwrap_or_else(|| constraint_from_message(kind, &message)),
                        message,
                    },
                    None => GabineteError::DatabaseError(sqlx::Error::Database(db)),
                }
            }
            other => GabineteError::DatabaseError(other),
        }
    }
}

fn classify_constraint(kind: ErrorKind, message: &str) -> Option<IntegrityKind> {
    match kind {
        ErrorKind::UniqueViolation => Some(IntegrityKind::Unique),
        ErrorKind::CheckViolation => Some(IntegrityKind::Check),
        ErrorKind::ForeignKeyViolation => Some(IntegrityKind::ForeignKey),
        ErrorKind::NotNullViolation => Some(IntegrityKind::NotNull),
        // SQLite without extended result codes only reports the primary code.
        _ => [
            ("UNIQUE constraint failed", IntegrityKind::Unique),
            ("CHECK constraint failed", IntegrityKind::Check),
            ("FOREIGN KEY constraint failed", IntegrityKind::ForeignKey),
            ("NOT NULL constraint failed", IntegrityKind::NotNull),
        ]
        .into_iter()
        .find_map(|(prefix, kind)| message.starts_with(prefix).then_some(kind)),
    }
}

/// SQLite names the constraint (or the `table.column`) after the colon.
fn constraint_from_message(kind: IntegrityKind, message: &str) -> String {
    message
        .split_once(": ")
        .map(|(_, name)| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| kind.to_string())
}

impl IntoResponse for GabineteError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            GabineteError::Validation(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiErrorObject {
                    code: "VALIDATION_ERROR".to_string(),
                    message: err.message,
                    details: Some(json!({ "field": err.field })),
                },
            ),

            GabineteError::Integrity {
                kind,
                constraint,
                message,
            } => {
                let status = match kind {
                    IntegrityKind::Unique => StatusCode::CONFLICT,
                    IntegrityKind::Check | IntegrityKind::ForeignKey | IntegrityKind::NotNull => {
                        StatusCode::BAD_REQUEST
                    }
                };
                (
                    status,
                    ApiErrorObject {
                        code: "INTEGRITY_ERROR".to_string(),
                        message,
                        details: Some(json!({ "kind": kind, "constraint": constraint })),
                    },
                )
            }

            GabineteError::Conflict(message) => (
                StatusCode::CONFLICT,
                ApiErrorObject {
                    code: "CONFLICT".to_string(),
                    message,
                    details: None,
                },
            ),

            GabineteError::NotFound { entity, id } => (
                StatusCode::NOT_FOUND,
                ApiErrorObject {
                    code: "NOT_FOUND".to_string(),
                    message: format!("{entity} not found"),
                    details: Some(json!({ "id": id })),
                },
            ),

            GabineteError::JsonError(err) => (
                StatusCode::BAD_REQUEST,
                ApiErrorObject {
                    code: "INVALID_JSON".to_string(),
                    message: err.to_string(),
                    details: Some(json!({ "line": err.line(), "column": err.column() })),
                },
            ),

            GabineteError::RactorError(_)
            | GabineteError::DatabaseError(_)
            | GabineteError::UnexpectedError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorObject {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                    details: None,
                },
            ),
        };
        (status, Json(ApiErrorBody { inner: error_body })).into_response()
    }
}

/// Standardized API error response payload.
#[derive(Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}

#[cfg(test)]
mod tests {
    use super::*;
    use gabinete_schema::DemandCityHallSync;

    #[test]
    fn classifies_sqlite_messages_without_extended_codes() {
        assert_eq!(
            classify_constraint(
                ErrorKind::Other,
                "CHECK constraint failed: cabinets_plan_check"
            ),
            Some(IntegrityKind::Check)
        );
        assert_eq!(
            classify_constraint(ErrorKind::Other, "database is locked"),
            None
        );
    }

    #[test]
    fn constraint_name_comes_after_the_colon() {
        assert_eq!(
            constraint_from_message(
                IntegrityKind::Unique,
                "UNIQUE constraint failed: cabinets.agent_access_token"
            ),
            "cabinets.agent_access_token"
        );
        assert_eq!(
            constraint_from_message(IntegrityKind::ForeignKey, "FOREIGN KEY constraint failed"),
            "foreign_key"
        );
    }

    #[test]
    fn taxonomy_maps_to_client_statuses() {
        let cases = [
            (
                GabineteError::from(ValidationError::new("title", "too long")),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                GabineteError::Integrity {
                    kind: IntegrityKind::Unique,
                    constraint: "cabinets.agent_access_token".into(),
                    message: "dup".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                GabineteError::Integrity {
                    kind: IntegrityKind::Check,
                    constraint: "cabinets_plan_check".into(),
                    message: "bad plan".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (GabineteError::not_found("demand", 7), StatusCode::NOT_FOUND),
            (
                GabineteError::Conflict("stale sync state".into()),
                StatusCode::CONFLICT,
            ),
            (
                GabineteError::UnexpectedError("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    async fn body_of(err: GabineteError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn unknown_sync_status_is_a_client_error_naming_the_field() {
        let err = DemandCityHallSync::from_json(json!({ "sync_status": "done" })).unwrap_err();
        let (status, body) = body_of(err.into()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"]["field"], "sync_status");
    }

    #[tokio::test]
    async fn undecodable_payloads_are_bad_requests() {
        let err = serde_json::from_str::<DemandCityHallSync>(r#"{"sync_status":"done"}"#)
            .unwrap_err();
        let (status, body) = body_of(err.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_JSON");
        assert!(
            body["error"]["message"]
                .as_str()
                .unwrap()
                .contains("sync_status")
        );
    }

    #[test]
    fn row_not_found_is_not_an_integrity_error() {
        let err = GabineteError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, GabineteError::NotFound { .. }));
        assert!(!err.is_integrity());
    }
}
