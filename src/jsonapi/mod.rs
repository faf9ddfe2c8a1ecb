//! JSON:API document types.
//!
//! Request and response bodies follow the JSON:API structure: a `data` member
//! carrying resource objects with `type`/`id`/`attributes`, and an `errors`
//! array on failure. Responses are stamped with the
//! `application/vnd.api+json` media type.

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// The JSON:API media type.
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

/// Top-level document with a single `data` member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document<T> {
    pub data: T,
}

impl<T> Document<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// A resource object as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource<A> {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub attributes: A,
}

impl<A> Resource<A> {
    pub fn new(kind: impl Into<String>, id: impl Into<String>, attributes: A) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            attributes,
        }
    }
}

/// A resource object as submitted by clients.
///
/// The `id` is optional: absent on creation, present (and matching the URL)
/// on updates.
#[derive(Debug, Clone, Deserialize)]
pub struct NewResource<A> {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    pub attributes: A,
}

/// A single error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorObject {
    pub status: String,
    pub code: String,
    pub title: String,
    pub detail: String,
}

/// Top-level error document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub errors: Vec<ErrorObject>,
}

impl ErrorDocument {
    /// Build a document carrying a single error.
    pub fn single(
        status: StatusCode,
        code: impl Into<String>,
        title: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            errors: vec![ErrorObject {
                status: status.as_u16().to_string(),
                code: code.into(),
                title: title.into(),
                detail: detail.into(),
            }],
        }
    }
}

/// Response wrapper that serializes the body and sets the JSON:API media type.
#[derive(Debug, Clone)]
pub struct JsonApi<T>(pub T);

impl<T: Serialize> IntoResponse for JsonApi<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(body) => (
                [(header::CONTENT_TYPE, header::HeaderValue::from_static(MEDIA_TYPE))],
                body,
            )
                .into_response(),
            Err(err) => {
                tracing::error!("Failed to serialize response body: {err}");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal Server Error",
                    "response serialization failed",
                )
            }
        }
    }
}

/// Build a complete error response with the JSON:API media type.
pub fn error_response(
    status: StatusCode,
    code: impl Into<String>,
    title: impl Into<String>,
    detail: impl Into<String>,
) -> Response {
    let document = ErrorDocument::single(status, code, title, detail);
    (status, JsonApi(document)).into_response()
}
