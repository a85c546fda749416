use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

use crate::api::handlers::ErrorResponse;

pub type BindResult<T> = Result<T, BindingError>;

/// Everything that can stop a request from reaching its handler.
///
/// Only `NotFound` is a legitimate business outcome. `Store` is passed through
/// from the storage layer untouched, and every other variant is a wiring defect
/// between a route declaration and the handler it is bound to.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("{model} not found where {key} = {value:?}")]
    NotFound {
        model: String,
        key: String,
        value: String,
    },

    #[error("malformed route parameter `{token}`: {reason}")]
    MalformedParam { token: String, reason: String },

    #[error("route `{route}` declares parameter `{name}` more than once")]
    DuplicateParam { route: String, name: String },

    #[error(
        "route `{route}` has {params} parameter(s) but handler `{handler}` declares {slots} binding slot(s)"
    )]
    ParamCountMismatch {
        route: String,
        handler: String,
        params: usize,
        slots: usize,
    },

    #[error("scoped parameter `{param}` must directly follow a model-bound parameter")]
    InvalidScope { param: String },

    #[error("`{parent}` declares no relationship named {candidates:?} for scoped parameter `{param}`")]
    MissingRelationship {
        parent: String,
        param: String,
        candidates: Vec<String>,
    },

    #[error("`{model}` rows have no `{column}` column")]
    MissingColumn { model: String, column: String },

    #[error("no binding metadata registered for handler `{0}`")]
    UnknownHandler(String),

    #[error("handler `{handler}` is already registered with different binding slots")]
    ConflictingRegistration { handler: String },

    #[error("binding slots for handler `{handler}` are not numbered 0..{count}")]
    InvalidSlotPositions { handler: String, count: usize },

    #[error("binding registry is sealed; cannot register handler `{handler}` after startup")]
    RegistrySealed { handler: String },

    #[error("binding slot {position} expects `{expected}` but resolved `{found}`")]
    TypeMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl BindingError {
    pub fn not_found(model: &str, key: &str, value: &str) -> Self {
        Self::NotFound {
            model: model.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// True for every defect in route/handler wiring.
    pub fn is_configuration(&self) -> bool {
        !self.is_not_found() && !self.is_store()
    }

    pub fn status_code(&self) -> StatusCode {
        if self.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for BindingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            BindingError::NotFound { .. } => {
                log::debug!("route binding: {}", self);
                self.to_string()
            }
            BindingError::Store(source) => {
                log::error!("route binding store failure: {:#}", source);
                "Internal server error".to_string()
            }
            _ => {
                log::error!("route binding misconfigured: {}", self);
                "Internal server error".to_string()
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
