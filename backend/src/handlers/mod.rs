pub mod proposals;
pub mod requests;

use std::sync::Arc;

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

use crate::error::EngineError;
use crate::matching::MatchingConfig;
use crate::services::notifier::Notifier;
use crate::services::payments::PaymentProvider;
use crate::store::StoreError;

pub struct AppState<S> {
    pub store: Arc<S>,
    pub payments: Arc<dyn PaymentProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub matching: Arc<MatchingConfig>,
}

// Manual impl: `S` itself does not need to be Clone behind the Arc.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            payments: self.payments.clone(),
            notifier: self.notifier.clone(),
            matching: self.matching.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

pub fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error: message.into(),
        }),
    )
}

pub fn engine_error_response(e: EngineError) -> (StatusCode, Json<ApiError>) {
    let status = match &e {
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidState(_) => StatusCode::CONFLICT,
        EngineError::Payment(_) => StatusCode::PAYMENT_REQUIRED,
        EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiError { error: e.to_string() }))
}

pub fn store_error_response(e: StoreError) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError { error: e.to_string() }),
    )
}
