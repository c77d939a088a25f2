use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

use crate::lifecycle;
use crate::models::Booking;
use crate::store::Store;

use super::{ApiError, AppState, engine_error_response};

pub async fn accept_proposal<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, (StatusCode, Json<ApiError>)> {
    lifecycle::accept_proposal(
        state.store.as_ref(),
        state.payments.as_ref(),
        state.notifier.as_ref(),
        id,
    )
    .await
    .map(Json)
    .map_err(engine_error_response)
}

pub async fn reject_proposal<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    lifecycle::reject_proposal(state.store.as_ref(), id)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(engine_error_response)
}
