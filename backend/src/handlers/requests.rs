use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::matching::run_matching_batch;
use crate::models::{Location, Proposal, RequestStatus, RideRequest};
use crate::store::Store;

use super::{ApiError, AppState, bad_request, store_error_response};

#[derive(Debug, Deserialize)]
pub struct CreateRequestInput {
    pub customer_id: Uuid,
    pub pickup: Location,
    pub dropoff: Location,
    pub return_point: Location,
    pub home: Location,
    pub desired_pickup_time: DateTime<Utc>,
    pub desired_return_time: DateTime<Utc>,
    pub passenger_count: i32,
}

fn validate_input(input: &CreateRequestInput) -> Result<(), String> {
    if input.passenger_count < 1 {
        return Err("passenger_count must be at least 1".into());
    }
    if input.desired_return_time <= input.desired_pickup_time {
        return Err("desired_return_time must be after desired_pickup_time".into());
    }
    let locations = [
        ("pickup", &input.pickup),
        ("dropoff", &input.dropoff),
        ("return_point", &input.return_point),
        ("home", &input.home),
    ];
    for (name, location) in locations {
        if !location.has_valid_coordinates() {
            return Err(format!("{name} has invalid coordinates"));
        }
    }
    Ok(())
}

pub async fn create_request<S: Store>(
    State(state): State<AppState<S>>,
    Json(input): Json<CreateRequestInput>,
) -> Result<(StatusCode, Json<RideRequest>), (StatusCode, Json<ApiError>)> {
    validate_input(&input).map_err(bad_request)?;

    let request = RideRequest {
        id: Uuid::new_v4(),
        customer_id: input.customer_id,
        pickup: input.pickup,
        dropoff: input.dropoff,
        return_point: input.return_point,
        home: input.home,
        desired_pickup_time: input.desired_pickup_time,
        desired_return_time: input.desired_return_time,
        passenger_count: input.passenger_count,
        status: RequestStatus::Requested,
        created_at: Utc::now(),
    };
    state
        .store
        .insert_request(&request)
        .await
        .map_err(store_error_response)?;

    // Immediate matching run: fire-and-forget, observable only through
    // subsequent status changes.
    let spawned = state.clone();
    tokio::spawn(async move {
        if let Err(e) = run_matching_batch(
            spawned.store.as_ref(),
            spawned.notifier.as_ref(),
            &spawned.matching,
        )
        .await
        {
            tracing::error!("immediate matching run failed: {}", e);
        }
    });

    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn get_request<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RideRequest>, (StatusCode, Json<ApiError>)> {
    let request = state
        .store
        .get_request(id)
        .await
        .map_err(store_error_response)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiError {
                    error: "request not found".into(),
                }),
            )
        })?;

    Ok(Json(request))
}

pub async fn get_active_proposal<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Proposal>, (StatusCode, Json<ApiError>)> {
    let proposal = state
        .store
        .active_proposal_for_request(id)
        .await
        .map_err(store_error_response)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiError {
                    error: "no active proposal for this request".into(),
                }),
            )
        })?;

    Ok(Json(proposal))
}
