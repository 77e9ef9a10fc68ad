use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::errors::AppResult;
use crate::models::{Booking, CreateBookingRequest, TimeSlot};
use crate::state::AppState;

// GET /api/courts/:court_id/slots?date=
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: String,
}

pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    Path(court_id): Path<String>,
    query: Result<Query<SlotsQuery>, QueryRejection>,
) -> AppResult<Json<Vec<TimeSlot>>> {
    let Query(query) = query?;
    let slots = state.engine.list_slots(&query.date, &court_id).await?;
    Ok(Json(slots))
}

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    request: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Booking>)> {
    let Json(request) = request?;
    let booking = state.engine.create_booking(request).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Booking>> {
    Ok(Json(state.engine.get_booking(&id).await?))
}

// GET /api/users/:user_id/bookings
pub async fn user_bookings(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<Booking>>> {
    Ok(Json(state.engine.user_bookings(&user_id).await?))
}
