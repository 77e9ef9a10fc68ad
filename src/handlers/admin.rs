use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::errors::{AppError, AppResult};
use crate::models::{Booking, BookingStatus};
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> AppResult<()> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<BookingsQuery>, QueryRejection>,
) -> AppResult<Json<Vec<Booking>>> {
    check_auth(&headers, &state.config.admin_token)?;
    let Query(query) = query?;

    let status = query
        .status
        .as_deref()
        .map(|s| {
            BookingStatus::parse(s)
                .ok_or_else(|| AppError::validation(format!("unknown booking status: {s}")))
        })
        .transpose()?;

    let bookings = state.engine.list_bookings(status, query.limit).await?;
    Ok(Json(bookings))
}

// POST /api/admin/bookings/:id/status
#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    update: Result<Json<StatusUpdate>, JsonRejection>,
) -> AppResult<Json<Booking>> {
    check_auth(&headers, &state.config.admin_token)?;
    let Json(update) = update?;

    let status = BookingStatus::parse(&update.status).ok_or_else(|| {
        AppError::validation(format!("unknown booking status: {}", update.status))
    })?;

    let booking = state.engine.update_booking_status(&id, status).await?;
    Ok(Json(booking))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", value.parse().unwrap());
        headers
    }

    #[test]
    fn test_check_auth() {
        assert!(check_auth(&headers("Bearer secret"), "secret").is_ok());
        assert!(check_auth(&headers("Bearer wrong"), "secret").is_err());
        assert!(check_auth(&headers("secret"), "secret").is_err());
        assert!(check_auth(&HeaderMap::new(), "secret").is_err());
        assert!(check_auth(&headers("Bearer "), "").is_err());
    }
}
