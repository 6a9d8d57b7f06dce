use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::current_actor;
use crate::models::{BookingDetails, BookingStatus};
use crate::services::booking::{
    self, BookingError, CancelCheck, CancelOutcome, NewBookingRequest, StatusUpdateError,
};
use crate::state::AppState;

// GET /api/items/:id/availability
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub available: bool,
}

pub async fn check_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Json<AvailabilityResponse> {
    let available = {
        let db = state.db.lock().unwrap();
        booking::check_item_availability(&db, &id, query.start_date, query.end_date)
    };
    Json(AvailabilityResponse { available })
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub item_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: f64,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBookingRequest>,
) -> Result<Json<BookingDetails>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = current_actor(&db, &headers);

    let request = NewBookingRequest {
        item_id: body.item_id,
        start_date: body.start_date,
        end_date: body.end_date,
        total_price: body.total_price,
    };

    let details =
        booking::create_booking_with_dates(&db, actor.as_ref(), &request, Utc::now().naive_utc())
            .map_err(|e| {
                let message = e.to_string();
                match e {
                    BookingError::AuthenticationRequired => AppError::Unauthorized,
                    BookingError::ItemNotFound => AppError::NotFound(message),
                    BookingError::OwnItem => AppError::Forbidden(message),
                    BookingError::Unavailable => AppError::BadRequest(message),
                    BookingError::Storage(_) => AppError::Database(anyhow::anyhow!(message)),
                }
            })?;

    Ok(Json(details))
}

// GET /api/bookings?role=renter|owner
#[derive(Deserialize)]
pub struct MyBookingsQuery {
    pub role: Option<String>,
}

pub async fn my_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<MyBookingsQuery>,
) -> Result<Json<Vec<BookingDetails>>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = current_actor(&db, &headers).ok_or(AppError::Unauthorized)?;

    let as_owner = query.role.as_deref() == Some("owner");
    let bookings = queries::get_bookings_by_user(&db, &actor.id, as_owner)?;

    Ok(Json(bookings))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingDetails>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = current_actor(&db, &headers).ok_or(AppError::Unauthorized)?;

    let details = queries::get_booking_details(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    let participant =
        details.booking.renter_id == actor.id || details.booking.owner_id == actor.id;
    if !participant && !actor.is_admin {
        return Err(AppError::Forbidden("not a participant in this booking".to_string()));
    }

    Ok(Json(details))
}

// GET /api/bookings/:id/can-cancel
//
// Always 200; refusal arrives as { can_cancel: false, reason } so the
// client can disable the button with an explanation.
pub async fn can_cancel(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Json<CancelCheck> {
    let db = state.db.lock().unwrap();
    let actor = current_actor(&db, &headers);

    let check = booking::can_cancel_booking(&db, actor.as_ref(), &id, Utc::now().naive_utc());
    Json(check)
}

// POST /api/bookings/:id/cancel
#[derive(Deserialize, Default)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Option<Json<CancelRequest>>,
) -> Json<CancelOutcome> {
    let actor = {
        let db = state.db.lock().unwrap();
        current_actor(&db, &headers)
    };
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let outcome = booking::cancel_booking(
        &state,
        actor.as_ref(),
        &id,
        body.reason.as_deref(),
        Utc::now().naive_utc(),
    );
    Json(outcome)
}

// PATCH /api/bookings/:id/status
#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub status: BookingStatus,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<BookingDetails>, AppError> {
    let actor = {
        let db = state.db.lock().unwrap();
        current_actor(&db, &headers)
    };

    let details = booking::update_booking_status(
        &state,
        actor.as_ref(),
        &id,
        body.status,
        Utc::now().naive_utc(),
    )
    .map_err(|e| {
        let message = e.to_string();
        match e {
            StatusUpdateError::AuthenticationRequired => AppError::Unauthorized,
            StatusUpdateError::NotFound => AppError::NotFound(message),
            StatusUpdateError::NoPermission => AppError::Forbidden(message),
            StatusUpdateError::InvalidTransition { .. } => AppError::BadRequest(message),
            StatusUpdateError::Storage(_) => AppError::Database(anyhow::anyhow!(message)),
        }
    })?;

    Ok(Json(details))
}
