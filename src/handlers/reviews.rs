use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::current_actor;
use crate::models::{BookingStatus, Review, ReviewDetails};
use crate::state::AppState;

// POST /api/reviews
#[derive(Deserialize)]
pub struct CreateReviewRequest {
    pub booking_id: String,
    pub rating: i64,
    pub comment: Option<String>,
}

pub async fn create_review(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateReviewRequest>,
) -> Result<Json<Review>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = current_actor(&db, &headers).ok_or(AppError::Unauthorized)?;

    if !(1..=5).contains(&body.rating) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".to_string()));
    }

    let booking = queries::get_booking_by_id(&db, &body.booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {}", body.booking_id)))?;

    if booking.renter_id != actor.id {
        return Err(AppError::Forbidden("only the renter can review this booking".to_string()));
    }
    if booking.status != BookingStatus::Completed {
        return Err(AppError::BadRequest(
            "reviews can only be left on completed bookings".to_string(),
        ));
    }

    let review = Review {
        id: uuid::Uuid::new_v4().to_string(),
        item_id: booking.item_id,
        booking_id: booking.id,
        reviewer_id: actor.id,
        rating: body.rating,
        comment: body.comment.unwrap_or_default(),
        created_at: Utc::now().naive_utc(),
    };

    queries::create_review(&db, &review)?;
    Ok(Json(review))
}

// GET /api/items/:id/reviews
pub async fn reviews_by_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ReviewDetails>>, AppError> {
    let reviews = {
        let db = state.db.lock().unwrap();
        queries::get_reviews_by_item(&db, &id)?
    };
    Ok(Json(reviews))
}
