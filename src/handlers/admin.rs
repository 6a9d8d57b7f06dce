use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::queries::{self, AdminAnalytics};
use crate::errors::AppError;
use crate::handlers::current_actor;
use crate::models::BookingDetails;
use crate::state::AppState;

fn require_admin(conn: &Connection, headers: &HeaderMap) -> Result<(), AppError> {
    let actor = current_actor(conn, headers).ok_or(AppError::Unauthorized)?;
    if !actor.is_admin {
        return Err(AppError::Forbidden("admin access required".to_string()));
    }
    Ok(())
}

// GET /api/admin/analytics
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AdminAnalytics>, AppError> {
    let db = state.db.lock().unwrap();
    require_admin(&db, &headers)?;

    let analytics = queries::get_admin_analytics(&db, &Utc::now().naive_utc())?;
    Ok(Json(analytics))
}

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct AllBookingsQuery {
    pub limit: Option<i64>,
}

pub async fn all_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AllBookingsQuery>,
) -> Result<Json<Vec<BookingDetails>>, AppError> {
    let db = state.db.lock().unwrap();
    require_admin(&db, &headers)?;

    let bookings = queries::get_all_bookings(&db, query.limit.unwrap_or(50))?;
    Ok(Json(bookings))
}
