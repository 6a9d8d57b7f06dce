use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::current_actor;
use crate::models::{Profile, ProfileStats};
use crate::state::AppState;

// GET /api/profiles/:id
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Profile>, AppError> {
    let profile = {
        let db = state.db.lock().unwrap();
        queries::get_profile(&db, &id)?
    };
    profile
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("profile {id}")))
}

// POST /api/profiles
//
// Mirrors the externally authenticated user into a local profile row.
// The id comes from the x-user-id header, not the body, so a caller can
// only ever register themselves.
#[derive(Deserialize)]
pub struct RegisterProfileRequest {
    pub email: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
}

pub async fn register_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<RegisterProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(AppError::Unauthorized)?;

    if body.email.trim().is_empty() || body.full_name.trim().is_empty() {
        return Err(AppError::BadRequest("email and full_name are required".to_string()));
    }

    let db = state.db.lock().unwrap();

    let existing = queries::get_profile(&db, user_id)?;
    let profile = Profile {
        id: user_id.to_string(),
        email: body.email.trim().to_string(),
        full_name: body.full_name.trim().to_string(),
        avatar_url: body.avatar_url,
        location: body.location,
        bio: body.bio,
        phone: body.phone,
        is_verified: existing.as_ref().is_some_and(|p| p.is_verified),
        is_admin: existing.as_ref().is_some_and(|p| p.is_admin),
        rating: existing.as_ref().map(|p| p.rating).unwrap_or(0.0),
        review_count: existing.as_ref().map(|p| p.review_count).unwrap_or(0),
        joined_at: existing
            .as_ref()
            .map(|p| p.joined_at)
            .unwrap_or_else(|| Utc::now().naive_utc()),
    };

    queries::save_profile(&db, &profile)?;
    Ok(Json(profile))
}

// PUT /api/profiles/me
#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
}

pub async fn update_my_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = current_actor(&db, &headers).ok_or(AppError::Unauthorized)?;

    let mut profile = queries::get_profile(&db, &actor.id)?
        .ok_or_else(|| AppError::NotFound(format!("profile {}", actor.id)))?;

    if let Some(full_name) = body.full_name {
        profile.full_name = full_name;
    }
    if let Some(avatar_url) = body.avatar_url {
        profile.avatar_url = Some(avatar_url);
    }
    if let Some(location) = body.location {
        profile.location = Some(location);
    }
    if let Some(bio) = body.bio {
        profile.bio = Some(bio);
    }
    if let Some(phone) = body.phone {
        profile.phone = Some(phone);
    }

    queries::save_profile(&db, &profile)?;
    Ok(Json(profile))
}

// GET /api/profiles/:id/stats
pub async fn profile_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProfileStats>, AppError> {
    let stats = {
        let db = state.db.lock().unwrap();
        queries::get_profile_stats(&db, &id)?
    };
    Ok(Json(stats))
}
