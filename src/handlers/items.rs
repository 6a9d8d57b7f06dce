use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::db::queries::{self, ItemFilters};
use crate::errors::AppError;
use crate::handlers::current_actor;
use crate::models::{Item, ReviewDetails};
use crate::state::AppState;

// GET /api/items
#[derive(Deserialize)]
pub struct ListItemsQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub location: Option<String>,
    pub sort_by: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListItemsQuery>,
) -> Result<Json<Vec<Item>>, AppError> {
    let filters = ItemFilters {
        category: query.category,
        search: query.search,
        min_price: query.min_price,
        max_price: query.max_price,
        location: query.location,
        sort_by: query.sort_by,
        limit: query.limit,
        offset: query.offset,
    };

    let items = {
        let db = state.db.lock().unwrap();
        queries::list_items(&db, &filters)?
    };

    Ok(Json(items))
}

// GET /api/categories
#[derive(Serialize)]
pub struct CategoryResponse {
    pub name: String,
    pub count: i64,
}

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategoryResponse>>, AppError> {
    let categories = {
        let db = state.db.lock().unwrap();
        queries::list_categories(&db)?
    };

    let response = categories
        .into_iter()
        .map(|c| CategoryResponse {
            name: c.category,
            count: c.count,
        })
        .collect();
    Ok(Json(response))
}

// GET /api/items/:id
#[derive(Serialize)]
pub struct ItemWithReviews {
    #[serde(flatten)]
    pub item: Item,
    pub reviews: Vec<ReviewDetails>,
}

pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ItemWithReviews>, AppError> {
    let db = state.db.lock().unwrap();

    let item = queries::get_item_by_id(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("item {id}")))?;
    let reviews = queries::get_reviews_by_item(&db, &id)?;

    Ok(Json(ItemWithReviews { item, reviews }))
}

// POST /api/items
#[derive(Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub location: String,
    pub image: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

pub async fn create_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateItemRequest>,
) -> Result<Json<Item>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = current_actor(&db, &headers).ok_or(AppError::Unauthorized)?;

    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    if body.price < 0.0 {
        return Err(AppError::BadRequest("price must not be negative".to_string()));
    }

    let now = Utc::now().naive_utc();
    let item = Item {
        id: uuid::Uuid::new_v4().to_string(),
        name: body.name.trim().to_string(),
        description: body.description,
        price: body.price,
        category: body.category,
        owner_id: actor.id,
        location: body.location,
        image: body.image,
        features: body.features,
        is_available: true,
        created_at: now,
        updated_at: now,
        average_rating: 0.0,
        review_count: 0,
    };

    queries::create_item(&db, &item)?;
    Ok(Json(item))
}

// PUT /api/items/:id
#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub image: Option<String>,
    pub features: Option<Vec<String>>,
    pub is_available: Option<bool>,
}

pub async fn update_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateItemRequest>,
) -> Result<Json<Item>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = current_actor(&db, &headers).ok_or(AppError::Unauthorized)?;

    let mut item = queries::get_item_by_id(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("item {id}")))?;

    if item.owner_id != actor.id && !actor.is_admin {
        return Err(AppError::Forbidden("only the owner can edit this item".to_string()));
    }

    if let Some(name) = body.name {
        item.name = name;
    }
    if let Some(description) = body.description {
        item.description = description;
    }
    if let Some(price) = body.price {
        if price < 0.0 {
            return Err(AppError::BadRequest("price must not be negative".to_string()));
        }
        item.price = price;
    }
    if let Some(category) = body.category {
        item.category = category;
    }
    if let Some(location) = body.location {
        item.location = location;
    }
    if let Some(image) = body.image {
        item.image = Some(image);
    }
    if let Some(features) = body.features {
        item.features = features;
    }
    if let Some(is_available) = body.is_available {
        item.is_available = is_available;
    }
    item.updated_at = Utc::now().naive_utc();

    if !queries::update_item(&db, &item)? {
        return Err(AppError::NotFound(format!("item {id}")));
    }
    Ok(Json(item))
}

// DELETE /api/items/:id
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = current_actor(&db, &headers).ok_or(AppError::Unauthorized)?;

    let item = queries::get_item_by_id(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("item {id}")))?;

    if item.owner_id != actor.id && !actor.is_admin {
        return Err(AppError::Forbidden("only the owner can delete this item".to_string()));
    }

    queries::delete_item(&db, &id)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// GET /api/users/:id/items
pub async fn items_by_owner(
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<String>,
) -> Result<Json<Vec<Item>>, AppError> {
    let items = {
        let db = state.db.lock().unwrap();
        queries::get_items_by_owner(&db, &owner_id)?
    };
    Ok(Json(items))
}

// GET /api/items/:id/booked-dates
//
// Confirmed and pending ranges expanded to individual days, for greying
// out a date picker. Pending requests are included here even though they
// do not block booking, so the calendar errs toward caution.
pub async fn booked_dates(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    let ranges = {
        let db = state.db.lock().unwrap();
        queries::get_booked_ranges(&db, &id)?
    };

    let mut dates = Vec::new();
    for (start, end) in ranges {
        let mut day = start;
        while day <= end {
            dates.push(day.format("%Y-%m-%d").to_string());
            day = day + Duration::days(1);
        }
    }
    dates.sort();
    dates.dedup();

    Ok(Json(dates))
}
