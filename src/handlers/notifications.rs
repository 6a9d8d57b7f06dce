use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, Sse};
use axum::Json;
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::current_actor;
use crate::models::Notification;
use crate::state::AppState;

// GET /api/notifications
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Notification>>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = current_actor(&db, &headers).ok_or(AppError::Unauthorized)?;

    let notifications = queries::get_notifications(&db, &actor.id)?;
    Ok(Json(notifications))
}

// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = current_actor(&db, &headers).ok_or(AppError::Unauthorized)?;

    let count = queries::unread_notification_count(&db, &actor.id)?;
    Ok(Json(serde_json::json!({"count": count})))
}

// POST /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = current_actor(&db, &headers).ok_or(AppError::Unauthorized)?;

    // Scope the lookup to the caller so one user cannot ack another's.
    let owned = queries::get_notifications(&db, &actor.id)?
        .into_iter()
        .any(|n| n.id == id);
    if !owned {
        return Err(AppError::NotFound(format!("notification {id}")));
    }

    queries::mark_notification_read(&db, &id)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// POST /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db.lock().unwrap();
    let actor = current_actor(&db, &headers).ok_or(AppError::Unauthorized)?;

    let updated = queries::mark_all_notifications_read(&db, &actor.id)?;
    Ok(Json(serde_json::json!({"ok": true, "updated": updated})))
}

// GET /api/notifications/events (SSE stream)
#[derive(Deserialize)]
pub struct SseQuery {
    pub user_id: Option<String>,
}

pub async fn events_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SseQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    // Identity via query param (EventSource can't set headers).
    let user_id = query.user_id.unwrap_or_default();
    if user_id.is_empty() {
        return Err(AppError::Unauthorized);
    }

    // Catch up on unread notifications before going live.
    let catchup = {
        let db = state.db.lock().unwrap();
        queries::get_unread_notifications(&db, &user_id).unwrap_or_default()
    };

    let rx = state.notify_tx.subscribe();

    let to_event = |notification: &Notification| {
        let data = serde_json::to_string(notification).unwrap_or_default();
        Event::default().data(data).event("notification")
    };

    let catchup_stream = tokio_stream::iter(
        catchup
            .iter()
            .map(|n| Ok::<_, Infallible>(to_event(n)))
            .collect::<Vec<_>>(),
    );

    let live_stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(notification) if notification.user_id == user_id => {
            Some(Ok(to_event(&notification)))
        }
        Ok(_) => None,
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(_)) => None,
    });

    let keepalive_stream = tokio_stream::StreamExt::map(
        tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(Duration::from_secs(30))),
        |_| Ok(Event::default().comment("keepalive")),
    );

    let combined = catchup_stream.chain(live_stream);
    let merged = StreamExt::merge(combined, keepalive_stream);

    Ok(Sse::new(merged))
}
