pub mod admin;
pub mod bookings;
pub mod health;
pub mod items;
pub mod notifications;
pub mod profiles;
pub mod reviews;

use axum::http::HeaderMap;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::Actor;

/// Resolve the acting user from the `x-user-id` header. Identity is
/// asserted by the fronting auth proxy; an unknown or missing id simply
/// means an anonymous request, which each operation rejects on its own
/// terms.
pub fn current_actor(conn: &Connection, headers: &HeaderMap) -> Option<Actor> {
    let user_id = headers.get("x-user-id")?.to_str().ok()?;
    if user_id.is_empty() {
        return None;
    }
    match queries::get_profile(conn, user_id) {
        Ok(Some(profile)) => Some(profile.actor()),
        Ok(None) => None,
        Err(e) => {
            tracing::error!(error = %e, user_id, "failed to resolve acting user");
            None
        }
    }
}
