use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::db::queries;
use crate::models::{Notification, NotificationKind};
use crate::state::AppState;

/// Write a notification row and broadcast it to SSE subscribers.
/// Best-effort: failures are logged and never escalate to the caller,
/// so a lost notification cannot roll back the booking change that
/// triggered it.
pub fn record_notification(
    state: &Arc<AppState>,
    user_id: &str,
    booking_id: &str,
    kind: NotificationKind,
    title: &str,
    message: &str,
    now: &NaiveDateTime,
) {
    let notification = Notification {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        booking_id: booking_id.to_string(),
        kind,
        title: title.to_string(),
        message: message.to_string(),
        is_read: false,
        created_at: *now,
    };

    let inserted = {
        let db = state.db.lock().unwrap();
        queries::insert_notification(&db, &notification)
    };

    match inserted {
        Ok(()) => {
            // Ignore send errors; no receivers is normal.
            let _ = state.notify_tx.send(notification);
        }
        Err(e) => {
            tracing::error!(error = %e, user_id, booking_id, "failed to record notification");
        }
    }
}
