//! Booking lifecycle rules: date-range availability, creation guards,
//! cancellation eligibility and execution, and status transitions.
//!
//! Every operation takes the acting user explicitly (`Option<&Actor>`)
//! and, where timing matters, an explicit `now`, so the rules are plain
//! functions over booking state and the clock. Reads and writes are
//! deliberately check-then-act without a wrapping transaction, matching
//! the request-scoped call pattern of the storage layer.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::models::{Actor, Booking, BookingDetails, BookingStatus, NotificationKind};
use crate::services::notify;
use crate::state::AppState;

/// Renters may not self-cancel a confirmed booking this close to its start.
pub const CANCELLATION_GRACE_HOURS: i64 = 24;

fn start_instant(booking: &Booking) -> NaiveDateTime {
    booking.start_date.and_time(NaiveTime::MIN)
}

// ── Availability ──

/// Whether `[start, end]` (inclusive) is free for the item. Only confirmed
/// and active bookings block; pending requests do not exclude each other.
/// Fails closed: a storage error reports the range as unavailable.
pub fn check_item_availability(
    conn: &Connection,
    item_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> bool {
    match queries::get_blocking_bookings(conn, item_id, start, end) {
        Ok(blocking) => blocking.is_empty(),
        Err(e) => {
            tracing::error!(error = %e, item_id, "availability check failed, reporting unavailable");
            false
        }
    }
}

// ── Creation ──

#[derive(Debug, Clone)]
pub struct NewBookingRequest {
    pub item_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("You must be logged in to make a booking")]
    AuthenticationRequired,
    #[error("Item not found")]
    ItemNotFound,
    #[error("You cannot book your own item")]
    OwnItem,
    #[error("Item is not available for the selected dates")]
    Unavailable,
    #[error("Failed to create booking: {0}")]
    Storage(String),
}

/// Create a pending booking for the acting renter. Preconditions are
/// checked in order and nothing is written until all of them pass.
pub fn create_booking_with_dates(
    conn: &Connection,
    actor: Option<&Actor>,
    request: &NewBookingRequest,
    now: NaiveDateTime,
) -> Result<BookingDetails, BookingError> {
    let actor = actor.ok_or(BookingError::AuthenticationRequired)?;

    let item = queries::get_item_by_id(conn, &request.item_id)
        .map_err(|e| BookingError::Storage(e.to_string()))?
        .ok_or(BookingError::ItemNotFound)?;

    if item.owner_id == actor.id {
        return Err(BookingError::OwnItem);
    }

    if !check_item_availability(conn, &request.item_id, request.start_date, request.end_date) {
        return Err(BookingError::Unavailable);
    }

    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        item_id: request.item_id.clone(),
        renter_id: actor.id.clone(),
        owner_id: item.owner_id,
        start_date: request.start_date,
        end_date: request.end_date,
        total_price: request.total_price,
        status: BookingStatus::Pending,
        created_at: now,
        updated_at: now,
    };

    queries::insert_booking(conn, &booking).map_err(|e| BookingError::Storage(e.to_string()))?;

    queries::get_booking_details(conn, &booking.id)
        .map_err(|e| BookingError::Storage(e.to_string()))?
        .ok_or_else(|| BookingError::Storage("booking vanished after insert".to_string()))
}

// ── Cancellation ──

/// One taxonomy for every way a cancellation can be refused, shared by the
/// eligibility check and the execution path so their reasons always agree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CancelDenied {
    #[error("You must be logged in to cancel a booking")]
    AuthenticationRequired,
    #[error("Booking not found")]
    NotFound,
    #[error("You don't have permission to cancel this booking")]
    NoPermission,
    #[error("Cannot cancel an active rental that has already started")]
    ActiveRental,
    #[error("Cannot cancel a completed booking")]
    Completed,
    #[error("This booking is already cancelled")]
    AlreadyCancelled,
    #[error("Cannot cancel a booking that has already started")]
    AlreadyStarted,
    #[error("Cannot cancel within 24 hours of the rental start time")]
    GracePeriod,
    #[error("An unexpected error occurred: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelCheck {
    pub can_cancel: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelOutcome {
    pub success: bool,
    pub message: String,
}

fn deny(reason: CancelDenied) -> CancelCheck {
    CancelCheck {
        can_cancel: false,
        reason: Some(reason.to_string()),
    }
}

/// Pure eligibility predicate: no state is mutated. The answer depends on
/// `now`, so execution re-derives it rather than trusting an earlier call.
pub fn can_cancel_booking(
    conn: &Connection,
    actor: Option<&Actor>,
    booking_id: &str,
    now: NaiveDateTime,
) -> CancelCheck {
    let actor = match actor {
        Some(actor) => actor,
        None => return deny(CancelDenied::AuthenticationRequired),
    };

    let booking = match queries::get_booking_by_id(conn, booking_id) {
        Ok(Some(booking)) => booking,
        Ok(None) => return deny(CancelDenied::NotFound),
        Err(e) => return deny(CancelDenied::Storage(e.to_string())),
    };

    let is_renter = booking.renter_id == actor.id;
    let is_owner = booking.owner_id == actor.id;
    if !is_renter && !is_owner && !actor.is_admin {
        return deny(CancelDenied::NoPermission);
    }

    match booking.status {
        BookingStatus::Active => return deny(CancelDenied::ActiveRental),
        BookingStatus::Completed => return deny(CancelDenied::Completed),
        BookingStatus::Cancelled => return deny(CancelDenied::AlreadyCancelled),
        BookingStatus::Pending | BookingStatus::Confirmed => {}
    }

    if booking.status == BookingStatus::Confirmed && start_instant(&booking) <= now {
        return deny(CancelDenied::AlreadyStarted);
    }

    // 24-hour grace period binds renters only, and only once confirmed.
    if booking.status == BookingStatus::Confirmed
        && is_renter
        && start_instant(&booking) - now < Duration::hours(CANCELLATION_GRACE_HOURS)
    {
        return deny(CancelDenied::GracePeriod);
    }

    CancelCheck {
        can_cancel: true,
        reason: None,
    }
}

/// Cancel a booking. The eligibility sequence is re-run inline here, not by
/// calling `can_cancel_booking`, since time and booking state may have moved
/// between the check and this call. The free-text `reason` is accepted but
/// not persisted (matching the storage schema, which has no column for it);
/// the counterparty notification is best-effort and never fails the
/// cancellation.
pub fn cancel_booking(
    state: &Arc<AppState>,
    actor: Option<&Actor>,
    booking_id: &str,
    reason: Option<&str>,
    now: NaiveDateTime,
) -> CancelOutcome {
    let refuse = |denied: CancelDenied| CancelOutcome {
        success: false,
        message: denied.to_string(),
    };

    let actor = match actor {
        Some(actor) => actor,
        None => return refuse(CancelDenied::AuthenticationRequired),
    };

    let (booking, is_renter) = {
        let db = state.db.lock().unwrap();

        let booking = match queries::get_booking_by_id(&db, booking_id) {
            Ok(Some(booking)) => booking,
            Ok(None) => return refuse(CancelDenied::NotFound),
            Err(e) => return refuse(CancelDenied::Storage(e.to_string())),
        };

        let is_renter = booking.renter_id == actor.id;
        let is_owner = booking.owner_id == actor.id;
        if !is_renter && !is_owner && !actor.is_admin {
            return refuse(CancelDenied::NoPermission);
        }

        match booking.status {
            BookingStatus::Active => return refuse(CancelDenied::ActiveRental),
            BookingStatus::Completed => return refuse(CancelDenied::Completed),
            BookingStatus::Cancelled => return refuse(CancelDenied::AlreadyCancelled),
            BookingStatus::Pending | BookingStatus::Confirmed => {}
        }

        if booking.status == BookingStatus::Confirmed && start_instant(&booking) <= now {
            return refuse(CancelDenied::AlreadyStarted);
        }

        if booking.status == BookingStatus::Confirmed
            && is_renter
            && start_instant(&booking) - now < Duration::hours(CANCELLATION_GRACE_HOURS)
        {
            return refuse(CancelDenied::GracePeriod);
        }

        if let Some(reason) = reason {
            tracing::debug!(booking_id, reason, "cancellation reason provided");
        }

        if let Err(e) =
            queries::update_booking_status(&db, booking_id, BookingStatus::Cancelled, &now)
        {
            return refuse(CancelDenied::Storage(e.to_string()));
        }

        (booking, is_renter)
    };

    notify_cancellation(state, &booking, is_renter, &now);

    CancelOutcome {
        success: true,
        message: if is_renter {
            "Booking cancelled successfully. The owner has been notified.".to_string()
        } else {
            "Booking cancelled successfully. The renter has been notified.".to_string()
        },
    }
}

fn notify_cancellation(
    state: &Arc<AppState>,
    booking: &Booking,
    cancelled_by_renter: bool,
    now: &NaiveDateTime,
) {
    let details = {
        let db = state.db.lock().unwrap();
        queries::get_booking_details(&db, &booking.id)
    };

    let details = match details {
        Ok(Some(details)) => details,
        Ok(None) => return,
        Err(e) => {
            tracing::error!(error = %e, booking_id = %booking.id, "failed to load details for cancellation notification");
            return;
        }
    };

    let item_name = details
        .item
        .as_ref()
        .map(|i| i.name.clone())
        .unwrap_or_else(|| "an item".to_string());

    let (recipient, title, message) = if cancelled_by_renter {
        let renter_name = details
            .renter
            .as_ref()
            .map(|p| p.full_name.clone())
            .unwrap_or_else(|| "A renter".to_string());
        (
            booking.owner_id.as_str(),
            "Booking Cancelled by Renter",
            format!("{renter_name} has cancelled their booking for \"{item_name}\""),
        )
    } else {
        let owner_name = details
            .owner
            .as_ref()
            .map(|p| p.full_name.clone())
            .unwrap_or_else(|| "The owner".to_string());
        (
            booking.renter_id.as_str(),
            "Booking Cancelled by Owner",
            format!("{owner_name} has cancelled the booking for \"{item_name}\""),
        )
    };

    notify::record_notification(
        state,
        recipient,
        &booking.id,
        NotificationKind::BookingCancelled,
        title,
        &message,
        now,
    );
}

// ── Status updates ──

#[derive(Debug, thiserror::Error)]
pub enum StatusUpdateError {
    #[error("You must be logged in to update a booking")]
    AuthenticationRequired,
    #[error("Booking not found")]
    NotFound,
    #[error("You don't have permission to update this booking")]
    NoPermission,
    #[error("Cannot move a {from} booking to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("Failed to update booking: {0}")]
    Storage(String),
}

/// Owner/admin status change (confirm, reject, start, complete), gated by
/// the canonical transition table. Confirming a pending booking notifies the
/// renter with `booking_approved`; rejecting it (pending to cancelled through
/// this path) notifies with `booking_rejected`. Renters cancel through
/// `cancel_booking`. Confirmation does not re-check availability against
/// other pending requests for the same range.
pub fn update_booking_status(
    state: &Arc<AppState>,
    actor: Option<&Actor>,
    booking_id: &str,
    new_status: BookingStatus,
    now: NaiveDateTime,
) -> Result<BookingDetails, StatusUpdateError> {
    let actor = actor.ok_or(StatusUpdateError::AuthenticationRequired)?;

    let (booking, details) = {
        let db = state.db.lock().unwrap();

        let booking = queries::get_booking_by_id(&db, booking_id)
            .map_err(|e| StatusUpdateError::Storage(e.to_string()))?
            .ok_or(StatusUpdateError::NotFound)?;

        if booking.owner_id != actor.id && !actor.is_admin {
            return Err(StatusUpdateError::NoPermission);
        }

        if !booking.status.can_transition_to(new_status) {
            return Err(StatusUpdateError::InvalidTransition {
                from: booking.status.as_str(),
                to: new_status.as_str(),
            });
        }

        queries::update_booking_status(&db, booking_id, new_status, &now)
            .map_err(|e| StatusUpdateError::Storage(e.to_string()))?;

        let details = queries::get_booking_details(&db, booking_id)
            .map_err(|e| StatusUpdateError::Storage(e.to_string()))?
            .ok_or(StatusUpdateError::NotFound)?;

        (booking, details)
    };

    let item_name = details
        .item
        .as_ref()
        .map(|i| i.name.clone())
        .unwrap_or_else(|| "an item".to_string());

    match (booking.status, new_status) {
        (BookingStatus::Pending, BookingStatus::Confirmed) => {
            notify::record_notification(
                state,
                &booking.renter_id,
                &booking.id,
                NotificationKind::BookingApproved,
                "Booking Approved",
                &format!("Your booking for \"{item_name}\" has been approved"),
                &now,
            );
        }
        (BookingStatus::Pending, BookingStatus::Cancelled) => {
            notify::record_notification(
                state,
                &booking.renter_id,
                &booking.id,
                NotificationKind::BookingRejected,
                "Booking Rejected",
                &format!("Your booking request for \"{item_name}\" was declined"),
                &now,
            );
        }
        _ => {}
    }

    Ok(details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use chrono::NaiveDate;
    use tokio::sync::broadcast;

    use crate::config::AppConfig;
    use crate::db;
    use crate::models::{Item, Profile};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn test_state() -> Arc<AppState> {
        let conn = db::init_db(":memory:").unwrap();
        let (notify_tx, _) = broadcast::channel(16);
        Arc::new(AppState {
            db: Arc::new(Mutex::new(conn)),
            config: AppConfig {
                port: 3000,
                database_url: ":memory:".to_string(),
            },
            notify_tx,
        })
    }

    fn seed_profile(conn: &Connection, id: &str, name: &str, is_admin: bool) {
        let profile = Profile {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            full_name: name.to_string(),
            avatar_url: None,
            location: None,
            bio: None,
            phone: None,
            is_verified: true,
            is_admin,
            rating: 0.0,
            review_count: 0,
            joined_at: dt("2024-01-01 00:00"),
        };
        queries::save_profile(conn, &profile).unwrap();
    }

    fn seed_item(conn: &Connection, id: &str, owner_id: &str, price: f64) {
        let item = Item {
            id: id.to_string(),
            name: "Power Drill".to_string(),
            description: "Cordless drill".to_string(),
            price,
            category: "Tools".to_string(),
            owner_id: owner_id.to_string(),
            location: "Springfield".to_string(),
            image: None,
            features: vec!["18V".to_string()],
            is_available: true,
            created_at: dt("2024-01-01 00:00"),
            updated_at: dt("2024-01-01 00:00"),
            average_rating: 0.0,
            review_count: 0,
        };
        queries::create_item(conn, &item).unwrap();
    }

    fn seed_booking(
        conn: &Connection,
        id: &str,
        item_id: &str,
        renter_id: &str,
        owner_id: &str,
        start: &str,
        end: &str,
        status: BookingStatus,
    ) {
        let booking = Booking {
            id: id.to_string(),
            item_id: item_id.to_string(),
            renter_id: renter_id.to_string(),
            owner_id: owner_id.to_string(),
            start_date: date(start),
            end_date: date(end),
            total_price: 100.0,
            status,
            created_at: dt("2024-06-01 00:00"),
            updated_at: dt("2024-06-01 00:00"),
        };
        queries::insert_booking(conn, &booking).unwrap();
    }

    /// One item owned by "owner", profiles for "owner", "renter", "other",
    /// and an admin "root".
    fn seed_marketplace(conn: &Connection) {
        seed_profile(conn, "owner", "Olivia Owner", false);
        seed_profile(conn, "renter", "Rachel Renter", false);
        seed_profile(conn, "other", "Oscar Other", false);
        seed_profile(conn, "root", "Ada Admin", true);
        seed_item(conn, "drill", "owner", 50.0);
    }

    fn renter() -> Actor {
        Actor {
            id: "renter".to_string(),
            is_admin: false,
        }
    }

    fn owner() -> Actor {
        Actor {
            id: "owner".to_string(),
            is_admin: false,
        }
    }

    fn admin() -> Actor {
        Actor {
            id: "root".to_string(),
            is_admin: true,
        }
    }

    // ── Availability ──

    #[test]
    fn test_no_bookings_is_available() {
        let state = test_state();
        let db = state.db.lock().unwrap();
        seed_marketplace(&db);
        assert!(check_item_availability(&db, "drill", date("2025-01-10"), date("2025-01-12")));
    }

    #[test]
    fn test_confirmed_booking_blocks_overlap() {
        let state = test_state();
        let db = state.db.lock().unwrap();
        seed_marketplace(&db);
        seed_booking(&db, "b1", "drill", "renter", "owner", "2025-01-10", "2025-01-12", BookingStatus::Confirmed);

        assert!(!check_item_availability(&db, "drill", date("2025-01-11"), date("2025-01-14")));
        assert!(!check_item_availability(&db, "drill", date("2025-01-08"), date("2025-01-10")));
        // Shared boundary day overlaps: ranges are inclusive.
        assert!(!check_item_availability(&db, "drill", date("2025-01-12"), date("2025-01-14")));
    }

    #[test]
    fn test_disjoint_range_is_available() {
        let state = test_state();
        let db = state.db.lock().unwrap();
        seed_marketplace(&db);
        seed_booking(&db, "b1", "drill", "renter", "owner", "2025-01-10", "2025-01-12", BookingStatus::Confirmed);

        assert!(check_item_availability(&db, "drill", date("2025-01-13"), date("2025-01-15")));
        assert!(check_item_availability(&db, "drill", date("2025-01-07"), date("2025-01-09")));
    }

    #[test]
    fn test_pending_and_terminal_bookings_do_not_block() {
        let state = test_state();
        let db = state.db.lock().unwrap();
        seed_marketplace(&db);
        seed_booking(&db, "b1", "drill", "renter", "owner", "2025-01-10", "2025-01-12", BookingStatus::Pending);
        seed_booking(&db, "b2", "drill", "other", "owner", "2025-01-10", "2025-01-12", BookingStatus::Cancelled);
        seed_booking(&db, "b3", "drill", "other", "owner", "2025-01-10", "2025-01-12", BookingStatus::Completed);

        assert!(check_item_availability(&db, "drill", date("2025-01-10"), date("2025-01-12")));
    }

    #[test]
    fn test_active_booking_blocks() {
        let state = test_state();
        let db = state.db.lock().unwrap();
        seed_marketplace(&db);
        seed_booking(&db, "b1", "drill", "renter", "owner", "2025-01-10", "2025-01-12", BookingStatus::Active);

        assert!(!check_item_availability(&db, "drill", date("2025-01-12"), date("2025-01-13")));
    }

    // ── Creation ──

    fn drill_request(start: &str, end: &str) -> NewBookingRequest {
        NewBookingRequest {
            item_id: "drill".to_string(),
            start_date: date(start),
            end_date: date(end),
            total_price: 150.0,
        }
    }

    #[test]
    fn test_create_requires_login() {
        let state = test_state();
        let db = state.db.lock().unwrap();
        seed_marketplace(&db);

        let result = create_booking_with_dates(&db, None, &drill_request("2025-01-10", "2025-01-12"), dt("2025-01-01 12:00"));
        assert!(matches!(result, Err(BookingError::AuthenticationRequired)));
    }

    #[test]
    fn test_create_unknown_item() {
        let state = test_state();
        let db = state.db.lock().unwrap();
        seed_marketplace(&db);

        let request = NewBookingRequest {
            item_id: "missing".to_string(),
            ..drill_request("2025-01-10", "2025-01-12")
        };
        let result = create_booking_with_dates(&db, Some(&renter()), &request, dt("2025-01-01 12:00"));
        assert!(matches!(result, Err(BookingError::ItemNotFound)));
    }

    #[test]
    fn test_cannot_book_own_item() {
        let state = test_state();
        let db = state.db.lock().unwrap();
        seed_marketplace(&db);

        let result = create_booking_with_dates(&db, Some(&owner()), &drill_request("2025-01-10", "2025-01-12"), dt("2025-01-01 12:00"));
        assert!(matches!(result, Err(BookingError::OwnItem)));

        // The ownership guard fires before any date logic.
        let result = create_booking_with_dates(&db, Some(&owner()), &drill_request("2030-12-01", "2030-12-02"), dt("2025-01-01 12:00"));
        assert!(matches!(result, Err(BookingError::OwnItem)));
    }

    #[test]
    fn test_create_rejects_unavailable_dates() {
        let state = test_state();
        let db = state.db.lock().unwrap();
        seed_marketplace(&db);
        seed_booking(&db, "b1", "drill", "other", "owner", "2025-01-10", "2025-01-12", BookingStatus::Confirmed);

        let result = create_booking_with_dates(&db, Some(&renter()), &drill_request("2025-01-11", "2025-01-13"), dt("2025-01-01 12:00"));
        assert!(matches!(result, Err(BookingError::Unavailable)));
    }

    #[test]
    fn test_create_success_is_pending_and_joined() {
        let state = test_state();
        let db = state.db.lock().unwrap();
        seed_marketplace(&db);

        let details = create_booking_with_dates(&db, Some(&renter()), &drill_request("2025-01-10", "2025-01-12"), dt("2025-01-01 12:00")).unwrap();

        assert_eq!(details.booking.status, BookingStatus::Pending);
        assert_eq!(details.booking.renter_id, "renter");
        assert_eq!(details.booking.owner_id, "owner");
        assert_eq!(details.booking.total_price, 150.0);
        assert_eq!(details.item.unwrap().name, "Power Drill");
        assert_eq!(details.renter.unwrap().full_name, "Rachel Renter");
        assert_eq!(details.owner.unwrap().full_name, "Olivia Owner");

        // Creation writes no notification.
        assert_eq!(queries::get_notifications(&db, "owner").unwrap().len(), 0);
    }

    #[test]
    fn test_two_pending_requests_can_coexist() {
        let state = test_state();
        let db = state.db.lock().unwrap();
        seed_marketplace(&db);

        let other = Actor {
            id: "other".to_string(),
            is_admin: false,
        };
        create_booking_with_dates(&db, Some(&renter()), &drill_request("2025-01-10", "2025-01-12"), dt("2025-01-01 12:00")).unwrap();
        // A second pending request for the same range is accepted.
        create_booking_with_dates(&db, Some(&other), &drill_request("2025-01-10", "2025-01-12"), dt("2025-01-01 12:00")).unwrap();
    }

    // ── Cancellation eligibility ──

    #[test]
    fn test_can_cancel_requires_login() {
        let state = test_state();
        let db = state.db.lock().unwrap();
        seed_marketplace(&db);

        let check = can_cancel_booking(&db, None, "b1", dt("2025-01-01 12:00"));
        assert!(!check.can_cancel);
        assert_eq!(check.reason.unwrap(), "You must be logged in to cancel a booking");
    }

    #[test]
    fn test_can_cancel_missing_booking() {
        let state = test_state();
        let db = state.db.lock().unwrap();
        seed_marketplace(&db);

        let check = can_cancel_booking(&db, Some(&renter()), "missing", dt("2025-01-01 12:00"));
        assert!(!check.can_cancel);
        assert_eq!(check.reason.unwrap(), "Booking not found");
    }

    #[test]
    fn test_can_cancel_third_party_denied() {
        let state = test_state();
        let db = state.db.lock().unwrap();
        seed_marketplace(&db);
        seed_booking(&db, "b1", "drill", "renter", "owner", "2025-01-10", "2025-01-12", BookingStatus::Pending);

        let other = Actor {
            id: "other".to_string(),
            is_admin: false,
        };
        let check = can_cancel_booking(&db, Some(&other), "b1", dt("2025-01-01 12:00"));
        assert!(!check.can_cancel);
        assert_eq!(check.reason.unwrap(), "You don't have permission to cancel this booking");
    }

    #[test]
    fn test_can_cancel_terminal_statuses_have_distinct_reasons() {
        let state = test_state();
        let db = state.db.lock().unwrap();
        seed_marketplace(&db);
        seed_booking(&db, "ba", "drill", "renter", "owner", "2025-01-10", "2025-01-12", BookingStatus::Active);
        seed_booking(&db, "bc", "drill", "renter", "owner", "2025-02-10", "2025-02-12", BookingStatus::Completed);
        seed_booking(&db, "bx", "drill", "renter", "owner", "2025-03-10", "2025-03-12", BookingStatus::Cancelled);

        let now = dt("2025-01-01 12:00");
        assert_eq!(
            can_cancel_booking(&db, Some(&renter()), "ba", now).reason.unwrap(),
            "Cannot cancel an active rental that has already started"
        );
        assert_eq!(
            can_cancel_booking(&db, Some(&renter()), "bc", now).reason.unwrap(),
            "Cannot cancel a completed booking"
        );
        assert_eq!(
            can_cancel_booking(&db, Some(&renter()), "bx", now).reason.unwrap(),
            "This booking is already cancelled"
        );
    }

    #[test]
    fn test_confirmed_booking_already_started() {
        let state = test_state();
        let db = state.db.lock().unwrap();
        seed_marketplace(&db);
        seed_booking(&db, "b1", "drill", "renter", "owner", "2025-01-10", "2025-01-12", BookingStatus::Confirmed);

        // Start-of-day on the start date counts as started.
        let check = can_cancel_booking(&db, Some(&owner()), "b1", dt("2025-01-10 00:00"));
        assert!(!check.can_cancel);
        assert_eq!(check.reason.unwrap(), "Cannot cancel a booking that has already started");
    }

    #[test]
    fn test_renter_grace_period_denied_owner_allowed() {
        let state = test_state();
        let db = state.db.lock().unwrap();
        seed_marketplace(&db);
        seed_booking(&db, "b1", "drill", "renter", "owner", "2025-01-10", "2025-01-12", BookingStatus::Confirmed);

        // 12 hours before the start: inside the renter's grace window.
        let now = dt("2025-01-09 12:00");
        let renter_check = can_cancel_booking(&db, Some(&renter()), "b1", now);
        assert!(!renter_check.can_cancel);
        assert_eq!(renter_check.reason.unwrap(), "Cannot cancel within 24 hours of the rental start time");

        let owner_check = can_cancel_booking(&db, Some(&owner()), "b1", now);
        assert!(owner_check.can_cancel);

        let admin_check = can_cancel_booking(&db, Some(&admin()), "b1", now);
        assert!(admin_check.can_cancel);
    }

    #[test]
    fn test_renter_outside_grace_period_allowed() {
        let state = test_state();
        let db = state.db.lock().unwrap();
        seed_marketplace(&db);
        seed_booking(&db, "b1", "drill", "renter", "owner", "2025-01-10", "2025-01-12", BookingStatus::Confirmed);

        let check = can_cancel_booking(&db, Some(&renter()), "b1", dt("2025-01-08 12:00"));
        assert!(check.can_cancel);
    }

    #[test]
    fn test_grace_period_does_not_apply_to_pending() {
        let state = test_state();
        let db = state.db.lock().unwrap();
        seed_marketplace(&db);
        seed_booking(&db, "b1", "drill", "renter", "owner", "2025-01-10", "2025-01-12", BookingStatus::Pending);

        // One hour before the start, but the request was never confirmed.
        let check = can_cancel_booking(&db, Some(&renter()), "b1", dt("2025-01-09 23:00"));
        assert!(check.can_cancel);
    }

    // ── Cancellation execution ──

    #[test]
    fn test_cancel_agrees_with_eligibility_check() {
        let state = test_state();
        {
            let db = state.db.lock().unwrap();
            seed_marketplace(&db);
            seed_booking(&db, "started", "drill", "renter", "owner", "2025-01-01", "2025-01-03", BookingStatus::Confirmed);
            seed_booking(&db, "done", "drill", "renter", "owner", "2025-02-10", "2025-02-12", BookingStatus::Completed);
            seed_booking(&db, "grace", "drill", "renter", "owner", "2025-06-10", "2025-06-12", BookingStatus::Confirmed);
        }

        let now = dt("2025-06-09 18:00");
        for (booking_id, actor) in [
            ("started", renter()),
            ("done", renter()),
            ("grace", renter()),
            ("missing", renter()),
        ] {
            let check = {
                let db = state.db.lock().unwrap();
                can_cancel_booking(&db, Some(&actor), booking_id, now)
            };
            let outcome = cancel_booking(&state, Some(&actor), booking_id, None, now);
            assert!(!check.can_cancel);
            assert!(!outcome.success);
            assert_eq!(check.reason.unwrap(), outcome.message);
        }
    }

    #[test]
    fn test_renter_cancel_notifies_owner() {
        let state = test_state();
        {
            let db = state.db.lock().unwrap();
            seed_marketplace(&db);
            seed_booking(&db, "b1", "drill", "renter", "owner", "2025-01-10", "2025-01-12", BookingStatus::Pending);
        }

        let outcome = cancel_booking(&state, Some(&renter()), "b1", Some("changed my mind"), dt("2025-01-01 12:00"));
        assert!(outcome.success);
        assert_eq!(outcome.message, "Booking cancelled successfully. The owner has been notified.");

        let db = state.db.lock().unwrap();
        assert_eq!(
            queries::get_booking_by_id(&db, "b1").unwrap().unwrap().status,
            BookingStatus::Cancelled
        );

        let notifications = queries::get_notifications(&db, "owner").unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::BookingCancelled);
        assert_eq!(notifications[0].title, "Booking Cancelled by Renter");
        assert_eq!(
            notifications[0].message,
            "Rachel Renter has cancelled their booking for \"Power Drill\""
        );
        assert!(!notifications[0].is_read);
    }

    #[test]
    fn test_owner_cancel_notifies_renter() {
        let state = test_state();
        {
            let db = state.db.lock().unwrap();
            seed_marketplace(&db);
            seed_booking(&db, "b1", "drill", "renter", "owner", "2025-01-10", "2025-01-12", BookingStatus::Confirmed);
        }

        let outcome = cancel_booking(&state, Some(&owner()), "b1", None, dt("2025-01-09 12:00"));
        assert!(outcome.success);
        assert_eq!(outcome.message, "Booking cancelled successfully. The renter has been notified.");

        let db = state.db.lock().unwrap();
        let notifications = queries::get_notifications(&db, "renter").unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "Booking Cancelled by Owner");
        assert_eq!(
            notifications[0].message,
            "Olivia Owner has cancelled the booking for \"Power Drill\""
        );
    }

    #[test]
    fn test_admin_cancel_uses_owner_branch() {
        let state = test_state();
        {
            let db = state.db.lock().unwrap();
            seed_marketplace(&db);
            seed_booking(&db, "b1", "drill", "renter", "owner", "2025-01-10", "2025-01-12", BookingStatus::Pending);
        }

        let outcome = cancel_booking(&state, Some(&admin()), "b1", None, dt("2025-01-01 12:00"));
        assert!(outcome.success);
        assert_eq!(outcome.message, "Booking cancelled successfully. The renter has been notified.");

        let db = state.db.lock().unwrap();
        assert_eq!(queries::get_notifications(&db, "renter").unwrap().len(), 1);
    }

    #[test]
    fn test_double_cancel_is_idempotent_failure() {
        let state = test_state();
        {
            let db = state.db.lock().unwrap();
            seed_marketplace(&db);
            seed_booking(&db, "b1", "drill", "renter", "owner", "2025-01-10", "2025-01-12", BookingStatus::Pending);
        }

        let now = dt("2025-01-01 12:00");
        let first = cancel_booking(&state, Some(&renter()), "b1", None, now);
        assert!(first.success);

        let second = cancel_booking(&state, Some(&renter()), "b1", None, now);
        assert!(!second.success);
        assert_eq!(second.message, "This booking is already cancelled");

        let third = cancel_booking(&state, Some(&renter()), "b1", None, now);
        assert!(!third.success);
        assert_eq!(third.message, "This booking is already cancelled");

        // Exactly one notification from the one successful cancellation.
        let db = state.db.lock().unwrap();
        assert_eq!(queries::get_notifications(&db, "owner").unwrap().len(), 1);
    }

    // ── Status updates ──

    #[test]
    fn test_owner_confirms_pending_booking() {
        let state = test_state();
        {
            let db = state.db.lock().unwrap();
            seed_marketplace(&db);
            seed_booking(&db, "b1", "drill", "renter", "owner", "2025-01-10", "2025-01-12", BookingStatus::Pending);
        }

        let details = update_booking_status(&state, Some(&owner()), "b1", BookingStatus::Confirmed, dt("2025-01-02 09:00")).unwrap();
        assert_eq!(details.booking.status, BookingStatus::Confirmed);

        let db = state.db.lock().unwrap();
        let notifications = queries::get_notifications(&db, "renter").unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::BookingApproved);
    }

    #[test]
    fn test_owner_rejects_pending_booking() {
        let state = test_state();
        {
            let db = state.db.lock().unwrap();
            seed_marketplace(&db);
            seed_booking(&db, "b1", "drill", "renter", "owner", "2025-01-10", "2025-01-12", BookingStatus::Pending);
        }

        let details = update_booking_status(&state, Some(&owner()), "b1", BookingStatus::Cancelled, dt("2025-01-02 09:00")).unwrap();
        assert_eq!(details.booking.status, BookingStatus::Cancelled);

        let db = state.db.lock().unwrap();
        let notifications = queries::get_notifications(&db, "renter").unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::BookingRejected);
    }

    #[test]
    fn test_renter_cannot_confirm() {
        let state = test_state();
        {
            let db = state.db.lock().unwrap();
            seed_marketplace(&db);
            seed_booking(&db, "b1", "drill", "renter", "owner", "2025-01-10", "2025-01-12", BookingStatus::Pending);
        }

        let result = update_booking_status(&state, Some(&renter()), "b1", BookingStatus::Confirmed, dt("2025-01-02 09:00"));
        assert!(matches!(result, Err(StatusUpdateError::NoPermission)));
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let state = test_state();
        {
            let db = state.db.lock().unwrap();
            seed_marketplace(&db);
            seed_booking(&db, "b1", "drill", "renter", "owner", "2025-01-10", "2025-01-12", BookingStatus::Cancelled);
        }

        let result = update_booking_status(&state, Some(&owner()), "b1", BookingStatus::Confirmed, dt("2025-01-02 09:00"));
        assert!(matches!(result, Err(StatusUpdateError::InvalidTransition { .. })));
    }

    // ── End to end ──

    #[test]
    fn test_full_booking_lifecycle() {
        let state = test_state();
        {
            let db = state.db.lock().unwrap();
            seed_marketplace(&db);
        }

        // $50/day drill, three inclusive days, price supplied by the caller.
        let details = {
            let db = state.db.lock().unwrap();
            create_booking_with_dates(
                &db,
                Some(&renter()),
                &NewBookingRequest {
                    item_id: "drill".to_string(),
                    start_date: date("2025-01-10"),
                    end_date: date("2025-01-12"),
                    total_price: 150.0,
                },
                dt("2025-01-02 10:00"),
            )
            .unwrap()
        };
        assert_eq!(details.booking.status, BookingStatus::Pending);
        let booking_id = details.booking.id.clone();

        let confirmed = update_booking_status(&state, Some(&owner()), &booking_id, BookingStatus::Confirmed, dt("2025-01-02 11:00")).unwrap();
        assert_eq!(confirmed.booking.status, BookingStatus::Confirmed);

        // Renter tries to cancel the evening before: grace period denies it.
        let now = dt("2025-01-09 12:00");
        let renter_attempt = cancel_booking(&state, Some(&renter()), &booking_id, None, now);
        assert!(!renter_attempt.success);
        assert_eq!(renter_attempt.message, "Cannot cancel within 24 hours of the rental start time");

        // The owner may still cancel, and the renter is notified.
        let owner_attempt = cancel_booking(&state, Some(&owner()), &booking_id, None, now);
        assert!(owner_attempt.success);

        let db = state.db.lock().unwrap();
        assert_eq!(
            queries::get_booking_by_id(&db, &booking_id).unwrap().unwrap().status,
            BookingStatus::Cancelled
        );
        let notifications = queries::get_notifications(&db, "renter").unwrap();
        // Approval first, then the cancellation.
        assert_eq!(notifications.len(), 2);
        assert!(notifications
            .iter()
            .any(|n| n.kind == NotificationKind::BookingCancelled));
    }
}
