use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Best-effort informational record written for the counterparty of a
/// booking state change. Owned by the recipient; only the read flag
/// mutates after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub booking_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingRequest,
    BookingApproved,
    BookingRejected,
    BookingCancelled,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BookingRequest => "booking_request",
            NotificationKind::BookingApproved => "booking_approved",
            NotificationKind::BookingRejected => "booking_rejected",
            NotificationKind::BookingCancelled => "booking_cancelled",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "booking_approved" => NotificationKind::BookingApproved,
            "booking_rejected" => NotificationKind::BookingRejected,
            "booking_cancelled" => NotificationKind::BookingCancelled,
            _ => NotificationKind::BookingRequest,
        }
    }
}
