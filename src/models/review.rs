use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::Profile;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub item_id: String,
    pub booking_id: String,
    pub reviewer_id: String,
    pub rating: i64,
    pub comment: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewDetails {
    #[serde(flatten)]
    pub review: Review,
    pub reviewer: Option<Profile>,
}
