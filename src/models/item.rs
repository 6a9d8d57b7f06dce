use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A rentable object listed by an owner. `features` is stored as a JSON
/// array in a single column; `average_rating` and `review_count` are
/// derived from reviews at query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub owner_id: String,
    pub location: String,
    pub image: Option<String>,
    pub features: Vec<String>,
    pub is_available: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub average_rating: f64,
    pub review_count: i64,
}
