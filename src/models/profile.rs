use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub is_verified: bool,
    pub is_admin: bool,
    pub rating: f64,
    pub review_count: i64,
    pub joined_at: NaiveDateTime,
}

impl Profile {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id.clone(),
            is_admin: self.is_admin,
        }
    }
}

/// The authenticated caller of an engine operation. Resolved once at the
/// edge and passed in explicitly so the engine never reads session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileStats {
    pub items_listed: i64,
    pub bookings_as_owner: i64,
    pub bookings_as_renter: i64,
    pub reviews_given: i64,
}
