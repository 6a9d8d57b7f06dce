use chrono::{Months, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{
    Booking, BookingDetails, BookingStatus, Item, Notification, NotificationKind, Profile,
    ProfileStats, Review, ReviewDetails,
};

const DATE_FMT: &str = "%Y-%m-%d";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

fn fmt_date(d: NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

fn fmt_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FMT).to_string()
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, DATE_FMT).unwrap_or_else(|_| Utc::now().date_naive())
}

fn parse_datetime(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT).unwrap_or_else(|_| Utc::now().naive_utc())
}

// ── Profiles ──

const PROFILE_COLUMNS: &str = "id, email, full_name, avatar_url, location, bio, phone, \
     is_verified, is_admin, rating, review_count, joined_at";

fn parse_profile_row(row: &rusqlite::Row) -> anyhow::Result<Profile> {
    let joined_at_str: String = row.get(11)?;
    Ok(Profile {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        avatar_url: row.get(3)?,
        location: row.get(4)?,
        bio: row.get(5)?,
        phone: row.get(6)?,
        is_verified: row.get::<_, i64>(7)? != 0,
        is_admin: row.get::<_, i64>(8)? != 0,
        rating: row.get(9)?,
        review_count: row.get(10)?,
        joined_at: parse_datetime(&joined_at_str),
    })
}

pub fn get_profile(conn: &Connection, id: &str) -> anyhow::Result<Option<Profile>> {
    let result = conn.query_row(
        &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
        params![id],
        |row| Ok(parse_profile_row(row)),
    );

    match result {
        Ok(profile) => Ok(Some(profile?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn save_profile(conn: &Connection, profile: &Profile) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO profiles (id, email, full_name, avatar_url, location, bio, phone,
             is_verified, is_admin, rating, review_count, joined_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(id) DO UPDATE SET
           email = excluded.email,
           full_name = excluded.full_name,
           avatar_url = excluded.avatar_url,
           location = excluded.location,
           bio = excluded.bio,
           phone = excluded.phone,
           is_verified = excluded.is_verified,
           is_admin = excluded.is_admin,
           rating = excluded.rating,
           review_count = excluded.review_count",
        params![
            profile.id,
            profile.email,
            profile.full_name,
            profile.avatar_url,
            profile.location,
            profile.bio,
            profile.phone,
            profile.is_verified as i64,
            profile.is_admin as i64,
            profile.rating,
            profile.review_count,
            fmt_datetime(&profile.joined_at),
        ],
    )?;
    Ok(())
}

/// Admin lookup is fail-closed: any error reads as "not an admin".
pub fn is_admin(conn: &Connection, user_id: &str) -> bool {
    match conn.query_row(
        "SELECT is_admin FROM profiles WHERE id = ?1",
        params![user_id],
        |row| row.get::<_, i64>(0),
    ) {
        Ok(flag) => flag != 0,
        Err(rusqlite::Error::QueryReturnedNoRows) => false,
        Err(e) => {
            tracing::error!(error = %e, user_id, "failed to check admin status");
            false
        }
    }
}

pub fn get_profile_stats(conn: &Connection, user_id: &str) -> anyhow::Result<ProfileStats> {
    let items_listed: i64 = conn.query_row(
        "SELECT COUNT(*) FROM items WHERE owner_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    let bookings_as_owner: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE owner_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    let bookings_as_renter: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE renter_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    let reviews_given: i64 = conn.query_row(
        "SELECT COUNT(*) FROM reviews WHERE reviewer_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;

    Ok(ProfileStats {
        items_listed,
        bookings_as_owner,
        bookings_as_renter,
        reviews_given,
    })
}

// ── Items ──

const ITEM_SELECT: &str = "SELECT i.id, i.name, i.description, i.price, i.category, i.owner_id, \
     i.location, i.image, i.features, i.is_available, i.created_at, i.updated_at, \
     COALESCE(AVG(r.rating), 0), COUNT(r.id) \
     FROM items i LEFT JOIN reviews r ON r.item_id = i.id";

fn parse_item_row(row: &rusqlite::Row) -> anyhow::Result<Item> {
    let features_json: String = row.get(8)?;
    let created_at_str: String = row.get(10)?;
    let updated_at_str: String = row.get(11)?;

    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        category: row.get(4)?,
        owner_id: row.get(5)?,
        location: row.get(6)?,
        image: row.get(7)?,
        features: serde_json::from_str(&features_json).unwrap_or_default(),
        is_available: row.get::<_, i64>(9)? != 0,
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
        average_rating: row.get(12)?,
        review_count: row.get(13)?,
    })
}

pub fn create_item(conn: &Connection, item: &Item) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO items (id, name, description, price, category, owner_id, location, image,
             features, is_available, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            item.id,
            item.name,
            item.description,
            item.price,
            item.category,
            item.owner_id,
            item.location,
            item.image,
            serde_json::to_string(&item.features)?,
            item.is_available as i64,
            fmt_datetime(&item.created_at),
            fmt_datetime(&item.updated_at),
        ],
    )?;
    Ok(())
}

pub fn update_item(conn: &Connection, item: &Item) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE items SET name = ?1, description = ?2, price = ?3, category = ?4, location = ?5,
             image = ?6, features = ?7, is_available = ?8, updated_at = ?9
         WHERE id = ?10",
        params![
            item.name,
            item.description,
            item.price,
            item.category,
            item.location,
            item.image,
            serde_json::to_string(&item.features)?,
            item.is_available as i64,
            fmt_datetime(&item.updated_at),
            item.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_item(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM items WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn get_item_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Item>> {
    let result = conn.query_row(
        &format!("{ITEM_SELECT} WHERE i.id = ?1 GROUP BY i.id"),
        params![id],
        |row| Ok(parse_item_row(row)),
    );

    match result {
        Ok(item) => Ok(Some(item?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Default, Clone)]
pub struct ItemFilters {
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub location: Option<String>,
    pub sort_by: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub fn list_items(conn: &Connection, filters: &ItemFilters) -> anyhow::Result<Vec<Item>> {
    let mut clauses: Vec<String> = vec!["i.is_available = 1".to_string()];
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(category) = &filters.category {
        values.push(Box::new(category.clone()));
        clauses.push(format!("i.category = ?{}", values.len()));
    }
    if let Some(search) = &filters.search {
        values.push(Box::new(format!("%{search}%")));
        let n = values.len();
        clauses.push(format!("(i.name LIKE ?{n} OR i.description LIKE ?{n})"));
    }
    if let Some(min_price) = filters.min_price {
        values.push(Box::new(min_price));
        clauses.push(format!("i.price >= ?{}", values.len()));
    }
    if let Some(max_price) = filters.max_price {
        values.push(Box::new(max_price));
        clauses.push(format!("i.price <= ?{}", values.len()));
    }
    if let Some(location) = &filters.location {
        values.push(Box::new(format!("%{location}%")));
        clauses.push(format!("i.location LIKE ?{}", values.len()));
    }

    let order = match filters.sort_by.as_deref() {
        Some("price_asc") => "i.price ASC",
        Some("price_desc") => "i.price DESC",
        Some("rating") => "COALESCE(AVG(r.rating), 0) DESC",
        _ => "i.created_at DESC",
    };

    values.push(Box::new(filters.limit.unwrap_or(50)));
    let limit_idx = values.len();
    values.push(Box::new(filters.offset.unwrap_or(0)));
    let offset_idx = values.len();

    let sql = format!(
        "{ITEM_SELECT} WHERE {} GROUP BY i.id ORDER BY {order} LIMIT ?{limit_idx} OFFSET ?{offset_idx}",
        clauses.join(" AND "),
    );

    let mut stmt = conn.prepare(&sql)?;
    let value_refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let rows = stmt.query_map(value_refs.as_slice(), |row| Ok(parse_item_row(row)))?;

    let mut items = vec![];
    for row in rows {
        items.push(row??);
    }
    Ok(items)
}

pub fn get_items_by_owner(conn: &Connection, owner_id: &str) -> anyhow::Result<Vec<Item>> {
    let mut stmt = conn.prepare(&format!(
        "{ITEM_SELECT} WHERE i.owner_id = ?1 GROUP BY i.id ORDER BY i.created_at DESC"
    ))?;
    let rows = stmt.query_map(params![owner_id], |row| Ok(parse_item_row(row)))?;

    let mut items = vec![];
    for row in rows {
        items.push(row??);
    }
    Ok(items)
}

/// Distinct categories with the number of available items in each, most
/// populated first. Drives the browse-by-category index.
pub fn list_categories(conn: &Connection) -> anyhow::Result<Vec<CategoryCount>> {
    let mut stmt = conn.prepare(
        "SELECT category, COUNT(*) FROM items WHERE is_available = 1
         GROUP BY category ORDER BY COUNT(*) DESC, category ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(CategoryCount {
            category: row.get(0)?,
            count: row.get(1)?,
        })
    })?;

    let mut categories = vec![];
    for row in rows {
        categories.push(row?);
    }
    Ok(categories)
}

/// Date ranges held against an item's calendar. Confirmed and pending both
/// appear here so the date picker can grey out requested days, even though
/// pending bookings do not block new requests.
pub fn get_booked_ranges(
    conn: &Connection,
    item_id: &str,
) -> anyhow::Result<Vec<(NaiveDate, NaiveDate)>> {
    let mut stmt = conn.prepare(
        "SELECT start_date, end_date FROM bookings
         WHERE item_id = ?1 AND status IN ('confirmed', 'pending')",
    )?;
    let rows = stmt.query_map(params![item_id], |row| {
        let start: String = row.get(0)?;
        let end: String = row.get(1)?;
        Ok((parse_date(&start), parse_date(&end)))
    })?;

    let mut ranges = vec![];
    for row in rows {
        ranges.push(row?);
    }
    Ok(ranges)
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, item_id, renter_id, owner_id, start_date, end_date, \
     total_price, status, created_at, updated_at";

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let start_date_str: String = row.get(4)?;
    let end_date_str: String = row.get(5)?;
    let status_str: String = row.get(7)?;
    let created_at_str: String = row.get(8)?;
    let updated_at_str: String = row.get(9)?;

    Ok(Booking {
        id: row.get(0)?,
        item_id: row.get(1)?,
        renter_id: row.get(2)?,
        owner_id: row.get(3)?,
        start_date: parse_date(&start_date_str),
        end_date: parse_date(&end_date_str),
        total_price: row.get(6)?,
        status: BookingStatus::parse(&status_str),
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
    })
}

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, item_id, renter_id, owner_id, start_date, end_date,
             total_price, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            booking.id,
            booking.item_id,
            booking.renter_id,
            booking.owner_id,
            fmt_date(booking.start_date),
            fmt_date(booking.end_date),
            booking.total_price,
            booking.status.as_str(),
            fmt_datetime(&booking.created_at),
            fmt_datetime(&booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Bookings that hold the item's calendar against a candidate range.
/// Closed-interval overlap: existing.start <= candidate.end AND
/// existing.end >= candidate.start. ISO date strings compare correctly
/// as text.
pub fn get_blocking_bookings(
    conn: &Connection,
    item_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE item_id = ?1 AND status IN ('confirmed', 'active')
           AND start_date <= ?2 AND end_date >= ?3"
    ))?;
    let rows = stmt.query_map(
        params![item_id, fmt_date(end), fmt_date(start)],
        |row| Ok(parse_booking_row(row)),
    )?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), fmt_datetime(now), id],
    )?;
    Ok(count > 0)
}

fn join_booking(conn: &Connection, booking: Booking) -> anyhow::Result<BookingDetails> {
    let item = get_item_by_id(conn, &booking.item_id)?;
    let renter = get_profile(conn, &booking.renter_id)?;
    let owner = get_profile(conn, &booking.owner_id)?;
    Ok(BookingDetails {
        booking,
        item,
        renter,
        owner,
    })
}

pub fn get_booking_details(conn: &Connection, id: &str) -> anyhow::Result<Option<BookingDetails>> {
    match get_booking_by_id(conn, id)? {
        Some(booking) => Ok(Some(join_booking(conn, booking)?)),
        None => Ok(None),
    }
}

pub fn get_bookings_by_user(
    conn: &Connection,
    user_id: &str,
    as_owner: bool,
) -> anyhow::Result<Vec<BookingDetails>> {
    let column = if as_owner { "owner_id" } else { "renter_id" };
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE {column} = ?1 ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![user_id], |row| Ok(parse_booking_row(row)))?;

    let mut details = vec![];
    for row in rows {
        details.push(join_booking(conn, row??)?);
    }
    Ok(details)
}

pub fn get_all_bookings(conn: &Connection, limit: i64) -> anyhow::Result<Vec<BookingDetails>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit], |row| Ok(parse_booking_row(row)))?;

    let mut details = vec![];
    for row in rows {
        details.push(join_booking(conn, row??)?);
    }
    Ok(details)
}

// ── Reviews ──

pub fn create_review(conn: &Connection, review: &Review) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO reviews (id, item_id, booking_id, reviewer_id, rating, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            review.id,
            review.item_id,
            review.booking_id,
            review.reviewer_id,
            review.rating,
            review.comment,
            fmt_datetime(&review.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_reviews_by_item(conn: &Connection, item_id: &str) -> anyhow::Result<Vec<ReviewDetails>> {
    let mut stmt = conn.prepare(
        "SELECT id, item_id, booking_id, reviewer_id, rating, comment, created_at
         FROM reviews WHERE item_id = ?1 ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map(params![item_id], |row| {
        let created_at_str: String = row.get(6)?;
        Ok(Review {
            id: row.get(0)?,
            item_id: row.get(1)?,
            booking_id: row.get(2)?,
            reviewer_id: row.get(3)?,
            rating: row.get(4)?,
            comment: row.get(5)?,
            created_at: parse_datetime(&created_at_str),
        })
    })?;

    let mut details = vec![];
    for row in rows {
        let review = row?;
        let reviewer = get_profile(conn, &review.reviewer_id)?;
        details.push(ReviewDetails { review, reviewer });
    }
    Ok(details)
}

// ── Notifications ──

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, booking_id, kind, title, message, is_read, created_at";

fn parse_notification_row(row: &rusqlite::Row) -> anyhow::Result<Notification> {
    let kind_str: String = row.get(3)?;
    let created_at_str: String = row.get(7)?;
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        booking_id: row.get(2)?,
        kind: NotificationKind::parse(&kind_str),
        title: row.get(4)?,
        message: row.get(5)?,
        is_read: row.get::<_, i64>(6)? != 0,
        created_at: parse_datetime(&created_at_str),
    })
}

pub fn insert_notification(conn: &Connection, notification: &Notification) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO notifications (id, user_id, booking_id, kind, title, message, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            notification.id,
            notification.user_id,
            notification.booking_id,
            notification.kind.as_str(),
            notification.title,
            notification.message,
            notification.is_read as i64,
            fmt_datetime(&notification.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_notifications(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Notification>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications
         WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map(params![user_id], |row| Ok(parse_notification_row(row)))?;

    let mut notifications = vec![];
    for row in rows {
        notifications.push(row??);
    }
    Ok(notifications)
}

pub fn get_unread_notifications(
    conn: &Connection,
    user_id: &str,
) -> anyhow::Result<Vec<Notification>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications
         WHERE user_id = ?1 AND is_read = 0 ORDER BY created_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![user_id], |row| Ok(parse_notification_row(row)))?;

    let mut notifications = vec![];
    for row in rows {
        notifications.push(row??);
    }
    Ok(notifications)
}

pub fn unread_notification_count(conn: &Connection, user_id: &str) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn mark_notification_read(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE id = ?1",
        params![id],
    )?;
    Ok(count > 0)
}

pub fn mark_all_notifications_read(conn: &Connection, user_id: &str) -> anyhow::Result<usize> {
    let count = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
        params![user_id],
    )?;
    Ok(count)
}

// ── Admin Analytics ──

#[derive(Debug, Clone, serde::Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MonthlyBookings {
    pub month: String,
    pub count: i64,
    pub revenue: f64,
}

#[derive(Debug, serde::Serialize)]
pub struct AdminAnalytics {
    pub total_items: i64,
    pub total_bookings: i64,
    pub total_users: i64,
    pub total_reviews: i64,
    pub total_revenue: f64,
    pub items_by_category: Vec<CategoryCount>,
    pub bookings_by_status: Vec<StatusCount>,
    pub bookings_by_month: Vec<MonthlyBookings>,
    pub recent_bookings: Vec<BookingDetails>,
}

pub fn get_admin_analytics(
    conn: &Connection,
    now: &NaiveDateTime,
) -> anyhow::Result<AdminAnalytics> {
    let total_items: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
    let total_bookings: i64 =
        conn.query_row("SELECT COUNT(*) FROM bookings", [], |row| row.get(0))?;
    let total_users: i64 = conn.query_row("SELECT COUNT(*) FROM profiles", [], |row| row.get(0))?;
    let total_reviews: i64 = conn.query_row("SELECT COUNT(*) FROM reviews", [], |row| row.get(0))?;
    let total_revenue: f64 = conn.query_row(
        "SELECT COALESCE(SUM(total_price), 0) FROM bookings",
        [],
        |row| row.get(0),
    )?;

    let mut stmt =
        conn.prepare("SELECT category, COUNT(*) FROM items GROUP BY category ORDER BY COUNT(*) DESC")?;
    let rows = stmt.query_map([], |row| {
        Ok(CategoryCount {
            category: row.get(0)?,
            count: row.get(1)?,
        })
    })?;
    let mut items_by_category = vec![];
    for row in rows {
        items_by_category.push(row?);
    }

    let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM bookings GROUP BY status")?;
    let rows = stmt.query_map([], |row| {
        Ok(StatusCount {
            status: row.get(0)?,
            count: row.get(1)?,
        })
    })?;
    let mut bookings_by_status = vec![];
    for row in rows {
        bookings_by_status.push(row?);
    }

    // Last 6 months, zero-filled, oldest first.
    let mut stmt = conn.prepare(
        "SELECT strftime('%Y-%m', created_at), COUNT(*), COALESCE(SUM(total_price), 0)
         FROM bookings GROUP BY 1",
    )?;
    let rows = stmt.query_map([], |row| {
        let month: String = row.get(0)?;
        let count: i64 = row.get(1)?;
        let revenue: f64 = row.get(2)?;
        Ok((month, count, revenue))
    })?;
    let mut by_month = std::collections::HashMap::new();
    for row in rows {
        let (month, count, revenue) = row?;
        by_month.insert(month, (count, revenue));
    }

    let mut bookings_by_month = Vec::with_capacity(6);
    for i in (0..6).rev() {
        let date = now
            .checked_sub_months(Months::new(i))
            .unwrap_or(*now);
        let month = date.format("%Y-%m").to_string();
        let (count, revenue) = by_month.get(&month).copied().unwrap_or((0, 0.0));
        bookings_by_month.push(MonthlyBookings {
            month,
            count,
            revenue,
        });
    }

    let recent_bookings = get_all_bookings(conn, 10)?;

    Ok(AdminAnalytics {
        total_items,
        total_bookings,
        total_users,
        total_reviews,
        total_revenue,
        items_by_category,
        bookings_by_status,
        bookings_by_month,
        recent_bookings,
    })
}
