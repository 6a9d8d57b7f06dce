use std::sync::{Arc, Mutex};

use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use renthub::config::AppConfig;
use renthub::db;
use renthub::handlers;
use renthub::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let (notify_tx, _) = broadcast::channel(256);

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        notify_tx,
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/categories", get(handlers::items::list_categories))
        .route("/api/items", get(handlers::items::list_items))
        .route("/api/items", post(handlers::items::create_item))
        .route("/api/items/:id", get(handlers::items::get_item))
        .route("/api/items/:id", put(handlers::items::update_item))
        .route("/api/items/:id", delete(handlers::items::delete_item))
        .route(
            "/api/items/:id/booked-dates",
            get(handlers::items::booked_dates),
        )
        .route(
            "/api/items/:id/availability",
            get(handlers::bookings::check_availability),
        )
        .route(
            "/api/items/:id/reviews",
            get(handlers::reviews::reviews_by_item),
        )
        .route("/api/users/:id/items", get(handlers::items::items_by_owner))
        .route("/api/bookings", get(handlers::bookings::my_bookings))
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/api/bookings/:id/can-cancel",
            get(handlers::bookings::can_cancel),
        )
        .route(
            "/api/bookings/:id/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/bookings/:id/status",
            patch(handlers::bookings::update_status),
        )
        .route("/api/reviews", post(handlers::reviews::create_review))
        .route("/api/profiles", post(handlers::profiles::register_profile))
        .route(
            "/api/profiles/me",
            put(handlers::profiles::update_my_profile),
        )
        .route("/api/profiles/:id", get(handlers::profiles::get_profile))
        .route(
            "/api/profiles/:id/stats",
            get(handlers::profiles::profile_stats),
        )
        .route(
            "/api/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/api/notifications/unread-count",
            get(handlers::notifications::unread_count),
        )
        .route(
            "/api/notifications/:id/read",
            post(handlers::notifications::mark_read),
        )
        .route(
            "/api/notifications/read-all",
            post(handlers::notifications::mark_all_read),
        )
        .route(
            "/api/notifications/events",
            get(handlers::notifications::events_stream),
        )
        .route("/api/admin/analytics", get(handlers::admin::get_analytics))
        .route("/api/admin/bookings", get(handlers::admin::all_bookings))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
