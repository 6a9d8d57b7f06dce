use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::models::Notification;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    /// Fan-out for freshly written notifications; SSE subscribers filter
    /// by recipient. Send errors (no receivers) are ignored.
    pub notify_tx: broadcast::Sender<Notification>,
}
