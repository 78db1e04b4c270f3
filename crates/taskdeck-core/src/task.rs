use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title given to the one-time bootstrap task inserted into an empty store.
pub const WELCOME_TITLE: &str = "Welcome to TaskManager";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: i64,

    pub title: String,

    pub completed: bool,
}

impl Task {
    pub fn new(title: String, id: i64) -> Self {
        Self {
            id,
            title,
            completed: false,
        }
    }

    /// The welcome task is backdated by three seconds so that anything added
    /// in the same session gets a strictly larger id.
    pub fn welcome(now: DateTime<Utc>) -> Self {
        Self::new(WELCOME_TITLE.to_string(), now.timestamp_millis() - 3000)
    }
}
