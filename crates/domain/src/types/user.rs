//! User identity as provided by the messaging platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bot user. The id is assigned by the messaging platform and is globally
/// unique and immutable; rows are created on first contact and never deleted
/// by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    /// ISO 639-1 language code, defaults to "en".
    pub language: String,
    pub created_at: DateTime<Utc>,
}
