//! Newsletter subscribers.

use chrono::{DateTime, Utc};
use redline_core::{Email, SubscriberId};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub email: Email,
    pub created_at: DateTime<Utc>,
}
