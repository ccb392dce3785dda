use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::Error;

/// Rows removed by one cleanup pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub sessions: u64,
    pub refresh_tokens: u64,
    pub email_verifications: u64,
    pub reset_codes: u64,
}

impl CleanupReport {
    pub fn total(&self) -> u64 {
        self.sessions + self.refresh_tokens + self.email_verifications + self.reset_codes
    }
}

/// Removes rows whose `expires_at` is at or before `now`
///
/// Expiry is enforced at use time regardless; this only reclaims space.
#[async_trait]
pub trait ExpiredRecordDeleter<Tx: Send>: Send + Sync + 'static {
    async fn delete_expired(&self, tx: &mut Tx, now: DateTime<Utc>)
    -> Result<CleanupReport, Error>;
}
