use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Cache entry behind a download token. The secret itself is the map key.
#[derive(Debug, Clone)]
pub struct DownloadToken {
    pub target_path: PathBuf,
    pub issued_at: DateTime<Utc>,
}

impl DownloadToken {
    pub fn is_expired(&self, now: DateTime<Utc>, lifetime: chrono::Duration) -> bool {
        now.signed_duration_since(self.issued_at) > lifetime
    }
}
