use crate::error::{AppError, INVALID_TOKEN_MESSAGE};
use crate::models::token::DownloadToken;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Random bytes per token; hex encoding doubles the length.
pub const TOKEN_BYTES: usize = 20;

/// Short-lived, single-use download tokens kept in process memory.
///
/// All access goes through one mutex which is only held for map work,
/// never across I/O or an `.await`.
pub struct DownloadTokenCache {
    tokens: Mutex<HashMap<String, DownloadToken>>,
    lifetime: Duration,
}

impl DownloadTokenCache {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
            lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DownloadToken>> {
        // Every critical section leaves the map consistent, so a panic
        // elsewhere while holding the lock cannot corrupt it.
        self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn issue(&self, path: impl Into<PathBuf>) -> Result<String, AppError> {
        self.issue_at(path, Utc::now())
    }

    /// [`issue`](Self::issue) with an explicit clock reading.
    pub fn issue_at(
        &self,
        path: impl Into<PathBuf>,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let token = generate_token()?;
        let target_path = path.into();

        tracing::info!(
            token = %token_prefix(&token),
            path = %target_path.display(),
            "Download token issued"
        );

        self.lock().insert(
            token.clone(),
            DownloadToken {
                target_path,
                issued_at: now,
            },
        );
        Ok(token)
    }

    pub fn redeem(&self, token: &str) -> Result<PathBuf, AppError> {
        self.redeem_at(token, Utc::now())
    }

    /// Consume `token`. The entry is removed before anything else is decided,
    /// so of any number of concurrent attempts at most one can succeed.
    pub fn redeem_at(&self, token: &str, now: DateTime<Utc>) -> Result<PathBuf, AppError> {
        let entry = self.lock().remove(token);

        let Some(entry) = entry else {
            tracing::warn!(token = %token_prefix(token), "Unknown download token");
            return Err(AppError::NotFound(INVALID_TOKEN_MESSAGE.into()));
        };

        if entry.is_expired(now, self.lifetime) {
            tracing::warn!(token = %token_prefix(token), "Expired download token");
            return Err(AppError::Expired);
        }

        tracing::info!(
            token = %token_prefix(token),
            path = %entry.target_path.display(),
            "Download token redeemed"
        );
        Ok(entry.target_path)
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    /// Drop every entry older than the lifetime. Returns how many were removed.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut tokens = self.lock();
        let before = tokens.len();
        tokens.retain(|token, entry| {
            let keep = !entry.is_expired(now, self.lifetime);
            if !keep {
                tracing::debug!(token = %token_prefix(token), "Evicting expired download token");
            }
            keep
        });
        before - tokens.len()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.lock().contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn generate_token() -> Result<String, AppError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AppError::RandomnessFailure(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Enough of a token to correlate log lines without leaking it.
fn token_prefix(token: &str) -> String {
    token.chars().take(8).collect()
}
