//! The lock written next to the state while a command runs

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// How long a lock is honoured before another run may take it over
pub const LOCK_TTL_MINUTES: i64 = 15;

/// The user and machine a lock was taken from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holder {
    pub user: String,
    pub host: String,
}

impl Holder {
    pub fn current() -> Self {
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());
        Self { user, host }
    }
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.host)
    }
}

/// Guards the state of one catalog against concurrent `plan`/`apply` runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateLock {
    pub id: String,
    /// CLI command that took the lock
    pub command: String,
    pub holder: Holder,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StateLock {
    pub fn for_command(command: impl Into<String>) -> Self {
        Self::lasting(command, TimeDelta::minutes(LOCK_TTL_MINUTES))
    }

    pub fn lasting(command: impl Into<String>, ttl: TimeDelta) -> Self {
        let acquired_at = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            command: command.into(),
            holder: Holder::current(),
            acquired_at,
            expires_at: acquired_at + ttl,
        }
    }

    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }

    /// Whole minutes left, rounded up; zero once stale
    pub fn minutes_left(&self) -> i64 {
        let left = self.expires_at - Utc::now();
        if left <= TimeDelta::zero() {
            0
        } else {
            (left.num_seconds() + 59) / 60
        }
    }
}

impl fmt::Display for StateLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lock {} held by {} for `{}` ({} min left)",
            self.id,
            self.holder,
            self.command,
            self.minutes_left()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_lock_lasts_the_ttl() {
        let lock = StateLock::for_command("apply");
        assert_eq!(lock.command, "apply");
        assert_eq!(
            lock.expires_at - lock.acquired_at,
            TimeDelta::minutes(LOCK_TTL_MINUTES)
        );
        assert!(!lock.is_stale());
        assert_eq!(lock.minutes_left(), LOCK_TTL_MINUTES);
    }

    #[test]
    fn lock_goes_stale_at_expiry() {
        let lock = StateLock::for_command("plan");
        assert!(!lock.is_stale_at(lock.expires_at - TimeDelta::seconds(1)));
        assert!(lock.is_stale_at(lock.expires_at));

        let past = StateLock::lasting("plan", TimeDelta::minutes(-1));
        assert!(past.is_stale());
        assert_eq!(past.minutes_left(), 0);
    }

    #[test]
    fn lock_display_names_holder_and_command() {
        let mut lock = StateLock::for_command("destroy");
        lock.holder = Holder {
            user: "ana".to_string(),
            host: "ci-7".to_string(),
        };
        let text = lock.to_string();
        assert!(text.starts_with(&format!("lock {} held by ana@ci-7 for `destroy`", lock.id)));
    }

    #[test]
    fn lock_file_round_trips() {
        let lock = StateLock::for_command("refresh");
        let json = serde_json::to_value(&lock).unwrap();
        assert_eq!(json["holder"]["user"], lock.holder.user.as_str());
        assert_eq!(serde_json::from_value::<StateLock>(json).unwrap(), lock);
    }
}
