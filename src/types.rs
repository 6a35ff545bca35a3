//! Core types shared by every store.

use crate::error::{Result, StoreError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    const MICROS_PER_DAY: i64 = 86_400 * 1_000_000;

    /// Current wall-clock time.
    pub fn now() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or_default();
        Timestamp(micros)
    }

    pub fn from_secs(secs: i64) -> Self {
        Timestamp(secs * 1_000_000)
    }

    pub fn as_micros(self) -> i64 {
        self.0
    }

    pub fn plus_days(self, days: i64) -> Self {
        Timestamp(self.0 + days * Self::MICROS_PER_DAY)
    }

    pub fn minus_days(self, days: i64) -> Self {
        Timestamp(self.0 - days * Self::MICROS_PER_DAY)
    }

    /// Whole days from `earlier` to `self` (negative if `earlier` is later).
    pub fn days_since(self, earlier: Timestamp) -> i64 {
        (self.0 - earlier.0) / Self::MICROS_PER_DAY
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Time source for the authoritative side of a store.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to. Used by tests and demos.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, ts: Timestamp) {
        *self.now.lock() = ts;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = Timestamp(now.0 + by.as_micros() as i64);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}

/// The owning boundary of a collection: (userId, farmId, lambingSeasonGroupId).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub user_id: String,
    pub farm_id: String,
    pub lambing_season_group_id: String,
}

impl Scope {
    pub fn new(
        user_id: impl Into<String>,
        farm_id: impl Into<String>,
        lambing_season_group_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            farm_id: farm_id.into(),
            lambing_season_group_id: lambing_season_group_id.into(),
        }
    }

    /// Scope owned by whoever is signed in.
    pub fn for_current_user(
        user: &dyn CurrentUser,
        farm_id: impl Into<String>,
        lambing_season_group_id: impl Into<String>,
    ) -> Result<Self> {
        let user_id = user.user_id().ok_or(StoreError::Unauthenticated)?;
        Ok(Self::new(user_id, farm_id, lambing_season_group_id))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.user_id, self.farm_id, self.lambing_season_group_id
        )
    }
}

/// Source of the signed-in user's identifier. Authentication itself lives
/// with the host application.
pub trait CurrentUser: Send + Sync {
    fn user_id(&self) -> Option<String>;
}

/// A fixed user, or nobody.
#[derive(Clone, Debug, Default)]
pub struct StaticUser(pub Option<String>);

impl StaticUser {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        StaticUser(Some(user_id.into()))
    }

    pub fn signed_out() -> Self {
        StaticUser(None)
    }
}

impl CurrentUser for StaticUser {
    fn user_id(&self) -> Option<String> {
        self.0.clone()
    }
}
