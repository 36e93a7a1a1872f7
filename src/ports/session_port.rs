//! Market session classification port trait.

use chrono::{DateTime, Utc};

/// Pure classification of bar timestamps. Implementations must not consult
/// the wall clock.
pub trait SessionCalendar: Sync {
    fn market_open(&self, ts: DateTime<Utc>) -> bool;

    /// Inside the window where positions are liquidated and no entries are
    /// taken.
    fn risk_off(&self, ts: DateTime<Utc>) -> bool;
}
