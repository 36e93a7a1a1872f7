//! OHLCV bar representation and validity checks.

use chrono::{DateTime, NaiveDate, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    /// RFC 3339 UTC timestamp, e.g. `2026-02-16T14:30:00Z`.
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub trade_count: u64,
    pub vwap: Option<f64>,
}

/// First invariant a bar fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BarDefect {
    #[error("non-positive or non-finite price")]
    NonPositivePrice,
    #[error("high below open, close or low")]
    HighBelowRange,
    #[error("low above open, close or high")]
    LowAboveRange,
    #[error("vwap outside [low, high]")]
    VwapOutOfRange,
    #[error("timestamp is not a valid RFC 3339 time")]
    BadTimestamp,
}

impl Bar {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// UTC calendar date of the bar; consecutive bars with different dates
    /// straddle a session boundary.
    pub fn session_date(&self) -> Option<NaiveDate> {
        self.time().map(|t| t.date_naive())
    }

    pub fn defect(&self) -> Option<BarDefect> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Some(BarDefect::NonPositivePrice);
        }
        if self.high < self.open || self.high < self.close || self.high < self.low {
            return Some(BarDefect::HighBelowRange);
        }
        if self.low > self.open || self.low > self.close {
            return Some(BarDefect::LowAboveRange);
        }
        if let Some(vwap) = self.vwap {
            if !(self.low..=self.high).contains(&vwap) {
                return Some(BarDefect::VwapOutOfRange);
            }
        }
        if self.time().is_none() {
            return Some(BarDefect::BadTimestamp);
        }
        None
    }

    pub fn is_valid(&self) -> bool {
        self.defect().is_none()
    }

    /// (close - open) / open * 100
    pub fn change_pct(&self) -> f64 {
        (self.close - self.open) / self.open * 100.0
    }

    /// (high - low) / close
    pub fn range_ratio(&self) -> f64 {
        (self.high - self.low) / self.close
    }
}
