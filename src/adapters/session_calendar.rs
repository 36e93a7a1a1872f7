//! Session calendar adapters.

use crate::ports::session_port::SessionCalendar;
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};

/// Regular US equity session in UTC minutes-of-day, 14:30 to 21:00.
/// Holidays and daylight saving are not modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NyseCalendar {
    pub open_minute: u32,
    pub close_minute: u32,
    /// Minutes after the open during which entries are blocked.
    pub opening_risk_off: u32,
    /// Minutes before the close during which positions are liquidated.
    pub closing_risk_off: u32,
}

impl Default for NyseCalendar {
    fn default() -> Self {
        NyseCalendar {
            open_minute: 14 * 60 + 30,
            close_minute: 21 * 60,
            opening_risk_off: 60,
            closing_risk_off: 30,
        }
    }
}

fn minute_of_day(ts: DateTime<Utc>) -> u32 {
    ts.hour() * 60 + ts.minute()
}

fn weekday(ts: DateTime<Utc>) -> bool {
    !matches!(ts.weekday(), Weekday::Sat | Weekday::Sun)
}

impl SessionCalendar for NyseCalendar {
    fn market_open(&self, ts: DateTime<Utc>) -> bool {
        let m = minute_of_day(ts);
        weekday(ts) && m >= self.open_minute && m < self.close_minute
    }

    fn risk_off(&self, ts: DateTime<Utc>) -> bool {
        if !self.market_open(ts) {
            return false;
        }
        let m = minute_of_day(ts);
        m < self.open_minute + self.opening_risk_off
            || m >= self.close_minute.saturating_sub(self.closing_risk_off)
    }
}

/// Every timestamp is tradable; for daily bars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlwaysOpenCalendar;

impl SessionCalendar for AlwaysOpenCalendar {
    fn market_open(&self, _ts: DateTime<Utc>) -> bool {
        true
    }

    fn risk_off(&self, _ts: DateTime<Utc>) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarKind {
    Nyse,
    AlwaysOpen,
}

impl CalendarKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "nyse" => Some(CalendarKind::Nyse),
            "always_open" => Some(CalendarKind::AlwaysOpen),
            _ => None,
        }
    }

    pub fn build(self) -> Box<dyn SessionCalendar> {
        match self {
            CalendarKind::Nyse => Box::new(NyseCalendar::default()),
            CalendarKind::AlwaysOpen => Box::new(AlwaysOpenCalendar),
        }
    }
}
