//! Time source for everything that stamps a report.
//!
//! All civil times are rendered at a fixed +03:00 offset, independent of the
//! host time zone, so ledger rows, archive paths and log lines agree no
//! matter where the process is deployed.

use chrono::{DateTime, FixedOffset, Utc};

/// Moscow civil time, which has had no DST since 2014.
pub const MOSCOW_OFFSET: FixedOffset = match FixedOffset::east_opt(3 * 3600) {
    Some(offset) => offset,
    None => panic!("offset out of range"),
};

/// Source of "now" in the ledger's civil time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    fn date_str(&self) -> String {
        ledger_date(&self.now())
    }

    fn time_str(&self) -> String {
        ledger_time(&self.now())
    }

    fn datetime_str(&self) -> String {
        log_stamp(&self.now())
    }
}

/// `DD.MM.YYYY`, used in the date-opened column.
pub fn ledger_date(t: &DateTime<FixedOffset>) -> String {
    t.format("%d.%m.%Y").to_string()
}

/// `HH:MM`, used in the time-opened column.
pub fn ledger_time(t: &DateTime<FixedOffset>) -> String {
    t.format("%H:%M").to_string()
}

/// `YYYY-MM-DD HH:MM:SS`, used for log lines and the liveness probe.
pub fn log_stamp(t: &DateTime<FixedOffset>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// `DD-MM-YYYY`, the day partition of the photo archive.
pub fn archive_folder(t: &DateTime<FixedOffset>) -> String {
    t.format("%d-%m-%Y").to_string()
}

/// `HHMM.jpg`, the photo file name within a day partition.
pub fn archive_file_name(t: &DateTime<FixedOffset>) -> String {
    t.format("%H%M.jpg").to_string()
}

/// Wall clock at a fixed offset from UTC.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(MOSCOW_OFFSET)
    }
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// A clock stopped at one instant. Used by tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    /// Stop the clock at `utc`, viewed at the Moscow offset.
    pub fn at_utc(utc: DateTime<Utc>) -> Self {
        Self(utc.with_timezone(&MOSCOW_OFFSET))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn late_evening_utc() -> FixedClock {
        // 22:30 UTC on 31 Jan is 01:30 on 1 Feb in Moscow.
        FixedClock::at_utc(Utc.with_ymd_and_hms(2026, 1, 31, 22, 30, 15).unwrap())
    }

    #[test]
    fn fixed_offset_rolls_date_over() {
        let clock = late_evening_utc();
        assert_eq!(clock.date_str(), "01.02.2026");
        assert_eq!(clock.time_str(), "01:30");
        assert_eq!(clock.datetime_str(), "2026-02-01 01:30:15");
    }

    #[test]
    fn archive_names() {
        let now = late_evening_utc().now();
        assert_eq!(archive_folder(&now), "01-02-2026");
        assert_eq!(archive_file_name(&now), "0130.jpg");
    }

    #[test]
    fn offset_is_three_hours() {
        assert_eq!(MOSCOW_OFFSET.local_minus_utc(), 10_800);
    }

    #[test]
    fn system_clock_uses_configured_offset() {
        let clock = SystemClock::default();
        assert_eq!(clock.now().offset().local_minus_utc(), 10_800);
    }
}
