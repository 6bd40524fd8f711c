//! "Today" in the configured zone.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};

/// Zone that defines the day boundary and the clock shown next to messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayZone {
    /// The process-local zone.
    Local,
    Named(chrono_tz::Tz),
}

impl From<Option<chrono_tz::Tz>> for DayZone {
    fn from(tz: Option<chrono_tz::Tz>) -> Self {
        tz.map_or(DayZone::Local, DayZone::Named)
    }
}

impl DayZone {
    /// Unix seconds of midnight of the current day.
    pub fn start_of_today(&self) -> i64 {
        self.start_of_day(Utc::now())
    }

    /// Unix seconds of midnight of the day that contains `now`.
    pub fn start_of_day(&self, now: DateTime<Utc>) -> i64 {
        match self {
            DayZone::Local => midnight(&chrono::Local, now),
            DayZone::Named(tz) => midnight(tz, now),
        }
    }

    /// `HH:MM` wall-clock time of a Unix timestamp.
    pub fn clock(&self, unix_seconds: i64) -> Option<String> {
        let instant = DateTime::<Utc>::from_timestamp(unix_seconds, 0)?;
        let rendered = match self {
            DayZone::Local => instant.with_timezone(&chrono::Local).format("%H:%M").to_string(),
            DayZone::Named(tz) => instant.with_timezone(tz).format("%H:%M").to_string(),
        };
        Some(rendered)
    }
}

fn midnight<Tz: TimeZone>(tz: &Tz, now: DateTime<Utc>) -> i64 {
    let day = now.with_timezone(tz).date_naive();
    let Some(start) = day.and_hms_opt(0, 0, 0) else {
        return now.timestamp();
    };
    earliest_instant(tz, start)
        .map(|instant| instant.timestamp())
        .unwrap_or_else(|| now.timestamp())
}

/// First instant at or after `naive` that exists in `tz`. Zones whose DST
/// transition skips midnight start the day at the end of the gap.
fn earliest_instant<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    (0..=24 * 4).find_map(|quarter| {
        tz.from_local_datetime(&(naive + Duration::minutes(15 * quarter)))
            .earliest()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).single().expect("valid date")
    }

    #[test]
    fn utc_midnight_is_start_of_day() {
        let zone = DayZone::Named(chrono_tz::UTC);
        let start = zone.start_of_day(utc(2024, 4, 5, 17, 42));
        assert_eq!(start, utc(2024, 4, 5, 0, 0).timestamp());
    }

    #[test]
    fn named_zone_uses_its_own_calendar_day() {
        // 23:30 UTC on the 5th is already the 6th in Tokyo (UTC+9).
        let zone = DayZone::Named(chrono_tz::Asia::Tokyo);
        let start = zone.start_of_day(utc(2024, 4, 5, 23, 30));
        assert_eq!(start, utc(2024, 4, 5, 15, 0).timestamp());
    }

    #[test]
    fn day_without_midnight_starts_after_the_gap() {
        // Santiago skipped 00:00-01:00 local on 2023-09-03.
        let zone = DayZone::Named(chrono_tz::America::Santiago);
        let start = zone.start_of_day(utc(2023, 9, 3, 15, 0));
        assert_eq!(start, utc(2023, 9, 3, 4, 0).timestamp());
    }

    #[test]
    fn start_of_today_is_within_the_last_day() {
        let start = DayZone::Named(chrono_tz::UTC).start_of_today();
        let elapsed = Utc::now().timestamp() - start;
        assert_eq!(start % 86_400, 0);
        assert!((0..86_400).contains(&elapsed));
    }

    #[test]
    fn clock_renders_hours_and_minutes_in_zone() {
        let zone = DayZone::Named(chrono_tz::Asia::Kolkata);
        assert_eq!(
            zone.clock(utc(2024, 4, 5, 3, 7).timestamp()).as_deref(),
            Some("08:37")
        );
    }
}
