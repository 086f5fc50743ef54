//! Monthly reset window.

use std::time::Duration;

use chrono::{DateTime, Datelike, LocalResult, TimeZone};

/// Whether `now` lies within half a poll interval either side of local
/// midnight on the first of a month.
///
/// Both the start of `now`'s month and the start of the following month are
/// considered, so a poll shortly before midnight on the last day also counts.
/// With a fixed poll interval at least one poll per month falls inside the
/// window while the process is running, so no "last reset" marker needs to be
/// persisted. A process that is down for the whole window skips that
/// month's reset.
pub fn should_reset<Tz: TimeZone>(now: &DateTime<Tz>, poll_interval: Duration) -> bool {
    let Ok(half_window) = chrono::Duration::from_std(poll_interval / 2) else {
        return false;
    };

    let (next_year, next_month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };

    [
        start_of_month(&now.timezone(), now.year(), now.month()),
        start_of_month(&now.timezone(), next_year, next_month),
    ]
    .into_iter()
    .flatten()
    .any(|start| {
        let (Some(earliest), Some(latest)) = (
            start.clone().checked_sub_signed(half_window),
            start.clone().checked_add_signed(half_window),
        ) else {
            tracing::warn!(
                "Poll interval of {:?} puts the reset window out of range; not resetting",
                poll_interval
            );
            return false;
        };
        earliest <= *now && *now <= latest
    })
}

/// Local midnight on the first day of the given month
fn start_of_month<Tz: TimeZone>(tz: &Tz, year: i32, month: u32) -> Option<DateTime<Tz>> {
    match tz.with_ymd_and_hms(year, month, 1, 0, 0, 0) {
        LocalResult::Single(start) => Some(start),
        // Midnight falls in a DST overlap: the earlier instant starts the month
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        // Midnight skipped by a DST gap
        LocalResult::None => {
            let start = tz.with_ymd_and_hms(year, month, 1, 1, 0, 0).earliest();
            if start.is_none() {
                tracing::warn!("Could not resolve the start of {}-{:02}", year, month);
            }
            start
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    const DAY: Duration = Duration::from_secs(86_400);

    #[test]
    fn test_midnight_on_the_first_resets() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert!(should_reset(&now, DAY));
    }

    #[test]
    fn test_window_edges() {
        let inside = Utc.with_ymd_and_hms(2024, 3, 1, 11, 59, 59).unwrap();
        let outside = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 1).unwrap();
        assert!(should_reset(&inside, DAY));
        assert!(!should_reset(&outside, DAY));
    }

    #[test]
    fn test_mid_month_does_not_reset() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        assert!(!should_reset(&now, DAY));
    }

    #[test]
    fn test_evening_before_the_first_resets() {
        let now = Utc.with_ymd_and_hms(2024, 2, 29, 23, 0, 0).unwrap();
        assert!(should_reset(&now, DAY));

        let too_early = Utc.with_ymd_and_hms(2024, 2, 29, 11, 0, 0).unwrap();
        assert!(!should_reset(&too_early, DAY));
    }

    #[test]
    fn test_year_rollover() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 20, 0, 0).unwrap();
        assert!(should_reset(&now, DAY));
    }

    #[test]
    fn test_daily_polls_hit_the_window_every_month() {
        let interval = DAY;
        let mut now = Utc.with_ymd_and_hms(2024, 1, 1, 17, 45, 0).unwrap();
        let mut resets_per_month = std::collections::BTreeMap::new();
        for _ in 0..366 {
            if should_reset(&now, interval) {
                let nearest = now + chrono::Duration::hours(12);
                *resets_per_month
                    .entry((nearest.year(), nearest.month()))
                    .or_insert(0) += 1;
            }
            now += chrono::Duration::days(1);
        }
        // Every month after January starts inside exactly one daily poll's window
        assert_eq!(resets_per_month.len(), 12);
        assert!(resets_per_month.values().all(|n| *n == 1));
    }

    #[test]
    fn test_short_interval_narrows_window() {
        let minute = Duration::from_secs(60);
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 29).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 31).unwrap();
        assert!(should_reset(&now, minute));
        assert!(!should_reset(&later, minute));
    }

    #[test]
    fn test_huge_interval_does_not_panic() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        assert!(!should_reset(&now, Duration::from_secs(1_000_000_000_000_000)));
        assert!(!should_reset(&now, Duration::MAX));
    }

    #[test]
    fn test_uses_the_clock_timezone() {
        let dublin_summer = FixedOffset::east_opt(3600).unwrap();
        let now = dublin_summer.with_ymd_and_hms(2024, 6, 1, 0, 30, 0).unwrap();
        assert!(should_reset(&now, DAY));
    }
}
