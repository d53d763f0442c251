//! Local-day clock: the canonical calendar date in a user's timezone, and
//! a cancelable watcher that detects day rollover while a session is open.
//!
//! "Today" is always the date's local year/month/day components, never a
//! naive UTC date. Converting through UTC would shift the day boundary by
//! the timezone offset and silently report the wrong day near midnight.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default cadence for rollover detection.
pub const ROLLOVER_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Parse an IANA timezone name, falling back to UTC for unknown names.
pub fn parse_timezone(name: &str) -> Tz {
    name.parse().unwrap_or(chrono_tz::UTC)
}

/// Calendar date at `instant` as seen from `tz`.
pub fn local_date_at(tz: Tz, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// The current calendar date in `tz`. Recomputed on every call; callers
/// must not cache the result across awaits.
pub fn current_local_date(tz: Tz) -> NaiveDate {
    local_date_at(tz, Utc::now())
}

/// Canonical zero-padded `YYYY-MM-DD` key. Lexicographic order on these
/// keys equals chronological order, which calendar consumers rely on.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    use chrono::Datelike;
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

/// Last day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    use chrono::Datelike;
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|next| next - chrono::Duration::days(1))
        .unwrap_or(date)
}

/// Background task that re-reads the local date on a fixed cadence and
/// invokes the callback exactly once per detected change, with the
/// previous and new date. Aborted when dropped, so owners (one watcher
/// per WebSocket connection) cannot leak timers past their lifetime.
pub struct RolloverWatcher {
    handle: JoinHandle<()>,
}

impl RolloverWatcher {
    pub fn spawn<F>(tz: Tz, poll_interval: Duration, on_rollover: F) -> Self
    where
        F: Fn(NaiveDate, NaiveDate) + Send + 'static,
    {
        Self::spawn_with(tz, poll_interval, Utc::now, on_rollover)
    }

    fn spawn_with<N, F>(tz: Tz, poll_interval: Duration, now: N, on_rollover: F) -> Self
    where
        N: Fn() -> DateTime<Utc> + Send + 'static,
        F: Fn(NaiveDate, NaiveDate) + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut current = local_date_at(tz, now());
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick resolves immediately; consume it so the loop waits
            // a full interval before re-checking.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let date = local_date_at(tz, now());
                if date != current {
                    tracing::debug!(previous = %current, new = %date, "Local day rolled over");
                    on_rollover(current, date);
                    current = date;
                }
            }
        });

        Self { handle }
    }
}

impl Drop for RolloverWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn local_date_uses_local_components_not_utc() {
        // 2023-12-31 20:00 UTC is already 2024-01-01 in Tokyo.
        let instant = Utc.with_ymd_and_hms(2023, 12, 31, 20, 0, 0).unwrap();
        let tokyo = local_date_at(chrono_tz::Asia::Tokyo, instant);

        assert_eq!(tokyo, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_ne!(tokyo, instant.date_naive());
    }

    #[test]
    fn dates_straddling_local_midnight_differ_by_one_day() {
        for tz in [
            chrono_tz::America::New_York,
            chrono_tz::Asia::Tokyo,
            chrono_tz::Pacific::Kiritimati,
            chrono_tz::UTC,
        ] {
            let before = tz
                .with_ymd_and_hms(2024, 3, 10, 23, 59, 59)
                .unwrap()
                .with_timezone(&Utc);
            let after = tz
                .with_ymd_and_hms(2024, 3, 11, 0, 0, 1)
                .unwrap()
                .with_timezone(&Utc);

            let d1 = local_date_at(tz, before);
            let d2 = local_date_at(tz, after);
            assert_eq!(d2 - d1, chrono::Duration::days(1), "tz = {}", tz);
        }
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        assert_eq!(parse_timezone("Mars/Olympus_Mons"), chrono_tz::UTC);
        assert_eq!(parse_timezone("Europe/Madrid"), chrono_tz::Europe::Madrid);
    }

    #[test]
    fn month_bounds() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
        assert_eq!(month_start(d), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(month_end(d), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let dec = NaiveDate::from_ymd_opt(2023, 12, 5).unwrap();
        assert_eq!(month_end(dec), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[tokio::test]
    async fn rollover_fires_exactly_once_per_change_and_stops_on_drop() {
        let clock_secs = Arc::new(AtomicI64::new(
            Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59)
                .unwrap()
                .timestamp(),
        ));
        let events: Arc<Mutex<Vec<(NaiveDate, NaiveDate)>>> = Arc::new(Mutex::new(Vec::new()));

        let now_source = clock_secs.clone();
        let sink = events.clone();
        let watcher = RolloverWatcher::spawn_with(
            chrono_tz::UTC,
            Duration::from_millis(5),
            move || {
                DateTime::from_timestamp(now_source.load(Ordering::SeqCst), 0)
                    .expect("valid timestamp")
            },
            move |prev, new| sink.lock().unwrap().push((prev, new)),
        );

        // No change yet.
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(events.lock().unwrap().is_empty());

        // Cross midnight; several polls elapse but only one event fires.
        clock_secs.store(
            Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 1).unwrap().timestamp(),
            Ordering::SeqCst,
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        {
            let seen = events.lock().unwrap();
            assert_eq!(
                *seen,
                vec![(
                    NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
                    NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
                )]
            );
        }

        // After drop the timer is gone; a further change is never observed.
        drop(watcher);
        clock_secs.store(
            Utc.with_ymd_and_hms(2024, 3, 12, 0, 0, 1).unwrap().timestamp(),
            Ordering::SeqCst,
        );
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(events.lock().unwrap().len(), 1);
    }
}
