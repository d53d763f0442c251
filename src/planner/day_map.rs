//! Day aggregation: joins daily entries and tasks, which share nothing but
//! a (user, date) pair, into one view per calendar day.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::entry::{DailyEntry, EnergyLevel};
use crate::models::task::Task;

/// How a calendar cell behaves relative to the user's current local date:
/// future days are blocked, today opens the editing view, past days open a
/// read-only detail panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayKind {
    Past,
    Today,
    Future,
}

/// Display bucket for a day's energy. Absence renders the same as low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyTier {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DayTask {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
}

/// Derived per-day view. Never persisted; rebuilt from the two source
/// collections on every load.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DayView {
    pub date: NaiveDate,
    pub energy_level: Option<EnergyLevel>,
    pub note: Option<String>,
    pub tasks: Vec<DayTask>,
    pub completed_count: i64,
}

impl DayView {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            energy_level: None,
            note: None,
            tasks: Vec::new(),
            completed_count: 0,
        }
    }
}

/// Merge entries and tasks into one `DayView` per date.
///
/// Entries seed the map; tasks are appended in input order (callers supply
/// them ordered by creation time), creating an entry-less day on the fly
/// when needed. Every date present in either input appears exactly once in
/// the result; empty inputs yield an empty map. Range membership is the
/// caller's query's concern, not checked here.
pub fn build_day_map(entries: &[DailyEntry], tasks: &[Task]) -> BTreeMap<NaiveDate, DayView> {
    let mut days: BTreeMap<NaiveDate, DayView> = BTreeMap::new();

    for entry in entries {
        let day = days
            .entry(entry.entry_date)
            .or_insert_with(|| DayView::empty(entry.entry_date));
        day.energy_level = entry.energy_level;
        day.note = entry.note.clone();
    }

    for task in tasks {
        let day = days
            .entry(task.task_date)
            .or_insert_with(|| DayView::empty(task.task_date));
        day.tasks.push(DayTask {
            id: task.id,
            title: task.title.clone(),
            completed: task.completed,
        });
        if task.completed {
            day.completed_count += 1;
        }
    }

    days
}

/// Classify a day against the reference "today". Total over all date pairs;
/// on `YYYY-MM-DD` keys this matches lexicographic string comparison.
pub fn classify_day(date: NaiveDate, today: NaiveDate) -> DayKind {
    match date.cmp(&today) {
        std::cmp::Ordering::Less => DayKind::Past,
        std::cmp::Ordering::Equal => DayKind::Today,
        std::cmp::Ordering::Greater => DayKind::Future,
    }
}

/// Map an energy level (or its absence) to a display tier. Total: no
/// level and `low` share the lowest bucket.
pub fn energy_tier(level: Option<EnergyLevel>) -> EnergyTier {
    match level {
        Some(EnergyLevel::High) => EnergyTier::High,
        Some(EnergyLevel::Medium) => EnergyTier::Medium,
        Some(EnergyLevel::Low) | None => EnergyTier::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::clock::date_key;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn entry(date: &str, energy: Option<EnergyLevel>, note: Option<&str>) -> DailyEntry {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        DailyEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            entry_date: d(date),
            energy_level: energy,
            note: note.map(str::to_string),
            created_at: ts,
            updated_at: ts,
        }
    }

    fn task(date: &str, title: &str, completed: bool) -> Task {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Task {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            task_date: d(date),
            title: title.to_string(),
            completed,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn merges_entries_and_tasks_by_date() {
        let entries = vec![entry("2024-06-01", Some(EnergyLevel::High), Some("ok"))];
        let tasks = vec![
            task("2024-06-01", "A", true),
            task("2024-06-02", "B", false),
        ];

        let map = build_day_map(&entries, &tasks);
        assert_eq!(map.len(), 2);

        let first = &map[&d("2024-06-01")];
        assert_eq!(first.energy_level, Some(EnergyLevel::High));
        assert_eq!(first.note.as_deref(), Some("ok"));
        assert_eq!(first.completed_count, 1);
        assert_eq!(first.tasks.len(), 1);

        let second = &map[&d("2024-06-02")];
        assert_eq!(second.energy_level, None);
        assert_eq!(second.note, None);
        assert_eq!(second.completed_count, 0);
        assert_eq!(second.tasks[0].title, "B");
    }

    #[test]
    fn task_order_is_preserved() {
        let tasks = vec![
            task("2024-06-01", "first", false),
            task("2024-06-01", "second", true),
            task("2024-06-01", "third", false),
        ];

        let map = build_day_map(&[], &tasks);
        let titles: Vec<&str> = map[&d("2024-06-01")]
            .tasks
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[test]
    fn empty_inputs_yield_empty_map() {
        assert!(build_day_map(&[], &[]).is_empty());
    }

    #[test]
    fn is_idempotent() {
        let entries = vec![
            entry("2024-06-01", Some(EnergyLevel::Low), None),
            entry("2024-06-03", None, Some("note")),
        ];
        let tasks = vec![
            task("2024-06-01", "A", true),
            task("2024-06-02", "B", false),
            task("2024-06-02", "C", true),
        ];

        assert_eq!(
            build_day_map(&entries, &tasks),
            build_day_map(&entries, &tasks)
        );
    }

    #[test]
    fn key_set_is_exactly_the_union_of_input_dates() {
        let entries = vec![
            entry("2024-05-30", None, None),
            entry("2024-06-01", Some(EnergyLevel::Medium), None),
        ];
        let tasks = vec![task("2024-06-01", "A", false), task("2024-06-05", "B", true)];

        let map = build_day_map(&entries, &tasks);

        let expected: BTreeSet<NaiveDate> = entries
            .iter()
            .map(|e| e.entry_date)
            .chain(tasks.iter().map(|t| t.task_date))
            .collect();
        let actual: BTreeSet<NaiveDate> = map.keys().copied().collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn classifies_days_against_today() {
        let today = d("2024-06-01");
        assert_eq!(classify_day(d("2099-01-01"), today), DayKind::Future);
        assert_eq!(classify_day(d("2024-06-01"), today), DayKind::Today);
        assert_eq!(classify_day(d("2024-05-01"), today), DayKind::Past);
    }

    #[test]
    fn date_key_order_matches_chronological_order() {
        let pairs = [
            ("2024-01-31", "2024-02-01"),
            ("2023-12-31", "2024-01-01"),
            ("2024-02-29", "2024-03-01"),
            ("2024-06-09", "2024-06-10"),
        ];
        for (earlier, later) in pairs {
            assert!(d(earlier) < d(later));
            assert!(date_key(d(earlier)) < date_key(d(later)));
        }
    }

    #[test]
    fn energy_tiers_are_total_and_absence_maps_low() {
        assert_eq!(energy_tier(None), EnergyTier::Low);
        assert_eq!(energy_tier(Some(EnergyLevel::Low)), EnergyTier::Low);
        assert_eq!(energy_tier(Some(EnergyLevel::Medium)), EnergyTier::Medium);
        assert_eq!(energy_tier(Some(EnergyLevel::High)), EnergyTier::High);
    }
}
