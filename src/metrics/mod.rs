mod types;

pub use types::{EntryCount, MetricsSnapshot, TypeCount};

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};

use crate::{
    error::WheelError,
    history::HistoryStore,
    models::{Entry, SpinRecord},
    pool::EntryPool,
};

pub const TOP_ENTRIES_LIMIT: usize = 10;
pub const UNKNOWN_TYPE: &str = "Unknown";
const WEEK_DAYS: i64 = 7;

/// Quarter-hour steps tried past midnight when midnight itself does not exist.
const DAY_START_STEP_MINUTES: i64 = 15;
const DAY_START_MAX_STEPS: i64 = 12;

/// Snapshot using the server's local midnight for `todaySpins`.
pub fn compute_snapshot(
    records: &[SpinRecord],
    pool: &[Entry],
    now: DateTime<Utc>,
) -> MetricsSnapshot {
    compute_snapshot_in(records, pool, now.with_timezone(&Local))
}

/// Snapshot with "today" measured from midnight in `now`'s time zone.
///
/// Totals, unique users and time windows cover every record. Rankings only
/// count records whose entry name is still present in `pool`.
pub fn compute_snapshot_in<Tz: TimeZone>(
    records: &[SpinRecord],
    pool: &[Entry],
    now: DateTime<Tz>,
) -> MetricsSnapshot {
    let now_utc = now.with_timezone(&Utc);
    let today_start = start_of_day(&now);
    let week_start = now_utc - Duration::days(WEEK_DAYS);

    let live_names: HashSet<&str> = pool.iter().map(|entry| entry.name.as_str()).collect();

    let mut sessions: HashSet<&str> = HashSet::new();
    let mut today_spins = 0;
    let mut week_spins = 0;
    let mut by_name: HashMap<&str, usize> = HashMap::new();
    let mut by_type: HashMap<&str, usize> = HashMap::new();

    for record in records {
        sessions.insert(record.session_id.as_str());

        if record.timestamp >= today_start {
            today_spins += 1;
        }
        if record.timestamp >= week_start {
            week_spins += 1;
        }

        if live_names.contains(record.entry_name.as_str()) {
            *by_name.entry(record.entry_name.as_str()).or_default() += 1;
            let entry_type = record
                .entry_type
                .as_deref()
                .filter(|t| !t.is_empty())
                .unwrap_or(UNKNOWN_TYPE);
            *by_type.entry(entry_type).or_default() += 1;
        }
    }

    let top_entries = rank(by_name)
        .into_iter()
        .take(TOP_ENTRIES_LIMIT)
        .map(|(name, count)| EntryCount { name, count })
        .collect();

    let type_distribution = rank(by_type)
        .into_iter()
        .map(|(entry_type, count)| TypeCount { entry_type, count })
        .collect();

    let total_spins = records.len();
    let unique_users = sessions.len();

    MetricsSnapshot {
        total_spins,
        unique_users,
        today_spins,
        week_spins,
        top_entries,
        type_distribution,
        average_spins_per_user: average_per_user(total_spins, unique_users),
        last_updated: now_utc,
    }
}

/// Count descending, ties broken by key ascending.
fn rank(counts: HashMap<&str, usize>) -> Vec<(String, usize)> {
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(key, count)| (key.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

fn average_per_user(total_spins: usize, unique_users: usize) -> f64 {
    if unique_users == 0 {
        return 0.0;
    }
    let average = total_spins as f64 / unique_users as f64;
    (average * 10.0).round() / 10.0
}

/// First instant of `now`'s local day. If a DST jump skips midnight, the
/// day starts at the first local time that exists.
fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let tz = now.timezone();
    let midnight = now.date_naive().and_time(NaiveTime::default());

    (0..=DAY_START_MAX_STEPS)
        .map(|step| midnight + Duration::minutes(step * DAY_START_STEP_MINUTES))
        .find_map(|local| tz.from_local_datetime(&local).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| midnight_at_current_offset(now, midnight))
}

fn midnight_at_current_offset<Tz: TimeZone>(
    now: &DateTime<Tz>,
    midnight: NaiveDateTime,
) -> DateTime<Utc> {
    let offset = Duration::seconds(i64::from(now.offset().fix().local_minus_utc()));
    Utc.from_utc_datetime(&(midnight - offset))
}

/// Computes snapshots from a history store and the live pool.
#[derive(Clone)]
pub struct MetricsAggregator {
    history: Arc<dyn HistoryStore>,
    pool: Arc<dyn EntryPool>,
}

impl MetricsAggregator {
    pub fn new(history: Arc<dyn HistoryStore>, pool: Arc<dyn EntryPool>) -> Self {
        Self { history, pool }
    }

    pub async fn snapshot(&self) -> Result<MetricsSnapshot, WheelError> {
        let (records, entries) =
            tokio::try_join!(self.history.scan(None), self.pool.list_entries())
                .map_err(WheelError::Store)?;
        Ok(compute_snapshot(&records, &entries, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, LocalResult, NaiveDate};

    use super::*;
    use crate::{history::MemoryHistoryStore, pool::StaticEntryPool};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 10, 15, 0, 0).unwrap()
    }

    fn spin(
        name: &str,
        entry_type: Option<&str>,
        session: &str,
        ts: DateTime<Utc>,
    ) -> SpinRecord {
        SpinRecord {
            id: format!("{name}-{session}-{}", ts.timestamp_millis()),
            entry_id: name.to_lowercase(),
            entry_name: name.to_string(),
            entry_type: entry_type.map(str::to_string),
            entry_who: None,
            filter: "all".into(),
            weighted_mode: false,
            timestamp: ts,
            session_id: session.to_string(),
            created_at: ts,
        }
    }

    fn repeated(name: &str, entry_type: &str, count: usize) -> Vec<SpinRecord> {
        (0..count)
            .map(|i| {
                spin(
                    name,
                    Some(entry_type),
                    &format!("s{}", i % 3),
                    now() - Duration::minutes(i as i64 + 1),
                )
            })
            .collect()
    }

    #[test]
    fn removed_entries_are_excluded_from_rankings_only() {
        let mut records = repeated("X", "Food", 10);
        records.extend(repeated("Y", "Movie", 5));
        let pool = vec![Entry::new("x", "X").with_type("Food")];

        let snapshot = compute_snapshot_in(&records, &pool, now());

        assert_eq!(snapshot.total_spins, 15);
        assert_eq!(
            snapshot.top_entries,
            vec![EntryCount {
                name: "X".into(),
                count: 10
            }]
        );
        assert_eq!(
            snapshot.type_distribution,
            vec![TypeCount {
                entry_type: "Food".into(),
                count: 10
            }]
        );
    }

    #[test]
    fn time_windows_use_midnight_and_seven_days() {
        let records = vec![
            spin("A", None, "s1", now() - Duration::hours(1)),
            spin("A", None, "s1", now() - Duration::hours(16)),
            spin("A", None, "s2", now() - Duration::days(3)),
            spin("A", None, "s2", now() - Duration::days(8)),
        ];

        let snapshot = compute_snapshot_in(&records, &[], now());

        assert_eq!(snapshot.today_spins, 1);
        assert_eq!(snapshot.week_spins, 3);
        assert_eq!(snapshot.unique_users, 2);
        assert_eq!(snapshot.average_spins_per_user, 2.0);
        assert!(snapshot.top_entries.is_empty());
    }

    /// Clocks jump from 00:00 (+01:00) straight to 01:00 (+02:00) on
    /// 2024-03-10, so that day has no local midnight.
    #[derive(Debug, Clone, Copy)]
    struct SkippedMidnight;

    impl SkippedMidnight {
        fn before() -> FixedOffset {
            FixedOffset::east_opt(3_600).unwrap()
        }

        fn after() -> FixedOffset {
            FixedOffset::east_opt(7_200).unwrap()
        }

        fn jump_utc() -> NaiveDateTime {
            Utc.with_ymd_and_hms(2024, 3, 9, 23, 0, 0).unwrap().naive_utc()
        }

        fn gap_start_local() -> NaiveDateTime {
            Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap().naive_utc()
        }
    }

    impl TimeZone for SkippedMidnight {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            SkippedMidnight
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::default()))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let gap_start = Self::gap_start_local();
            if *local < gap_start {
                LocalResult::Single(Self::before())
            } else if *local < gap_start + Duration::hours(1) {
                LocalResult::None
            } else {
                LocalResult::Single(Self::after())
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_time(NaiveTime::default()))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if *utc < Self::jump_utc() {
                Self::before()
            } else {
                Self::after()
            }
        }
    }

    #[test]
    fn skipped_midnight_starts_day_at_first_local_time() {
        // 10:00 local on the day without a midnight.
        let now = Utc
            .with_ymd_and_hms(2024, 3, 10, 8, 0, 0)
            .unwrap()
            .with_timezone(&SkippedMidnight);

        assert_eq!(
            start_of_day(&now),
            Utc.with_ymd_and_hms(2024, 3, 9, 23, 0, 0).unwrap()
        );

        // 01:30 local on the 10th counts as today; 23:30 local on the 9th does not.
        let records = vec![
            spin("X", None, "s1", Utc.with_ymd_and_hms(2024, 3, 9, 23, 30, 0).unwrap()),
            spin("X", None, "s1", Utc.with_ymd_and_hms(2024, 3, 9, 22, 30, 0).unwrap()),
        ];
        let snapshot = compute_snapshot_in(&records, &[], now);
        assert_eq!(snapshot.today_spins, 1);
    }

    #[test]
    fn regular_midnight_is_used_when_it_exists() {
        let tz = FixedOffset::west_opt(5 * 3_600).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 7, 10, 3, 0, 0).unwrap().with_timezone(&tz);

        assert_eq!(
            start_of_day(&now),
            Utc.with_ymd_and_hms(2024, 7, 9, 5, 0, 0).unwrap()
        );
    }

    #[test]
    fn missing_type_is_reported_as_unknown() {
        let records = vec![
            spin("A", None, "s1", now()),
            spin("B", Some(""), "s1", now()),
            spin("C", Some("Game"), "s1", now()),
        ];
        let pool = vec![Entry::new("a", "A"), Entry::new("b", "B"), Entry::new("c", "C")];

        let snapshot = compute_snapshot_in(&records, &pool, now());

        assert_eq!(
            snapshot.type_distribution,
            vec![
                TypeCount {
                    entry_type: "Unknown".into(),
                    count: 2
                },
                TypeCount {
                    entry_type: "Game".into(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn ties_are_broken_alphabetically_and_top_is_capped() {
        let names = [
            "Lima", "Alpha", "Kilo", "Bravo", "Juliet", "Charlie", "India", "Delta", "Hotel",
            "Echo", "Golf", "Foxtrot",
        ];
        let records: Vec<SpinRecord> = names
            .iter()
            .map(|name| spin(name, Some("T"), "s1", now()))
            .collect();
        let pool: Vec<Entry> = names.iter().map(|name| Entry::new(*name, *name)).collect();

        let snapshot = compute_snapshot_in(&records, &pool, now());

        let top: Vec<&str> = snapshot.top_entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            top,
            vec![
                "Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot", "Golf", "Hotel",
                "India", "Juliet"
            ]
        );
    }

    #[test]
    fn average_is_rounded_to_one_decimal() {
        let records = vec![
            spin("A", None, "s1", now()),
            spin("A", None, "s1", now() - Duration::seconds(1)),
            spin("A", None, "s2", now() - Duration::seconds(2)),
            spin("A", None, "s2", now() - Duration::seconds(3)),
            spin("A", None, "s3", now() - Duration::seconds(4)),
        ];

        let snapshot = compute_snapshot_in(&records, &[], now());

        assert_eq!(snapshot.average_spins_per_user, 1.7);
    }

    #[test]
    fn empty_history_yields_zeroes() {
        let snapshot = compute_snapshot_in(&[], &[Entry::new("a", "A")], now());

        assert_eq!(snapshot.total_spins, 0);
        assert_eq!(snapshot.unique_users, 0);
        assert_eq!(snapshot.average_spins_per_user, 0.0);
        assert_eq!(snapshot.last_updated, now());
    }

    #[tokio::test]
    async fn aggregator_reads_store_and_pool() {
        let store = Arc::new(MemoryHistoryStore::new());
        for record in repeated("X", "Food", 4) {
            store.append(&record).await.unwrap();
        }
        let pool = Arc::new(StaticEntryPool::new(vec![Entry::new("x", "X")]));

        let snapshot = MetricsAggregator::new(store, pool).snapshot().await.unwrap();

        assert_eq!(snapshot.total_spins, 4);
        assert_eq!(snapshot.unique_users, 3);
        assert_eq!(snapshot.top_entries[0].count, 4);
    }
}
