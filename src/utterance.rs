use crate::aggregate::{list_capture_files, scan_captures};
use crate::compare::signed_delta;
use crate::config::PeriodConfig;
use crate::errors::AppResult;
use crate::filename::parse_capture_filename;
use crate::models::{PeriodComparison, PeriodSnapshot, PeriodTotals, UserPeriodRow, UserRanking};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Rows spoken by each user: rows whose first column, trimmed, equals the
/// user id taken from the file name. The first `skip_rows` data rows of each
/// file are ignored.
///
/// This is a different unit from the category counts in `aggregate` and the
/// two totals are not comparable.
pub fn count_user_utterances(dir: &Path, skip_rows: usize) -> AppResult<BTreeMap<String, u64>> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for record in scan_captures(dir)? {
        let spoken = record
            .table
            .rows
            .iter()
            .skip(skip_rows)
            .filter(|row| row.first().is_some_and(|cell| cell.trim() == record.user_id))
            .count() as u64;
        *counts.entry(record.user_id).or_insert(0) += spoken;
    }
    Ok(counts)
}

/// Distinct well-named capture files per user. Contents are not read.
pub fn file_count_by_user(dir: &Path) -> AppResult<BTreeMap<String, u64>> {
    let mut files: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for path in list_capture_files(dir)? {
        let Some(base) = path.file_name().map(|value| value.to_string_lossy().to_string()) else {
            continue;
        };
        if let Ok(name) = parse_capture_filename(&base) {
            files.entry(name.user_id).or_default().insert(base);
        }
    }
    Ok(files
        .into_iter()
        .map(|(user, names)| (user, names.len() as u64))
        .collect())
}

/// Every `*.csv` file in the folder, whether or not its name parses.
pub fn count_total_files(dir: &Path) -> AppResult<u64> {
    Ok(list_capture_files(dir)?.len() as u64)
}

pub fn snapshot_period(period: &PeriodConfig) -> AppResult<PeriodSnapshot> {
    let snapshot = PeriodSnapshot {
        label: period.label.clone(),
        utterances: count_user_utterances(&period.dir, period.skip_rows)?,
        files_by_user: file_count_by_user(&period.dir)?,
        total_files: count_total_files(&period.dir)?,
    };
    tracing::info!(
        period = %snapshot.label,
        users = snapshot.utterances.len(),
        files = snapshot.total_files,
        "counted period utterances"
    );
    Ok(snapshot)
}

fn ranking(snapshot: &PeriodSnapshot, users: &BTreeSet<String>) -> Vec<UserRanking> {
    let mut rows = users
        .iter()
        .map(|user| UserRanking {
            user_id: user.clone(),
            utterances: snapshot.utterances.get(user).copied().unwrap_or(0),
            files: snapshot.files_by_user.get(user).copied().unwrap_or(0),
        })
        .collect::<Vec<_>>();
    // Stable: users with equal counts stay in name order.
    rows.sort_by(|a, b| b.utterances.cmp(&a.utterances));
    rows
}

/// Side-by-side utterance and file counts for two periods.
pub fn compare_periods(early: &PeriodSnapshot, late: &PeriodSnapshot) -> PeriodComparison {
    let users = early
        .utterances
        .keys()
        .chain(late.utterances.keys())
        .cloned()
        .collect::<BTreeSet<_>>();

    let rows = users
        .iter()
        .map(|user| {
            let early_utterances = early.utterances.get(user).copied().unwrap_or(0);
            let late_utterances = late.utterances.get(user).copied().unwrap_or(0);
            let early_files = early.files_by_user.get(user).copied().unwrap_or(0);
            let late_files = late.files_by_user.get(user).copied().unwrap_or(0);
            UserPeriodRow {
                user_id: user.clone(),
                early_utterances,
                late_utterances,
                utterance_delta: signed_delta(early_utterances, late_utterances),
                early_files,
                late_files,
                file_delta: signed_delta(early_files, late_files),
            }
        })
        .collect::<Vec<_>>();

    let early_totals = PeriodTotals::new(early.utterances.values().sum(), early.total_files);
    let late_totals = PeriodTotals::new(late.utterances.values().sum(), late.total_files);

    PeriodComparison {
        early_label: early.label.clone(),
        late_label: late.label.clone(),
        early_ranking: ranking(early, &users),
        late_ranking: ranking(late, &users),
        users: rows,
        file_delta: signed_delta(early.total_files, late.total_files),
        utterance_delta: signed_delta(early_totals.total, late_totals.total),
        early_totals,
        late_totals,
    }
}
