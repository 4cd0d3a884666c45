use crate::config::AggregateOptions;
use crate::errors::{AppError, AppResult};
use crate::filename::{has_capture_extension, parse_capture_filename};
use crate::loader::load_table;
use crate::models::{
    AggregateReport, AggregateRow, Category, CategoryPointSeries, FileRecord, PointFile, PointTotal, Potential,
    UserPointView,
};
use crate::normalize::find_column;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Lists `*.csv` files directly inside `dir`, sorted by file name.
///
/// Fails only when the directory itself cannot be read.
pub fn list_capture_files(dir: &Path) -> AppResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AppError::NotFound(format!(
            "Data directory does not exist: {}",
            dir.to_string_lossy()
        )));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|error| AppError::Io(error.to_string()))? {
        let entry = entry.map_err(|error| AppError::Io(error.to_string()))?;
        let path = entry.path();
        if path.is_file() && has_capture_extension(&path) {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Parses the name and loads the contents of one capture file.
pub fn read_capture(path: &Path) -> AppResult<FileRecord> {
    let source_file = path
        .file_name()
        .map(|value| value.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = parse_capture_filename(&source_file)?;
    let table = load_table(path)?;
    Ok(FileRecord {
        user_id: name.user_id,
        captured_at: name.captured_at,
        source_file,
        table,
    })
}

/// Scans `dir` and reads every capture file whose name follows the naming
/// convention. Stray files and per-file load failures are skipped.
pub fn scan_captures(dir: &Path) -> AppResult<Vec<FileRecord>> {
    let mut records = Vec::new();
    for path in list_capture_files(dir)? {
        match read_capture(&path) {
            Ok(record) => records.push(record),
            Err(error @ AppError::Format(_)) => {
                tracing::debug!(
                    path = %path.to_string_lossy(),
                    error = %error,
                    "skipping file outside naming convention"
                );
            }
            Err(error) if error.is_per_file() => {
                tracing::warn!(
                    path = %path.to_string_lossy(),
                    error = %error,
                    "skipping unreadable capture file"
                );
            }
            Err(error) => return Err(error),
        }
    }
    Ok(records)
}

/// Low/high counts per canonical category for one file, after skipping the
/// first `skip_rows` data rows.
pub fn count_categories(
    record: &FileRecord,
    options: &AggregateOptions,
) -> AppResult<[(Category, u64, u64); 4]> {
    let table = &record.table;
    let category_idx = find_column(&table.headers, &options.category_column).ok_or_else(|| {
        AppError::MissingColumn(format!("{} in {}", options.category_column, record.source_file))
    })?;
    let potential_idx = find_column(&table.headers, &options.potential_column).ok_or_else(|| {
        AppError::MissingColumn(format!("{} in {}", options.potential_column, record.source_file))
    })?;

    let mut counts = Category::ALL.map(|category| (category, 0u64, 0u64));
    for row in table.rows.iter().skip(options.skip_rows) {
        let Some(category) = row.get(category_idx).and_then(|raw| Category::normalize(raw)) else {
            continue;
        };
        let slot = &mut counts[category_slot(category)];
        match row.get(potential_idx).and_then(|raw| Potential::normalize(raw)) {
            Some(Potential::Low) => slot.1 += 1,
            Some(Potential::High) => slot.2 += 1,
            None => {}
        }
    }
    Ok(counts)
}

fn category_slot(category: Category) -> usize {
    Category::ALL
        .iter()
        .position(|candidate| *candidate == category)
        .unwrap_or_default()
}

/// Long-form TMSSR/Potential table for every capture in `dir`.
///
/// Each aggregated file contributes one row per canonical category. Points
/// are numbered 1..N per user in timestamp order; equal timestamps keep the
/// file-name order. Rows come back ordered by user, point, then category.
pub fn aggregate_folder(dir: &Path, options: &AggregateOptions) -> AppResult<Vec<AggregateRow>> {
    let records = scan_captures(dir)?;
    let mut rows = Vec::new();
    for record in &records {
        let counts = match count_categories(record, options) {
            Ok(counts) => counts,
            Err(error) => {
                tracing::debug!(
                    file = %record.source_file,
                    error = %error,
                    "skipping capture without required columns"
                );
                continue;
            }
        };
        for (category, low_count, high_count) in counts {
            rows.push(AggregateRow {
                user_id: record.user_id.clone(),
                timestamp: record.captured_at,
                category,
                low_count,
                high_count,
                point: 0,
                source_file: record.source_file.clone(),
            });
        }
    }

    assign_points(&mut rows);

    if let Some(selected) = &options.categories {
        rows.retain(|row| selected.contains(&row.category));
    }

    rows.sort_by(|a, b| {
        a.user_id
            .cmp(&b.user_id)
            .then(a.point.cmp(&b.point))
            .then(a.category.cmp(&b.category))
    });

    tracing::info!(
        dir = %dir.to_string_lossy(),
        files = records.len(),
        rows = rows.len(),
        "aggregated capture folder"
    );
    Ok(rows)
}

/// Numbers the distinct (user, timestamp, file) triples per user.
///
/// `rows` must be in file processing order; the stable sort keeps that order
/// for identical timestamps.
pub fn assign_points(rows: &mut [AggregateRow]) {
    let mut captures: Vec<(String, chrono::NaiveDateTime, String)> = Vec::new();
    for row in rows.iter() {
        let key = (row.user_id.clone(), row.timestamp, row.source_file.clone());
        if !captures.contains(&key) {
            captures.push(key);
        }
    }
    captures.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut points: HashMap<(String, chrono::NaiveDateTime, String), u32> = HashMap::new();
    let mut next_by_user: HashMap<String, u32> = HashMap::new();
    for capture in captures {
        let next = next_by_user.entry(capture.0.clone()).or_insert(0);
        *next += 1;
        points.insert(capture, *next);
    }

    for row in rows.iter_mut() {
        let key = (row.user_id.clone(), row.timestamp, row.source_file.clone());
        row.point = points.get(&key).copied().unwrap_or_default();
    }
}

/// Number of data points per user, e.g. for `user (N)` selector labels.
pub fn user_point_counts(rows: &[AggregateRow]) -> BTreeMap<String, u32> {
    let mut counts: BTreeMap<String, u32> = BTreeMap::new();
    for row in rows {
        let entry = counts.entry(row.user_id.clone()).or_insert(0);
        *entry = (*entry).max(row.point);
    }
    counts
}

/// Point → timestamp → file mapping for one user, ordered by point.
pub fn point_files(rows: &[AggregateRow], user_id: &str) -> Vec<PointFile> {
    let mut files: BTreeMap<u32, PointFile> = BTreeMap::new();
    for row in rows.iter().filter(|row| row.user_id == user_id) {
        files.entry(row.point).or_insert_with(|| PointFile {
            point: row.point,
            timestamp: row.timestamp,
            source_file: row.source_file.clone(),
        });
    }
    files.into_values().collect()
}

/// Low/high summed over every category per point for one user.
pub fn point_totals(rows: &[AggregateRow], user_id: &str) -> Vec<PointTotal> {
    let mut totals: BTreeMap<u32, PointTotal> = BTreeMap::new();
    for row in rows.iter().filter(|row| row.user_id == user_id) {
        let total = totals.entry(row.point).or_insert(PointTotal {
            point: row.point,
            low: 0,
            high: 0,
        });
        total.low += row.low_count;
        total.high += row.high_count;
    }
    totals.into_values().collect()
}

/// Per-category low/high series over all of the user's points. Points with
/// no row for a category read as zero.
pub fn category_point_series(rows: &[AggregateRow], user_id: &str) -> Vec<CategoryPointSeries> {
    let points = point_files(rows, user_id)
        .into_iter()
        .map(|file| file.point)
        .collect::<Vec<_>>();

    Category::ALL
        .into_iter()
        .map(|category| {
            let by_point = rows
                .iter()
                .filter(|row| row.user_id == user_id && row.category == category)
                .map(|row| (row.point, (row.low_count, row.high_count)))
                .collect::<BTreeMap<_, _>>();
            CategoryPointSeries {
                category,
                points: points
                    .iter()
                    .map(|point| {
                        let (low, high) = by_point.get(point).copied().unwrap_or((0, 0));
                        PointTotal {
                            point: *point,
                            low,
                            high,
                        }
                    })
                    .collect(),
            }
        })
        .collect()
}

/// Bundles the long-form rows with per-user point views. `user` limits the
/// views to one user; the rows are always complete.
pub fn build_report(rows: Vec<AggregateRow>, user: Option<&str>) -> AggregateReport {
    let counts = user_point_counts(&rows);
    let users = counts
        .iter()
        .filter(|(user_id, _)| user.map_or(true, |wanted| wanted == user_id.as_str()))
        .map(|(user_id, point_count)| UserPointView {
            user_id: user_id.clone(),
            point_count: *point_count,
            totals: point_totals(&rows, user_id),
            series: category_point_series(&rows, user_id),
            files: point_files(&rows, user_id),
        })
        .collect();

    AggregateReport {
        rows,
        user_point_counts: counts,
        users,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(user: &str, hour: u32, file: &str, category: Category, low: u64, high: u64) -> AggregateRow {
        AggregateRow {
            user_id: user.to_string(),
            timestamp: NaiveDate::from_ymd_opt(2025, 9, 11)
                .and_then(|date| date.and_hms_opt(hour, 0, 0))
                .expect("valid timestamp"),
            category,
            low_count: low,
            high_count: high,
            point: 0,
            source_file: file.to_string(),
        }
    }

    #[test]
    fn points_follow_timestamps_not_input_order() {
        let mut rows = vec![
            row("kim", 15, "c", Category::Eliciting, 0, 0),
            row("kim", 9, "a", Category::Eliciting, 0, 0),
            row("lee", 10, "x", Category::Eliciting, 0, 0),
            row("kim", 11, "b", Category::Eliciting, 0, 0),
        ];
        assign_points(&mut rows);
        let points = rows.iter().map(|row| (row.source_file.as_str(), row.point)).collect::<Vec<_>>();
        assert_eq!(points, vec![("c", 3), ("a", 1), ("x", 1), ("b", 2)]);
    }

    #[test]
    fn identical_timestamps_keep_processing_order() {
        let mut rows = vec![
            row("kim", 9, "first", Category::Eliciting, 0, 0),
            row("kim", 9, "first", Category::Responding, 0, 0),
            row("kim", 9, "second", Category::Eliciting, 0, 0),
        ];
        assign_points(&mut rows);
        assert_eq!(rows.iter().map(|row| row.point).collect::<Vec<_>>(), vec![1, 1, 2]);
    }

    #[test]
    fn point_views_fill_missing_categories() {
        let mut rows = vec![
            row("kim", 9, "a", Category::Eliciting, 1, 2),
            row("kim", 9, "a", Category::Extending, 3, 0),
            row("kim", 10, "b", Category::Eliciting, 0, 4),
        ];
        assign_points(&mut rows);

        let totals = point_totals(&rows, "kim");
        assert_eq!(
            totals,
            vec![
                PointTotal { point: 1, low: 4, high: 2 },
                PointTotal { point: 2, low: 0, high: 4 },
            ]
        );

        let series = category_point_series(&rows, "kim");
        assert_eq!(series.len(), 4);
        let extending = &series[3];
        assert_eq!(extending.category, Category::Extending);
        assert_eq!(extending.points[1], PointTotal { point: 2, low: 0, high: 0 });

        assert_eq!(user_point_counts(&rows).get("kim"), Some(&2));
        assert_eq!(point_files(&rows, "kim")[1].source_file, "b");
        assert!(point_files(&rows, "park").is_empty());
    }

    #[test]
    fn report_limits_views_to_requested_user() {
        let mut rows = vec![
            row("kim", 9, "a", Category::Eliciting, 1, 0),
            row("lee", 9, "b", Category::Eliciting, 0, 1),
        ];
        assign_points(&mut rows);

        let report = build_report(rows, Some("lee"));
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.user_point_counts.len(), 2);
        assert_eq!(report.users.len(), 1);
        assert_eq!(report.users[0].user_id, "lee");
        assert_eq!(report.users[0].totals[0].high, 1);
    }

    #[test]
    fn missing_directory_is_a_hard_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = aggregate_folder(&dir.path().join("nope"), &AggregateOptions::default())
            .expect_err("missing dir");
        assert!(error.to_string().starts_with("NOT_FOUND"));
    }
}
