use crate::models::{
    AggregateRow, Category, CategoryComparison, CategoryComparisonRow, ComparisonRow, CountComparison, PeriodTotals,
};
use std::collections::{BTreeMap, BTreeSet};

/// `b - a` without wrapping.
pub fn signed_delta(a: u64, b: u64) -> i64 {
    let a = i64::try_from(a).unwrap_or(i64::MAX);
    let b = i64::try_from(b).unwrap_or(i64::MAX);
    b.saturating_sub(a)
}

fn saturating_total(values: impl IntoIterator<Item = u64>) -> u64 {
    values.into_iter().fold(0, u64::saturating_add)
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl PeriodTotals {
    /// `rate` is `total / file_count`, or 0 for a period without files.
    pub fn new(total: u64, file_count: u64) -> Self {
        Self {
            total,
            file_count,
            rate: ratio(total, file_count),
        }
    }
}

/// Per-key comparison of two count maps. Missing keys count as zero.
///
/// Rows are ordered by combined volume, largest first, then by key.
pub fn compare_counts(a: &BTreeMap<String, u64>, b: &BTreeMap<String, u64>) -> CountComparison {
    compare_counts_with_files(a, b, 0, 0)
}

/// Like [`compare_counts`], with per-period file counts for the rate.
pub fn compare_counts_with_files(
    a: &BTreeMap<String, u64>,
    b: &BTreeMap<String, u64>,
    files_a: u64,
    files_b: u64,
) -> CountComparison {
    let keys = a.keys().chain(b.keys()).collect::<BTreeSet<_>>();
    let mut rows = keys
        .into_iter()
        .map(|key| {
            let value_a = a.get(key).copied().unwrap_or(0);
            let value_b = b.get(key).copied().unwrap_or(0);
            ComparisonRow {
                key: key.clone(),
                value_a,
                value_b,
                delta: signed_delta(value_a, value_b),
            }
        })
        .collect::<Vec<_>>();
    rows.sort_by(|x, y| {
        y.value_a
            .saturating_add(y.value_b)
            .cmp(&x.value_a.saturating_add(x.value_b))
            .then_with(|| x.key.cmp(&y.key))
    });

    let totals_a = PeriodTotals::new(saturating_total(a.values().copied()), files_a);
    let totals_b = PeriodTotals::new(saturating_total(b.values().copied()), files_b);
    CountComparison {
        rows,
        total_delta: signed_delta(totals_a.total, totals_b.total),
        totals_a,
        totals_b,
    }
}

#[derive(Default, Clone, Copy)]
struct CategoryTally {
    low: u64,
    high: u64,
}

fn tally(rows: &[AggregateRow]) -> (BTreeMap<Category, CategoryTally>, u64) {
    let mut by_category: BTreeMap<Category, CategoryTally> = BTreeMap::new();
    let mut files = BTreeSet::new();
    for row in rows {
        let entry = by_category.entry(row.category).or_default();
        entry.low = entry.low.saturating_add(row.low_count);
        entry.high = entry.high.saturating_add(row.high_count);
        files.insert((row.user_id.as_str(), row.timestamp, row.source_file.as_str()));
    }
    (by_category, files.len() as u64)
}

/// Category totals of two aggregates side by side, in canonical category
/// order, with each category's share of its period total.
pub fn compare_aggregates(a: &[AggregateRow], b: &[AggregateRow]) -> CategoryComparison {
    let (tally_a, files_a) = tally(a);
    let (tally_b, files_b) = tally(b);
    let grand_a = saturating_total(tally_a.values().map(|t| t.low.saturating_add(t.high)));
    let grand_b = saturating_total(tally_b.values().map(|t| t.low.saturating_add(t.high)));

    let rows = Category::ALL
        .into_iter()
        .map(|category| {
            let left = tally_a.get(&category).copied().unwrap_or_default();
            let right = tally_b.get(&category).copied().unwrap_or_default();
            let total_a = left.low.saturating_add(left.high);
            let total_b = right.low.saturating_add(right.high);
            CategoryComparisonRow {
                category,
                low_a: left.low,
                high_a: left.high,
                total_a,
                share_a: ratio(total_a, grand_a),
                low_b: right.low,
                high_b: right.high,
                total_b,
                share_b: ratio(total_b, grand_b),
                low_delta: signed_delta(left.low, right.low),
                high_delta: signed_delta(left.high, right.high),
                total_delta: signed_delta(total_a, total_b),
            }
        })
        .collect();

    CategoryComparison {
        rows,
        totals_a: PeriodTotals::new(grand_a, files_a),
        totals_b: PeriodTotals::new(grand_b, files_b),
        total_delta: signed_delta(grand_a, grand_b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn counts(values: &[(&str, u64)]) -> BTreeMap<String, u64> {
        values.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn row(file: &str, category: Category, low: u64, high: u64) -> AggregateRow {
        AggregateRow {
            user_id: "kim".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2025, 12, 4)
                .and_then(|date| date.and_hms_opt(9, 0, 0))
                .expect("valid timestamp"),
            category,
            low_count: low,
            high_count: high,
            point: 1,
            source_file: file.to_string(),
        }
    }

    #[test]
    fn deltas_default_missing_keys_to_zero() {
        let comparison = compare_counts(&counts(&[("kim", 3), ("lee", 7)]), &counts(&[("kim", 5), ("park", 1)]));
        let keys = comparison.rows.iter().map(|row| row.key.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["kim", "lee", "park"]);
        assert_eq!(comparison.rows[1].delta, -7);
        assert_eq!(comparison.rows[2].delta, 1);
        assert_eq!(comparison.total_delta, -4);
        assert_eq!(comparison.totals_a.rate, 0.0);
    }

    #[test]
    fn comparison_is_antisymmetric() {
        let a = counts(&[("kim", 3), ("lee", 7), ("choi", 0)]);
        let b = counts(&[("kim", 5), ("park", 1)]);
        let forward = compare_counts(&a, &b);
        let backward = compare_counts(&b, &a);
        for row in &forward.rows {
            let mirror = backward.rows.iter().find(|other| other.key == row.key).expect("shared key");
            assert_eq!(row.delta, -mirror.delta);
        }
        assert_eq!(forward.total_delta, -backward.total_delta);
    }

    #[test]
    fn rate_uses_file_counts() {
        let comparison = compare_counts_with_files(&counts(&[("kim", 9)]), &counts(&[("kim", 4)]), 3, 0);
        assert_eq!(comparison.totals_a.rate, 3.0);
        assert_eq!(comparison.totals_b.rate, 0.0);
    }

    #[test]
    fn extreme_counts_saturate_instead_of_overflowing() {
        let comparison = compare_counts(&counts(&[("kim", u64::MAX)]), &counts(&[("kim", 1), ("lee", 1)]));
        assert_eq!(comparison.rows[0].key, "kim");
        assert_eq!(comparison.totals_a.total, u64::MAX);
        assert_eq!(comparison.totals_b.total, 2);
        assert_eq!(comparison.rows[0].delta, 1 - i64::MAX);
    }

    #[test]
    fn aggregates_compare_by_category_with_shares() {
        let early = vec![
            row("a", Category::Eliciting, 1, 1),
            row("a", Category::Responding, 2, 0),
            row("b", Category::Eliciting, 0, 0),
        ];
        let late = vec![row("c", Category::Extending, 0, 5)];

        let comparison = compare_aggregates(&early, &late);
        assert_eq!(comparison.rows.len(), 4);
        let eliciting = &comparison.rows[0];
        assert_eq!((eliciting.total_a, eliciting.total_b, eliciting.total_delta), (2, 0, -2));
        assert!((eliciting.share_a - 0.5).abs() < 1e-9);
        assert_eq!(comparison.rows[3].share_b, 1.0);
        assert_eq!(comparison.totals_a.file_count, 2);
        assert_eq!(comparison.totals_a.rate, 2.0);
        assert_eq!(comparison.total_delta, 1);

        let empty = compare_aggregates(&[], &[]);
        assert!(empty.rows.iter().all(|row| row.share_a == 0.0 && row.total_delta == 0));
    }
}
