use crate::config::AggregateOptions;
use crate::errors::{AppError, AppResult};
use crate::models::{Category, CrossTabCell, CrossTabRow, Distribution, FrequencyRow, Potential, Table};
use crate::normalize::find_column;
use std::collections::BTreeMap;

fn percent(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

fn frequencies<K: Ord + Copy>(counts: &BTreeMap<K, u64>, label: impl Fn(K) -> &'static str) -> Vec<FrequencyRow> {
    let total = counts.values().sum::<u64>();
    let mut running = 0u64;
    counts
        .iter()
        .map(|(key, count)| {
            running += count;
            FrequencyRow {
                label: label(*key).to_string(),
                count: *count,
                percentage: percent(*count, total),
                cumulative_percentage: percent(running, total),
            }
        })
        .collect()
}

/// Frequency and cross-tabulation of categories and potentials in a single
/// coded table. Only values that normalize are counted; only labels that
/// occur at least once get a row.
pub fn distribution(table: &Table, options: &AggregateOptions) -> AppResult<Distribution> {
    let category_idx = find_column(&table.headers, &options.category_column)
        .ok_or_else(|| AppError::MissingColumn(options.category_column.clone()))?;
    let potential_idx = find_column(&table.headers, &options.potential_column)
        .ok_or_else(|| AppError::MissingColumn(options.potential_column.clone()))?;

    let mut categories: BTreeMap<Category, u64> = BTreeMap::new();
    let mut potentials: BTreeMap<Potential, u64> = BTreeMap::new();
    let mut pairs: BTreeMap<(Category, Potential), u64> = BTreeMap::new();

    let rows = table.rows.iter().skip(options.skip_rows).collect::<Vec<_>>();
    for row in &rows {
        let category = row.get(category_idx).and_then(|raw| Category::normalize(raw));
        let potential = row.get(potential_idx).and_then(|raw| Potential::normalize(raw));
        if let Some(category) = category {
            *categories.entry(category).or_insert(0) += 1;
        }
        if let Some(potential) = potential {
            *potentials.entry(potential).or_insert(0) += 1;
        }
        if let (Some(category), Some(potential)) = (category, potential) {
            *pairs.entry((category, potential)).or_insert(0) += 1;
        }
    }

    let by_category = categories
        .keys()
        .map(|category| {
            let cells = Potential::ALL
                .into_iter()
                .map(|potential| (potential.as_str(), pairs.get(&(*category, potential)).copied().unwrap_or(0)))
                .collect::<Vec<_>>();
            cross_tab_row(category.as_str(), cells)
        })
        .collect();

    let by_potential = potentials
        .keys()
        .map(|potential| {
            let cells = categories
                .keys()
                .map(|category| (category.as_str(), pairs.get(&(*category, *potential)).copied().unwrap_or(0)))
                .collect::<Vec<_>>();
            cross_tab_row(potential.as_str(), cells)
        })
        .collect();

    Ok(Distribution {
        total_rows: rows.len() as u64,
        categories: frequencies(&categories, Category::as_str),
        potentials: frequencies(&potentials, Potential::as_str),
        by_category,
        by_potential,
    })
}

fn cross_tab_row(label: &str, cells: Vec<(&str, u64)>) -> CrossTabRow {
    let total = cells.iter().map(|(_, count)| count).sum::<u64>();
    CrossTabRow {
        label: label.to_string(),
        total,
        cells: cells
            .into_iter()
            .map(|(label, count)| CrossTabCell {
                label: label.to_string(),
                count,
                percentage: percent(count, total),
            })
            .collect(),
    }
}
