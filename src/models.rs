use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Eliciting,
    Responding,
    Facilitating,
    Extending,
}

impl Category {
    /// Canonical display order.
    pub const ALL: [Category; 4] = [
        Self::Eliciting,
        Self::Responding,
        Self::Facilitating,
        Self::Extending,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eliciting => "Eliciting",
            Self::Responding => "Responding",
            Self::Facilitating => "Facilitating",
            Self::Extending => "Extending",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Potential {
    High,
    Low,
}

impl Potential {
    pub const ALL: [Potential; 2] = [Self::High, Self::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    Utf8Sig,
    Cp949,
    Utf8,
    PlatformDefault,
}

impl TextEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Utf8Sig => "utf-8-sig",
            Self::Cp949 => "cp949",
            Self::Utf8 => "utf-8",
            Self::PlatformDefault => "platform-default",
        }
    }
}

/// A decoded CSV file: header row plus data rows. Rows may be ragged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub encoding: TextEncoding,
}

impl Table {
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|values| values.get(column))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureName {
    pub user_id: String,
    pub captured_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct FileRecord {
    pub user_id: String,
    pub captured_at: NaiveDateTime,
    pub source_file: String,
    pub table: Table,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AggregateRow {
    pub user_id: String,
    pub timestamp: NaiveDateTime,
    pub category: Category,
    pub low_count: u64,
    pub high_count: u64,
    pub point: u32,
    pub source_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PointTotal {
    pub point: u32,
    pub low: u64,
    pub high: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CategoryPointSeries {
    pub category: Category,
    pub points: Vec<PointTotal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PointFile {
    pub point: u32,
    pub timestamp: NaiveDateTime,
    pub source_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PeriodTotals {
    pub total: u64,
    pub file_count: u64,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ComparisonRow {
    pub key: String,
    pub value_a: u64,
    pub value_b: u64,
    pub delta: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CountComparison {
    pub rows: Vec<ComparisonRow>,
    pub totals_a: PeriodTotals,
    pub totals_b: PeriodTotals,
    pub total_delta: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CategoryComparisonRow {
    pub category: Category,
    pub low_a: u64,
    pub high_a: u64,
    pub total_a: u64,
    pub share_a: f64,
    pub low_b: u64,
    pub high_b: u64,
    pub total_b: u64,
    pub share_b: f64,
    pub low_delta: i64,
    pub high_delta: i64,
    pub total_delta: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CategoryComparison {
    pub rows: Vec<CategoryComparisonRow>,
    pub totals_a: PeriodTotals,
    pub totals_b: PeriodTotals,
    pub total_delta: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PeriodSnapshot {
    pub label: String,
    pub utterances: BTreeMap<String, u64>,
    pub files_by_user: BTreeMap<String, u64>,
    pub total_files: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UserPeriodRow {
    pub user_id: String,
    pub early_utterances: u64,
    pub late_utterances: u64,
    pub utterance_delta: i64,
    pub early_files: u64,
    pub late_files: u64,
    pub file_delta: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UserRanking {
    pub user_id: String,
    pub utterances: u64,
    pub files: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PeriodComparison {
    pub early_label: String,
    pub late_label: String,
    pub users: Vec<UserPeriodRow>,
    pub early_ranking: Vec<UserRanking>,
    pub late_ranking: Vec<UserRanking>,
    pub early_totals: PeriodTotals,
    pub late_totals: PeriodTotals,
    pub file_delta: i64,
    pub utterance_delta: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FrequencyRow {
    pub label: String,
    pub count: u64,
    pub percentage: f64,
    pub cumulative_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CrossTabCell {
    pub label: String,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CrossTabRow {
    pub label: String,
    pub total: u64,
    pub cells: Vec<CrossTabCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Distribution {
    pub total_rows: u64,
    pub categories: Vec<FrequencyRow>,
    pub potentials: Vec<FrequencyRow>,
    pub by_category: Vec<CrossTabRow>,
    pub by_potential: Vec<CrossTabRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UserPointView {
    pub user_id: String,
    pub point_count: u32,
    pub totals: Vec<PointTotal>,
    pub series: Vec<CategoryPointSeries>,
    pub files: Vec<PointFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AggregateReport {
    pub rows: Vec<AggregateRow>,
    pub user_point_counts: BTreeMap<String, u32>,
    pub users: Vec<UserPointView>,
}
