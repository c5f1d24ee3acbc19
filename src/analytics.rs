use crate::error::SchoolResult;
use crate::store::RecordStore;
use serde::Serialize;
use std::cmp::Ordering;

/// 1-decimal rounding used for every percentage we report:
/// `floor(10*x + 0.5) / 10`
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelValue {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeShare {
    pub grade: String,
    pub count: i64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentMark {
    pub name: String,
    pub marks: Option<i64>,
}

/// One class in the report summary: its student count and, when any student
/// is marked, the mean marks rounded to one decimal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStanding {
    pub class_id: i64,
    pub name: String,
    pub students: i64,
    pub average: Option<f64>,
}

/// Optional ordering requested by the caller. `Grouped` keeps whatever the
/// store's GROUP BY produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Grouped,
    Label,
    Value,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Option<SortOrder> {
        match raw {
            None | Some("grouped") => Some(SortOrder::Grouped),
            Some("label") => Some(SortOrder::Label),
            Some("value") => Some(SortOrder::Value),
            Some(_) => None,
        }
    }
}

fn sort_by_label_or_value<T>(
    rows: &mut [T],
    order: SortOrder,
    label: impl Fn(&T) -> &str,
    value: impl Fn(&T) -> f64,
) {
    match order {
        SortOrder::Grouped => {}
        SortOrder::Label => rows.sort_by(|a, b| label(a).cmp(label(b))),
        SortOrder::Value => rows.sort_by(|a, b| {
            value(b)
                .partial_cmp(&value(a))
                .unwrap_or(Ordering::Equal)
                .then_with(|| label(a).cmp(label(b)))
        }),
    }
}

pub fn class_averages(store: &RecordStore, order: SortOrder) -> SchoolResult<Vec<LabelValue>> {
    let mut rows: Vec<LabelValue> = store
        .aggregate_by_class()?
        .into_iter()
        .map(|(label, value)| LabelValue { label, value })
        .collect();
    sort_by_label_or_value(&mut rows, order, |r| r.label.as_str(), |r| r.value);
    tracing::debug!(classes = rows.len(), "computed class averages");
    Ok(rows)
}

pub fn grade_distribution(store: &RecordStore, order: SortOrder) -> SchoolResult<Vec<GradeShare>> {
    let mut rows = grade_shares(store.aggregate_by_grade()?);
    sort_by_label_or_value(&mut rows, order, |r| r.grade.as_str(), |r| r.count as f64);
    tracing::debug!(grades = rows.len(), "computed grade distribution");
    Ok(rows)
}

/// Attaches each group's share of the total, rounded to one decimal.
pub fn grade_shares(counts: Vec<(String, i64)>) -> Vec<GradeShare> {
    let total: i64 = counts.iter().map(|(_, c)| *c).sum();
    counts
        .into_iter()
        .map(|(grade, count)| {
            let percent = if total > 0 {
                round_off_1_decimal((count as f64) * 100.0 / (total as f64))
            } else {
                0.0
            };
            GradeShare {
                grade,
                count,
                percent,
            }
        })
        .collect()
}

pub fn class_counts(store: &RecordStore, order: SortOrder) -> SchoolResult<Vec<LabelValue>> {
    let mut rows: Vec<LabelValue> = store
        .class_student_counts()?
        .into_iter()
        .map(|(label, count)| LabelValue {
            label,
            value: count as f64,
        })
        .collect();
    sort_by_label_or_value(&mut rows, order, |r| r.label.as_str(), |r| r.value);
    Ok(rows)
}

pub fn class_standings(store: &RecordStore) -> SchoolResult<Vec<ClassStanding>> {
    Ok(store
        .class_summaries()?
        .into_iter()
        .map(|(class_id, name, students, average)| ClassStanding {
            class_id,
            name,
            students,
            average: average.map(round_off_1_decimal),
        })
        .collect())
}

pub fn student_marks(store: &RecordStore) -> SchoolResult<Vec<StudentMark>> {
    Ok(store
        .student_marks()?
        .into_iter()
        .map(|(name, marks)| StudentMark { name, marks })
        .collect())
}
