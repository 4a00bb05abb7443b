use crate::types::CleanedTable;
use serde::Serialize;

/// Mean over the present values only. `None` when every value is absent.
pub fn mean_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values.into_iter().flatten() {
        sum += value;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Across-region averages of the three statistics for one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub rows: usize,
    pub avg_p5: Option<f64>,
    pub avg_mean: Option<f64>,
    pub avg_p95: Option<f64>,
}

pub fn summarize(table: &CleanedTable) -> TableSummary {
    TableSummary {
        rows: table.rows.len(),
        avg_p5: mean_present(table.rows.iter().map(|r| r.p5)),
        avg_mean: mean_present(table.rows.iter().map(|r| r.mean)),
        avg_p95: mean_present(table.rows.iter().map(|r| r.p95)),
    }
}

/// One statistic compared across genders. The difference is male minus
/// female and only exists when both sides do.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatDiff {
    pub male: Option<f64>,
    pub female: Option<f64>,
    pub difference: Option<f64>,
}

impl StatDiff {
    fn new(male: Option<f64>, female: Option<f64>) -> Self {
        let difference = match (male, female) {
            (Some(m), Some(f)) => Some(m - f),
            _ => None,
        };
        StatDiff {
            male,
            female,
            difference,
        }
    }
}

/// Male-vs-female comparison of the across-region averages.
#[derive(Debug, Clone, Serialize)]
pub struct GenderComparison {
    pub parameter: String,
    pub p5: StatDiff,
    pub mean: StatDiff,
    pub p95: StatDiff,
}

pub fn compare_tables(
    parameter: &str,
    male: &CleanedTable,
    female: &CleanedTable,
) -> GenderComparison {
    let male_summary = summarize(male);
    let female_summary = summarize(female);
    GenderComparison {
        parameter: parameter.to_string(),
        p5: StatDiff::new(male_summary.avg_p5, female_summary.avg_p5),
        mean: StatDiff::new(male_summary.avg_mean, female_summary.avg_mean),
        p95: StatDiff::new(male_summary.avg_p95, female_summary.avg_p95),
    }
}
