use crate::types::{
    CellValue, CleanedTable, NumericColumns, RawTable, StatRow, MEAN_LABEL, P5_LABEL, P95_LABEL,
    STATE_LABEL,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Everything that is not part of a number: units, thousands separators,
/// footnote markers, stray whitespace.
static NON_NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\d.\-]").expect("strip pattern is valid"));

/// Substrings that mark a column as a candidate for one of the three
/// measurement roles. Matched against lowercased labels.
const NUMERIC_KEYWORDS: &[&str] = &["percentile", "mean", "average", "5th", "95th"];

/// Substrings that mark a column as the region label, in priority order.
const STATE_KEYWORDS: &[&str] = &["state", "region", "location", "area"];

/// Map the source's column labels onto the three measurement roles.
///
/// Sheets that already carry the exact canonical labels are taken at face
/// value. Anything else falls back to a keyword scan over the labels, taking
/// the first three matches in original column order as (5th, mean, 95th) —
/// the order is positional and is not verified against the data. Fewer than
/// three candidates means the table has no usable measurement columns.
pub fn identify_numeric_columns(columns: &[String]) -> Option<NumericColumns> {
    let canonical = [P5_LABEL, MEAN_LABEL, P95_LABEL];
    if canonical
        .iter()
        .all(|label| columns.iter().any(|c| c == label))
    {
        return Some(NumericColumns::canonical());
    }

    let candidates: Vec<&String> = columns
        .iter()
        .filter(|label| {
            let lower = label.to_lowercase();
            NUMERIC_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .collect();

    if candidates.len() < 3 {
        return None;
    }

    Some(NumericColumns {
        p5: candidates[0].clone(),
        mean: candidates[1].clone(),
        p95: candidates[2].clone(),
    })
}

/// Find the column carrying the region label. A column literally named
/// `State` wins outright; otherwise the keywords are tried in priority
/// order against lowercased labels.
pub fn identify_state_column(columns: &[String]) -> Option<String> {
    if columns.iter().any(|c| c == STATE_LABEL) {
        return Some(STATE_LABEL.to_string());
    }

    for keyword in STATE_KEYWORDS {
        if let Some(label) = columns.iter().find(|c| c.to_lowercase().contains(keyword)) {
            return Some(label.clone());
        }
    }

    None
}

/// Coerce one cell to a finite number, or `None` when it carries none.
///
/// The cell is rendered as text and stripped of every character that is not
/// a digit, decimal point, or minus sign. An empty or bare-`-` remainder is
/// missing data; anything that still fails to parse (several decimal points,
/// interior minus) is treated the same way. Coercion never fails a row.
pub fn coerce_numeric(value: &CellValue) -> Option<f64> {
    let text = value.render()?;
    let stripped = NON_NUMERIC.replace_all(&text, "");
    if stripped.is_empty() || stripped == "-" {
        return None;
    }
    stripped.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Normalize a raw table: identify columns once, coerce every cell in the
/// chosen columns, and drop rows with nothing usable in them.
pub fn clean_table(raw: &RawTable) -> CleanedTable {
    let numeric_columns = identify_numeric_columns(&raw.columns);
    let state_column = identify_state_column(&raw.columns);

    match &numeric_columns {
        Some(cols) if cols.p5 != P5_LABEL => {
            debug!(
                p5 = %cols.p5,
                mean = %cols.mean,
                p95 = %cols.p95,
                "renamed measurement columns to canonical labels"
            );
        }
        Some(_) => {}
        None => {
            warn!(
                columns = ?raw.columns,
                "no measurement columns identified, table has no usable numeric data"
            );
        }
    }

    let mut rows = Vec::with_capacity(raw.rows.len());
    let mut dropped = 0usize;

    for raw_row in &raw.rows {
        let (p5, mean, p95) = match &numeric_columns {
            Some(cols) => (
                raw_row.get(&cols.p5).and_then(coerce_numeric),
                raw_row.get(&cols.mean).and_then(coerce_numeric),
                raw_row.get(&cols.p95).and_then(coerce_numeric),
            ),
            None => (None, None, None),
        };

        let state = state_column
            .as_ref()
            .and_then(|col| raw_row.get(col))
            .and_then(|v| v.render())
            .filter(|s| !s.trim().is_empty());

        let row = StatRow {
            state,
            p5,
            mean,
            p95,
        };
        if row.has_numeric() {
            rows.push(row);
        } else {
            dropped += 1;
        }
    }

    if dropped > 0 {
        debug!(dropped, retained = rows.len(), "dropped rows with no usable values");
    }

    CleanedTable {
        rows,
        numeric_columns,
        state_column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawRow;

    fn table(columns: &[&str], rows: Vec<Vec<&str>>) -> RawTable {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|cells| {
                let mut row = RawRow::new();
                for (label, cell) in columns.iter().zip(cells) {
                    row.insert(label.clone(), CellValue::from_csv_field(cell));
                }
                row
            })
            .collect();
        RawTable { columns, rows }
    }

    #[test]
    fn exact_canonical_labels_are_selected_directly() {
        let raw = table(
            &["State", "5th Percentile", "Mean", "95th Percentile"],
            vec![
                vec!["All India", "10", "15", "20"],
                vec!["Punjab", "11", "16", "21"],
            ],
        );

        let cleaned = clean_table(&raw);
        assert_eq!(
            cleaned.numeric_columns,
            Some(NumericColumns::canonical())
        );
        assert_eq!(cleaned.rows.len(), 2);
        assert_eq!(cleaned.rows[0].p5, Some(10.0));
        assert_eq!(cleaned.rows[0].mean, Some(15.0));
        assert_eq!(cleaned.rows[0].p95, Some(20.0));
        assert_eq!(cleaned.rows[1].state.as_deref(), Some("Punjab"));
    }

    #[test]
    fn keyword_candidates_map_in_column_order() {
        let raw = table(
            &["Region", "5th %ile (cm)", "Average (cm)", "95th %ile (cm)"],
            vec![vec!["Gujarat", "151.2", "163.9", "176.1"]],
        );

        let cleaned = clean_table(&raw);
        let cols = cleaned.numeric_columns.expect("columns identified");
        assert_eq!(cols.p5, "5th %ile (cm)");
        assert_eq!(cols.mean, "Average (cm)");
        assert_eq!(cols.p95, "95th %ile (cm)");
        assert_eq!(cleaned.rows[0].p5, Some(151.2));
        assert_eq!(cleaned.rows[0].mean, Some(163.9));
        assert_eq!(cleaned.rows[0].p95, Some(176.1));
    }

    #[test]
    fn fewer_than_three_candidates_is_columns_not_found() {
        let raw = table(
            &["State", "Mean", "Notes"],
            vec![vec!["All India", "63.2", "survey 2009"]],
        );

        let cleaned = clean_table(&raw);
        assert!(cleaned.numeric_columns.is_none());
        assert!(cleaned.rows.is_empty());
        // The region dimension is still reported for display purposes.
        assert_eq!(cleaned.state_column.as_deref(), Some("State"));
    }

    #[test]
    fn coercion_is_idempotent_on_finite_numbers() {
        let first = coerce_numeric(&CellValue::Text("1,234.5 kg".to_string())).unwrap();
        let second = coerce_numeric(&CellValue::Number(first)).unwrap();
        assert_eq!(first, 1234.5);
        assert_eq!(first, second);
    }

    #[test]
    fn units_and_separators_are_stripped() {
        assert_eq!(
            coerce_numeric(&CellValue::Text("1,234.5 kg".to_string())),
            Some(1234.5)
        );
        assert_eq!(
            coerce_numeric(&CellValue::Text("12.5 cm".to_string())),
            Some(12.5)
        );
        assert_eq!(
            coerce_numeric(&CellValue::Text("-3.1".to_string())),
            Some(-3.1)
        );
    }

    #[test]
    fn placeholder_values_are_absent_not_zero() {
        for raw in ["--", "", "N/A", "-", "n/a", "   "] {
            assert_eq!(
                coerce_numeric(&CellValue::from_csv_field(raw)),
                None,
                "{:?} should coerce to absent",
                raw
            );
        }
    }

    #[test]
    fn garbled_numbers_degrade_to_absent() {
        assert_eq!(coerce_numeric(&CellValue::Text("1.2.3".to_string())), None);
        assert_eq!(coerce_numeric(&CellValue::Text("4-2".to_string())), None);
        assert_eq!(coerce_numeric(&CellValue::Absent), None);
    }

    #[test]
    fn all_absent_rows_are_dropped_partial_rows_kept() {
        let raw = table(
            &["State", "5th Percentile", "Mean", "95th Percentile"],
            vec![
                vec!["Punjab", "5.0", "", ""],
                vec!["Orissa", "", "", ""],
            ],
        );

        let cleaned = clean_table(&raw);
        assert_eq!(cleaned.rows.len(), 1);
        assert_eq!(cleaned.rows[0].state.as_deref(), Some("Punjab"));
        assert_eq!(cleaned.rows[0].p5, Some(5.0));
        assert_eq!(cleaned.rows[0].mean, None);
    }

    #[test]
    fn state_column_is_found_by_keyword_priority() {
        // "state" outranks "area" even when the area column comes first.
        let columns: Vec<String> = ["Survey Area", "State Name", "Mean"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(identify_state_column(&columns).as_deref(), Some("State Name"));

        let columns: Vec<String> = ["Survey Area", "Mean"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(identify_state_column(&columns).as_deref(), Some("Survey Area"));

        let columns: Vec<String> = ["Mean", "Median"].iter().map(|s| s.to_string()).collect();
        assert_eq!(identify_state_column(&columns), None);
    }

    #[test]
    fn literal_state_column_wins_over_keyword_matches() {
        let columns: Vec<String> = ["Region", "State", "Mean"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(identify_state_column(&columns).as_deref(), Some("State"));
    }

    #[test]
    fn partial_canonical_set_falls_through_to_keyword_scan() {
        // Only "Mean" is canonical, but all three labels carry keywords, so
        // the positional fallback still finds a full mapping.
        let raw = table(
            &["State", "P5 (5th)", "Mean", "P95 (95th)"],
            vec![vec!["All India", "10", "15", "20"]],
        );

        let cleaned = clean_table(&raw);
        let cols = cleaned.numeric_columns.expect("columns identified");
        assert_eq!(cols.p5, "P5 (5th)");
        assert_eq!(cols.mean, "Mean");
        assert_eq!(cols.p95, "P95 (95th)");
    }

    #[test]
    fn normalizes_mixed_fixture_end_to_end() {
        let raw = table(
            &["State", "5th Percentile", "Mean", "95th Percentile"],
            vec![
                vec!["Punjab", "10", "-", "20"],
                vec!["X", "", "", ""],
            ],
        );

        let cleaned = clean_table(&raw);
        assert_eq!(cleaned.rows.len(), 1);
        let row = &cleaned.rows[0];
        assert_eq!(row.state.as_deref(), Some("Punjab"));
        assert_eq!(row.p5, Some(10.0));
        assert_eq!(row.mean, None);
        assert_eq!(row.p95, Some(20.0));
    }
}
