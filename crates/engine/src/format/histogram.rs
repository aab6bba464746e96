//! Histogram: fixed-width ASCII bar tables.

use super::units::HistValue;

/// Width of the longest bar.
pub const HISTOGRAM_LENGTH: u64 = 60;

/// One table row: the leading columns plus the plotted value.
#[derive(Debug, Clone)]
pub struct RowValue<V> {
    pub row: Vec<String>,
    pub value: V,
}

#[derive(Debug, Clone)]
pub struct RowValues<V> {
    pub rows: Vec<RowValue<V>>,
    pub total: V,
}

/// Render `rows` under `headers`. The last header names the value column.
///
/// ```text
///
/// Event | Duration | Perc | Histogram
/// ---------------------------------------------------------------------------------
/// Start | 0s       |   0% |
/// Resp  | 15µs     | 100% | ############################################################
/// ---------------------------------------------------------------------------------
/// Total   15µs
/// ```
///
/// Percentages are relative to the total, bar lengths to the largest value.
/// A zero value or a zero total gets `0%` and no bar.
pub fn generate_histogram<V: HistValue>(headers: &[&str], values: &RowValues<V>) -> String {
    let Some(value_col) = headers.len().checked_sub(1) else {
        return String::new();
    };

    let mut max_lens: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    let total_str = values.total.to_string();
    max_lens[value_col] = max_lens[value_col].max(total_str.len());

    let mut max_value = 0;
    let mut value_strs = Vec::with_capacity(values.rows.len());
    for row_value in &values.rows {
        for (width, col) in max_lens[..value_col].iter_mut().zip(&row_value.row) {
            *width = (*width).max(col.len());
        }
        let value_str = row_value.value.to_string();
        max_lens[value_col] = max_lens[value_col].max(value_str.len());
        max_value = max_value.max(row_value.value.value());
        value_strs.push(value_str);
    }

    let width_sum: usize = max_lens.iter().sum();
    let separator = format!(
        "{}\n",
        "-".repeat(width_sum + (headers.len() + 2) * 3 + HISTOGRAM_LENGTH as usize + 1)
    );

    let mut s = String::from("\n");
    for (header, width) in headers.iter().zip(&max_lens) {
        s.push_str(&format!("{header:<width$} | "));
    }
    s.push_str("Perc | Histogram\n");
    s.push_str(&separator);

    let total = values.total.value();
    for (row_value, value_str) in values.rows.iter().zip(&value_strs) {
        let value = row_value.value.value();
        let (perc, bar) = if value > 0 && total > 0 && max_value > 0 {
            let perc = u128::from(value) * 100 / u128::from(total);
            let bar = (u128::from(value) * u128::from(HISTOGRAM_LENGTH) / u128::from(max_value)).max(1);
            (perc, bar as usize)
        } else {
            (0, 0)
        };

        for (col, width) in row_value.row.iter().zip(&max_lens[..value_col]) {
            s.push_str(&format!("{col:<width$} | "));
        }
        s.push_str(&format!("{value_str:<width$} | ", width = max_lens[value_col]));
        s.push_str(&format!("{perc:>3}% |"));
        if bar > 0 {
            s.push(' ');
            s.push_str(&"#".repeat(bar));
        }
        s.push('\n');
    }

    s.push_str(&separator);
    let total_width = width_sum - max_lens[value_col] + headers.len() * 3 - 3;
    s.push_str(&format!("{:<total_width$}{total_str}\n", "Total"));

    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::units::{DurationValue, SizeValue};
    use std::time::Duration;

    fn row<V>(cols: &[&str], value: V) -> RowValue<V> {
        RowValue {
            row: cols.iter().map(|c| c.to_string()).collect(),
            value,
        }
    }

    fn nanos(n: u64) -> DurationValue {
        DurationValue(Duration::from_nanos(n))
    }

    #[test]
    fn test_duration_histogram() {
        let headers = ["TxId", "Type", "Reason", "Duration"];
        let values = RowValues {
            rows: vec![
                row(&["26", "sess", "HTTP/1"], nanos(0)),
                row(&["27", "req", "rxreq"], nanos(818000)),
                row(&["28", "bereq", "fetch"], nanos(317000)),
                row(&["29_1", "req", "esi"], nanos(361000)),
                row(&["30", "bereq", "pass"], nanos(131000)),
                row(&["31_2", "req", "esi"], nanos(165000)),
                row(&["32*", "bereq", "fetch"], nanos(321000)),
            ],
            total: nanos(2113000),
        };

        let expected = "
TxId | Type  | Reason | Duration | Perc | Histogram
------------------------------------------------------------------------------------------------------
26   | sess  | HTTP/1 | 0s       |   0% |
27   | req   | rxreq  | 818µs    |  38% | ############################################################
28   | bereq | fetch  | 317µs    |  15% | #######################
29_1 | req   | esi    | 361µs    |  17% | ##########################
30   | bereq | pass   | 131µs    |   6% | #########
31_2 | req   | esi    | 165µs    |   7% | ############
32*  | bereq | fetch  | 321µs    |  15% | #######################
------------------------------------------------------------------------------------------------------
Total                   2.113ms
";

        assert_eq!(generate_histogram(&headers, &values), expected);
    }

    #[test]
    fn test_size_histogram() {
        let headers = ["Type", "Direction", "Size"];
        let values = RowValues {
            rows: vec![
                row(&["Body", "Transmitted"], SizeValue(923)),
                row(&["Header", "Transmitted"], SizeValue(8180)),
            ],
            total: SizeValue(9103),
        };

        let expected = "
Type   | Direction   | Size    | Perc | Histogram
----------------------------------------------------------------------------------------------------
Body   | Transmitted | 923B    |  10% | ######
Header | Transmitted | 7.988KB |  89% | ############################################################
----------------------------------------------------------------------------------------------------
Total                  8.890KB
";

        assert_eq!(generate_histogram(&headers, &values), expected);
    }

    #[test]
    fn test_zero_total_has_no_bars() {
        let values = RowValues {
            rows: vec![row(&["a"], SizeValue(0)), row(&["b"], SizeValue(0))],
            total: SizeValue(0),
        };
        let out = generate_histogram(&["Name", "Size"], &values);
        assert!(!out.contains('#'));
        assert_eq!(out.matches("  0% |\n").count(), 2);
    }

    #[test]
    fn test_tiny_value_keeps_a_bar() {
        let values = RowValues {
            rows: vec![row(&["big"], SizeValue(1_000_000)), row(&["tiny"], SizeValue(1))],
            total: SizeValue(1_000_001),
        };
        let out = generate_histogram(&["Name", "Size"], &values);
        let tiny = out.lines().find(|l| l.starts_with("tiny")).unwrap();
        assert!(tiny.ends_with("  0% | #"), "{tiny}");
    }

    #[test]
    fn test_percentages_never_exceed_100() {
        let values = RowValues {
            rows: vec![
                row(&["a"], SizeValue(333)),
                row(&["b"], SizeValue(333)),
                row(&["c"], SizeValue(334)),
            ],
            total: SizeValue(1000),
        };
        let out = generate_histogram(&["Name", "Size"], &values);
        let sum: u32 = out
            .lines()
            .filter_map(|l| l.split('|').nth(2))
            .filter_map(|p| p.trim().trim_end_matches('%').parse::<u32>().ok())
            .sum();
        assert!(sum <= 100, "sum = {sum}");
    }

    #[test]
    fn test_no_headers() {
        let values: RowValues<SizeValue> = RowValues { rows: vec![], total: SizeValue(0) };
        assert_eq!(generate_histogram(&[], &values), "");
    }
}
