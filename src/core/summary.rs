use std::fs;
use std::path::Path as FsPath;

use super::types::{PathMatrix, SummaryRow};

/// Reduces the matrix across runs for each step index. Row order is
/// immaterial; only the completed column contents feed each statistic.
pub fn summarize(matrix: &PathMatrix) -> Vec<SummaryRow> {
    let mut rows = Vec::with_capacity(matrix.steps);
    let mut column = Vec::with_capacity(matrix.runs());

    for day in 0..matrix.steps {
        column.clear();
        column.extend(matrix.paths.iter().map(|path| path[day]));

        let mean = column.iter().sum::<f64>() / column.len() as f64;
        let min = column.iter().copied().fold(f64::INFINITY, f64::min);
        let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let p5 = percentile(&mut column, 5.0);
        let p95 = percentile(&mut column, 95.0);

        rows.push(SummaryRow {
            day,
            mean_ote: mean,
            min_ote: min,
            max_ote: max,
            p5_ote: p5,
            p95_ote: p95,
        });
    }

    rows
}

/// Linear-interpolation percentile over a sorted copy of `values`.
fn percentile(values: &mut [f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len();
    if n == 1 {
        return values[0];
    }

    let rank = (p / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        values[lower]
    } else {
        let w = rank - lower as f64;
        values[lower] * (1.0 - w) + values[upper] * w
    }
}

/// Fixed column order: day, mean, min, max, p5, p95.
pub fn render_csv(rows: &[SummaryRow]) -> String {
    let mut csv = String::from("day,mean_ote,min_ote,max_ote,p5_ote,p95_ote\n");
    for row in rows {
        csv.push_str(&format!(
            "{},{:.6},{:.6},{:.6},{:.6},{:.6}\n",
            row.day, row.mean_ote, row.min_ote, row.max_ote, row.p5_ote, row.p95_ote,
        ));
    }
    csv
}

pub fn write_csv(path: &FsPath, rows: &[SummaryRow]) -> std::io::Result<()> {
    fs::write(path, render_csv(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn matrix_3x2() -> PathMatrix {
        PathMatrix {
            paths: vec![vec![10.0, 1.0], vec![20.0, 2.0], vec![30.0, 3.0]],
            steps: 2,
        }
    }

    #[test]
    fn per_step_mean_min_max() {
        let rows = summarize(&matrix_3x2());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].day, 0);
        assert_approx(rows[0].mean_ote, 20.0);
        assert_approx(rows[0].min_ote, 10.0);
        assert_approx(rows[0].max_ote, 30.0);
        assert_approx(rows[1].mean_ote, 2.0);
    }

    #[test]
    fn summary_is_invariant_to_row_order() {
        let mut shuffled = matrix_3x2();
        shuffled.paths.reverse();
        assert_eq!(summarize(&matrix_3x2()), summarize(&shuffled));
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        let mut values = vec![3.0, 1.0, 2.0, 4.0, 5.0];
        // rank for p5 over 5 points is 0.2: 1.0 + 0.2 * (2.0 - 1.0)
        assert_approx(percentile(&mut values, 5.0), 1.2);
        assert_approx(percentile(&mut values, 95.0), 4.8);
        assert_approx(percentile(&mut values, 50.0), 3.0);
        assert_approx(percentile(&mut values, 0.0), 1.0);
        assert_approx(percentile(&mut values, 100.0), 5.0);
    }

    #[test]
    fn percentile_of_single_value_is_that_value() {
        assert_approx(percentile(&mut [7.5], 5.0), 7.5);
        assert_approx(percentile(&mut [7.5], 95.0), 7.5);
    }

    #[test]
    fn csv_has_header_and_one_line_per_step() {
        let csv = render_csv(&summarize(&matrix_3x2()));
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "day,mean_ote,min_ote,max_ote,p5_ote,p95_ote");
        assert_eq!(lines[1], "0,20.000000,10.000000,30.000000,11.000000,29.000000");
    }
}
