//! Numeric coercion for value columns.
//!
//! Survey exports mix period and comma decimals ("45.4" vs "45,4") and
//! sprinkle placeholders like "N/A" or "~" into numeric columns. Every cell
//! is coerced on its own; anything unparseable becomes missing.

use crate::table::Cell;

/// Coerce one cell to a float.
///
/// Numbers pass through untouched, so normalizing an already cleaned
/// column is a no-op. Text has every `,` replaced with `.` before parsing.
/// Non-finite results (`"NaN"`, `"inf"`) count as missing.
pub fn normalize_cell(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(v) => Some(*v),
        Cell::Text(s) => parse_decimal(s),
        Cell::Missing => None,
    }
}

pub fn normalize_column<'a, I>(cells: I) -> Vec<Option<f64>>
where
    I: IntoIterator<Item = &'a Cell>,
{
    cells.into_iter().map(normalize_cell).collect()
}

fn parse_decimal(raw: &str) -> Option<f64> {
    let s = raw.trim().replace(',', ".");
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mixed_column() {
        let cells = [
            Cell::text("45,4"),
            Cell::text("N/A"),
            Cell::text("12.0"),
            Cell::text(""),
        ];
        assert_eq!(
            normalize_column(&cells),
            vec![Some(45.4), None, Some(12.0), None]
        );
    }

    #[test]
    fn comma_decimal_matches_period_decimal() {
        for (a, b) in [("0", "5"), ("12", "25"), ("007", "125"), ("99999", "0001")] {
            let comma = normalize_cell(&Cell::text(format!("{a},{b}")));
            let period: f64 = format!("{a}.{b}").parse().unwrap();
            assert_eq!(comma, Some(period));
        }
    }

    #[test]
    fn tolerates_whitespace_and_sign() {
        assert_eq!(normalize_cell(&Cell::text("  -3,5 \t")), Some(-3.5));
        assert_eq!(normalize_cell(&Cell::text(" 7 ")), Some(7.0));
    }

    #[test]
    fn garbage_is_missing() {
        for s in ["", "   ", "N/A", "~", "abc", "1,2,3", "12.3.4", "--1", "NaN", "inf"] {
            assert_eq!(normalize_cell(&Cell::text(s)), None, "input {:?}", s);
        }
    }

    #[test]
    fn numbers_and_missing_pass_through() {
        assert_eq!(normalize_cell(&Cell::Number(3.25)), Some(3.25));
        assert_eq!(normalize_cell(&Cell::Missing), None);
    }

    #[test]
    fn second_pass_is_noop() {
        let cells = [Cell::text("45,4"), Cell::text("x"), Cell::Missing];
        let once: Vec<Cell> = normalize_column(&cells)
            .into_iter()
            .map(Cell::from_option)
            .collect();
        let twice: Vec<Cell> = normalize_column(&once)
            .into_iter()
            .map(Cell::from_option)
            .collect();
        assert_eq!(once, twice);
    }
}
