//! In-memory survey table loaded from a delimited file.

pub mod cell;
pub mod load;

pub use cell::Cell;
pub use load::{load_csv, normalize_header};

use crate::Result;
use anyhow::bail;

static MISSING: Cell = Cell::Missing;

/// One row of the source table, aligned with `Table::headers`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub cells: Vec<Cell>,
}

impl Record {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn get(&self, idx: usize) -> &Cell {
        self.cells.get(idx).unwrap_or(&MISSING)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    pub fn new(headers: Vec<String>, records: Vec<Record>) -> Self {
        Self { headers, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cells of a named column in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&Cell>> {
        let Some(idx) = self.column_index(name) else {
            bail!("unknown column {:?}", name);
        };
        Ok(self.records.iter().map(|r| r.get(idx)).collect())
    }

    /// Replace a column's cells, or append it as a new column.
    pub fn set_column(&mut self, name: &str, cells: Vec<Cell>) -> Result<()> {
        if cells.len() != self.records.len() {
            bail!(
                "column {:?} has {} cells but table has {} rows",
                name,
                cells.len(),
                self.records.len()
            );
        }

        match self.column_index(name) {
            Some(idx) => {
                for (record, cell) in self.records.iter_mut().zip(cells) {
                    if idx < record.cells.len() {
                        record.cells[idx] = cell;
                    } else {
                        record.cells.resize(idx, Cell::Missing);
                        record.cells.push(cell);
                    }
                }
            }
            None => {
                let idx = self.headers.len();
                self.headers.push(name.to_string());
                for (record, cell) in self.records.iter_mut().zip(cells) {
                    record.cells.resize(idx, Cell::Missing);
                    record.cells.push(cell);
                }
            }
        }
        Ok(())
    }

    /// Serialize back to delimited text. Numbers use their shortest form,
    /// missing cells are written empty.
    pub fn write_csv<W: std::io::Write>(&self, out: W, delimiter: u8) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(out);
        writer.write_record(&self.headers)?;
        for record in &self.records {
            writer.write_record(
                (0..self.headers.len()).map(|i| record.get(i).to_string()),
            )?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Table {
        Table::new(
            vec!["state".into(), "value".into()],
            vec![
                Record::new(vec![Cell::text("IL"), Cell::text("45,4")]),
                Record::new(vec![Cell::text("OH"), Cell::Missing]),
            ],
        )
    }

    #[test]
    fn set_column_appends_then_replaces() {
        let mut t = sample();
        t.set_column("latitude", vec![Cell::Number(41.8), Cell::Missing])
            .unwrap();
        assert_eq!(t.headers, vec!["state", "value", "latitude"]);
        assert_eq!(t.records[0].get(2), &Cell::Number(41.8));

        t.set_column("latitude", vec![Cell::Number(1.0), Cell::Number(2.0)])
            .unwrap();
        assert_eq!(t.headers.len(), 3);
        assert_eq!(t.records[1].get(2), &Cell::Number(2.0));
    }

    #[test]
    fn set_column_rejects_length_mismatch() {
        let mut t = sample();
        let err = t.set_column("x", vec![Cell::Missing]).unwrap_err();
        assert!(err.to_string().contains("has 1 cells but table has 2 rows"));
    }

    #[test]
    fn column_lookup() {
        let t = sample();
        let col = t.column("state").unwrap();
        assert_eq!(col, vec![&Cell::text("IL"), &Cell::text("OH")]);
        assert!(t.column("nope").is_err());
    }

    #[test]
    fn write_csv_renders_missing_as_empty() {
        let mut t = sample();
        t.set_column("value", vec![Cell::Number(45.4), Cell::Missing])
            .unwrap();
        let mut buf = Vec::new();
        t.write_csv(&mut buf, b',').unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "state,value\nIL,45.4\nOH,\n");
    }
}
