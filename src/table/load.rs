use crate::error::LoadError;
use crate::table::{Cell, Record, Table};
use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

/// Load a delimited file with a header row into a `Table`.
///
/// The whole file loads or nothing does: any unreadable row (bad quoting,
/// wrong field count, invalid UTF-8) fails the load.
///
/// Header names are normalized with `normalize_header`, so
/// `" Salary Amount"` becomes `salary_amount`.
pub fn load_csv(path: &Path, delimiter: u8) -> Result<Table, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(normalize_header)
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::NoHeaders {
            path: path.to_path_buf(),
        });
    }

    let mut seen = BTreeSet::new();
    for h in &headers {
        if !seen.insert(h.as_str()) {
            return Err(LoadError::DuplicateColumn {
                path: path.to_path_buf(),
                column: h.clone(),
            });
        }
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(csv_err)?;
        let cells = row
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Cell::Missing
                } else {
                    Cell::text(field)
                }
            })
            .collect();
        records.push(Record::new(cells));
    }

    tracing::debug!(
        path = %path.display(),
        columns = headers.len(),
        rows = records.len(),
        "loaded table"
    );

    Ok(Table::new(headers, records))
}

/// Trim, lower-case, and replace spaces with underscores.
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_tmp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn normalizes_headers() {
        assert_eq!(normalize_header("  Salary Amount "), "salary_amount");
        assert_eq!(normalize_header("Gender"), "gender");
    }

    #[test]
    fn loads_rows_as_text_and_missing() {
        let f = write_tmp("State, Data Value ,Geolocation\nIL,\"45,4\",POINT (-87.6 41.8)\nOH,,\n");
        let t = load_csv(f.path(), b',').unwrap();
        assert_eq!(t.headers, vec!["state", "data_value", "geolocation"]);
        assert_eq!(t.len(), 2);
        assert_eq!(
            t.records[0].cells,
            vec![
                Cell::text("IL"),
                Cell::text("45,4"),
                Cell::text("POINT (-87.6 41.8)")
            ]
        );
        assert_eq!(t.records[1].cells, vec![Cell::text("OH"), Cell::Missing, Cell::Missing]);
    }

    #[test]
    fn honours_delimiter() {
        let f = write_tmp("a;b\n1;2\n");
        let t = load_csv(f.path(), b';').unwrap();
        assert_eq!(t.headers, vec!["a", "b"]);
        assert_eq!(t.records[0].cells, vec![Cell::text("1"), Cell::text("2")]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_csv(Path::new("/definitely/not/here.csv"), b',').unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn ragged_row_fails_whole_load() {
        let f = write_tmp("a,b\n1,2\n3\n");
        let err = load_csv(f.path(), b',').unwrap_err();
        assert!(matches!(err, LoadError::Csv { .. }));
    }

    #[test]
    fn duplicate_normalized_header_fails() {
        let f = write_tmp("Gender,gender \nM,F\n");
        let err = load_csv(f.path(), b',').unwrap_err();
        assert!(matches!(err, LoadError::DuplicateColumn { ref column, .. } if column == "gender"));
    }

    #[test]
    fn empty_file_has_no_headers() {
        let f = write_tmp("");
        let err = load_csv(f.path(), b',').unwrap_err();
        assert!(matches!(err, LoadError::NoHeaders { .. }));
    }
}
