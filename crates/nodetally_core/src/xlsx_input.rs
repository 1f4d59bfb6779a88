//! Source tables read from flat `.xlsx` files, first worksheet, first row as header.

use std::path::{Path, PathBuf};

use calamine::{Data, Reader, Xlsx, open_workbook};
use polars::prelude::{Column, DataFrame};

use crate::error::{Error, Result};

/// `<dir>/<table>.xlsx`.
pub fn derive_xlsx_input_path(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{table}.xlsx"))
}

/// Load `<dir>/<table>.xlsx`, the layout [`crate::emit::dump_table`] writes.
pub fn read_xlsx_table(dir: &Path, table: &str) -> Result<DataFrame> {
    let path = derive_xlsx_input_path(dir, table);
    let df = read_xlsx_frame(&path)?;
    tracing::info!(table, path = %path.display(), rows = df.height(), "spreadsheet loaded");
    Ok(df)
}

/// Read the first worksheet of `path` into a frame.
///
/// Columns whose non-empty cells are all integral numbers become `i64`, all numeric become
/// `f64`, all boolean become `bool`; anything else is text. Empty cells are null.
pub fn read_xlsx_frame(path: &Path) -> Result<DataFrame> {
    let map_read_err = |source: calamine::XlsxError| Error::XlsxRead {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(map_read_err)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(map_read_err)?,
        None => {
            return Err(Error::EmptyWorkbook {
                path: path.to_path_buf(),
            });
        }
    };

    let mut l_rows = range.rows();
    let Some(l_header) = l_rows.next() else {
        return Ok(DataFrame::empty());
    };
    let l_body: Vec<&[Data]> = l_rows.collect();

    let mut l_columns = Vec::with_capacity(l_header.len());
    for (n_idx_col, cell_header) in l_header.iter().enumerate() {
        let c_name = match cell_header {
            Data::Empty => format!("column_{n_idx_col}"),
            other => other.to_string(),
        };
        let l_cells: Vec<&Data> = l_body.iter().map(|row| &row[n_idx_col]).collect();
        l_columns.push(derive_typed_column(&c_name, &l_cells));
    }
    Ok(DataFrame::new(l_columns)?)
}

fn derive_typed_column(name: &str, cells: &[&Data]) -> Column {
    let l_present: Vec<&Data> = cells
        .iter()
        .copied()
        .filter(|cell| !matches!(cell, Data::Empty))
        .collect();

    if !l_present.is_empty() {
        if l_present.iter().all(|cell| match cell {
            Data::Int(_) => true,
            Data::Float(x) => x.fract() == 0.0 && x.abs() < 9.0e15,
            _ => false,
        }) {
            let l_values: Vec<Option<i64>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(n) => Some(*n),
                    Data::Float(x) => Some(*x as i64),
                    _ => None,
                })
                .collect();
            return Column::new(name.into(), l_values);
        }
        if l_present
            .iter()
            .all(|cell| matches!(cell, Data::Int(_) | Data::Float(_)))
        {
            let l_values: Vec<Option<f64>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(n) => Some(*n as f64),
                    Data::Float(x) => Some(*x),
                    _ => None,
                })
                .collect();
            return Column::new(name.into(), l_values);
        }
        if l_present.iter().all(|cell| matches!(cell, Data::Bool(_))) {
            let l_values: Vec<Option<bool>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            return Column::new(name.into(), l_values);
        }
    }

    let l_values: Vec<Option<String>> = cells
        .iter()
        .map(|cell| match cell {
            Data::Empty => None,
            other => Some(other.to_string()),
        })
        .collect();
    Column::new(name.into(), l_values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::dump_table;
    use polars::prelude::DataType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dumped_table_reads_back_typed() {
        let dir = tempfile::tempdir().unwrap();
        let df = DataFrame::new(vec![
            Column::new("facility_id".into(), vec![Some(1i64), Some(2)]),
            Column::new("customer_name".into(), vec![Some("Acme"), None]),
            Column::new("score".into(), vec![1.5f64, 2.0]),
        ])
        .unwrap();
        dump_table(&df, "customer_details", &derive_xlsx_input_path(dir.path(), "customer_details"))
            .unwrap();

        let df_loaded = read_xlsx_table(dir.path(), "customer_details").unwrap();
        assert_eq!(
            df_loaded.get_column_names_str(),
            vec!["facility_id", "customer_name", "score"]
        );
        assert_eq!(df_loaded.column("facility_id").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df_loaded.column("customer_name").unwrap().dtype(), &DataType::String);
        assert_eq!(df_loaded.column("score").unwrap().dtype(), &DataType::Float64);
        let l_names = df_loaded
            .column("customer_name")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .map(|value| value.map(ToString::to_string))
            .collect::<Vec<_>>();
        assert_eq!(l_names, vec![Some("Acme".to_string()), None]);
    }

    #[test]
    fn test_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        match read_xlsx_table(dir.path(), "absent") {
            Err(Error::XlsxRead { path, .. }) => assert!(path.ends_with("absent.xlsx")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
