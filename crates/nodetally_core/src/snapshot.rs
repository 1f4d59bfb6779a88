//! Arrow IPC snapshots of fetched tables.

use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::{DataFrame, IpcReader, IpcWriter, SerReader, SerWriter};

use crate::error::{Error, Result};

/// `<dir>/<table>.arrow`.
pub fn derive_snapshot_path(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{table}.arrow"))
}

/// Write `df` to `<dir>/<table>.arrow`, creating `dir` if needed.
pub fn write_snapshot(df: &mut DataFrame, dir: &Path, table: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|source| Error::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = derive_snapshot_path(dir, table);
    let file = File::create(&path).map_err(|source| Error::Io {
        path: path.clone(),
        source,
    })?;
    IpcWriter::new(file).finish(df)?;
    tracing::info!(table, path = %path.display(), rows = df.height(), "snapshot written");
    Ok(path)
}

/// Load `<dir>/<table>.arrow`.
pub fn read_snapshot(dir: &Path, table: &str) -> Result<DataFrame> {
    let path = derive_snapshot_path(dir, table);
    let file = File::open(&path).map_err(|source| Error::Io {
        path: path.clone(),
        source,
    })?;
    let df = IpcReader::new(file).finish()?;
    tracing::info!(table, path = %path.display(), rows = df.height(), "snapshot loaded");
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::Column;

    #[test]
    fn test_snapshot_preserves_columns_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut df = DataFrame::new(vec![
            Column::new("FacilityId".into(), vec![Some(1i64), None]),
            Column::new("oemModel".into(), vec!["ST898ZB", "linuxevb"]),
        ])
        .unwrap();

        let path = write_snapshot(&mut df, &dir.path().join("snap"), "node_details").unwrap();
        assert!(path.ends_with("snap/node_details.arrow"));

        let df_loaded = read_snapshot(&dir.path().join("snap"), "node_details").unwrap();
        assert!(df_loaded.equals_missing(&df));
    }

    #[test]
    fn test_missing_snapshot_is_io_error_with_path() {
        let dir = tempfile::tempdir().unwrap();
        match read_snapshot(dir.path(), "absent") {
            Err(Error::Io { path, .. }) => assert!(path.ends_with("absent.arrow")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
