//! Reading and writing frames as CSV and Parquet files.

use crate::error::{Error, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Cell spellings read as null, besides the empty field.
const NULL_TOKENS: [&str; 4] = ["NA", "null", "NULL", "None"];

// ============================================================================
// CSV
// ============================================================================

/// Read a CSV file with a header row; column types are inferred from every row.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let null_values = NullValues::AllColumns(NULL_TOKENS.iter().map(|t| t.to_string()).collect());
    let frame = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_null_values(Some(null_values))
        .finish()?
        .collect()?;
    log::debug!("Read {} rows from {}", frame.height(), path.display());
    Ok(frame)
}

// Columns with no type yet (every value null) are written as strings.
fn writable(frame: &DataFrame) -> Result<DataFrame> {
    let columns = frame
        .get_columns()
        .iter()
        .map(|s| match s.dtype() {
            DataType::Null => s.cast(&DataType::String),
            _ => Ok(s.clone()),
        })
        .collect::<PolarsResult<Vec<Series>>>()?;
    Ok(DataFrame::new(columns)?)
}

pub fn write_csv(frame: &DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut writable(frame)?)?;
    Ok(())
}

// ============================================================================
// Parquet
// ============================================================================

pub fn write_parquet(frame: &DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    ParquetWriter::new(file).finish(&mut writable(frame)?)?;
    Ok(())
}

pub fn read_parquet(path: &Path) -> Result<DataFrame> {
    let frame = ParquetReader::new(File::open(path)?).finish()?;
    log::debug!("Read {} rows from {}", frame.height(), path.display());
    Ok(frame)
}

// ============================================================================
// By path
// ============================================================================

/// Read a `.parquet` or `.csv` file; a missing file is a [`Error::MissingArtifact`].
pub fn read_table(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(Error::MissingArtifact {
            path: path.to_path_buf(),
            reason: "file does not exist".to_string(),
        });
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("parquet") => read_parquet(path),
        Some("csv") => read_csv(path),
        _ => Err(Error::InvalidValue {
            column: path.display().to_string(),
            message: "expected a .parquet or .csv file".to_string(),
        }),
    }
}

/// Find `<dir>/<stem>.parquet`, else `<dir>/<stem>.csv`.
pub fn locate(dir: &Path, stem: &str) -> Result<PathBuf> {
    ["parquet", "csv"]
        .iter()
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .find(|p| p.exists())
        .ok_or_else(|| Error::MissingArtifact {
            path: dir.join(format!("{}.parquet", stem)),
            reason: "no .parquet or .csv file with this name".to_string(),
        })
}

/// Write `<dir>/<name>.parquet` and `<dir>/<name>.csv`, returning both paths.
pub fn write_outputs(frame: &DataFrame, dir: &Path, name: &str) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)?;
    let parquet_path = dir.join(format!("{}.parquet", name));
    let csv_path = dir.join(format!("{}.csv", name));
    write_parquet(frame, &parquet_path)?;
    write_csv(frame, &csv_path)?;
    log::info!(
        "Wrote {} rows x {} columns to {}",
        frame.height(),
        frame.width(),
        parquet_path.display()
    );
    Ok((parquet_path, csv_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::cell;

    const TYPED: [&str; 4] = ["id", "speed", "name", "on_3b"];

    fn sample() -> DataFrame {
        let mut frame = df!(
            "id" => [Some(1i64), Some(2), None],
            "speed" => [Some(27.5), Some(30.0), None],
            "name" => [Some("Ann"), None, Some("Cy, Jr.")],
            "on_3b" => [Some(true), Some(false), None]
        )
        .unwrap();
        frame
            .with_column(Series::full_null("empty", 3, &DataType::Null))
            .unwrap();
        frame
    }

    #[test]
    fn test_csv_type_inference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "a,b,c,d\n1,1.5,x,true\nNA,2,,false\n").unwrap();
        let frame = read_csv(&path).unwrap();
        assert_eq!(cell(&frame, "a", 0), AnyValue::Int64(1));
        assert_eq!(cell(&frame, "a", 1), AnyValue::Null);
        assert_eq!(cell(&frame, "b", 1), AnyValue::Float64(2.0));
        assert_eq!(cell(&frame, "c", 1), AnyValue::Null);
        assert_eq!(cell(&frame, "d", 0), AnyValue::Boolean(true));
    }

    #[test]
    fn test_csv_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        write_csv(&sample(), &path).unwrap();
        let back = read_csv(&path).unwrap();
        assert!(back
            .select(TYPED)
            .unwrap()
            .equals_missing(&sample().select(TYPED).unwrap()));
        assert_eq!(back.column("empty").unwrap().null_count(), 3);
    }

    #[test]
    fn test_parquet_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.parquet");
        write_parquet(&sample(), &path).unwrap();
        let back = read_parquet(&path).unwrap();
        assert!(back
            .select(TYPED)
            .unwrap()
            .equals_missing(&sample().select(TYPED).unwrap()));
        // the untyped column comes back as nullable strings
        let empty = back.column("empty").unwrap();
        assert_eq!(empty.dtype(), &DataType::String);
        assert_eq!(empty.null_count(), 3);
    }

    #[test]
    fn test_missing_file_is_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_table(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, Error::MissingArtifact { .. }));
        let err = locate(dir.path(), "nope").unwrap_err();
        assert!(matches!(err, Error::MissingArtifact { .. }));
    }

    #[test]
    fn test_write_outputs_names_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let (pq, csv) = write_outputs(&sample(), dir.path(), "plays_wide").unwrap();
        assert!(pq.ends_with("plays_wide.parquet") && pq.exists());
        assert!(csv.ends_with("plays_wide.csv") && csv.exists());
        assert_eq!(locate(dir.path(), "plays_wide").unwrap(), pq);
    }
}
