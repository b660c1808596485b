// ============================================================
// Layer 4 - CSV Loader
// ============================================================
// Reads delimited files into polars DataFrames and writes them
// back. The first line is always the header. Column types come
// from scanning every row; empty fields and the usual NA tokens
// ("NA", "NaN", "null", ...) become nulls.

use std::{fs::File, path::{Path, PathBuf}};

use polars::prelude::*;

use crate::domain::dataset::{stack, Partitions};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::traits::PartitionSource;

const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn read_options() -> CsvReadOptions {
    let na: Vec<PlSmallStr> = NA_TOKENS.iter().map(|t| (*t).into()).collect();
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(CsvParseOptions::default().with_null_values(Some(NullValues::AllColumns(na))))
}

/// Read one CSV file. A missing file is a MissingInput error.
pub fn read_dataset(path: &Path) -> PipelineResult<DataFrame> {
    if !path.exists() {
        return Err(PipelineError::MissingInput(format!("'{}' does not exist", path.display())));
    }

    let file = File::open(path)?;
    let df = read_options().into_reader_with_file_handle(file).finish()?;

    tracing::debug!("Read '{}': {} rows x {} columns", path.display(), df.height(), df.width());
    Ok(df)
}

pub fn write_dataset(path: &Path, df: &DataFrame) -> PipelineResult<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).finish(&mut df.clone())?;

    tracing::debug!("Wrote '{}': {} rows", path.display(), df.height());
    Ok(())
}

/// Loads the three raw partition files
pub struct CsvPartitionLoader {
    paths: Partitions<PathBuf>,
}

impl CsvPartitionLoader {
    pub fn new(paths: Partitions<PathBuf>) -> Self {
        Self { paths }
    }
}

impl PartitionSource for CsvPartitionLoader {
    fn load_partitions(&self) -> PipelineResult<Partitions<DataFrame>> {
        // Check every file up front so nothing is read when one is absent
        for (partition, path) in self.paths.iter() {
            if !path.exists() {
                return Err(PipelineError::MissingInput(format!(
                    "{partition} partition '{}' not found; split the dataset first",
                    path.display()
                )));
            }
        }
        let partitions = self.paths.try_map(|_, path| read_dataset(path))?.aligned()?;

        tracing::info!(
            "Loaded partitions: {} train, {} val, {} test rows",
            partitions.train.height(),
            partitions.validation.height(),
            partitions.test.height()
        );
        Ok(partitions)
    }
}

/// Raw partitions stacked in train → val → test order
pub fn stack_files(paths: &Partitions<PathBuf>) -> PipelineResult<DataFrame> {
    let frames = paths.try_map(|_, path| read_dataset(path))?;
    stack(&[&frames.train, &frames.validation, &frames.test])
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    /// Build a frame from string cells through the CSV reader, so
    /// dtypes are inferred exactly as for files. "" is a missing cell.
    pub(crate) fn dataset(columns: &[&str], rows: &[&[&str]]) -> DataFrame {
        let mut text = columns.join(",");
        for row in rows {
            let cells: Vec<&str> = row.iter().map(|c| if c.is_empty() { "NA" } else { c }).collect();
            text.push('\n');
            text.push_str(&cells.join(","));
        }
        text.push('\n');
        read_options().into_reader_with_file_handle(Cursor::new(text.into_bytes())).finish().unwrap()
    }

    pub(crate) fn floats(df: &DataFrame, column: &str) -> Vec<Option<f64>> {
        let cast = df.column(column).unwrap().cast(&DataType::Float64).unwrap();
        cast.f64().unwrap().into_iter().collect()
    }

    pub(crate) fn texts(df: &DataFrame, column: &str) -> Vec<Option<String>> {
        let cast = df.column(column).unwrap().cast(&DataType::String).unwrap();
        cast.str().unwrap().into_iter().map(|v| v.map(String::from)).collect()
    }

    fn paths(dir: &Path) -> Partitions<PathBuf> {
        Partitions::new(dir.join("train.csv"), dir.join("val.csv"), dir.join("test.csv"))
    }

    #[test]
    fn test_na_tokens_and_blank_fields_read_as_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.csv");
        std::fs::write(&path, "x,colour\n1.5,red\n,blue\nNA,\n2,None\n").unwrap();

        let df = read_dataset(&path).unwrap();
        assert_eq!(df.column("x").unwrap().dtype(), &DataType::Float64);
        assert_eq!(floats(&df, "x"), vec![Some(1.5), None, None, Some(2.0)]);
        assert_eq!(df.column("colour").unwrap().null_count(), 2);
    }

    #[test]
    fn test_write_then_read_keeps_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.csv");
        let df = dataset(&["x", "colour"], &[&["1.5", "red"], &["", "blue"]]);
        write_dataset(&path, &df).unwrap();
        let back = read_dataset(&path).unwrap();
        assert!(back.equals_missing(&df));
    }

    #[test]
    fn test_missing_partition_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let df = dataset(&["x"], &[&["1"]]);
        write_dataset(&dir.path().join("train.csv"), &df).unwrap();
        write_dataset(&dir.path().join("val.csv"), &df).unwrap();
        let err = CsvPartitionLoader::new(paths(dir.path())).load_partitions();
        assert!(matches!(err, Err(PipelineError::MissingInput(_))));
    }

    #[test]
    fn test_partitions_share_dtypes_after_loading() {
        let dir = tempfile::tempdir().unwrap();
        let p = paths(dir.path());
        write_dataset(&p.train, &dataset(&["x", "y"], &[&["1", "a"], &["2", "b"]])).unwrap();
        write_dataset(&p.validation, &dataset(&["x", "y"], &[&["0.5", "a"]])).unwrap();
        write_dataset(&p.test, &dataset(&["x", "y"], &[&["", "b"]])).unwrap();

        let parts = CsvPartitionLoader::new(p).load_partitions().unwrap();
        for (_, df) in parts.iter() {
            assert_eq!(df.column("x").unwrap().dtype(), &DataType::Float64);
        }
        assert_eq!(floats(&parts.train, "x"), vec![Some(1.0), Some(2.0)]);
    }
}
