use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, AsArray, BooleanArray, Int32Array, Int64Array};
use arrow::compute::filter_record_batch;
use arrow::datatypes::DataType;
use log::info;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use crate::error::{Result, SubsetError};

/// Before/after row counts of one columnar filter pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCounts {
    pub before: usize,
    pub after: usize,
}

// ---------------------------------------------------------------------------
// Parquet filter
// ---------------------------------------------------------------------------

/// Copy `src` to `dest` keeping only rows whose `column` value is in `keep`.
///
/// Membership is exact equality on the textual key (see
/// [`CellValue::as_key`](super::model::CellValue::as_key)); nulls never match.
/// Column order, types and schema metadata are preserved.
///
/// The whole source is read before `dest` is created, so `src` and `dest`
/// may name the same file.
pub fn filter_parquet(
    src: &Path,
    dest: &Path,
    column: &str,
    keep: &BTreeSet<String>,
) -> Result<RowCounts> {
    let file = std::fs::File::open(src)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let key_idx = schema
        .index_of(column)
        .map_err(|_| SubsetError::MissingColumn {
            table: file_label(src),
            column: column.to_string(),
        })?;
    let reader = builder.build()?;

    let mut before = 0usize;
    let mut kept = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        before += batch.num_rows();
        let mask = membership_mask(batch.column(key_idx), column, keep)?;
        kept.push(filter_record_batch(&batch, &mask)?);
    }

    let out = std::fs::File::create(dest)?;
    let mut writer = ArrowWriter::try_new(out, schema, None)?;
    let mut after = 0usize;
    for batch in &kept {
        after += batch.num_rows();
        writer.write(batch)?;
    }
    writer.close()?;

    info!("  Parquet {}: {before} -> {after} rows", file_label(src));
    Ok(RowCounts { before, after })
}

/// Distinct non-null keys of `column`.
pub fn distinct_keys(path: &Path, column: &str) -> Result<BTreeSet<String>> {
    let file = std::fs::File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let key_idx = builder
        .schema()
        .index_of(column)
        .map_err(|_| SubsetError::MissingColumn {
            table: file_label(path),
            column: column.to_string(),
        })?;
    let mut keys = BTreeSet::new();
    for batch_result in builder.build()? {
        let batch = batch_result?;
        let col = batch.column(key_idx);
        for row in 0..batch.num_rows() {
            if let Some(k) = key_at(col, row, column)? {
                keys.insert(k);
            }
        }
    }
    Ok(keys)
}

// -- Arrow helpers --

fn membership_mask(
    col: &Arc<dyn Array>,
    column: &str,
    keep: &BTreeSet<String>,
) -> Result<BooleanArray> {
    let mut mask = Vec::with_capacity(col.len());
    for row in 0..col.len() {
        let hit = key_at(col, row, column)?.is_some_and(|k| keep.contains(&k));
        mask.push(hit);
    }
    Ok(BooleanArray::from(mask))
}

/// Extract the textual key from an Arrow column at a given row.
fn key_at(col: &Arc<dyn Array>, row: usize, column: &str) -> Result<Option<String>> {
    if col.is_null(row) {
        return Ok(None);
    }
    let key = match col.data_type() {
        DataType::Utf8 => col.as_string::<i32>().value(row).to_string(),
        DataType::LargeUtf8 => col.as_string::<i64>().value(row).to_string(),
        DataType::Int32 => match col.as_any().downcast_ref::<Int32Array>() {
            Some(arr) => arr.value(row).to_string(),
            None => return Err(unsupported(col, column)),
        },
        DataType::Int64 => match col.as_any().downcast_ref::<Int64Array>() {
            Some(arr) => arr.value(row).to_string(),
            None => return Err(unsupported(col, column)),
        },
        _ => return Err(unsupported(col, column)),
    };
    Ok(Some(key))
}

fn unsupported(col: &Arc<dyn Array>, column: &str) -> SubsetError {
    SubsetError::UnsupportedKeyType {
        column: column.to_string(),
        data_type: format!("{:?}", col.data_type()),
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
