use std::path::Path;

use log::info;

use crate::error::{Result, SubsetError};

/// Marker written over dropped contrast labels.
pub const NULL_MARKER: &str = "NA";

const CONTRAST_NAME: &str = "ContrastName";
const CONTRAST: &str = "Contrast";

/// The two annotation table layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationFormat {
    /// `ContrastName` + `Contrast` label columns.
    ExplicitContrast,
    /// Contrasts implied by `Group` / `Control` columns.
    GroupControl,
}

impl AnnotationFormat {
    /// Detect the layout from a header row.
    pub fn detect<'a, I>(header: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        if header.into_iter().any(|h| h == CONTRAST_NAME) {
            AnnotationFormat::ExplicitContrast
        } else {
            AnnotationFormat::GroupControl
        }
    }
}

/// Outcome of filtering one annotation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationReport {
    pub format: AnnotationFormat,
    pub rows: usize,
    pub nulled: usize,
}

// ---------------------------------------------------------------------------
// TSV filter
// ---------------------------------------------------------------------------

/// Filter a tab-delimited annotation table against the kept contrasts.
///
/// Explicit-contrast tables keep every row; labels of dropped contrasts are
/// overwritten with [`NULL_MARKER`] in both `ContrastName` and `Contrast`.
/// Group/Control tables are copied byte for byte.
pub fn filter_annotation(
    src: &Path,
    dest: &Path,
    keep_contrasts: &[String],
) -> Result<AnnotationReport> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(src)?;
    let headers = reader.headers()?.clone();
    let format = AnnotationFormat::detect(headers.iter());

    let report = match format {
        AnnotationFormat::GroupControl => {
            let rows = reader.records().try_fold(0usize, |n, r| r.map(|_| n + 1))?;
            drop(reader);
            std::fs::copy(src, dest)?;
            AnnotationReport {
                format,
                rows,
                nulled: 0,
            }
        }
        AnnotationFormat::ExplicitContrast => {
            let name_idx = header_index(&headers, CONTRAST_NAME, src)?;
            let contrast_idx = header_index(&headers, CONTRAST, src)?;
            let records: Vec<csv::StringRecord> =
                reader.records().collect::<std::result::Result<_, _>>()?;
            drop(reader);

            let mut writer = csv::WriterBuilder::new()
                .delimiter(b'\t')
                .terminator(csv::Terminator::CRLF)
                .from_path(dest)?;
            writer.write_record(&headers)?;
            let mut nulled = 0usize;
            for record in &records {
                let name = record.get(name_idx).unwrap_or("").trim();
                if is_dropped(name, keep_contrasts) {
                    nulled += 1;
                    let rewritten: csv::StringRecord = record
                        .iter()
                        .enumerate()
                        .map(|(i, v)| {
                            if i == name_idx || i == contrast_idx {
                                NULL_MARKER
                            } else {
                                v
                            }
                        })
                        .collect();
                    writer.write_record(&rewritten)?;
                } else {
                    writer.write_record(record)?;
                }
            }
            writer.flush()?;
            AnnotationReport {
                format,
                rows: records.len(),
                nulled,
            }
        }
    };

    let label = match report.format {
        AnnotationFormat::ExplicitContrast => "ContrastName/Contrast",
        AnnotationFormat::GroupControl => "Group/Control",
    };
    info!(
        "  {}: {} rows ({label} format, {} contrast labels nulled)",
        src.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
        report.rows,
        report.nulled
    );
    Ok(report)
}

fn is_dropped(name: &str, keep_contrasts: &[String]) -> bool {
    !name.is_empty() && name != NULL_MARKER && !keep_contrasts.iter().any(|c| c == name)
}

fn header_index(headers: &csv::StringRecord, column: &str, src: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| SubsetError::MissingColumn {
            table: src.display().to_string(),
            column: column.to_string(),
        })
}
