use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Result, SubsetError};

// ---------------------------------------------------------------------------
// CellValue – a single cell in any of the three table formats
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring what xlsx, parquet and tsv can hold.
/// Membership tests go through [`CellValue::as_key`], never the value itself.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Textual entity key used for keep-set membership in every format.
    ///
    /// Integral floats print as integers so that an id stored as a number in
    /// one format still matches the same id stored as an integer in another.
    pub fn as_key(&self) -> Option<String> {
        match self {
            CellValue::String(s) => Some(s.clone()),
            CellValue::Integer(i) => Some(i.to_string()),
            CellValue::Float(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => {
                Some((*v as i64).to_string())
            }
            CellValue::Float(v) => Some(v.to_string()),
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Null => None,
        }
    }

    /// Whether the cell's key is a member of `keep`. `Null` is never a member.
    pub fn key_in(&self, keep: &BTreeSet<String>) -> bool {
        match self {
            CellValue::String(s) => keep.contains(s),
            other => other.as_key().is_some_and(|k| keep.contains(&k)),
        }
    }
}

/// Normalise a decoy/contaminant flag cell.
///
/// Accepts booleans, `TRUE`/`True`/`true`/`FALSE`/`False`/`false`, and empty
/// cells (false). Any other encoding is a schema error.
pub fn parse_flag(value: &CellValue, table: &str, column: &str) -> Result<bool> {
    match value {
        CellValue::Bool(b) => Ok(*b),
        CellValue::Null => Ok(false),
        CellValue::String(s) => match s.trim() {
            "TRUE" | "True" | "true" => Ok(true),
            "FALSE" | "False" | "false" | "" => Ok(false),
            _ => Err(invalid_flag(value, table, column)),
        },
        _ => Err(invalid_flag(value, table, column)),
    }
}

fn invalid_flag(value: &CellValue, table: &str, column: &str) -> SubsetError {
    SubsetError::InvalidFlag {
        table: table.to_string(),
        column: column.to_string(),
        value: value.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Table – one sheet as header + ordered rows
// ---------------------------------------------------------------------------

/// A named sheet: header row plus ordered data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(name: impl Into<String>, header: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Table {
            name: name.into(),
            header,
            rows,
        }
    }

    /// Position of `column` in the header, or a `MissingColumn` error.
    pub fn column(&self, column: &str) -> Result<usize> {
        self.header
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| SubsetError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Resolve several columns at once; fails on the first missing one.
    pub fn columns<const N: usize>(&self, names: [&str; N]) -> Result<[usize; N]> {
        let mut out = [0usize; N];
        for (slot, name) in out.iter_mut().zip(names) {
            *slot = self.column(name)?;
        }
        Ok(out)
    }

    /// Cell at (`row`, `col`), treating short rows as padded with `Null`.
    pub fn cell<'a>(row: &'a [CellValue], col: usize) -> &'a CellValue {
        row.get(col).unwrap_or(&CellValue::Null)
    }

    /// Copy of this table keeping only the rows accepted by `keep`.
    pub fn retain_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[CellValue]) -> bool,
    {
        Table {
            name: self.name.clone(),
            header: self.header.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Workbook – ordered collection of sheets
// ---------------------------------------------------------------------------

/// All sheets of one spreadsheet file, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Table>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Table> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Like [`Workbook::sheet`] but a missing sheet is an error.
    pub fn require(&self, name: &str) -> Result<&Table> {
        self.sheet(name)
            .ok_or_else(|| SubsetError::MissingSheet(name.to_string()))
    }

    /// Replace the sheet called `table.name` in place, or append it.
    pub fn upsert(&mut self, table: Table) {
        match self.sheets.iter_mut().find(|s| s.name == table.name) {
            Some(slot) => *slot = table,
            None => self.sheets.push(table),
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset kind
// ---------------------------------------------------------------------------

/// The two paired datasets of one analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    Phospho,
    Protein,
}

impl DatasetKind {
    /// Entity key column shared by the workbook and the columnar table.
    pub fn key_column(self) -> &'static str {
        match self {
            DatasetKind::Phospho => "site",
            DatasetKind::Protein => PROTEIN_ID,
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Phospho => write!(f, "phospho"),
            DatasetKind::Protein => write!(f, "protein"),
        }
    }
}

/// Owning-protein column name in the wide sheets of both datasets.
pub const PROTEIN_ID: &str = "protein_Id";
