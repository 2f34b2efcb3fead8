use std::collections::BTreeSet;

use super::model::{parse_flag, CellValue, DatasetKind, Table, Workbook};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Sheet roles
// ---------------------------------------------------------------------------

/// How a workbook sheet is treated by [`filter_workbook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetRole {
    /// Copied unchanged.
    PassThrough,
    /// One row per contrast, keyed by `contrast_name`.
    ContrastKeyed,
    /// One row per entity × contrast.
    EntityContrastKeyed,
    /// One row per entity.
    EntityKeyed,
}

/// Wide sheets carrying one row per entity.
pub const ENTITY_SHEETS: [&str; 9] = [
    WIDE_SHEET,
    "normalized_abundances",
    "raw_abundances_matrix",
    "normalized_abundances_matrix",
    "missing_information",
    "stats_normalized",
    "stats_normalized_wide",
    "stats_raw",
    "stats_raw_wide",
];

pub const WIDE_SHEET: &str = "diff_exp_analysis_wide";
pub const LONG_SHEET: &str = "diff_exp_analysis";
pub const CONTRASTS_SHEET: &str = "contrasts";
pub const SUMMARY_SHEET: &str = "summary";

impl SheetRole {
    /// Role of a sheet by name. Unknown sheets pass through.
    pub fn of(name: &str) -> SheetRole {
        match name {
            "annotation" | "formula" | SUMMARY_SHEET => SheetRole::PassThrough,
            CONTRASTS_SHEET => SheetRole::ContrastKeyed,
            LONG_SHEET => SheetRole::EntityContrastKeyed,
            n if ENTITY_SHEETS.contains(&n) => SheetRole::EntityKeyed,
            _ => SheetRole::PassThrough,
        }
    }
}

// ---------------------------------------------------------------------------
// Multi-sheet filter
// ---------------------------------------------------------------------------

/// Apply a keep-set to every sheet according to its role, then replace the
/// summary sheet with one recomputed from the filtered wide sheet.
pub fn filter_workbook(
    workbook: &Workbook,
    kind: DatasetKind,
    keep: &BTreeSet<String>,
    keep_contrasts: &[String],
) -> Result<Workbook> {
    let key = kind.key_column();
    let in_contrasts =
        |v: &CellValue| v.as_key().is_some_and(|c| keep_contrasts.iter().any(|k| *k == c));

    let mut sheets = Vec::with_capacity(workbook.sheets.len());
    for sheet in &workbook.sheets {
        let filtered = match SheetRole::of(&sheet.name) {
            SheetRole::PassThrough => sheet.clone(),
            SheetRole::ContrastKeyed => {
                let cn = sheet.column("contrast_name")?;
                sheet.retain_rows(|r| in_contrasts(Table::cell(r, cn)))
            }
            SheetRole::EntityContrastKeyed => {
                let [k, c] = sheet.columns([key, "contrast"])?;
                sheet.retain_rows(|r| {
                    Table::cell(r, k).key_in(keep) && in_contrasts(Table::cell(r, c))
                })
            }
            SheetRole::EntityKeyed => {
                let k = sheet.column(key)?;
                sheet.retain_rows(|r| Table::cell(r, k).key_in(keep))
            }
        };
        sheets.push(filtered);
    }

    let mut out = Workbook { sheets };
    let summary = Summary::from_wide(out.require(WIDE_SHEET)?)?;
    out.upsert(summary.to_table());
    Ok(out)
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Counters of the `summary` sheet, derived from a wide sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub percent_contaminants: f64,
    pub percent_false_positives: f64,
    pub net: usize,
}

impl Summary {
    pub const HEADER: [&'static str; 4] = [
        "totalNrOfProteins",
        "percentOfContaminants",
        "percentOfFalsePositives",
        "NrOfProteinsNoDecoys",
    ];

    /// Count decoys (`REV`) and contaminants (`CON`). An absent flag column
    /// counts as no flagged rows.
    pub fn from_wide(wide: &Table) -> Result<Summary> {
        let total = wide.len();
        let rev = count_flagged(wide, "REV")?;
        let con = count_flagged(wide, "CON")?;
        Ok(Summary {
            total,
            percent_contaminants: percent(con, total),
            percent_false_positives: percent(rev, total),
            net: total.saturating_sub(rev + con),
        })
    }

    pub fn to_table(&self) -> Table {
        Table::new(
            SUMMARY_SHEET,
            Self::HEADER.iter().map(|h| h.to_string()).collect(),
            vec![vec![
                CellValue::Integer(self.total as i64),
                CellValue::Float(self.percent_contaminants),
                CellValue::Float(self.percent_false_positives),
                CellValue::Integer(self.net as i64),
            ]],
        )
    }
}

fn count_flagged(wide: &Table, column: &str) -> Result<usize> {
    let Ok(idx) = wide.column(column) else {
        return Ok(0);
    };
    let mut n = 0;
    for row in &wide.rows {
        if parse_flag(Table::cell(row, idx), &wide.name, column)? {
            n += 1;
        }
    }
    Ok(n)
}

/// Percentage rounded to two decimals, ties to even; zero for an empty table.
fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = 100.0 * count as f64 / total as f64;
    (pct * 100.0).round_ties_even() / 100.0
}
