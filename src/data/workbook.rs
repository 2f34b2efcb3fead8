use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use log::debug;
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Workbook as XlsxWorkbook};

use super::model::{CellValue, Table, Workbook};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read every sheet of an xlsx file as header + rows, in file order.
///
/// The file handle is dropped before this returns, so the same path may be
/// opened for writing afterwards.
pub fn read_workbook(path: &Path) -> Result<Workbook> {
    let mut wb = open_workbook_auto(path)?;
    let mut sheets = Vec::new();
    for name in wb.sheet_names() {
        let range = wb.worksheet_range(&name)?;
        let mut rows = range.rows();
        let header: Vec<String> = match rows.next() {
            Some(first) => first.iter().map(header_text).collect(),
            None => Vec::new(),
        };
        let data: Vec<Vec<CellValue>> = rows
            .map(|r| r.iter().map(cell_value).collect())
            .collect();
        debug!("Read sheet '{name}': {} columns, {} rows", header.len(), data.len());
        sheets.push(Table::new(name, header, data));
    }
    Ok(Workbook { sheets })
}

fn header_text(cell: &Data) -> String {
    match cell_value(cell) {
        CellValue::Null => String::new(),
        other => other.to_string(),
    }
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::String(s) => CellValue::String(s.clone()),
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Float(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::String(e.to_string()),
        Data::Empty => CellValue::Null,
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write all sheets to a fresh xlsx file at `path`.
///
/// The document creation time is pinned so that identical sheets always
/// produce identical bytes.
pub fn write_workbook(workbook: &Workbook, path: &Path) -> Result<()> {
    let mut xlsx = XlsxWorkbook::new();
    let properties =
        DocProperties::new().set_creation_datetime(&ExcelDateTime::from_ymd(2000, 1, 1)?);
    xlsx.set_properties(&properties);

    for table in &workbook.sheets {
        let sheet = xlsx.add_worksheet();
        sheet.set_name(&table.name)?;
        for (col, name) in table.header.iter().enumerate() {
            sheet.write_string(0, col as u16, name)?;
        }
        for (r, row) in table.rows.iter().enumerate() {
            let xr = (r + 1) as u32;
            for (c, value) in row.iter().enumerate() {
                let xc = c as u16;
                match value {
                    CellValue::String(s) => {
                        sheet.write_string(xr, xc, s)?;
                    }
                    CellValue::Integer(i) => {
                        sheet.write_number(xr, xc, *i as f64)?;
                    }
                    CellValue::Float(f) => {
                        sheet.write_number(xr, xc, *f)?;
                    }
                    CellValue::Bool(b) => {
                        sheet.write_boolean(xr, xc, *b)?;
                    }
                    CellValue::Null => {}
                }
            }
        }
    }

    xlsx.save(path)?;
    Ok(())
}
