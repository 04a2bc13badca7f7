//! Workbook file format: calamine for reading, rust_xlsxwriter for writing.
//!
//! Only values survive a round trip. Styles, formulas (beyond their cached
//! results), merged ranges and charts in an uploaded file are dropped the
//! first time the store rewrites it.

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use chrono::{NaiveDate, NaiveDateTime};
use opsbook_core::cell::to_serial;
use opsbook_core::{CellValue, Sheet, Workbook};
use rust_xlsxwriter::Format;

use crate::error::StorageError;

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

pub fn read_workbook(path: &Path) -> Result<Workbook, StorageError> {
    let mut sheets = open_workbook_auto(path)?;
    read_sheets(&mut sheets)
}

pub fn read_workbook_bytes(bytes: &[u8]) -> Result<Workbook, StorageError> {
    let mut sheets = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    read_sheets(&mut sheets)
}

fn read_sheets<RS: Read + Seek>(sheets: &mut Sheets<RS>) -> Result<Workbook, StorageError> {
    let mut workbook = Workbook::new();
    for name in sheets.sheet_names().to_vec() {
        let range = sheets.worksheet_range(&name)?;
        workbook.push(Sheet::from_rows(name, range_to_rows(&range)));
    }
    Ok(workbook)
}

/// Place a calamine range on an absolute grid. Ranges start at the first used
/// cell, so a sheet whose data begins at C3 still lands at C3 here.
fn range_to_rows(range: &Range<Data>) -> Vec<Vec<CellValue>> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };
    let (start_row, start_col) = (start_row as usize, start_col as usize);
    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); start_row + range.height()];

    for (r, c, data) in range.used_cells() {
        let value = data_to_cell(data);
        if matches!(value, CellValue::Empty) {
            continue;
        }
        let cells = &mut rows[start_row + r];
        let col = start_col + c;
        if cells.len() <= col {
            cells.resize(col + 1, CellValue::Empty);
        }
        cells[col] = value;
    }

    while rows.len() > 1 && rows.last().is_some_and(|r| r.iter().all(CellValue::is_empty)) {
        rows.pop();
    }
    rows
}

fn data_to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text(s.as_str()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        // as_datetime applies the workbook's 1900/1904 date system.
        Data::DateTime(dt) if dt.is_datetime() => match dt.as_datetime() {
            Some(ts) => CellValue::Date(ts),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::text(s.as_str())),
        Data::DurationIso(s) => CellValue::text(s.as_str()),
        Data::Error(e) => CellValue::Error(e.to_string()),
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Serialize the whole workbook to xlsx bytes.
pub fn write_workbook(workbook: &Workbook) -> Result<Vec<u8>, StorageError> {
    let date_format = Format::new().set_num_format(DATE_FORMAT);
    let datetime_format = Format::new().set_num_format(DATETIME_FORMAT);
    let mut out = rust_xlsxwriter::Workbook::new();

    for sheet in workbook.sheets() {
        let ws = out.add_worksheet();
        ws.set_name(sheet.name())?;

        for (r, cells) in sheet.rows().iter().enumerate() {
            for (c, cell) in cells.iter().enumerate() {
                if matches!(cell, CellValue::Empty) {
                    continue;
                }
                let (Ok(row), Ok(col)) = (u32::try_from(r), u16::try_from(c)) else {
                    return Err(StorageError::TooLarge {
                        sheet: sheet.name().to_string(),
                        row: r,
                        col: c,
                    });
                };
                match cell {
                    CellValue::Empty => {}
                    CellValue::Text(s) | CellValue::Error(s) => {
                        ws.write_string(row, col, s)?;
                    }
                    CellValue::Number(n) => {
                        ws.write_number(row, col, *n)?;
                    }
                    CellValue::Bool(b) => {
                        ws.write_boolean(row, col, *b)?;
                    }
                    CellValue::Date(dt) => {
                        let serial = to_serial(dt);
                        let format = if serial.fract() == 0.0 {
                            &date_format
                        } else {
                            &datetime_format
                        };
                        ws.write_number_with_format(row, col, serial, format)?;
                    }
                }
            }
        }
    }

    Ok(out.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn values_survive_write_then_read() {
        let mut sheet = Sheet::with_header("Engagements", &["Employee Name", "Starting Date", "n", "ok"]);
        sheet.push_row(vec![
            CellValue::Text("Ada".into()),
            CellValue::Date(ymd(2024, 1, 1)),
            CellValue::Number(3.5),
            CellValue::Bool(true),
        ]);
        let mut wb = Workbook::new();
        wb.push(sheet);
        wb.push(Sheet::with_header("Sites_List", &["Location"]));

        let bytes = write_workbook(&wb).unwrap();
        let back = read_workbook_bytes(&bytes).unwrap();

        assert_eq!(back.sheet_names(), vec!["Engagements", "Sites_List"]);
        let eng = back.sheet("Engagements").unwrap();
        assert_eq!(eng.cell_text(1, 0), "Ada");
        assert_eq!(eng.cell(1, 1), &CellValue::Date(ymd(2024, 1, 1)));
        assert_eq!(eng.cell(1, 2), &CellValue::Number(3.5));
        assert_eq!(eng.cell(1, 3), &CellValue::Bool(true));
        let sites = back.sheet("Sites_List").unwrap();
        assert_eq!(sites.data_row_count(), 0);
        assert_eq!(sites.header_text(0), "Location");
    }

    #[test]
    fn empty_sheet_reads_back_with_header_row() {
        let mut wb = Workbook::new();
        wb.push(Sheet::new("Schedule"));
        let back = read_workbook_bytes(&write_workbook(&wb).unwrap()).unwrap();
        let sheet = back.sheet("Schedule").unwrap();
        assert_eq!(sheet.row_count(), 1);
        assert_eq!(sheet.column_count(), 0);
    }

    /// Rewrite a workbook written by us so it declares the 1904 date system.
    fn with_1904_dates(bytes: &[u8]) -> Vec<u8> {
        use std::io::Write;

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut out = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).unwrap();
            let name = entry.name().to_string();
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            if name == "xl/workbook.xml" {
                let xml = String::from_utf8(content).unwrap();
                assert!(xml.contains("<workbookPr "));
                content = xml
                    .replacen("<workbookPr ", "<workbookPr date1904=\"1\" ", 1)
                    .into_bytes();
            }
            out.start_file(name, zip::write::SimpleFileOptions::default())
                .unwrap();
            out.write_all(&content).unwrap();
        }
        out.finish().unwrap().into_inner()
    }

    #[test]
    fn dates_follow_the_1904_system_when_declared() {
        let mut sheet = Sheet::with_header("Engagements", &["Starting Date"]);
        sheet.push_row(vec![CellValue::Date(ymd(2024, 1, 1))]);
        let mut wb = Workbook::new();
        wb.push(sheet);
        let bytes = with_1904_dates(&write_workbook(&wb).unwrap());

        // The stored serial is unchanged; read under 1904 it lands 1462 days later.
        let back = read_workbook_bytes(&bytes).unwrap();
        let cell = back.sheet("Engagements").unwrap().cell(1, 0).clone();
        assert_eq!(cell, CellValue::Date(ymd(2024, 1, 1) + chrono::Duration::days(1462)));
        assert_eq!(cell, CellValue::Date(ymd(2028, 1, 2)));
    }

    #[test]
    fn offset_ranges_keep_absolute_positions() {
        let mut sheet = Sheet::new("s");
        sheet.set_cell(2, 3, CellValue::Text("late".into()));
        let mut wb = Workbook::new();
        wb.push(sheet);
        let back = read_workbook_bytes(&write_workbook(&wb).unwrap()).unwrap();
        assert_eq!(back.sheet("s").unwrap().cell_text(2, 3), "late");
    }
}
