use std::collections::HashMap;

use crate::cell::CellValue;
use crate::model::Sheet;
use crate::normalize::norm_key;
use crate::record::Record;

/// Read row `row` (0 is the header) as a record keyed by header text.
///
/// When a header name repeats, the first non-empty value wins: the earliest
/// column supplies the value unless it is blank, in which case a later
/// duplicate fills it in.
pub fn row_to_record(sheet: &Sheet, row: usize) -> Record {
    let mut record = Record::new();
    for col in 0..sheet.column_count() {
        let key = sheet.header_text(col);
        if key.is_empty() {
            continue;
        }
        let value = sheet.cell_text(row, col);
        match record.get(&key) {
            Some(existing) if !existing.is_empty() => {}
            _ => record.set(key, value),
        }
    }
    record
}

/// Every data row, top to bottom.
pub fn all_records(sheet: &Sheet) -> Vec<Record> {
    (1..sheet.row_count())
        .map(|row| row_to_record(sheet, row))
        .collect()
}

fn incoming_by_key(record: &Record) -> HashMap<String, &str> {
    let mut incoming = HashMap::new();
    for (k, v) in record.iter() {
        incoming.insert(norm_key(k), v);
    }
    incoming
}

/// Project a record onto the sheet's current header order; keys the header
/// does not know are dropped and columns the record lacks stay empty.
pub fn record_to_row(sheet: &Sheet, record: &Record) -> Vec<CellValue> {
    let incoming = incoming_by_key(record);
    (0..sheet.column_count())
        .map(|col| {
            let key = norm_key(&sheet.header_text(col));
            match incoming.get(&key) {
                Some(v) if !key.is_empty() => CellValue::text(*v),
                _ => CellValue::Empty,
            }
        })
        .collect()
}

/// Partial update: only the first column of each patched name is written.
/// Returns whether any cell was touched.
pub fn apply_patch(sheet: &mut Sheet, row: usize, patch: &Record) -> bool {
    let incoming = incoming_by_key(patch);
    let mut touched = false;
    for (key, col) in sheet.header_index() {
        if let Some(v) = incoming.get(&key) {
            sheet.set_cell(row, col, CellValue::text(*v));
            touched = true;
        }
    }
    touched
}
