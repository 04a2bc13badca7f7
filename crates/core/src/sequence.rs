//! Prefixed sequential identifiers (`EMP-00001`) and foreign-key backfill.
//!
//! The next id is always recomputed from a full scan of the id column, so two
//! writers racing on the same sheet would hand out the same id. Callers must
//! hold the store's write slot.

use std::collections::HashMap;

use regex::Regex;

use crate::cell::CellValue;
use crate::error::CoreError;
use crate::model::Sheet;
use crate::normalize::{fold_id, norm_key};
use crate::schema::{EMPLOYEE_ID, EMPLOYEE_NAME, ID_COLUMN};

const ID_WIDTH: usize = 5;

pub fn format_id(prefix: &str, seq: u64) -> String {
    format!("{prefix}-{seq:0width$}", width = ID_WIDTH)
}

fn id_pattern(prefix: &str) -> Result<Regex, CoreError> {
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(CoreError::InvalidIdPrefix(prefix.to_string()));
    }
    Regex::new(&format!(r"(?i)^{}-(\d+)$", regex::escape(prefix)))
        .map_err(|e| CoreError::InvalidIdPrefix(e.to_string()))
}

/// Largest numeric suffix among `PREFIX-n` values in column `id_col`.
pub fn max_sequence(sheet: &Sheet, id_col: usize, prefix: &str) -> Result<u64, CoreError> {
    let pattern = id_pattern(prefix)?;
    let mut max = 0;
    for row in 1..sheet.row_count() {
        let value = sheet.cell_text(row, id_col);
        if let Some(seq) = pattern
            .captures(&value)
            .and_then(|c| c[1].parse::<u64>().ok())
        {
            max = max.max(seq);
        }
    }
    Ok(max)
}

fn successor(prefix: &str, seq: u64) -> Result<u64, CoreError> {
    seq.checked_add(1)
        .ok_or_else(|| CoreError::SequenceExhausted(prefix.to_string()))
}

/// The id the next new row would get, or `None` if the sheet has no id column.
pub fn next_id(sheet: &Sheet, prefix: &str) -> Result<Option<String>, CoreError> {
    let Some(id_col) = sheet.find_column(ID_COLUMN) else {
        return Ok(None);
    };
    let max = max_sequence(sheet, id_col, prefix)?;
    Ok(Some(format_id(prefix, successor(prefix, max)?)))
}

/// Give every row with a blank id the next id in sequence, top to bottom.
pub fn backfill_ids(sheet: &mut Sheet, prefix: &str) -> Result<bool, CoreError> {
    let Some(id_col) = sheet.find_column(ID_COLUMN) else {
        return Ok(false);
    };
    let mut max = max_sequence(sheet, id_col, prefix)?;
    let mut changed = false;
    for row in 1..sheet.row_count() {
        if !sheet.cell_text(row, id_col).is_empty() {
            continue;
        }
        max = successor(prefix, max)?;
        sheet.set_cell(row, id_col, CellValue::Text(format_id(prefix, max)));
        changed = true;
    }
    Ok(changed)
}

/// Row index of the first data row whose id equals `id` (both trimmed).
pub fn find_row_by_id(sheet: &Sheet, id: &str) -> Option<usize> {
    let id_col = sheet.find_column(ID_COLUMN)?;
    let want = id.trim();
    (1..sheet.row_count()).find(|&row| sheet.cell_text(row, id_col) == want)
}

/// Like [`find_row_by_id`], ignoring case. Used to reject new ids that only
/// differ from an existing one in case.
pub fn find_row_by_folded_id(sheet: &Sheet, id: &str) -> Option<usize> {
    let id_col = sheet.find_column(ID_COLUMN)?;
    let want = fold_id(id);
    (1..sheet.row_count()).find(|&row| fold_id(&sheet.cell_text(row, id_col)) == want)
}

/// Row index of the first data row whose `column` normalizes to `value`.
pub fn find_row_by_key(sheet: &Sheet, column: &str, value: &str) -> Option<usize> {
    let col = sheet.find_column(column)?;
    let want = norm_key(value);
    (1..sheet.row_count()).find(|&row| norm_key(&sheet.cell_text(row, col)) == want)
}

/// Normalized employee name to id, first occurrence winning.
pub fn employee_ids_by_name(profiles: &Sheet) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let (Some(id_col), Some(name_col)) = (
        profiles.find_column(ID_COLUMN),
        profiles.find_column(EMPLOYEE_NAME),
    ) else {
        return map;
    };
    for row in 1..profiles.row_count() {
        let id = profiles.cell_text(row, id_col);
        let name = norm_key(&profiles.cell_text(row, name_col));
        if id.is_empty() || name.is_empty() {
            continue;
        }
        map.entry(name).or_insert(id);
    }
    map
}

/// Fill blank Employee ID cells of engagement rows from the employee name.
pub fn backfill_employee_ids(engagements: &mut Sheet, profiles: &Sheet) -> bool {
    let by_name = employee_ids_by_name(profiles);
    if by_name.is_empty() {
        return false;
    }
    let (Some(emp_id_col), Some(name_col)) = (
        engagements.find_column(EMPLOYEE_ID),
        engagements.find_column(EMPLOYEE_NAME),
    ) else {
        return false;
    };

    let mut changed = false;
    for row in 1..engagements.row_count() {
        if !engagements.cell_text(row, emp_id_col).is_empty() {
            continue;
        }
        let name = norm_key(&engagements.cell_text(row, name_col));
        if name.is_empty() {
            continue;
        }
        if let Some(id) = by_name.get(&name) {
            engagements.set_cell(row, emp_id_col, CellValue::Text(id.clone()));
            changed = true;
        }
    }
    changed
}
