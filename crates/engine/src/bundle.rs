//! One employee's slice of the master, joined across all four sheets.

use std::collections::HashSet;

use chrono::NaiveDate;
use opsbook_core::codec::all_records;
use opsbook_core::derived::{engagement_fields, schedule_fields};
use opsbook_core::normalize::{fold_id, norm_key};
use opsbook_core::schema::{EMPLOYEE_ID, EMPLOYEE_NAME, ID_COLUMN, LOCATION, SITE_ENGAGED};
use opsbook_core::sequence::backfill_employee_ids;
use opsbook_core::{CellValue, Record, Sheet, SheetNames, Workbook};
use serde::Serialize;

use crate::error::EngineError;

pub const PROFILE_SHEET: &str = "Employee_Profile";
pub const ENGAGEMENTS_SHEET: &str = "Engagements";
pub const SITES_SHEET: &str = "Sites";
pub const SCHEDULE_SHEET: &str = "Schedule";

const RESPONSIBILITY_HINTS: &[&str] = &["responsibility", "owner", "assigned"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleExport {
    pub file_name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// `EMP-00001` becomes `EMP-00001_bundle.xlsx`; anything outside
/// `[A-Za-z0-9_-]` is replaced with `_`.
pub fn bundle_file_name(employee_id: &str) -> String {
    let safe: String = employee_id
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{safe}_bundle.xlsx")
}

fn require<'a>(workbook: &'a Workbook, name: &str) -> Result<&'a Sheet, EngineError> {
    workbook
        .sheet(name)
        .ok_or_else(|| EngineError::Schema(format!("sheet {name:?} is missing")))
}

/// Build the export workbook. `master` is only read; foreign keys are
/// resolved on a private copy of the engagements sheet.
pub fn build_bundle(
    master: &Workbook,
    names: &SheetNames,
    employee_id: &str,
    today: NaiveDate,
) -> Result<Workbook, EngineError> {
    let wanted = fold_id(employee_id);
    let profiles = require(master, &names.profiles)?;
    let profile = all_records(profiles)
        .into_iter()
        .find(|r| r.get_normalized(ID_COLUMN).is_some_and(|id| fold_id(id) == wanted))
        .ok_or_else(|| EngineError::NotFound(format!("employee {}", employee_id.trim())))?;
    let employee_name = profile
        .get_normalized(EMPLOYEE_NAME)
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    let mut engagements_sheet = require(master, &names.engagements)?.clone();
    backfill_employee_ids(&mut engagements_sheet, profiles);
    let engagements: Vec<Record> = all_records(&engagements_sheet)
        .into_iter()
        .filter(|r| r.get_normalized(EMPLOYEE_ID).is_some_and(|id| fold_id(id) == wanted))
        .map(|r| engagement_fields(&r, today))
        .collect();

    let site_keys: HashSet<String> = engagements
        .iter()
        .filter_map(|r| r.get_normalized(SITE_ENGAGED))
        .map(norm_key)
        .filter(|k| !k.is_empty())
        .collect();
    let sites: Vec<Record> = all_records(require(master, &names.sites)?)
        .into_iter()
        .filter(|r| {
            r.get_normalized(LOCATION)
                .is_some_and(|loc| site_keys.contains(&norm_key(loc)))
        })
        .collect();

    let schedule = match master.sheet(&names.schedule) {
        Some(sheet) => schedule_rows(sheet, &wanted, &employee_name, today),
        None => Vec::new(),
    };

    let mut out = Workbook::new();
    out.push(records_sheet(PROFILE_SHEET, std::slice::from_ref(&profile)));
    out.push(records_sheet(ENGAGEMENTS_SHEET, &engagements));
    out.push(records_sheet(SITES_SHEET, &sites));
    out.push(records_sheet(SCHEDULE_SHEET, &schedule));
    Ok(out)
}

fn responsibility_column(sheet: &Sheet) -> Option<String> {
    (0..sheet.column_count())
        .map(|col| sheet.header_text(col))
        .find(|h| {
            let key = norm_key(h);
            RESPONSIBILITY_HINTS.iter().any(|hint| key.contains(hint))
        })
}

fn schedule_rows(sheet: &Sheet, wanted: &str, employee_name: &str, today: NaiveDate) -> Vec<Record> {
    let Some(column) = responsibility_column(sheet) else {
        return Vec::new();
    };
    all_records(sheet)
        .into_iter()
        .filter(|r| {
            let value = r.get(&column).unwrap_or_default();
            fold_id(value) == wanted
                || (!employee_name.is_empty() && value.to_lowercase().contains(employee_name))
        })
        .map(|r| schedule_fields(&r, today))
        .collect()
}

/// Header from the first record's keys, one row per record.
fn records_sheet(name: &str, records: &[Record]) -> Sheet {
    let Some(first) = records.first() else {
        return Sheet::new(name);
    };
    let header: Vec<&str> = first.keys().collect();
    let mut sheet = Sheet::with_header(name, &header);
    for record in records {
        sheet.push_row(
            header
                .iter()
                .map(|key| CellValue::text(record.get(key).unwrap_or_default()))
                .collect(),
        );
    }
    sheet
}
