//! Job bodies. Each runs inside one serialized slot: load the master, work on
//! it in memory, save at most once at the end.

use chrono::NaiveDate;
use opsbook_core::codec::{all_records, apply_patch, record_to_row, row_to_record};
use opsbook_core::derived::{engagement_fields, schedule_fields};
use opsbook_core::schema::{reconcile, reconcile_workbook, ID_COLUMN, LOCATION};
use opsbook_core::sequence::{
    backfill_employee_ids, backfill_ids, find_row_by_folded_id, find_row_by_id, find_row_by_key,
    next_id,
};
use opsbook_core::{Record, Sheet, SheetKind, SheetNames, Workbook};
use opsbook_storage::format::write_workbook;
use opsbook_storage::{IngestReport, WorkbookStorage};
use serde::Serialize;
use tracing::{debug, info};

use crate::bundle::{build_bundle, bundle_file_name, BundleExport};
use crate::error::EngineError;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub items: Vec<Record>,
}

/// Ingest, create-if-missing, load. Every job starts here.
pub(crate) fn open_master<S: WorkbookStorage>(store: &S) -> Result<(Workbook, IngestReport), EngineError> {
    let ingest = store.ingest_uploads()?;
    store.ensure_exists()?;
    let workbook = store.load()?;
    Ok((workbook, ingest))
}

/// Column reconciliation and id backfill for `sheet_name` only. On the
/// engagements sheet, blank employee ids are also resolved against a
/// reconciled copy of the profiles, which itself is left as stored.
/// Returns whether anything changed.
pub(crate) fn normalize(workbook: &mut Workbook, names: &SheetNames, sheet_name: &str) -> Result<bool, EngineError> {
    let kind = names.kind_of(sheet_name);
    let profiles = match kind {
        Some(SheetKind::Engagements) => workbook.sheet(&names.profiles).map(|sheet| {
            let mut profiles = sheet.clone();
            reconcile(&mut profiles, SheetKind::Profiles);
            profiles
        }),
        _ => None,
    };
    let Some(sheet) = workbook.sheet_mut(sheet_name) else {
        return Ok(false);
    };
    let Some(kind) = kind else {
        return Ok(false);
    };

    let mut changed = reconcile(sheet, kind);
    if let Some(prefix) = kind.id_prefix() {
        changed |= backfill_ids(sheet, prefix)?;
    }
    if let Some(profiles) = &profiles {
        changed |= backfill_employee_ids(sheet, profiles);
    }
    Ok(changed)
}

fn sheet_or_schema<'a>(workbook: &'a mut Workbook, name: &str) -> Result<&'a mut Sheet, EngineError> {
    workbook
        .sheet_mut(name)
        .ok_or_else(|| EngineError::Schema(format!("sheet {name:?} is missing")))
}

/// Read-time fields for the sheets that carry them.
fn present(kind: Option<SheetKind>, record: Record, today: NaiveDate) -> Record {
    match kind {
        Some(SheetKind::Engagements) => engagement_fields(&record, today),
        Some(SheetKind::Schedule) => schedule_fields(&record, today),
        _ => record,
    }
}

fn clamp_paging(page: usize, page_size: Option<usize>) -> (usize, usize) {
    let page = page.max(1);
    let size = page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    (page, size)
}

pub(crate) fn list_rows<S: WorkbookStorage>(
    store: &S,
    sheet: &str,
    page: usize,
    page_size: Option<usize>,
    today: NaiveDate,
) -> Result<Page, EngineError> {
    let names = store.names();
    let (mut workbook, _) = open_master(store)?;
    let changed = normalize(&mut workbook, names, sheet)?;
    let records = all_records(sheet_or_schema(&mut workbook, sheet)?);
    if changed {
        store.atomic_save(&workbook)?;
        info!(event = "backfill_saved", sheet);
    }

    let (page, page_size) = clamp_paging(page, page_size);
    let total = records.len();
    let kind = names.kind_of(sheet);
    let items = records
        .into_iter()
        .skip((page - 1).saturating_mul(page_size))
        .take(page_size)
        .map(|r| present(kind, r, today))
        .collect();
    Ok(Page {
        total,
        page,
        page_size,
        items,
    })
}

fn required_location(value: Option<&str>) -> Result<String, EngineError> {
    let location = value.unwrap_or_default().trim().to_string();
    if location.is_empty() {
        return Err(EngineError::Validation("Location is required".into()));
    }
    Ok(location)
}

pub(crate) fn create_row<S: WorkbookStorage>(
    store: &S,
    sheet_name: &str,
    id_prefix: Option<&str>,
    mut data: Record,
    today: NaiveDate,
) -> Result<Record, EngineError> {
    let names = store.names();
    let kind = names.kind_of(sheet_name);
    let (mut workbook, _) = open_master(store)?;
    normalize(&mut workbook, names, sheet_name)?;
    let sheet = sheet_or_schema(&mut workbook, sheet_name)?;

    if kind == Some(SheetKind::Sites) {
        let location = required_location(data.get_normalized(LOCATION))?;
        if find_row_by_key(sheet, LOCATION, &location).is_some() {
            return Err(EngineError::DuplicateKey(format!("site {location:?} already exists")));
        }
        data.remove_normalized(LOCATION);
        data.set(LOCATION, location);
    } else {
        if sheet.find_column(ID_COLUMN).is_none() {
            return Err(EngineError::Schema(format!("sheet {sheet_name:?} has no id column")));
        }
        let explicit = data
            .remove_normalized(ID_COLUMN)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        let id = match explicit {
            Some(id) => {
                if find_row_by_folded_id(sheet, &id).is_some() {
                    return Err(EngineError::DuplicateKey(format!("id {id:?} already exists")));
                }
                id
            }
            None => {
                let prefix = kind
                    .and_then(|k| k.id_prefix())
                    .or(id_prefix)
                    .ok_or_else(|| EngineError::Validation("an id prefix is required".into()))?;
                next_id(sheet, prefix)?.ok_or_else(|| {
                    EngineError::Schema(format!("sheet {sheet_name:?} has no id column"))
                })?
            }
        };
        data.set(ID_COLUMN, id);
    }

    let row = record_to_row(sheet, &data);
    let row = sheet.push_row(row);
    normalize(&mut workbook, names, sheet_name)?;
    let created = row_to_record(sheet_or_schema(&mut workbook, sheet_name)?, row);
    store.atomic_save(&workbook)?;
    info!(event = "row_created", sheet = sheet_name, row);
    Ok(present(kind, created, today))
}

/// Locate the row a caller's key refers to: Location for sites, id elsewhere.
fn locate(sheet: &Sheet, kind: Option<SheetKind>, key: &str) -> Result<usize, EngineError> {
    let found = if kind == Some(SheetKind::Sites) {
        find_row_by_key(sheet, LOCATION, key)
    } else {
        if sheet.find_column(ID_COLUMN).is_none() {
            return Err(EngineError::Schema(format!(
                "sheet {:?} has no id column",
                sheet.name()
            )));
        }
        find_row_by_id(sheet, key)
    };
    found.ok_or_else(|| EngineError::NotFound(format!("{:?} in {:?}", key.trim(), sheet.name())))
}

pub(crate) fn update_row<S: WorkbookStorage>(
    store: &S,
    sheet_name: &str,
    key: &str,
    mut patch: Record,
    today: NaiveDate,
) -> Result<Record, EngineError> {
    let names = store.names();
    let kind = names.kind_of(sheet_name);
    let (mut workbook, _) = open_master(store)?;
    normalize(&mut workbook, names, sheet_name)?;
    let sheet = sheet_or_schema(&mut workbook, sheet_name)?;
    let row = locate(sheet, kind, key)?;

    if kind == Some(SheetKind::Sites) {
        if let Some(value) = patch.remove_normalized(LOCATION) {
            let location = required_location(Some(&value))?;
            if find_row_by_key(sheet, LOCATION, &location).is_some_and(|other| other != row) {
                return Err(EngineError::DuplicateKey(format!("site {location:?} already exists")));
            }
            patch.set(LOCATION, location);
        }
    } else {
        patch.remove_normalized(ID_COLUMN);
    }

    apply_patch(sheet, row, &patch);
    normalize(&mut workbook, names, sheet_name)?;
    let updated = row_to_record(sheet_or_schema(&mut workbook, sheet_name)?, row);
    store.atomic_save(&workbook)?;
    info!(event = "row_updated", sheet = sheet_name, row);
    Ok(present(kind, updated, today))
}

pub(crate) fn delete_row<S: WorkbookStorage>(store: &S, sheet_name: &str, key: &str) -> Result<(), EngineError> {
    let names = store.names();
    let kind = names.kind_of(sheet_name);
    let (mut workbook, _) = open_master(store)?;
    normalize(&mut workbook, names, sheet_name)?;
    let sheet = sheet_or_schema(&mut workbook, sheet_name)?;
    let row = locate(sheet, kind, key)?;
    sheet.remove_row(row);
    store.atomic_save(&workbook)?;
    info!(event = "row_deleted", sheet = sheet_name, row);
    Ok(())
}

pub(crate) fn export_bundle<S: WorkbookStorage>(
    store: &S,
    employee_id: &str,
    today: NaiveDate,
) -> Result<BundleExport, EngineError> {
    let names = store.names();
    let (mut workbook, _) = open_master(store)?;
    // In memory only; an export never writes the master.
    reconcile_workbook(&mut workbook, names);
    let bundle = build_bundle(&workbook, names, employee_id, today)?;
    let bytes = write_workbook(&bundle)?;
    debug!(event = "bundle_built", employee = employee_id.trim(), bytes = bytes.len());
    Ok(BundleExport {
        file_name: bundle_file_name(employee_id),
        bytes,
    })
}

pub(crate) fn sheet_names<S: WorkbookStorage>(store: &S) -> Result<Vec<String>, EngineError> {
    let (workbook, _) = open_master(store)?;
    Ok(workbook.sheet_names())
}
