//! Column reconciliation.
//!
//! Uploaded workbooks drift: columns get renamed, reordered, or dropped. Each
//! known sheet carries a static table of canonical columns and their accepted
//! aliases, and [`reconcile`] rewrites the header (and moves data) until the
//! sheet matches it. A reconciled sheet reconciles to itself.

use serde::{Deserialize, Serialize};

use crate::cell::CellValue;
use crate::error::CoreError;
use crate::model::{Sheet, Workbook};
use crate::normalize::norm_key;

pub const ID_COLUMN: &str = "id";
pub const EMPLOYEE_NAME: &str = "Employee Name";
pub const DESIGNATION: &str = "Designation";
pub const SITE_ENGAGED: &str = "Site Engaged";
pub const STARTING_DATE: &str = "Starting Date";
pub const END_DATE: &str = "End Date";
pub const DURATION_DAYS: &str = "Duration (Days)";
pub const STATUS: &str = "status";
pub const EMPLOYEE_ID: &str = "Employee ID";
pub const LOCATION: &str = "Location";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetKind {
    Profiles,
    Engagements,
    Sites,
    Schedule,
}

impl SheetKind {
    pub const ALL: [SheetKind; 4] = [
        SheetKind::Profiles,
        SheetKind::Engagements,
        SheetKind::Sites,
        SheetKind::Schedule,
    ];

    /// Prefix of generated ids, or `None` for the natural-key sites sheet.
    pub fn id_prefix(&self) -> Option<&'static str> {
        match self {
            Self::Profiles => Some("EMP"),
            Self::Engagements => Some("ENG"),
            Self::Sites => None,
            Self::Schedule => Some("SETI"),
        }
    }

    pub fn schema(&self) -> &'static [ColumnSpec] {
        match self {
            Self::Profiles => PROFILES,
            Self::Engagements => ENGAGEMENTS,
            Self::Sites => SITES,
            Self::Schedule => SCHEDULE,
        }
    }

    /// Header row of a freshly created sheet.
    pub fn default_header(&self) -> Vec<&'static str> {
        self.schema().iter().map(|c| c.name).collect()
    }
}

/// Sheet names as they appear in the workbook file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub profiles: String,
    pub engagements: String,
    pub sites: String,
    pub schedule: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            profiles: "profiles".into(),
            engagements: "Engagements".into(),
            sites: "Sites_List".into(),
            schedule: "Seti_Updated".into(),
        }
    }
}

impl SheetNames {
    pub fn name_of(&self, kind: SheetKind) -> &str {
        match kind {
            SheetKind::Profiles => &self.profiles,
            SheetKind::Engagements => &self.engagements,
            SheetKind::Sites => &self.sites,
            SheetKind::Schedule => &self.schedule,
        }
    }

    pub fn kind_of(&self, sheet: &str) -> Option<SheetKind> {
        SheetKind::ALL
            .into_iter()
            .find(|kind| self.name_of(*kind) == sheet)
    }

    /// Reject names a workbook file cannot hold, and collisions between kinds.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut seen: Vec<&str> = Vec::new();
        for kind in SheetKind::ALL {
            let name = self.name_of(kind);
            validate_sheet_name(name)?;
            if seen.iter().any(|s| s.eq_ignore_ascii_case(name)) {
                return Err(CoreError::DuplicateSheetName(name.to_string()));
            }
            seen.push(name);
        }
        Ok(())
    }
}

fn validate_sheet_name(name: &str) -> Result<(), CoreError> {
    let invalid = |reason| CoreError::InvalidSheetName {
        name: name.to_string(),
        reason,
    };
    if name.trim().is_empty() {
        return Err(invalid("empty"));
    }
    if name.chars().count() > 31 {
        return Err(invalid("longer than 31 characters"));
    }
    if name.contains(['[', ']', ':', '*', '?', '/', '\\']) {
        return Err(invalid("contains one of []:*?/\\"));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(invalid("starts or ends with an apostrophe"));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Column must sit at this 0-based index.
    Fixed(usize),
    /// Column may sit anywhere; appended on the right when missing.
    Append,
}

#[derive(Debug)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub placement: Placement,
}

impl ColumnSpec {
    fn matches(&self, key: &str) -> bool {
        !key.is_empty()
            && (norm_key(self.name) == key || self.aliases.iter().any(|a| norm_key(a) == key))
    }
}

const fn fixed(name: &'static str, pos: usize, aliases: &'static [&'static str]) -> ColumnSpec {
    ColumnSpec {
        name,
        aliases,
        placement: Placement::Fixed(pos),
    }
}

const fn append(name: &'static str, aliases: &'static [&'static str]) -> ColumnSpec {
    ColumnSpec {
        name,
        aliases,
        placement: Placement::Append,
    }
}

static PROFILES: &[ColumnSpec] = &[
    fixed(ID_COLUMN, 0, &["ID", "Id"]),
    fixed(EMPLOYEE_NAME, 1, &["EmployeeName", "Name"]),
    fixed(DESIGNATION, 2, &["Designations", "Position", "Role"]),
];

static ENGAGEMENTS: &[ColumnSpec] = &[
    append(EMPLOYEE_NAME, &["Emp Name", "EmployeeName", "Name"]),
    append(SITE_ENGAGED, &["Site", "SiteEngaged", "Location"]),
    append(STARTING_DATE, &["Start Date", "StartDate"]),
    append(END_DATE, &["Ending Date", "EndDate"]),
    append(DURATION_DAYS, &["Duration", "Days", "Duration Days"]),
    append(STATUS, &["Status", "Phase"]),
    append(ID_COLUMN, &["ID"]),
    append(EMPLOYEE_ID, &["Emp ID", "EmployeeID"]),
];

static SITES: &[ColumnSpec] = &[fixed(LOCATION, 0, &["Site", "Site Name"])];

static SCHEDULE: &[ColumnSpec] = &[append(ID_COLUMN, &["ID", "Id"])];

fn find_spec_column(sheet: &Sheet, spec: &ColumnSpec) -> Option<usize> {
    (0..sheet.column_count()).find(|&col| spec.matches(&norm_key(&sheet.header_text(col))))
}

fn ensure_column_at(sheet: &mut Sheet, spec: &ColumnSpec, pos: usize) -> bool {
    let Some(found) = find_spec_column(sheet, spec) else {
        sheet.insert_column(pos, vec![CellValue::text(spec.name)]);
        return true;
    };

    let mut changed = false;
    if norm_key(&sheet.header_text(found)) != norm_key(spec.name) {
        sheet.set_cell(0, found, CellValue::text(spec.name));
        changed = true;
    }
    if found != pos {
        let values = sheet.remove_column(found);
        sheet.insert_column(pos, values);
        changed = true;
    }
    changed
}

fn ensure_column_appended(sheet: &mut Sheet, spec: &ColumnSpec) -> bool {
    match find_spec_column(sheet, spec) {
        Some(col) => {
            if norm_key(&sheet.header_text(col)) == norm_key(spec.name) {
                return false;
            }
            sheet.set_cell(0, col, CellValue::text(spec.name));
            true
        }
        None => {
            let col = sheet.column_count();
            sheet.set_cell(0, col, CellValue::text(spec.name));
            true
        }
    }
}

/// Bring `sheet` in line with the column table of `kind`. Returns whether
/// anything changed.
pub fn reconcile(sheet: &mut Sheet, kind: SheetKind) -> bool {
    let mut changed = false;
    for spec in kind.schema() {
        changed |= match spec.placement {
            Placement::Fixed(pos) => ensure_column_at(sheet, spec, pos),
            Placement::Append => ensure_column_appended(sheet, spec),
        };
    }
    changed
}

/// Reconcile every known sheet present in the workbook; absent sheets are
/// left for the caller to report.
pub fn reconcile_workbook(workbook: &mut Workbook, names: &SheetNames) -> bool {
    let mut changed = false;
    for kind in SheetKind::ALL {
        if let Some(sheet) = workbook.sheet_mut(names.name_of(kind)) {
            changed |= reconcile(sheet, kind);
        }
    }
    changed
}

/// A new master: the four sheets with bare header rows.
pub fn default_workbook(names: &SheetNames) -> Workbook {
    let mut workbook = Workbook::new();
    for kind in SheetKind::ALL {
        workbook.push(Sheet::with_header(names.name_of(kind), &kind.default_header()));
    }
    workbook
}
