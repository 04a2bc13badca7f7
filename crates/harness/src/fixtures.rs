use opsbook_core::{CellValue, Record, Sheet, Workbook};

/// A sheet from string rows; the first row is the header and "" is an empty cell.
pub fn sheet(name: &str, rows: &[&[&str]]) -> Sheet {
    Sheet::from_rows(
        name,
        rows.iter()
            .map(|r| r.iter().map(|c| CellValue::text(*c)).collect())
            .collect(),
    )
}

pub fn record(pairs: &[(&str, &str)]) -> Record {
    pairs.iter().copied().collect()
}

/// A master the way people actually leave it: alias headers, columns out of
/// place, missing ids and employee ids.
pub fn sample_master() -> Workbook {
    let mut wb = Workbook::new();
    wb.push(sheet(
        "profiles",
        &[
            &["Name", "Role", "ID"],
            &["Ada Lovelace", "Lead", "EMP-00001"],
            &["Alan Turing", "Analyst", ""],
            &["Grace Hopper", "Engineer", "EMP-00007"],
        ],
    ));
    wb.push(sheet(
        "Engagements",
        &[
            &["Emp Name", "Site", "Start Date", "EndDate", "Phase", "Employee ID"],
            &["Ada Lovelace", "Plant A", "2024-01-01", "2024-01-10", "", "EMP-00001"],
            &["ada  lovelace", "plant_b", "45292", "", "", ""],
            &["Grace Hopper", "Dock", "Jan 2, 2024", "", "", ""],
            &["Nobody", "Quarry", "", "", "", ""],
        ],
    ));
    wb.push(sheet(
        "Sites_List",
        &[&["Site Name"], &["Plant A"], &["Plant B"], &["Dock"], &["Quarry"]],
    ));
    wb.push(sheet(
        "Seti_Updated",
        &[
            &["Task", "Owner", "Starting Date", "End Date", "Group"],
            &["Audit", "EMP-00001", "2024-01-01", "2024-01-03", "A"],
            &["Survey", "Ada Lovelace, Grace Hopper", "2024-01-02", "", ""],
            &["Paint", "Grace Hopper", "2024-01-04", "", "B"],
        ],
    ));
    wb
}
