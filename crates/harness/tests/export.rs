use opsbook_core::codec::all_records;
use opsbook_core::{Sheet, Workbook};
use opsbook_engine::{EngineError, ErrorKind};
use opsbook_harness::{read_bundle, sample_master, TestStore};

fn column(sheet: &Sheet, name: &str) -> Vec<String> {
    all_records(sheet)
        .iter()
        .map(|r| r.get_normalized(name).unwrap_or_default().to_string())
        .collect()
}

fn output<'a>(bundle: &'a Workbook, name: &str) -> Result<&'a Sheet, String> {
    bundle.sheet(name).ok_or_else(|| format!("{name} missing from bundle"))
}

// ============================================================================
// Bundle contents
// ============================================================================

#[tokio::test]
async fn bundle_joins_profile_engagements_sites_and_schedule() -> Result<(), Box<dyn std::error::Error>> {
    let t = TestStore::with_master(&sample_master())?;
    let export = t.engine.export_employee_bundle("emp-00001 ").await?;
    assert_eq!(export.file_name, "emp-00001_bundle.xlsx");

    let bundle = read_bundle(&export.bytes)?;
    assert_eq!(
        bundle.sheet_names(),
        vec!["Employee_Profile", "Engagements", "Sites", "Schedule"]
    );

    let profile = output(&bundle, "Employee_Profile")?;
    assert_eq!(column(profile, "Employee Name"), vec!["Ada Lovelace"]);

    let engagements = output(&bundle, "Engagements")?;
    assert_eq!(column(engagements, "Site Engaged"), vec!["Plant A", "plant_b"]);
    assert_eq!(column(engagements, "status"), vec!["Completed", "Active"]);
    assert_eq!(column(engagements, "Duration (Days)"), vec!["10", "5"]);

    // Exactly the referenced sites, matched through normalization.
    let sites = output(&bundle, "Sites")?;
    assert_eq!(column(sites, "Location"), vec!["Plant A", "Plant B"]);

    let schedule = output(&bundle, "Schedule")?;
    assert_eq!(column(schedule, "Task"), vec!["Audit", "Survey"]);
    assert_eq!(column(schedule, "status"), vec!["Completed", ""]);
    Ok(())
}

#[tokio::test]
async fn export_never_writes_the_master() -> Result<(), Box<dyn std::error::Error>> {
    let t = TestStore::with_master(&sample_master())?;
    let before = std::fs::read(t.master_path())?;

    let export = t.engine.export_employee_bundle("EMP-00007").await?;
    let bundle = read_bundle(&export.bytes)?;
    assert_eq!(column(output(&bundle, "Sites")?, "Location"), vec!["Dock"]);
    assert_eq!(column(output(&bundle, "Schedule")?, "Task"), vec!["Survey", "Paint"]);

    assert_eq!(std::fs::read(t.master_path())?, before);
    Ok(())
}

#[tokio::test]
async fn unknown_employee_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let t = TestStore::with_master(&sample_master())?;
    let err = t.engine.export_employee_bundle("EMP-04040").await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn missing_schedule_sheet_exports_empty_schedule() -> Result<(), Box<dyn std::error::Error>> {
    let mut master = Workbook::new();
    for sheet in sample_master().sheets() {
        if sheet.name() != "Seti_Updated" {
            master.push(sheet.clone());
        }
    }
    let t = TestStore::with_master(&master)?;
    let export = t.engine.export_employee_bundle("EMP-00001").await?;
    let bundle = read_bundle(&export.bytes)?;
    let schedule = output(&bundle, "Schedule")?;
    assert_eq!(schedule.data_row_count(), 0);
    assert_eq!(schedule.column_count(), 0);
    Ok(())
}
