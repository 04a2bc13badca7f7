use opsbook_core::codec::row_to_record;
use opsbook_engine::EngineError;
use opsbook_harness::{sample_master, TestStore};

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn pages_are_one_indexed_and_clamped() -> Result<(), Box<dyn std::error::Error>> {
    let t = TestStore::with_master(&sample_master())?;

    let first = t.engine.list_rows("Engagements", 1, Some(2)).await?;
    assert_eq!(first.total, 4);
    assert_eq!(first.page, 1);
    assert_eq!(first.page_size, 2);
    assert_eq!(first.items.len(), 2);

    let second = t.engine.list_rows("Engagements", 2, Some(2)).await?;
    assert_eq!(second.items.len(), 2);
    assert_ne!(first.items[0].get("id"), second.items[0].get("id"));

    let zero = t.engine.list_rows("Engagements", 0, None).await?;
    assert_eq!(zero.page, 1);
    assert_eq!(zero.page_size, 50);
    assert_eq!(zero.items.len(), 4);

    let past_end = t.engine.list_rows("Engagements", 9, Some(2)).await?;
    assert_eq!(past_end.total, 4);
    assert!(past_end.items.is_empty());

    let tiny = t.engine.list_rows("Engagements", 1, Some(0)).await?;
    assert_eq!(tiny.page_size, 1);
    let huge = t.engine.list_rows("Engagements", 1, Some(100_000)).await?;
    assert_eq!(huge.page_size, 500);

    Ok(())
}

#[tokio::test]
async fn missing_sheet_is_a_schema_error() -> Result<(), Box<dyn std::error::Error>> {
    let t = TestStore::new()?;
    let err = t.engine.list_rows("Payroll", 1, None).await.unwrap_err();
    assert!(matches!(err, EngineError::Schema(_)));
    Ok(())
}

// ============================================================================
// Reconciliation and backfill on read
// ============================================================================

#[tokio::test]
async fn listing_persists_reconciled_headers_and_ids() -> Result<(), Box<dyn std::error::Error>> {
    let t = TestStore::with_master(&sample_master())?;
    let page = t.engine.list_rows("profiles", 1, None).await?;

    let ids: Vec<_> = page.items.iter().map(|r| r.get_normalized("id").unwrap_or_default()).collect();
    assert_eq!(ids, vec!["EMP-00001", "EMP-00008", "EMP-00007"]);

    let master = t.read_master()?;
    let profiles = master.sheet("profiles").ok_or("profiles missing")?;
    assert_eq!(profiles.header_text(1), "Employee Name");
    assert_eq!(profiles.header_text(2), "Designation");
    assert_eq!(profiles.cell_text(2, 0), "EMP-00008");

    t.engine.list_rows("Engagements", 1, None).await?;
    let master = t.read_master()?;
    let engagements = master.sheet("Engagements").ok_or("engagements missing")?;
    let row = row_to_record(engagements, 2);
    assert_eq!(row.get("id"), Some("ENG-00002"));
    assert_eq!(row.get("Employee ID"), Some("EMP-00001"));
    let nobody = row_to_record(engagements, 4);
    assert_eq!(nobody.get("Employee ID"), Some(""));

    t.engine.list_rows("Seti_Updated", 1, None).await?;
    let master = t.read_master()?;
    let schedule = master.sheet("Seti_Updated").ok_or("schedule missing")?;
    assert_eq!(row_to_record(schedule, 3).get("id"), Some("SETI-00003"));

    // A second listing finds nothing left to fix.
    let before = std::fs::read(t.master_path())?;
    t.engine.list_rows("profiles", 1, None).await?;
    t.engine.list_rows("Engagements", 1, None).await?;
    assert_eq!(std::fs::read(t.master_path())?, before);

    Ok(())
}

#[tokio::test]
async fn listing_touches_only_the_listed_sheet() -> Result<(), Box<dyn std::error::Error>> {
    let t = TestStore::with_master(&sample_master())?;
    let page = t.engine.list_rows("Sites_List", 1, None).await?;
    assert_eq!(page.items[0].get("Location"), Some("Plant A"));

    let master = t.read_master()?;
    assert_eq!(master.sheet("Sites_List").ok_or("sites missing")?.header_text(0), "Location");

    let profiles = master.sheet("profiles").ok_or("profiles missing")?;
    assert_eq!(profiles.header_text(0), "Name");
    assert_eq!(profiles.cell_text(2, 2), "");
    let engagements = master.sheet("Engagements").ok_or("engagements missing")?;
    assert_eq!(engagements.header_text(0), "Emp Name");
    assert_eq!(row_to_record(engagements, 2).get("Employee ID"), Some(""));

    // Engagements resolve employee ids against the profiles as they stand.
    t.engine.list_rows("Engagements", 1, None).await?;
    let master = t.read_master()?;
    let profiles = master.sheet("profiles").ok_or("profiles missing")?;
    assert_eq!(profiles.header_text(0), "Name");
    let engagements = master.sheet("Engagements").ok_or("engagements missing")?;
    assert_eq!(row_to_record(engagements, 2).get("Employee ID"), Some("EMP-00001"));
    Ok(())
}

// ============================================================================
// Derived fields
// ============================================================================

#[tokio::test]
async fn engagements_carry_status_and_duration() -> Result<(), Box<dyn std::error::Error>> {
    let t = TestStore::with_master(&sample_master())?;
    let page = t.engine.list_rows("Engagements", 1, None).await?;
    let view: Vec<_> = page
        .items
        .iter()
        .map(|r| {
            (
                r.get("Starting Date").unwrap_or_default(),
                r.get("Duration (Days)").unwrap_or_default(),
                r.get("status").unwrap_or_default(),
            )
        })
        .collect();
    assert_eq!(
        view,
        vec![
            ("2024-01-01", "10", "Completed"),
            ("2024-01-01", "5", "Active"),
            ("2024-01-02", "4", "Active"),
            ("", "", ""),
        ]
    );

    // Derived values stay out of the file.
    let master = t.read_master()?;
    let engagements = master.sheet("Engagements").ok_or("engagements missing")?;
    assert_eq!(row_to_record(engagements, 1).get("status"), Some(""));
    Ok(())
}

#[tokio::test]
async fn schedule_status_needs_a_group() -> Result<(), Box<dyn std::error::Error>> {
    let t = TestStore::with_master(&sample_master())?;
    let page = t.engine.list_rows("Seti_Updated", 1, None).await?;
    let statuses: Vec<_> = page.items.iter().map(|r| r.get("status").unwrap_or_default()).collect();
    assert_eq!(statuses, vec!["Completed", "", "Active"]);
    assert_eq!(page.items[1].get("Duration (Days)"), Some("4"));
    Ok(())
}

#[tokio::test]
async fn page_serializes_as_plain_json() -> Result<(), Box<dyn std::error::Error>> {
    let t = TestStore::with_master(&sample_master())?;
    let page = t.engine.list_rows("Sites_List", 1, Some(2)).await?;
    let json = serde_json::to_value(&page)?;
    assert_eq!(json["total"], 4);
    assert_eq!(json["page_size"], 2);
    assert_eq!(json["items"][0]["Location"], "Plant A");
    Ok(())
}
