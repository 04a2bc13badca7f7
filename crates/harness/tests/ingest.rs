use std::fs;
use std::time::Duration;

use opsbook_harness::{record, sample_master, sheet, TestStore};

const HOUR: Duration = Duration::from_secs(3600);

// ============================================================================
// Master lifecycle
// ============================================================================

#[tokio::test]
async fn first_job_creates_default_master() -> Result<(), Box<dyn std::error::Error>> {
    let t = TestStore::new()?;
    assert!(!t.master_path().exists());

    let status = t.engine.status().await?;
    assert!(status.master.created);
    assert!(status.master.bytes > 0);
    assert!(!status.ingest.promoted);

    assert_eq!(
        t.engine.sheet_names().await?,
        vec!["profiles", "Engagements", "Sites_List", "Seti_Updated"]
    );
    assert!(!t.engine.status().await?.master.created);
    Ok(())
}

// ============================================================================
// Upload promotion
// ============================================================================

#[tokio::test]
async fn newer_upload_replaces_master_before_the_job_runs() -> Result<(), Box<dyn std::error::Error>> {
    let t = TestStore::new()?;
    t.engine
        .create_row("profiles", None, record(&[("Employee Name", "Before Upload")]))
        .await?;
    t.age(&t.master_path(), HOUR)?;
    t.upload("replacement.xlsx", &sample_master())?;

    let page = t.engine.list_rows("profiles", 1, None).await?;
    let names: Vec<_> = page
        .items
        .iter()
        .map(|r| r.get("Employee Name").unwrap_or_default())
        .collect();
    assert_eq!(names, vec!["Ada Lovelace", "Alan Turing", "Grace Hopper"]);

    let backups: Vec<_> = fs::read_dir(t.config().backups_path())?.collect::<Result<_, _>>()?;
    assert_eq!(backups.len(), 1);
    let backup_name = backups[0].file_name().to_string_lossy().into_owned();
    assert!(backup_name.starts_with("data-") && backup_name.ends_with(".xlsx"));

    // Already promoted; the next job leaves the master alone.
    let report = t.engine.ingest().await?;
    assert!(!report.promoted);
    Ok(())
}

#[tokio::test]
async fn stale_upload_is_ignored() -> Result<(), Box<dyn std::error::Error>> {
    let t = TestStore::new()?;
    t.engine.status().await?;
    let upload = t.upload("old.xlsx", &sample_master())?;
    t.age(&upload, HOUR)?;

    let report = t.engine.ingest().await?;
    assert!(!report.promoted);
    assert_eq!(t.engine.list_rows("profiles", 1, None).await?.total, 0);
    Ok(())
}

#[tokio::test]
async fn unreadable_upload_is_reported_and_master_kept() -> Result<(), Box<dyn std::error::Error>> {
    let t = TestStore::new()?;
    t.engine
        .create_row("Sites_List", None, record(&[("Location", "Plant A")]))
        .await?;
    t.age(&t.master_path(), HOUR)?;
    fs::write(t.config().uploads_path().join("broken.xlsx"), b"definitely not a zip")?;

    let status = t.engine.status().await?;
    assert!(!status.ingest.promoted);
    assert!(status.ingest.error.is_some());

    let sites = t.engine.list_rows("Sites_List", 1, None).await?;
    assert_eq!(sites.items[0].get("Location"), Some("Plant A"));
    Ok(())
}

#[tokio::test]
async fn upload_missing_a_sheet_surfaces_as_schema_error() -> Result<(), Box<dyn std::error::Error>> {
    let t = TestStore::new()?;
    t.engine.status().await?;
    t.age(&t.master_path(), HOUR)?;

    let mut partial = opsbook_core::Workbook::new();
    partial.push(sheet("profiles", &[&["id", "Employee Name"], &["", "Solo"]]));
    t.upload("partial.xlsx", &partial)?;

    let page = t.engine.list_rows("profiles", 1, None).await?;
    assert_eq!(page.items[0].get("id"), Some("EMP-00001"));
    assert_eq!(page.items[0].get("Designation"), Some(""));

    let err = t.engine.list_rows("Engagements", 1, None).await.unwrap_err();
    assert_eq!(err.kind(), opsbook_engine::ErrorKind::Schema);
    Ok(())
}
