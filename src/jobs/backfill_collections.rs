//! Backfill facility_services / facility_tests / facility_qualifications by
//! hitting the public API: each clinicDetail read hydrates the KV metadata
//! into D1 and restores missing collections.

use crate::api::DirectoryApi;
use crate::batch::{run_batch, BatchOptions, RecordOutcome};
use crate::error::{MaintenanceError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const PAGE_SIZE: u32 = 200;
/// Floor per hydration call so a fast page of cache hits does not hammer the
/// Worker.
const MIN_RECORD_MILLIS: u64 = 50;

/// Page through /api/listClinics until a short page signals the end.
pub async fn list_all_clinics(api: &dyn DirectoryApi) -> Result<Vec<crate::api::Clinic>> {
    let mut offset = 0u32;
    let mut clinics = Vec::new();
    loop {
        let chunk = api.list_clinics(Some(PAGE_SIZE), Some(offset)).await?;
        let len = chunk.len() as u32;
        clinics.extend(chunk);
        if len < PAGE_SIZE {
            break;
        }
        offset += PAGE_SIZE;
    }
    Ok(clinics)
}

pub async fn run(api: Arc<dyn DirectoryApi>, api_base: &str, concurrency: usize) -> Result<()> {
    println!("Backfilling facility collections via {api_base}");
    let clinics = list_all_clinics(api.as_ref()).await?;
    println!("Found {} clinics", clinics.len());

    let ids: Vec<Option<String>> = clinics.iter().map(|clinic| clinic.id.clone()).collect();

    let options = BatchOptions {
        concurrency,
        max_attempts: 2,
        retry_delay: Duration::from_millis(500),
        pacing: Duration::from_millis(MIN_RECORD_MILLIS),
    };
    let report = run_batch("backfill-collections", ids, &options, move |id| {
        let api = Arc::clone(&api);
        async move {
            let Some(id) = id.filter(|id| !id.is_empty()) else {
                return Ok(RecordOutcome::Skipped("missing clinic id".into()));
            };
            api.clinic_detail(&id).await?;
            Ok(RecordOutcome::Completed)
        }
    })
    .await;

    info!(
        "backfill: completed={} skipped={} failed={}",
        report.completed, report.skipped, report.failed
    );
    println!(
        "Backfill completed. success={}, skipped={}, failed={}",
        report.completed, report.skipped, report.failed
    );
    if report.failed > 0 {
        for error in &report.errors {
            println!(" - {error}");
        }
        return Err(MaintenanceError::Failures(report.failed));
    }
    Ok(())
}
