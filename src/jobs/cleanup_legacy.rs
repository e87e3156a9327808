//! Drive the Worker-side legacy master cleanup. The heavy lifting happens in
//! the API; this job chooses types and batch size and reports the summary.

use crate::api::{CleanupRequest, DirectoryApi};
use crate::error::Result;
use tracing::info;

pub async fn run(
    api: &dyn DirectoryApi,
    api_base: &str,
    types: Vec<String>,
    dry_run: bool,
    batch_size: u32,
) -> Result<()> {
    println!("Using API base: {api_base}");
    println!("Dry run: {dry_run}");

    let request = CleanupRequest {
        types: Some(types),
        dry_run,
        batch_size,
        include_keys: None,
        max_keys_per_type: None,
    };
    let response = api.master_cleanup(&request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if let Some(summary) = &response.summary {
        info!(
            "legacy cleanup: {} type(s), {} error(s), dry_run={dry_run}",
            summary.types.len(),
            summary.errors.len()
        );
    }
    if dry_run {
        println!("\nNext step: rerun with --apply to apply changes.");
    }
    Ok(())
}
