//! Report legacy master entries still living in KV. Runs the cleanup
//! endpoint in dry-run mode with key sampling enabled and writes the summary
//! to a JSON report file.

use crate::api::{CleanupRequest, DirectoryApi};
use crate::error::{MaintenanceError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct OrphanReport<'a> {
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
    #[serde(rename = "apiBase")]
    pub api_base: &'a str,
    pub params: OrphanReportParams<'a>,
    pub summary: &'a crate::api::CleanupSummary,
}

#[derive(Debug, Serialize)]
pub struct OrphanReportParams<'a> {
    pub types: TypesParam<'a>,
    #[serde(rename = "dryRun")]
    pub dry_run: bool,
    #[serde(rename = "batchSize")]
    pub batch_size: u32,
    #[serde(rename = "includeKeys")]
    pub include_keys: bool,
    #[serde(rename = "maxKeysPerType")]
    pub max_keys_per_type: u32,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TypesParam<'a> {
    All(&'static str),
    Selected(&'a [String]),
}

pub async fn run(
    api: &dyn DirectoryApi,
    api_base: &str,
    types: Option<Vec<String>>,
    batch_size: u32,
    max_keys_per_type: u32,
    output: &Path,
) -> Result<()> {
    let request = CleanupRequest {
        types: types.clone(),
        dry_run: true,
        batch_size,
        include_keys: Some(true),
        max_keys_per_type: Some(max_keys_per_type),
    };
    println!("[report] calling {api_base} (batchSize={batch_size}, maxKeys={max_keys_per_type})");

    let response = api.master_cleanup(&request).await?;
    let summary = response
        .summary
        .as_ref()
        .ok_or_else(|| MaintenanceError::UnexpectedResponse("API response missing summary".into()))?;

    let report = OrphanReport {
        generated_at: Utc::now(),
        api_base,
        params: OrphanReportParams {
            types: match &types {
                Some(selected) => TypesParam::Selected(selected),
                None => TypesParam::All("ALL"),
            },
            dry_run: true,
            batch_size,
            include_keys: true,
            max_keys_per_type,
        },
        summary,
    };

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, serde_json::to_string_pretty(&report)?)?;
    println!("[report] wrote {}", output.display());

    for type_summary in &summary.types {
        println!(
            "  {}: legacy={}, pending={}",
            type_summary.master_type,
            type_summary.legacy_keys,
            type_summary.pending()
        );
    }
    if !summary.errors.is_empty() {
        warn!("orphan report encountered {} error(s)", summary.errors.len());
        println!("[report] encountered errors:\n{:?}", summary.errors);
    }
    Ok(())
}
