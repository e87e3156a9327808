//! Refresh the published MHLW facility metadata after an out-of-band dataset
//! upload. Requires the system-root access token.

use crate::api::DirectoryApi;
use crate::error::{MaintenanceError, Result};

pub async fn run(
    api: &dyn DirectoryApi,
    token: Option<&str>,
    facility_count: u64,
    schedule_count: u64,
) -> Result<()> {
    if token.map(str::trim).unwrap_or("").is_empty() {
        return Err(MaintenanceError::Config(
            "System root access token is required. Provide via --token or SYSTEM_ROOT_TOKEN env."
                .into(),
        ));
    }

    api.refresh_mhlw_meta(facility_count, schedule_count).await?;
    println!(
        "[info] refreshed MHLW meta (facilities={facility_count}, schedules={schedule_count})."
    );
    Ok(())
}
