//! Re-submit department master entries with trimmed fields, forcing each row
//! through the update path so the Worker rewrites it under the current schema.

use crate::api::{DirectoryApi, MasterUpdate};
use crate::error::{MaintenanceError, Result};
use crate::normalize::sanitize_opt;
use std::io::{self, Write};
use tracing::info;

pub async fn run(api: &dyn DirectoryApi) -> Result<()> {
    println!("Fetching department master entries...");
    let items = api.list_master("department", false).await?;
    println!("Found {} entries.", items.len());

    let mut updated = 0usize;
    let mut failures: Vec<(String, String)> = Vec::new();

    for item in &items {
        let category = sanitize_opt(&item.category);
        let name = sanitize_opt(&item.name);
        if category.is_empty() || name.is_empty() {
            continue;
        }

        let status = match sanitize_opt(&item.status) {
            s if s.is_empty() => "approved".to_string(),
            s => s,
        };

        let payload = MasterUpdate {
            master_type: "department".to_string(),
            category: category.clone(),
            name: name.clone(),
            new_category: Some(category),
            new_name: Some(name.clone()),
            status: Some(status),
            canonical_name: Some(sanitize_opt(&item.canonical_name)),
            desc: Some(item.desc.clone().unwrap_or_default()),
            notes: Some(item.notes.clone().unwrap_or_default()),
            classification: None,
            reference_url: None,
        };

        match api.update_master_item(&payload).await {
            Ok(()) => {
                updated += 1;
                print!(".");
            }
            Err(err) => {
                failures.push((name, err.to_string()));
                print!("F");
            }
        }
        let _ = io::stdout().flush();
    }

    println!("\nMigration complete.");
    println!("Updated: {updated}");
    info!("department migration: updated={updated} failed={}", failures.len());
    if !failures.is_empty() {
        println!("Failures:");
        for (name, error) in &failures {
            println!(" - {name}: {error}");
        }
        return Err(MaintenanceError::Failures(failures.len()));
    }
    Ok(())
}
