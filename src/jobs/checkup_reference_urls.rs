//! Move reference URLs embedded in checkup desc/notes text into the
//! structured referenceUrl field, writing the cleaned text back. A record
//! with a stale referenceUrl but no source text gets the URL cleared.

use crate::api::{DirectoryApi, MasterUpdate};
use crate::error::Result;
use crate::normalize::{extract_reference, sanitize_opt, sanitize_url};
use std::time::Duration;
use tracing::info;

pub async fn run(api: &dyn DirectoryApi, dry_run: bool, delay: Duration) -> Result<()> {
    let items = api.list_master("checkup", false).await?;
    if items.is_empty() {
        println!("No checkup master records found.");
        return Ok(());
    }

    let mut updated = 0usize;
    for item in &items {
        let category = sanitize_opt(&item.category);
        let name = sanitize_opt(&item.name);
        if category.is_empty() || name.is_empty() {
            continue;
        }

        let reference_existing = item.any_reference_url();
        let desc = sanitize_opt(&item.desc);
        let notes = sanitize_opt(&item.notes);
        let source_text = if desc.is_empty() { notes.clone() } else { desc.clone() };

        if source_text.is_empty() {
            if reference_existing.is_empty() {
                continue;
            }
            let payload = MasterUpdate {
                master_type: "checkup".to_string(),
                category: category.clone(),
                name: name.clone(),
                reference_url: Some(String::new()),
                ..MasterUpdate::default()
            };
            if dry_run {
                println!("[dry-run] clear referenceUrl: {category} / {name}");
            } else {
                api.update_master_item(&payload).await?;
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            updated += 1;
            continue;
        }

        let extracted = extract_reference(&source_text);
        let sanitized_url = sanitize_url(&extracted.url);
        let cleaned_desc = extracted.cleaned;

        let should_update_url = sanitized_url != reference_existing;
        let should_update_text = cleaned_desc != desc || cleaned_desc != notes;
        if !should_update_url && !should_update_text {
            continue;
        }

        let payload = MasterUpdate {
            master_type: "checkup".to_string(),
            category: category.clone(),
            name: name.clone(),
            desc: Some(cleaned_desc.clone()),
            notes: Some(cleaned_desc.clone()),
            reference_url: Some(sanitized_url.clone()),
            ..MasterUpdate::default()
        };

        if dry_run {
            println!("[dry-run] update {category} / {name}");
            println!("  desc: \"{desc}\" -> \"{cleaned_desc}\"");
            println!("  referenceUrl: \"{reference_existing}\" -> \"{sanitized_url}\"");
        } else {
            api.update_master_item(&payload).await?;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        updated += 1;
    }

    info!("checkup referenceUrl migration: updated={updated} dry_run={dry_run}");
    if dry_run {
        println!("Dry-run complete. {updated} record(s) would be updated.");
    } else {
        println!("Migration complete. {updated} record(s) updated.");
    }
    Ok(())
}
