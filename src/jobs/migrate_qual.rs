//! Qualification master cleanup: split trailing parenthetical notes out of
//! names, merge note fragments, and infer a classification. A cleaned name
//! that would collide with another entry in the same category keeps its
//! original spelling.

use crate::api::{DirectoryApi, MasterUpdate};
use crate::error::{MaintenanceError, Result};
use crate::normalize::{extract_parenthetical, infer_classification, sanitize_opt, uniquify};
use std::collections::HashMap;
use std::io::{self, Write};
use tracing::info;

pub async fn run(api: &dyn DirectoryApi) -> Result<()> {
    println!("Fetching current qualification master list...");
    let items = api.list_master("qual", false).await?;
    println!("Fetched {} qualification entries.", items.len());

    // Target name counts per category, to detect post-cleanup collisions.
    let mut name_counts: HashMap<(String, String), usize> = HashMap::new();
    for item in &items {
        let category = sanitize_opt(&item.category);
        let clean_name = extract_parenthetical(&sanitize_opt(&item.name)).base;
        *name_counts.entry((category, clean_name)).or_insert(0) += 1;
    }

    let mut updated = 0usize;
    let mut skipped = 0usize;
    let mut failures: Vec<(String, String)> = Vec::new();

    for item in &items {
        let original_name = sanitize_opt(&item.name);
        let original_category = sanitize_opt(&item.category);
        if original_name.is_empty() || original_category.is_empty() {
            skipped += 1;
            continue;
        }

        let split = extract_parenthetical(&original_name);
        let key = (original_category.clone(), split.base.clone());
        let has_collision =
            name_counts.get(&key).copied().unwrap_or(0) > 1 && split.base != original_name;
        let final_name = if has_collision {
            original_name.clone()
        } else {
            split.base.clone()
        };

        let note_candidates = uniquify(&[
            item.notes.as_deref().unwrap_or(""),
            item.issuer.as_deref().unwrap_or(""),
            &split.note,
        ]);
        let final_notes = note_candidates.join(" / ");
        let final_desc = if final_notes.is_empty() {
            sanitize_opt(&item.desc)
        } else {
            final_notes.clone()
        };
        let classification = infer_classification(
            item.classification.as_deref().unwrap_or(""),
            &original_category,
            "医師",
        );

        let status = match sanitize_opt(&item.status) {
            s if s.is_empty() => "candidate".to_string(),
            s => s,
        };

        let payload = MasterUpdate {
            master_type: "qual".to_string(),
            category: original_category.clone(),
            name: original_name.clone(),
            new_category: Some(original_category),
            new_name: Some(final_name),
            status: Some(status),
            canonical_name: Some(sanitize_opt(&item.canonical_name)),
            desc: Some(final_desc),
            notes: Some(final_notes),
            classification: Some(classification),
            reference_url: None,
        };

        match api.update_master_item(&payload).await {
            Ok(()) => {
                updated += 1;
                print!(".");
            }
            Err(err) => {
                failures.push((original_name, err.to_string()));
                print!("F");
            }
        }
        let _ = io::stdout().flush();
    }

    println!("\nMigration complete.");
    println!("Updated: {updated}");
    if skipped > 0 {
        println!("Skipped: {skipped}");
    }
    info!("qual migration: updated={updated} skipped={skipped} failed={}", failures.len());
    if !failures.is_empty() {
        println!("Failures:");
        for (name, error) in &failures {
            println!(" - {name}: {error}");
        }
        return Err(MaintenanceError::Failures(failures.len()));
    }
    Ok(())
}
