//! Derive society names for personal qualifications held on clinic records,
//! normalize the notes/issuer/societyName triple on each entry, and register
//! any society names not yet present in the society master.

use crate::api::DirectoryApi;
use crate::error::Result;
use crate::normalize::{extract_parenthetical, sanitize};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::warn;

fn text_field(entry: &Value, key: &str) -> String {
    sanitize(entry.get(key).and_then(Value::as_str).unwrap_or(""))
}

/// Society name for one qualification entry: explicit fields first, then
/// notes, issuer, and finally the parenthetical tail of the name.
fn derive_society_name(entry: &Value) -> String {
    if !entry.is_object() {
        return String::new();
    }
    let direct = text_field(entry, "societyName");
    if !direct.is_empty() {
        return direct;
    }
    let society = text_field(entry, "society");
    if !society.is_empty() {
        return society;
    }
    let notes = text_field(entry, "notes");
    if !notes.is_empty() {
        return notes;
    }
    let issuer = text_field(entry, "issuer");
    if !issuer.is_empty() {
        return issuer;
    }
    extract_parenthetical(&text_field(entry, "name")).note
}

async fn load_existing_societies(api: &dyn DirectoryApi) -> BTreeSet<String> {
    let mut existing = BTreeSet::new();
    match api.list_master("society", false).await {
        Ok(items) => {
            for item in items {
                let name = sanitize(item.name.as_deref().unwrap_or(""));
                if !name.is_empty() {
                    existing.insert(name);
                }
            }
        }
        Err(err) => warn!("failed to load society master: {err}"),
    }
    existing
}

async fn load_qualification_societies(api: &dyn DirectoryApi) -> BTreeSet<String> {
    let mut societies = BTreeSet::new();
    match api.list_master("qual", false).await {
        Ok(items) => {
            for item in items {
                let notes = sanitize(item.notes.as_deref().unwrap_or(""));
                let name = if notes.is_empty() {
                    sanitize(item.issuer.as_deref().unwrap_or(""))
                } else {
                    notes
                };
                if !name.is_empty() {
                    societies.insert(name);
                }
            }
        }
        Err(err) => warn!("failed to load qualification master: {err}"),
    }
    societies
}

/// Rewrite one qualification entry in place; returns true when it changed.
fn normalize_entry(entry: &mut Value, societies: &mut BTreeSet<String>) -> bool {
    if !entry.is_object() {
        return false;
    }
    let society_name = derive_society_name(entry);
    if !society_name.is_empty() {
        societies.insert(society_name.clone());
    }

    let mut changed = false;
    let object = match entry.as_object_mut() {
        Some(object) => object,
        None => return false,
    };
    if !society_name.is_empty() {
        for key in ["notes", "issuer", "societyName"] {
            let current = object.get(key).and_then(Value::as_str).unwrap_or("");
            if current != society_name {
                object.insert(key.to_string(), Value::String(society_name.clone()));
                changed = true;
            }
        }
        if !object.contains_key("societySource") {
            object.insert("societySource".to_string(), Value::String("legacy".to_string()));
            changed = true;
        }
    } else if object.remove("societyName").is_some() {
        changed = true;
    }
    changed
}

pub async fn run(api: &dyn DirectoryApi, dry_run: bool, delay: Duration) -> Result<()> {
    println!("[info] mode: {}", if dry_run { "dry-run" } else { "commit" });

    let existing = load_existing_societies(api).await;
    let mut collected = load_qualification_societies(api).await;

    let clinics = api.list_clinics(None, None).await?;
    let mut updated_count = 0usize;

    for clinic in &clinics {
        let Some(name) = clinic.name.clone().filter(|n| !n.is_empty()) else {
            continue;
        };
        let personal_list = clinic
            .personal_qualifications
            .clone()
            .or_else(|| clinic.qualifications.clone())
            .unwrap_or_default();
        if personal_list.is_empty() {
            continue;
        }

        let mut changed = false;
        let mut transformed = personal_list;
        for entry in &mut transformed {
            if normalize_entry(entry, &mut collected) {
                changed = true;
            }
        }
        if !changed {
            continue;
        }

        updated_count += 1;
        if dry_run {
            println!("[dry-run] would update clinic: {name}");
            continue;
        }

        let payload = json!({
            "id": clinic.id,
            "name": name,
            "personalQualifications": transformed,
            "qualifications": transformed,
        });
        api.update_clinic(&payload).await?;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        println!("[updated] clinic: {name}");
    }

    println!("[info] processed clinics: {}", clinics.len());
    println!("[info] clinics needing update: {updated_count}");
    println!("[info] societies observed in migrations: {}", collected.len());

    if !dry_run {
        // Reload to pick up notes the updates just wrote.
        println!("[info] refreshing qualification list after updates...");
        for name in load_qualification_societies(api).await {
            collected.insert(name);
        }
    }

    register_societies(api, &collected, &existing, dry_run, delay).await
}

async fn register_societies(
    api: &dyn DirectoryApi,
    values: &BTreeSet<String>,
    existing: &BTreeSet<String>,
    dry_run: bool,
    delay: Duration,
) -> Result<()> {
    let to_register: Vec<&String> = values.iter().filter(|name| !existing.contains(*name)).collect();

    if to_register.is_empty() {
        println!("[info] no new society names to register.");
        return Ok(());
    }

    println!(
        "[info] registering {} society master entries{}.",
        to_register.len(),
        if dry_run { " (dry-run)" } else { "" }
    );
    for name in to_register {
        if dry_run {
            println!("[dry-run] would register society master: {name}");
            continue;
        }
        let payload = json!({
            "type": "society",
            "category": "global",
            "name": name,
            "source": "migrateSocietyNotes",
            "status": "candidate",
        });
        match api.add_master_item(&payload).await {
            Ok(()) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                println!("[registered] society master: {name}");
            }
            Err(err) => {
                warn!("failed to register society master \"{name}\": {err}");
            }
        }
    }
    Ok(())
}
