//! Seed organization-specific master data (departments / committees / groups
//! / positions) from a template dataset file via /api/addMasterItem.

use crate::api::DirectoryApi;
use crate::error::{MaintenanceError, Result};
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;

const SECTIONS: &[(&str, &str, &str)] = &[
    ("departments", "department", "部署"),
    ("committees", "committee", "委員会"),
    ("groups", "group", "グループ"),
    ("positions", "position", "役職"),
];

fn section_rows(dataset: &Value, section: &str) -> Vec<Value> {
    dataset
        .get(section)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

pub async fn run(api: &dyn DirectoryApi, dataset_path: &Path, apply: bool) -> Result<()> {
    let raw = std::fs::read_to_string(dataset_path).map_err(|err| {
        MaintenanceError::Config(format!(
            "dataset not found: {}: {err}",
            dataset_path.display()
        ))
    })?;
    let dataset: Value = serde_json::from_str(&raw)?;

    let mut sent = 0usize;
    let mut failures = 0usize;

    for (section, master_type, label) in SECTIONS {
        let rows = section_rows(&dataset, section);
        if rows.is_empty() {
            continue;
        }
        println!("[seed] {label}: {} entries", rows.len());

        for row in rows {
            let mut payload = row.clone();
            let Some(object) = payload.as_object_mut() else {
                continue;
            };
            object.insert("type".to_string(), json!(master_type));

            let category = object
                .get("category")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            let name = object
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            if name.is_empty() {
                continue;
            }

            if !apply {
                println!("[dry-run] {master_type} {category} {name}");
                sent += 1;
                continue;
            }
            match api.add_master_item(&payload).await {
                Ok(()) => {
                    sent += 1;
                }
                Err(err) => {
                    failures += 1;
                    println!("[error] {master_type}/{category}/{name}: {err}");
                }
            }
        }
    }

    info!("org master seed: sent={sent} failed={failures} apply={apply}");
    if !apply {
        println!("Dry-run complete: {sent} entries would be sent. Rerun with --apply to write.");
    } else {
        println!("Seed complete: {sent} entries sent, {failures} failed.");
    }
    if failures > 0 {
        return Err(MaintenanceError::Failures(failures));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sections_default_to_empty() {
        let dataset = json!({ "departments": [{ "category": "診療", "name": "内科" }] });
        assert_eq!(section_rows(&dataset, "departments").len(), 1);
        assert!(section_rows(&dataset, "committees").is_empty());
    }
}
