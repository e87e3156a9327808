//! Compare an exported master dataset against the live counts in D1.

use crate::error::{MaintenanceError, Result};
use crate::reconcile::{diff_counts, format_diff};
use crate::wrangler;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

pub struct DatasetCounts {
    pub item_counts: BTreeMap<String, i64>,
    pub category_counts: BTreeMap<String, i64>,
    pub types: Vec<String>,
}

/// Count items and categories per type in an exported dataset, optionally
/// restricted to a type filter.
pub fn load_dataset(raw: &str, selected_types: Option<&[String]>) -> Result<DatasetCounts> {
    let parsed: Value = serde_json::from_str(raw)?;
    let master_items = ["masterItems", "masters", "items"]
        .iter()
        .find_map(|key| parsed.get(*key))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let categories = parsed
        .get("categories")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let mut discovered: Vec<String> = master_items
        .keys()
        .chain(categories.keys())
        .cloned()
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    if let Some(selected) = selected_types {
        discovered = selected.to_vec();
    }
    if discovered.is_empty() {
        return Err(MaintenanceError::UnexpectedResponse(
            "dataset contains no master types".into(),
        ));
    }

    let mut item_counts = BTreeMap::new();
    let mut category_counts = BTreeMap::new();
    for master_type in &discovered {
        if let Some(items) = master_items.get(master_type).and_then(Value::as_array) {
            item_counts.insert(master_type.clone(), items.len() as i64);
        }
        match categories.get(master_type) {
            Some(Value::Array(list)) => {
                category_counts.insert(master_type.clone(), list.len() as i64);
            }
            Some(Value::Object(object)) => {
                if let Some(items) = object.get("items").and_then(Value::as_array) {
                    category_counts.insert(master_type.clone(), items.len() as i64);
                }
            }
            _ => {}
        }
    }

    Ok(DatasetCounts {
        item_counts,
        category_counts,
        types: discovered,
    })
}

fn organization_condition(organization_id: Option<&str>) -> String {
    match organization_id {
        Some(id) => format!("= '{}'", wrangler::escape_literal(id)),
        None => "IS NULL".to_string(),
    }
}

pub async fn run(
    dataset_path: &Path,
    db_binding: &str,
    organization_id: Option<&str>,
    types: Option<Vec<String>>,
) -> Result<()> {
    let raw = std::fs::read_to_string(dataset_path).map_err(|err| {
        MaintenanceError::Config(format!("dataset not found: {}: {err}", dataset_path.display()))
    })?;
    let dataset = load_dataset(&raw, types.as_deref())?;
    println!("[verify] Dataset types: {}", dataset.types.join(", "));

    let org_condition = organization_condition(organization_id);
    let item_rows = wrangler::d1_query(
        db_binding,
        &format!(
            "SELECT type, COUNT(*) AS cnt FROM master_items WHERE organization_id {org_condition} GROUP BY type;"
        ),
        true,
    )
    .await?;
    let category_rows = wrangler::d1_query(
        db_binding,
        &format!(
            "SELECT type, COUNT(*) AS cnt FROM master_categories WHERE organization_id {org_condition} GROUP BY type;"
        ),
        true,
    )
    .await?;

    let item_map = wrangler::rows_to_counts(&item_rows, "type");
    let category_map = wrangler::rows_to_counts(&category_rows, "type");

    let item_diffs = diff_counts(&dataset.item_counts, &item_map);
    let category_diffs = diff_counts(&dataset.category_counts, &category_map);

    println!("\n=== Master Item Counts ===");
    if item_diffs.is_empty() {
        println!("All item counts match.");
    } else {
        for entry in &item_diffs {
            println!("{}", format_diff(entry));
        }
    }

    println!("\n=== Category Counts ===");
    if category_diffs.is_empty() {
        println!("All category counts match.");
    } else {
        for entry in &category_diffs {
            println!("{}", format_diff(entry));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_items_and_categories_per_type() {
        let raw = r#"{
            "masterItems": { "qual": [{}, {}], "service": [{}] },
            "categories": { "qual": [{}, {}, {}], "service": { "items": [{}] } }
        }"#;
        let dataset = load_dataset(raw, None).unwrap();
        assert_eq!(dataset.item_counts.get("qual"), Some(&2));
        assert_eq!(dataset.item_counts.get("service"), Some(&1));
        assert_eq!(dataset.category_counts.get("qual"), Some(&3));
        assert_eq!(dataset.category_counts.get("service"), Some(&1));
        assert_eq!(dataset.types, vec!["qual", "service"]);
    }

    #[test]
    fn type_filter_limits_counting() {
        let raw = r#"{ "masterItems": { "qual": [{}], "service": [{}] }, "categories": {} }"#;
        let selected = vec!["service".to_string()];
        let dataset = load_dataset(raw, Some(&selected)).unwrap();
        assert!(dataset.item_counts.get("qual").is_none());
        assert_eq!(dataset.item_counts.get("service"), Some(&1));
    }

    #[test]
    fn legacy_masters_spelling_is_accepted() {
        let raw = r#"{ "masters": { "test": [{}, {}, {}] } }"#;
        let dataset = load_dataset(raw, None).unwrap();
        assert_eq!(dataset.item_counts.get("test"), Some(&3));
    }

    #[test]
    fn empty_dataset_is_an_error() {
        assert!(load_dataset(r#"{}"#, None).is_err());
    }

    #[test]
    fn organization_filter_escapes_quotes() {
        assert_eq!(organization_condition(None), "IS NULL");
        assert_eq!(
            organization_condition(Some("organization:o'brien")),
            "= 'organization:o''brien'"
        );
    }
}
