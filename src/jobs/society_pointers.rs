//! Mirror society master records into the legacy KV namespace and write
//! legacyPointer keys for every known alias, so old lookups keep resolving
//! while the relational side is authoritative.

use crate::api::DirectoryApi;
use crate::error::Result;
use crate::wrangler;
use tracing::info;

pub async fn run(api: &dyn DirectoryApi, kv_binding: &str) -> Result<()> {
    let items = api.list_master("society", true).await?;
    println!("[society] fetched {} items from API", items.len());

    let mut written_records = 0usize;
    let mut written_pointers = 0usize;

    for item in &items {
        let Some(id) = item.id_string() else {
            continue;
        };
        let key = format!("master:society:{id}");

        let aliases: Vec<String> = item
            .legacy_aliases
            .clone()
            .unwrap_or_default()
            .into_iter()
            .map(|alias| alias.trim().to_string())
            .filter(|alias| !alias.is_empty())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        // Strip the export-only bookkeeping fields before writing back.
        let mut record = serde_json::to_value(item)?;
        if let Some(object) = record.as_object_mut() {
            object.remove("_key");
            object.remove("_source");
        }
        wrangler::kv_put(kv_binding, &key, &serde_json::to_string(&record)?).await?;
        written_records += 1;

        let updated_at = item
            .updated_at
            .unwrap_or_else(|| chrono::Utc::now().timestamp());
        let pointer = serde_json::json!({
            "legacy": true,
            "type": "society",
            "id": id,
            "name": item.name,
            "category": item.category,
            "updatedAt": updated_at,
        });
        let pointer_json = serde_json::to_string(&pointer)?;
        for alias in &aliases {
            let pointer_key = format!("legacyPointer:{alias}");
            wrangler::kv_put(kv_binding, &pointer_key, &pointer_json).await?;
            written_pointers += 1;
        }
    }

    info!("society pointers: records={written_records} pointers={written_pointers}");
    println!("[society] KV updated: {written_records} records, {written_pointers} pointers");
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::api::MasterItem;
    use serde_json::json;

    #[test]
    fn export_bookkeeping_fields_are_stripped() {
        let item: MasterItem = serde_json::from_value(json!({
            "id": "society-1",
            "name": "日本内科学会",
            "category": "global",
            "_key": "master:society:society-1",
            "_source": "kv",
        }))
        .unwrap();
        let mut record = serde_json::to_value(&item).unwrap();
        let object = record.as_object_mut().unwrap();
        assert!(object.remove("_key").is_some());
        assert!(object.remove("_source").is_some());
        assert_eq!(object["name"], "日本内科学会");
    }

    #[test]
    fn numeric_ids_render_as_key_segments() {
        let item: MasterItem = serde_json::from_value(json!({ "id": 42 })).unwrap();
        assert_eq!(item.id_string().as_deref(), Some("42"));
    }
}
