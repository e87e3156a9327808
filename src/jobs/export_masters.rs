//! Export master items, categories, and explanations from the live API into
//! a single JSON snapshot, the input format verify-masters consumes.

use crate::api::{DirectoryApi, MasterItem};
use crate::constants::{category_supported, explanation_supported};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct MastersExport {
    #[serde(rename = "exportedAt")]
    pub exported_at: DateTime<Utc>,
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    pub types: Vec<String>,
    #[serde(rename = "masterItems")]
    pub master_items: BTreeMap<String, Vec<MasterItem>>,
    pub categories: BTreeMap<String, Vec<Value>>,
    pub explanations: BTreeMap<String, Vec<Value>>,
}

pub async fn run(
    api: &dyn DirectoryApi,
    api_base: &str,
    types: Vec<String>,
    output: &Path,
    pretty: bool,
    skip_explanations: bool,
) -> Result<()> {
    let mut export = MastersExport {
        exported_at: Utc::now(),
        base_url: api_base.to_string(),
        types: types.clone(),
        master_items: BTreeMap::new(),
        categories: BTreeMap::new(),
        explanations: BTreeMap::new(),
    };

    for master_type in &types {
        println!("[export] fetching master items for type={master_type}");
        let items = api.list_master(master_type, false).await?;
        export.master_items.insert(master_type.clone(), items);

        println!("[export] fetching categories for type={master_type}");
        let categories = if category_supported(master_type) {
            match api.list_categories(master_type).await {
                Ok(categories) => categories,
                Err(err) => {
                    warn!("failed to load categories for type={master_type}: {err}");
                    Vec::new()
                }
            }
        } else {
            println!("[export] skipping categories for type={master_type} (not supported)");
            Vec::new()
        };
        export.categories.insert(master_type.clone(), categories);

        if !skip_explanations {
            println!("[export] fetching explanations for type={master_type}");
            let explanations = if explanation_supported(master_type) {
                match api.list_explanations(master_type).await {
                    Ok(explanations) => explanations,
                    Err(err) => {
                        warn!("failed to load explanations for type={master_type}: {err}");
                        Vec::new()
                    }
                }
            } else {
                println!("[export] skipping explanations for type={master_type} (not supported)");
                Vec::new()
            };
            export.explanations.insert(master_type.clone(), explanations);
        }
    }

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = if pretty {
        serde_json::to_string_pretty(&export)?
    } else {
        serde_json::to_string(&export)?
    };
    std::fs::write(output, json)?;
    println!("[export] wrote {}", output.display());
    Ok(())
}
