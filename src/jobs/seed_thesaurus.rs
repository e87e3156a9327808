//! Seed the search thesaurus with a starter set of symptom and test synonyms.

use crate::api::{DirectoryApi, ThesaurusEntry};
use crate::error::Result;
use crate::normalize::normalize_term;
use tracing::warn;

fn seed_entries() -> Vec<ThesaurusEntry> {
    fn entry(term: &str, variants: &[&str], context: &str) -> ThesaurusEntry {
        ThesaurusEntry {
            term: term.to_string(),
            normalized: normalize_term(term),
            variants: variants.iter().map(|v| v.to_string()).collect(),
            context: vec![context.to_string()],
            locale: "ja-JP".to_string(),
            notes: None,
            source: None,
        }
    }

    vec![
        entry("腹痛", &["腹部痛", "お腹の痛み", "みぞおちの痛み"], "symptom"),
        entry("咳", &["せき", "咳嗽", "長引くせき"], "symptom"),
        entry("動悸", &["胸のドキドキ", "心臓がバクバクする"], "symptom"),
        entry("内視鏡検査", &["内視鏡", "胃カメラ"], "test"),
    ]
}

pub async fn run(api: &dyn DirectoryApi) -> Result<()> {
    println!("Seeding thesaurus entries...");
    let mut processed = 0usize;

    for entry in seed_entries() {
        if entry.normalized.is_empty() {
            println!("Skip invalid entry (no term)");
            continue;
        }
        let exists = match api.thesaurus_lookup(&entry.normalized).await {
            Ok(items) => !items.is_empty(),
            Err(err) => {
                warn!("failed to look up {}: {err}", entry.term);
                false
            }
        };
        if exists {
            println!("Updating: {}", entry.term);
        } else {
            println!("Adding: {}", entry.term);
        }
        match api.upsert_thesaurus(&entry).await {
            Ok(()) => processed += 1,
            Err(err) => {
                warn!("failed to upsert {}: {err}", entry.term);
            }
        }
    }

    println!("Done. Processed {processed} entries.");
    Ok(())
}
