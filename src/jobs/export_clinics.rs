//! Back up clinic records (schema v1) into a JSON Lines file, or pretty JSON
//! with --pretty, for migration snapshots.

use crate::api::DirectoryApi;
use crate::error::Result;
use chrono::Utc;
use std::io::Write;
use std::path::{Path, PathBuf};

fn timestamp_string() -> String {
    Utc::now().format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn default_output_path(output_dir: &Path, pretty: bool) -> PathBuf {
    let extension = if pretty { "json" } else { "jsonl" };
    output_dir.join(format!("clinics-v1-{}.{extension}", timestamp_string()))
}

pub async fn run(
    api: &dyn DirectoryApi,
    output: Option<PathBuf>,
    output_dir: &Path,
    pretty: bool,
) -> Result<()> {
    println!("[info] Fetching clinics…");
    let clinics = api.list_clinics(None, None).await?;
    println!("[info] Retrieved {} clinics.", clinics.len());

    let target_path = output.unwrap_or_else(|| default_output_path(output_dir, pretty));
    if let Some(parent) = target_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if pretty {
        let contents = serde_json::to_string_pretty(&clinics)?;
        std::fs::write(&target_path, format!("{contents}\n"))?;
        println!("[info] Wrote pretty JSON to {}", target_path.display());
        return Ok(());
    }

    // JSON Lines output for streaming-friendly processing.
    let file = std::fs::File::create(&target_path)?;
    let mut writer = std::io::BufWriter::new(file);
    for clinic in &clinics {
        serde_json::to_writer(&mut writer, clinic)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    println!("[info] Wrote JSON Lines to {}", target_path.display());
    Ok(())
}
