//! Subprocess driver for the `wrangler` CLI. D1 queries and KV writes go
//! through the operator's own wrangler binding rather than a public endpoint.

use crate::error::{MaintenanceError, Result};
use serde_json::Value;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Run `wrangler d1 execute --json` and extract the result rows.
pub async fn d1_query(binding: &str, sql: &str, remote: bool) -> Result<Vec<Value>> {
    let mut command = Command::new("wrangler");
    command.arg("d1").arg("execute");
    if remote {
        command.arg("--remote");
    }
    command
        .arg(binding)
        .arg("--command")
        .arg(sql)
        .arg("--json")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    debug!("wrangler d1 execute {binding}");

    let output = command.output().await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(MaintenanceError::Wrangler(if stderr.is_empty() {
            format!("wrangler exited with {}", output.status)
        } else {
            stderr
        }));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: Value = serde_json::from_str(stdout.trim())
        .map_err(|err| MaintenanceError::Wrangler(format!("failed to parse wrangler JSON output: {err}")))?;
    extract_rows(&parsed)
}

/// Run `wrangler d1 execute` for its side effect, streaming output through.
pub async fn d1_execute(binding: &str, sql: &str, remote: bool) -> Result<()> {
    let mut command = Command::new("wrangler");
    command.arg("d1").arg("execute");
    if remote {
        command.arg("--remote");
    }
    command.arg(binding).arg("--command").arg(sql);
    debug!("wrangler d1 execute {binding}");

    let status = command.status().await?;
    if !status.success() {
        return Err(MaintenanceError::Wrangler(format!(
            "wrangler exited with {status}"
        )));
    }
    Ok(())
}

/// Write one key through `wrangler kv key put` against the remote namespace.
pub async fn kv_put(binding: &str, key: &str, value: &str) -> Result<()> {
    let status = Command::new("npx")
        .args([
            "wrangler",
            "kv",
            "key",
            "put",
            &format!("--binding={binding}"),
            "--preview",
            "false",
            "--remote",
            key,
            value,
        ])
        .status()
        .await?;
    if !status.success() {
        return Err(MaintenanceError::Wrangler(format!(
            "wrangler kv key put exited with {status}"
        )));
    }
    Ok(())
}

/// wrangler has shipped several JSON envelopes over time; accept the known
/// ones and fail closed on anything else.
fn extract_rows(parsed: &Value) -> Result<Vec<Value>> {
    if let Some(batches) = parsed.as_array() {
        if let Some(results) = batches
            .first()
            .and_then(|batch| batch.get("results"))
            .and_then(Value::as_array)
        {
            return Ok(results.clone());
        }
        // A bare array of rows.
        if batches.iter().all(|row| row.is_object()) {
            return Ok(batches.clone());
        }
    }
    if let Some(rows) = parsed
        .get("result")
        .and_then(|result| result.get("rows"))
        .and_then(Value::as_array)
    {
        return Ok(rows.clone());
    }
    if let Some(results) = parsed.get("results").and_then(Value::as_array) {
        return Ok(results.clone());
    }
    Err(MaintenanceError::Wrangler(
        "unrecognized wrangler JSON output shape".to_string(),
    ))
}

/// SQL single-quote escaping for literals interpolated into wrangler commands.
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Turn `SELECT type, COUNT(*) AS cnt ... GROUP BY type` rows into a count map.
pub fn rows_to_counts(rows: &[Value], key_field: &str) -> std::collections::BTreeMap<String, i64> {
    let mut map = std::collections::BTreeMap::new();
    for row in rows {
        let Some(key) = row.get(key_field) else {
            continue;
        };
        let key = match key {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => continue,
        };
        let count = ["cnt", "count", "COUNT"]
            .iter()
            .find_map(|field| row.get(*field).and_then(Value::as_i64))
            .unwrap_or(0);
        map.insert(key, count);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_batch_results_shape() {
        let parsed = json!([{ "results": [{ "type": "qual", "cnt": 3 }] }]);
        let rows = extract_rows(&parsed).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["type"], "qual");
    }

    #[test]
    fn extracts_result_rows_shape() {
        let parsed = json!({ "result": { "rows": [{ "type": "test", "cnt": 5 }] } });
        let rows = extract_rows(&parsed).unwrap();
        assert_eq!(rows[0]["cnt"], 5);
    }

    #[test]
    fn unknown_shape_is_an_error() {
        let parsed = json!({ "unexpected": true });
        assert!(extract_rows(&parsed).is_err());
    }

    #[test]
    fn counts_read_any_count_field_spelling() {
        let rows = vec![
            json!({ "type": "qual", "cnt": 3 }),
            json!({ "type": "test", "COUNT": 7 }),
            json!({ "missing": true }),
        ];
        let counts = rows_to_counts(&rows, "type");
        assert_eq!(counts.get("qual"), Some(&3));
        assert_eq!(counts.get("test"), Some(&7));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn escapes_single_quotes() {
        assert_eq!(escape_literal("organization:o'brien"), "organization:o''brien");
    }
}
