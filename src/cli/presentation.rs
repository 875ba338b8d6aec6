//! CLI presentation: text and json formatters per command.

use crate::cli::parse::OutputFormat;
use crate::deploy::{DeployMode, DeploymentResult};
use crate::diff::ChangeSet;
use crate::manifest::Snapshot;
use crate::tree::FileEntry;
use comfy_table::{presets::UTF8_FULL, Table};
use serde_json::json;

const HASH_PREFIX_LEN: usize = 12;

fn to_json(value: &serde_json::Value) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

fn mode_label(mode: DeployMode) -> &'static str {
    match mode {
        DeployMode::Incremental => "incremental",
        DeployMode::FullFallback => "full upload (snapshot unavailable)",
        DeployMode::Forced => "full upload (forced)",
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

fn short(hash: &str) -> &str {
    hash.get(..HASH_PREFIX_LEN).unwrap_or(hash)
}

pub fn format_deploy_result(
    result: &DeploymentResult,
    format: OutputFormat,
    dry_run: bool,
) -> Result<String, serde_json::Error> {
    if format == OutputFormat::Json {
        let mut value = serde_json::to_value(result)?;
        if let Some(object) = value.as_object_mut() {
            object.insert("dryRun".to_string(), json!(dry_run));
        }
        return to_json(&value);
    }

    let mut s = if dry_run {
        "Dry run complete (nothing was uploaded):".to_string()
    } else {
        "Deployment complete:".to_string()
    };
    s.push_str(&format!("\n  Manifest: {}", result.manifest_id));
    s.push_str(&format!("\n  URL:      {}", result.entry_url));
    s.push_str(&format!("\n  Mode:     {}", mode_label(result.mode)));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Uploaded", "Unchanged", "Deleted", "Total", "Bytes"]);
    table.add_row(vec![
        result.files_uploaded.to_string(),
        result.files_unchanged.to_string(),
        result.files_deleted.to_string(),
        result.total_files.to_string(),
        human_size(result.bytes_uploaded),
    ]);
    s.push('\n');
    s.push_str(&table.to_string());

    if !result.deleted_paths.is_empty() {
        s.push_str(&format!("\n\nNo longer referenced ({}):", result.deleted_paths.len()));
        for path in &result.deleted_paths {
            s.push_str(&format!("\n  - {}", path));
        }
    }
    if !result.warnings.is_empty() {
        s.push_str(&format!("\n\nWarnings ({}):", result.warnings.len()));
        for w in &result.warnings {
            s.push_str(&format!("\n  - {}", w));
        }
    }
    Ok(s)
}

pub fn format_change_set(changes: &ChangeSet, format: OutputFormat) -> Result<String, serde_json::Error> {
    if format == OutputFormat::Json {
        let changed: Vec<serde_json::Value> = changes
            .changed
            .iter()
            .map(|r| {
                json!({
                    "path": r.logical_path(),
                    "isNew": r.is_new,
                    "contentHash": r.content_hash,
                    "sizeBytes": r.entry.size_bytes,
                    "readError": r.read_error,
                })
            })
            .collect();
        let unchanged: Vec<&str> = changes.unchanged.iter().map(|r| r.logical_path()).collect();
        return to_json(&json!({
            "changed": changed,
            "unchanged": unchanged,
            "deleted": changes.deleted,
            "totalFiles": changes.total_files,
        }));
    }

    if changes.changed.is_empty() && changes.deleted.is_empty() {
        return Ok(format!(
            "Up to date: {} file(s), nothing to upload",
            changes.total_files
        ));
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Change", "Path", "Size"]);
    for record in &changes.changed {
        let change = if record.read_error.is_some() {
            "unreadable"
        } else if record.is_new {
            "new"
        } else {
            "modified"
        };
        table.add_row(vec![
            change.to_string(),
            record.logical_path().to_string(),
            human_size(record.entry.size_bytes),
        ]);
    }
    for path in &changes.deleted {
        table.add_row(vec!["deleted".to_string(), path.clone(), "-".to_string()]);
    }

    Ok(format!(
        "{}\n{} to upload, {} unchanged, {} deleted ({} total)",
        table,
        changes.changed.len(),
        changes.unchanged.len(),
        changes.deleted.len(),
        changes.total_files
    ))
}

pub fn format_collect_result(entries: &[FileEntry], format: OutputFormat) -> Result<String, serde_json::Error> {
    if format == OutputFormat::Json {
        let arr: Vec<serde_json::Value> = entries
            .iter()
            .map(|e| {
                json!({
                    "path": e.logical_path,
                    "sizeBytes": e.size_bytes,
                    "modified": e.modified,
                })
            })
            .collect();
        return to_json(&json!(arr));
    }

    if entries.is_empty() {
        return Ok("No deployable files found.".to_string());
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Path", "Size"]);
    let mut total = 0;
    for entry in entries {
        total += entry.size_bytes;
        table.add_row(vec![entry.logical_path.clone(), human_size(entry.size_bytes)]);
    }
    Ok(format!("{}\n{} file(s), {}", table, entries.len(), human_size(total)))
}

pub fn format_snapshot(snapshot: Option<&Snapshot>, format: OutputFormat) -> Result<String, serde_json::Error> {
    if format == OutputFormat::Json {
        return match snapshot {
            Some(snapshot) => serde_json::to_string_pretty(snapshot),
            None => to_json(&serde_json::Value::Null),
        };
    }

    let Some(snapshot) = snapshot else {
        return Ok("No deployment snapshot stored; the next deployment uploads everything.".to_string());
    };

    let deployed_at = snapshot
        .deployed_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Path", "Content ID", "Hash", "Size"]);
    for (path, entry) in &snapshot.entries {
        table.add_row(vec![
            path.clone(),
            entry.content_id.clone(),
            short(&entry.content_hash).to_string(),
            human_size(entry.size_bytes),
        ]);
    }
    Ok(format!(
        "Deployed at: {}\n{}\n{} file(s)",
        deployed_at,
        table,
        snapshot.len()
    ))
}
