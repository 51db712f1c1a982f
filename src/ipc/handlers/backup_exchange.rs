use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn export_bundle(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let workspace = PathBuf::from(get_required_str(params, "workspacePath")?);
    let out_path = PathBuf::from(get_required_str(params, "outPath")?);
    let summary =
        backup::export_workspace_bundle(&workspace, &out_path).map_err(|e| HandlerErr {
            code: "backup_export_failed",
            message: format!("{e:#}"),
            details: None,
        })?;
    Ok(json!({
        "bundleFormat": summary.bundle_format,
        "entryCount": summary.entry_count,
        "outPath": out_path.to_string_lossy(),
    }))
}

fn import_bundle(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let workspace = PathBuf::from(get_required_str(params, "workspacePath")?);
    let in_path = PathBuf::from(get_required_str(params, "inPath")?);
    let summary =
        backup::import_workspace_bundle(&in_path, &workspace).map_err(|e| HandlerErr {
            code: "backup_import_failed",
            message: format!("{e:#}"),
            details: None,
        })?;
    Ok(json!({
        "bundleFormatDetected": summary.bundle_format_detected,
        "workspacePath": workspace.to_string_lossy(),
    }))
}

fn handle_export(req: &Request) -> serde_json::Value {
    match export_bundle(&req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    // Drop any open handle to the workspace being replaced before the
    // extracted database is swapped in.
    let replacing_open_workspace = state
        .workspace
        .as_ref()
        .zip(req.params.get("workspacePath").and_then(|v| v.as_str()))
        .map(|(open, target)| open.to_string_lossy() == target)
        .unwrap_or(false);
    if replacing_open_workspace {
        state.db = None;
    }
    let resp = match import_bundle(&req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    };
    if replacing_open_workspace {
        if let Some(path) = state.workspace.clone() {
            match crate::db::open_db(&path) {
                Ok(conn) => state.db = Some(conn),
                Err(e) => return err(&req.id, "db_open_failed", format!("{e:?}"), None),
            }
        }
    }
    resp
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspaceBundle" => Some(handle_export(req)),
        "backup.importWorkspaceBundle" => Some(handle_import(state, req)),
        _ => None,
    }
}
