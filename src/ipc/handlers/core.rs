use crate::grades::GradeScale;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "passwordScheme": state.settings.verifier.scheme(),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match state.select_workspace(path.clone()) {
        Ok(info) => ok(
            &req.id,
            json!({
                "workspacePath": path.to_string_lossy(),
                "dbPath": info.db_path.to_string_lossy(),
                "userCount": info.user_count,
            }),
        ),
        Err(e) => {
            tracing::error!(workspace = %path.display(), "failed to open workspace: {e:#}");
            err(&req.id, "db_open_failed", format!("{e:#}"), None)
        }
    }
}

fn handle_grades_scale(state: &mut AppState, req: &Request) -> serde_json::Value {
    let scale: &GradeScale = &state.settings.grade_scale;
    ok(&req.id, json!({ "scale": scale }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "grades.scale" => Some(handle_grades_scale(state, req)),
        _ => None,
    }
}
