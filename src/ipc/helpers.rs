use crate::analytics::SortOrder;
use crate::ipc::error::{err, school_err};
use crate::ipc::types::{AppState, Request};
use crate::store::RecordStore;
use serde_json::json;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Opens a fresh connection for this request.
pub fn open_store(state: &AppState, req: &Request) -> Result<RecordStore, serde_json::Value> {
    let Some(config) = state.store.as_ref() else {
        return Err(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    RecordStore::open(config).map_err(|e| school_err(&req.id, &e))
}

pub fn sort_param(req: &Request) -> Result<SortOrder, serde_json::Value> {
    let raw = req.params.get("sort").and_then(|v| v.as_str());
    SortOrder::parse(raw).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            "sort must be one of: grouped, label, value",
            Some(json!({ "sort": raw })),
        )
    })
}
