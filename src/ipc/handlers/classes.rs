use crate::ipc::error::{ok, school_err};
use crate::ipc::helpers::{open_store, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.store.is_none() {
        return ok(&req.id, json!({ "classes": [] }));
    }
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.list_classes() {
        Ok(classes) => ok(&req.id, json!({ "classes": classes })),
        Err(e) => school_err(&req.id, &e),
    }
}

fn handle_classes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.create_class(&name) {
        Ok(class) => ok(&req.id, json!({ "classId": class.id, "name": class.name })),
        Err(e) => school_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "classes.create" => Some(handle_classes_create(state, req)),
        _ => None,
    }
}
