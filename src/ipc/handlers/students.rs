use crate::ipc::error::{err, ok, school_err};
use crate::ipc::helpers::open_store;
use crate::ipc::types::{AppState, Request};
use crate::models::NewStudent;
use serde_json::json;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.list_students_with_class() {
        Ok(students) => ok(&req.id, json!({ "students": students })),
        Err(e) => school_err(&req.id, &e),
    }
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let new: NewStudent = match serde_json::from_value(req.params.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    match store.create_student(&new, &state.settings.grade_scale) {
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => school_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        _ => None,
    }
}
