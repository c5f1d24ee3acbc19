use crate::analytics;
use crate::chart;
use crate::ipc::error::{ok, school_err};
use crate::ipc::helpers::{open_store, sort_param};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_class_averages(state: &mut AppState, req: &Request) -> serde_json::Value {
    let order = match sort_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match analytics::class_averages(&store, order) {
        Ok(rows) => ok(&req.id, json!({ "rows": rows })),
        Err(e) => school_err(&req.id, &e),
    }
}

fn handle_grade_distribution(state: &mut AppState, req: &Request) -> serde_json::Value {
    let order = match sort_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match analytics::grade_distribution(&store, order) {
        Ok(rows) => {
            let total: i64 = rows.iter().map(|r| r.count).sum();
            ok(&req.id, json!({ "rows": rows, "total": total }))
        }
        Err(e) => school_err(&req.id, &e),
    }
}

fn handle_class_counts(state: &mut AppState, req: &Request) -> serde_json::Value {
    let order = match sort_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match analytics::class_counts(&store, order) {
        Ok(rows) => ok(&req.id, json!({ "rows": rows })),
        Err(e) => school_err(&req.id, &e),
    }
}

fn handle_student_marks(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match analytics::student_marks(&store) {
        Ok(rows) => ok(&req.id, json!({ "rows": rows })),
        Err(e) => school_err(&req.id, &e),
    }
}

fn handle_charts(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let order = analytics::SortOrder::Grouped;
    let charts = analytics::class_averages(&store, order).and_then(|avgs| {
        let grades = analytics::grade_distribution(&store, order)?;
        chart::dashboard_charts(&avgs, &grades)
    });
    match charts {
        Ok(charts) => ok(&req.id, json!(charts)),
        Err(e) => school_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.classAverages" => Some(handle_class_averages(state, req)),
        "analytics.gradeDistribution" => Some(handle_grade_distribution(state, req)),
        "analytics.classCounts" => Some(handle_class_counts(state, req)),
        "analytics.studentMarks" => Some(handle_student_marks(state, req)),
        "analytics.charts" => Some(handle_charts(state, req)),
        _ => None,
    }
}
