use crate::bundle;
use crate::chart::{self, DashboardCharts};
use crate::error::SchoolResult;
use crate::ipc::error::{err, ok, school_err};
use crate::ipc::helpers::{open_store, required_str};
use crate::ipc::types::{AppState, Request};
use crate::report::{self, ReportData};
use crate::store::RecordStore;
use serde_json::json;
use std::path::PathBuf;

fn collect_with_charts(store: &RecordStore) -> SchoolResult<(ReportData, DashboardCharts)> {
    let data = report::collect(store)?;
    let charts = chart::dashboard_charts(&data.class_averages, &data.grades)?;
    Ok((data, charts))
}

fn handle_reports_html(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let html = collect_with_charts(&store)
        .and_then(|(data, charts)| report::render_html(&data, &charts));
    match html {
        Ok(html) => ok(&req.id, json!({ "html": html })),
        Err(e) => school_err(&req.id, &e),
    }
}

fn handle_reports_pdf(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match required_str(req, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let written = report::collect(&store).and_then(|data| report::write_pdf(&data, &out_path));
    match written {
        Ok(summary) => ok(&req.id, json!(summary)),
        Err(e) => school_err(&req.id, &e),
    }
}

fn handle_reports_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match required_str(req, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (data, charts) = match collect_with_charts(&store) {
        Ok(v) => v,
        Err(e) => return school_err(&req.id, &e),
    };
    match bundle::export_report_bundle(&data, &charts, &out_path) {
        Ok(summary) => ok(&req.id, json!(summary)),
        Err(e) => err(&req.id, "bundle_export_failed", format!("{e:#}"), None),
    }
}

fn handle_reports_verify_bundle(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match required_str(req, "path") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };
    match bundle::verify_report_bundle(&path) {
        Ok(summary) => ok(&req.id, json!(summary)),
        Err(e) => err(&req.id, "bundle_invalid", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.html" => Some(handle_reports_html(state, req)),
        "reports.pdf" => Some(handle_reports_pdf(state, req)),
        "reports.bundle" => Some(handle_reports_bundle(state, req)),
        "reports.verifyBundle" => Some(handle_reports_verify_bundle(state, req)),
        _ => None,
    }
}
