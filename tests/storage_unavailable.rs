mod test_support;

use serde_json::json;
use test_support::{spawn_sidecar, temp_dir};

#[test]
fn missing_database_surfaces_as_storage_error_without_crashing() {
    let workspace = temp_dir("gradebook-storage");
    let mut sc = spawn_sidecar(&[]);
    sc.select_workspace(workspace.path());
    sc.create_class("Math");

    std::fs::remove_file(workspace.path().join("school.db")).expect("remove db");

    for method in [
        "analytics.classAverages",
        "analytics.gradeDistribution",
        "analytics.charts",
        "reports.html",
        "students.list",
    ] {
        assert_eq!(
            sc.request_err(method, json!({})),
            "storage_unavailable",
            "{}",
            method
        );
    }
    let login = sc.request_err(
        "auth.login",
        json!({ "username": "admin", "password": "admin123" }),
    );
    assert_eq!(login, "storage_unavailable");

    // the process keeps serving
    sc.request_ok("health", json!({}));

    // reselecting recreates and reseeds the store
    let res = sc.select_workspace(workspace.path());
    assert_eq!(res.get("userCount"), Some(&json!(2)));
    assert_eq!(
        sc.request_ok("classes.list", json!({})).get("classes"),
        Some(&json!([]))
    );
}
