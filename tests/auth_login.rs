mod test_support;

use serde_json::json;
use test_support::{spawn_sidecar, temp_dir};

#[test]
fn seeded_users_resolve_to_roles() {
    let workspace = temp_dir("gradebook-auth");
    let mut sc = spawn_sidecar(&[]);
    sc.select_workspace(workspace.path());

    let admin = sc.request_ok(
        "auth.login",
        json!({ "username": "admin", "password": "admin123" }),
    );
    assert_eq!(admin.get("authenticated"), Some(&json!(true)));
    assert_eq!(admin.get("role"), Some(&json!("admin")));

    let teacher = sc.request_ok(
        "auth.login",
        json!({ "username": "teacher", "password": "teacher123" }),
    );
    assert_eq!(teacher.get("role"), Some(&json!("teacher")));

    let session = sc.request_ok("auth.session", json!({}));
    assert_eq!(
        session.pointer("/session/username"),
        Some(&json!("teacher"))
    );
}

#[test]
fn wrong_password_is_a_negative_result_and_keeps_session() {
    let workspace = temp_dir("gradebook-auth-miss");
    let mut sc = spawn_sidecar(&[]);
    sc.select_workspace(workspace.path());

    let miss = sc.request_ok(
        "auth.login",
        json!({ "username": "admin", "password": "wrong" }),
    );
    assert_eq!(miss.get("authenticated"), Some(&json!(false)));
    assert!(miss.get("role").is_none());
    assert_eq!(
        sc.request_ok("auth.session", json!({})).get("session"),
        Some(&json!(null))
    );

    sc.request_ok(
        "auth.login",
        json!({ "username": "admin", "password": "admin123" }),
    );
    sc.request_ok(
        "auth.login",
        json!({ "username": "admin", "password": "nope" }),
    );
    let session = sc.request_ok("auth.session", json!({}));
    assert_eq!(session.pointer("/session/role"), Some(&json!("admin")));

    let out = sc.request_ok("auth.logout", json!({}));
    assert_eq!(out.get("loggedOut"), Some(&json!(true)));
    assert_eq!(
        sc.request_ok("auth.session", json!({})).get("session"),
        Some(&json!(null))
    );
}

#[test]
fn argon2_scheme_stores_hashes_and_still_logs_in() {
    let workspace = temp_dir("gradebook-auth-argon2");
    let mut sc = spawn_sidecar(&["--password-scheme", "argon2"]);
    let health = sc.request_ok("health", json!({}));
    assert_eq!(health.get("passwordScheme"), Some(&json!("argon2")));
    sc.select_workspace(workspace.path());

    let admin = sc.request_ok(
        "auth.login",
        json!({ "username": "admin", "password": "admin123" }),
    );
    assert_eq!(admin.get("role"), Some(&json!("admin")));
    let miss = sc.request_ok(
        "auth.login",
        json!({ "username": "admin", "password": "admin" }),
    );
    assert_eq!(miss.get("authenticated"), Some(&json!(false)));
    drop(sc);

    let conn = rusqlite::Connection::open(workspace.path().join("school.db")).expect("open db");
    let stored: String = conn
        .query_row("SELECT password FROM users WHERE username = 'admin'", [], |r| {
            r.get(0)
        })
        .expect("admin row");
    assert!(stored.starts_with("$argon2"));
}

#[test]
fn login_requires_workspace() {
    let mut sc = spawn_sidecar(&[]);
    let code = sc.request_err(
        "auth.login",
        json!({ "username": "admin", "password": "admin123" }),
    );
    assert_eq!(code, "no_workspace");
}
