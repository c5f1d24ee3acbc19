#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tempfile::TempDir;

pub fn temp_dir(prefix: &str) -> TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("create temp dir")
}

pub struct Sidecar {
    pub child: Child,
    pub stdin: ChildStdin,
    pub reader: BufReader<ChildStdout>,
    next_id: u64,
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Spawns the built binary. Tests default to the plaintext scheme so login
/// checks stay fast; pass `--password-scheme argon2` to override.
pub fn spawn_sidecar(extra_args: &[&str]) -> Sidecar {
    let exe = env!("CARGO_BIN_EXE_gradebookd");
    let mut args = if extra_args.contains(&"--password-scheme") {
        vec!["--quiet"]
    } else {
        vec!["--password-scheme", "plaintext", "--quiet"]
    };
    args.extend_from_slice(extra_args);
    let mut child = Command::new(exe)
        .args(&args)
        .env_remove("GRADEBOOK_WORKSPACE")
        .env_remove("GRADEBOOK_DB_FILE")
        .env_remove("GRADEBOOK_PASSWORD_SCHEME")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradebookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    Sidecar {
        child,
        stdin,
        reader: BufReader::new(stdout),
        next_id: 0,
    }
}

impl Sidecar {
    pub fn request(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        self.next_id += 1;
        let id = self.next_id.to_string();
        let payload = json!({
            "id": id,
            "method": method,
            "params": params,
        });
        writeln!(self.stdin, "{}", payload).expect("write request");
        self.stdin.flush().expect("flush request");

        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read response line");
        assert!(!line.trim().is_empty(), "empty response for {}", method);
        let value: serde_json::Value =
            serde_json::from_str(line.trim()).expect("parse response json");
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
        value
    }

    pub fn request_ok(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or(serde_json::Value::Null)
    }

    pub fn request_err(&mut self, method: &str, params: serde_json::Value) -> String {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    }

    pub fn select_workspace(&mut self, dir: &std::path::Path) -> serde_json::Value {
        self.request_ok("workspace.select", json!({ "path": dir.to_string_lossy() }))
    }

    pub fn create_class(&mut self, name: &str) -> i64 {
        self.request_ok("classes.create", json!({ "name": name }))
            .get("classId")
            .and_then(|v| v.as_i64())
            .expect("classId")
    }

    pub fn create_student(&mut self, params: serde_json::Value) -> serde_json::Value {
        self.request_ok("students.create", params)
            .get("student")
            .cloned()
            .expect("student")
    }
}

pub fn rows(result: &serde_json::Value) -> Vec<serde_json::Value> {
    result
        .get("rows")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}
