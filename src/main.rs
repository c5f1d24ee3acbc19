mod analytics;
mod auth;
mod bundle;
mod chart;
mod cli;
mod db;
mod error;
mod grades;
mod ipc;
mod models;
mod pdf;
mod report;
mod store;

use clap::Parser;
use cli::Args;
use grades::GradeScale;
use std::io::{self, BufRead, Write};
use tracing_subscriber::FmtSubscriber;

fn init_logging(args: &Args) {
    // stdout carries the protocol; logs must go to stderr.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_target(false)
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("gradebookd: logging already initialized");
    }
}

fn main() {
    let args = Args::parse();
    init_logging(&args);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gradebookd starting");

    let mut state = ipc::AppState::new(ipc::Settings {
        db_file: args.db_file.clone(),
        verifier: args.password_scheme.verifier(),
        grade_scale: GradeScale::default(),
    });

    if let Some(path) = args.workspace.clone() {
        if let Err(e) = state.select_workspace(path) {
            tracing::error!("failed to open startup workspace: {e:#}");
            std::process::exit(1);
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::error!("stdin read failed: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("dropping malformed request: {e}");
                // Can't reply without id.
                let _ = writeln!(
                    stdout,
                    "{}",
                    serde_json::json!({
                        "ok": false,
                        "error": { "code": "bad_json", "message": e.to_string() }
                    })
                );
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    tracing::info!("stdin closed, exiting");
}
