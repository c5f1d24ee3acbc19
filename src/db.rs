use crate::auth::CredentialVerifier;
use crate::error::{SchoolError, SchoolResult};
use crate::models::Role;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};

pub const DEFAULT_DB_FILE: &str = "school.db";

/// Accounts every workspace starts with: (id, username, password, role).
const SEED_USERS: [(i64, &str, &str, Role); 2] = [
    (1, "admin", "admin123", Role::Admin),
    (2, "teacher", "teacher123", Role::Teacher),
];

/// Where the record store lives. Built once per selected workspace and handed
/// to every request that needs the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub db_path: PathBuf,
}

impl StoreConfig {
    pub fn in_workspace(workspace: &Path, db_file: &str) -> Self {
        StoreConfig {
            db_path: workspace.join(db_file),
        }
    }
}

/// Opens an existing database for one request. Does not create the file; a
/// missing or unreadable database is `StorageUnavailable`.
pub fn connect(config: &StoreConfig) -> SchoolResult<Connection> {
    if !config.db_path.is_file() {
        return Err(SchoolError::StorageUnavailable(format!(
            "database not found: {}",
            config.db_path.to_string_lossy()
        )));
    }
    let conn = Connection::open_with_flags(
        &config.db_path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(conn)
}

/// Opens the database, creating the file and its directory if needed.
pub fn open_db(config: &StoreConfig) -> anyhow::Result<Connection> {
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(&config.db_path)?;
    Ok(conn)
}

pub fn initialize_schema(conn: &Connection, verifier: &dyn CredentialVerifier) -> SchoolResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id INTEGER PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            role TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    // No FOREIGN KEY on class_id: orphans are stored and dropped from class
    // analytics by the inner join.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            section TEXT NOT NULL DEFAULT '',
            roll INTEGER,
            gender TEXT,
            notebook INTEGER NOT NULL DEFAULT 0,
            copy_checked INTEGER NOT NULL DEFAULT 0,
            projects INTEGER NOT NULL DEFAULT 0,
            marks INTEGER,
            grade TEXT,
            class_id INTEGER
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_class ON students(class_id)",
        [],
    )?;

    seed_users(conn, verifier)?;
    Ok(())
}

fn seed_users(conn: &Connection, verifier: &dyn CredentialVerifier) -> SchoolResult<()> {
    for (id, username, password, role) in SEED_USERS {
        let exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM users WHERE id = ? OR username = ?",
                (id, username),
                |r| r.get(0),
            )
            .optional()?;
        if exists.is_some() {
            continue;
        }
        let stored = verifier.encode(password)?;
        conn.execute(
            "INSERT OR IGNORE INTO users(id, username, password, role) VALUES(?, ?, ?, ?)",
            (id, username, &stored, role.as_str()),
        )?;
        tracing::info!(username, scheme = verifier.scheme(), "seeded default user");
    }
    Ok(())
}
