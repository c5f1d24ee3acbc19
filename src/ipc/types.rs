use std::path::PathBuf;

use crate::auth::CredentialVerifier;
use crate::db::{self, StoreConfig};
use crate::grades::GradeScale;
use crate::models::Session;
use crate::store::RecordStore;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct WorkspaceInfo {
    pub db_path: PathBuf,
    pub user_count: i64,
}

/// Process-wide settings fixed at startup.
pub struct Settings {
    pub db_file: String,
    pub verifier: Box<dyn CredentialVerifier>,
    pub grade_scale: GradeScale,
}

/// Per-process sidecar state. The store itself is reopened for every
/// request from `store`.
pub struct AppState {
    pub settings: Settings,
    pub workspace: Option<PathBuf>,
    pub store: Option<StoreConfig>,
    pub session: Option<Session>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        AppState {
            settings,
            workspace: None,
            store: None,
            session: None,
        }
    }
}

impl AppState {
    /// Points the sidecar at `path`, creating the database and seeding users
    /// if needed. Any session from a previous workspace is dropped.
    pub fn select_workspace(&mut self, path: PathBuf) -> anyhow::Result<WorkspaceInfo> {
        let config = StoreConfig::in_workspace(&path, &self.settings.db_file);
        let store = RecordStore::from_connection(db::open_db(&config)?);
        store.initialize_schema(self.settings.verifier.as_ref())?;
        let user_count = store.count_users()?;
        tracing::info!(
            workspace = %path.display(),
            scheme = self.settings.verifier.scheme(),
            user_count,
            "workspace selected"
        );
        self.workspace = Some(path);
        self.store = Some(config.clone());
        self.session = None;
        Ok(WorkspaceInfo {
            db_path: config.db_path,
            user_count,
        })
    }
}
