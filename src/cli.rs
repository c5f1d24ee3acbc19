//! Command-line and environment configuration for the sidecar.

use crate::auth::{Argon2Verifier, CredentialVerifier, PlaintextVerifier};
use crate::db::DEFAULT_DB_FILE;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PasswordScheme {
    /// Store and compare passwords verbatim (matches legacy workspaces)
    Plaintext,
    /// Argon2id PHC hashes
    Argon2,
}

impl PasswordScheme {
    pub fn verifier(self) -> Box<dyn CredentialVerifier> {
        match self {
            PasswordScheme::Plaintext => Box::new(PlaintextVerifier),
            PasswordScheme::Argon2 => Box::new(Argon2Verifier),
        }
    }
}

/// School records sidecar.
///
/// Reads one JSON request per line on stdin and answers one JSON line on
/// stdout. Logs go to stderr.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Workspace directory to open at startup (otherwise use workspace.select)
    #[arg(short, long, value_name = "DIR", env = "GRADEBOOK_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Database file name inside the workspace
    #[arg(long, default_value = DEFAULT_DB_FILE, env = "GRADEBOOK_DB_FILE")]
    pub db_file: String,

    /// How user passwords are stored and checked
    #[arg(
        long,
        value_enum,
        default_value_t = PasswordScheme::Argon2,
        env = "GRADEBOOK_PASSWORD_SCHEME"
    )]
    pub password_scheme: PasswordScheme,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
