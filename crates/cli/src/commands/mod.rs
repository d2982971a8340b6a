//! Local subcommands. Each opens the journal, replays it into a ledger,
//! performs one operation and prints the result.

mod query;
mod register;
mod update;

pub(crate) use query::{cmd_history, cmd_list, cmd_show, cmd_total};
pub(crate) use register::{cmd_register, RegisterArgs};
pub(crate) use update::cmd_update;

use std::path::Path;

use tracker_core::SystemClock;
use tracker_storage::{JournalStore, Ledger, LedgerError, StorageError};

use crate::config::ConfigError;
use crate::OutputFormat;

/// Exit code for a rejected or failed ledger operation.
pub(crate) const EXIT_FAILURE: i32 = 1;
/// Exit code for configuration and usage errors.
pub(crate) const EXIT_USAGE: i32 = 2;

#[derive(Debug, thiserror::Error)]
pub(crate) enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("failed to start async runtime: {0}")]
    Runtime(std::io::Error),

    #[error("server error: {0}")]
    Serve(String),
}

impl From<StorageError> for CommandError {
    fn from(e: StorageError) -> Self {
        CommandError::Ledger(LedgerError::Storage(e))
    }
}

impl CommandError {
    pub(crate) fn exit_code(&self) -> i32 {
        match self {
            CommandError::Config(_) => EXIT_USAGE,
            _ => EXIT_FAILURE,
        }
    }

    /// Stable machine-readable kind for `--output json`.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            CommandError::Config(_) => "config",
            CommandError::Ledger(e) => e.kind().map(|k| k.as_str()).unwrap_or("storage"),
            CommandError::Runtime(_) | CommandError::Serve(_) => "internal",
        }
    }
}

pub(crate) type LocalLedger = Ledger<JournalStore, SystemClock>;

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CommandError> {
    tokio::runtime::Runtime::new().map_err(CommandError::Runtime)
}

pub(crate) async fn open_ledger(journal: &Path) -> Result<LocalLedger, CommandError> {
    let store = JournalStore::open(journal).await?;
    Ok(Ledger::open(store, SystemClock).await?)
}

/// Print a result value: pretty JSON, or the given text.
pub(crate) fn emit(output: OutputFormat, json: serde_json::Value, text: impl FnOnce() -> String) {
    match output {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        ),
        OutputFormat::Text => println!("{}", text()),
    }
}
