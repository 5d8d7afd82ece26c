pub mod clear;
pub mod delete;
pub mod export;
pub mod init;
pub mod list;
pub mod logout;
pub mod record;
pub mod serve;
pub mod status;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;

use lens_core::config::{LENS_DIR, LensConfig};
use lens_core::history::{HttpHistoryService, LocalHistoryService};
use lens_core::notify::{Notifier, Toast, ToastLevel};
use lens_core::session::{FileSessionStorage, GuestHistory};
use lens_core::store::sqlite::SqliteStore;
use lens_core::view::{AccessMode, HistoryView, LoadOutcome, ViewOptions};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create `.lens/` with a default config and an empty history database
    Init(init::InitArgs),
    /// Serve the history endpoint over HTTP
    Serve(serve::ServeArgs),
    /// List history, newest first
    List(list::ListArgs),
    /// Delete one history entry
    Delete(delete::DeleteArgs),
    /// Delete every history entry
    Clear(clear::ClearArgs),
    /// Export history as CSV or PDF
    Export(export::ExportArgs),
    /// Record a completed analysis
    Record(record::RecordArgs),
    /// Show where history lives and how much of it there is
    Status(status::StatusArgs),
    /// End the guest session and discard its history
    Logout(logout::LogoutArgs),
}

pub async fn run(cmd: Command, globals: &GlobalArgs) -> anyhow::Result<()> {
    match cmd {
        Command::Init(args) => init::run(args, globals).await,
        Command::Serve(args) => serve::run(args, globals).await,
        Command::List(args) => list::run(args, globals).await,
        Command::Delete(args) => delete::run(args, globals).await,
        Command::Clear(args) => clear::run(args, globals).await,
        Command::Export(args) => export::run(args, globals).await,
        Command::Record(args) => record::run(args, globals).await,
        Command::Status(args) => status::run(args, globals).await,
        Command::Logout(args) => logout::run(args, globals).await,
    }
}

/// Flags shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub root: PathBuf,
    pub guest: bool,
    pub remote: Option<String>,
    pub quiet: bool,
}

impl GlobalArgs {
    pub fn lens_dir(&self) -> PathBuf {
        self.root.join(LENS_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.lens_dir().join("config.toml")
    }

    /// File backing the guest session container.
    pub fn guest_session_path(&self) -> PathBuf {
        self.lens_dir().join("session").join("guest.json")
    }

    pub fn load_config(&self) -> anyhow::Result<LensConfig> {
        let path = self.config_path();
        LensConfig::load_or_default(&path)
            .with_context(|| format!("Cannot load config: {}", path.display()))
    }

    /// Remote endpoint, from `--remote` or `server.remote`.
    pub fn remote_url(&self, config: &LensConfig) -> Option<String> {
        self.remote.clone().or_else(|| config.server.remote.clone())
    }

    pub fn guest_history(&self) -> GuestHistory {
        GuestHistory::new(Arc::new(FileSessionStorage::new(
            self.guest_session_path(),
        )))
    }

    /// Open (creating if needed) the local history database.
    pub fn open_store(&self, config: &LensConfig) -> anyhow::Result<SqliteStore> {
        let db_path = config.db_path(&self.root);
        ensure_parent(&db_path)?;
        SqliteStore::open(&db_path)
            .with_context(|| format!("Cannot open database: {}", db_path.display()))
    }

    /// Guest session, remote endpoint, or local database, in that order.
    pub fn access_mode(&self, config: &LensConfig) -> anyhow::Result<AccessMode> {
        if self.guest {
            return Ok(AccessMode::Guest(self.guest_history()));
        }
        if let Some(url) = self.remote_url(config) {
            let service = HttpHistoryService::new(&url)
                .with_context(|| format!("Cannot use remote history service at {url}"))?;
            return Ok(AccessMode::SignedIn(Arc::new(service)));
        }
        let store = self.open_store(config)?;
        Ok(AccessMode::SignedIn(Arc::new(LocalHistoryService::new(
            Arc::new(store),
        ))))
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::new(ConsoleNotifier { quiet: self.quiet })
    }

    /// Build a view for the selected mode and load it.
    pub async fn loaded_view(&self) -> anyhow::Result<HistoryView> {
        let config = self.load_config()?;
        let mode = self.access_mode(&config)?;
        let view = HistoryView::new(
            mode,
            self.notifier(),
            ViewOptions::from_config(&config, &self.root),
        );
        load_view(view).await
    }
}

pub async fn load_view(view: HistoryView) -> anyhow::Result<HistoryView> {
    if view.load().await == LoadOutcome::Failed {
        anyhow::bail!("Failed to load history: history service unavailable");
    }
    Ok(view)
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Prints toasts to stderr. `--quiet` keeps only errors.
#[derive(Debug)]
pub struct ConsoleNotifier {
    quiet: bool,
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, toast: Toast) {
        match toast.level {
            ToastLevel::Error => eprintln!("✗ {toast}"),
            ToastLevel::Success if !self.quiet => eprintln!("✓ {toast}"),
            ToastLevel::Info if !self.quiet => eprintln!("  {toast}"),
            ToastLevel::Success | ToastLevel::Info => {}
        }
    }
}
