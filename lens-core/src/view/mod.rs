//! History view model.
//!
//! A [`HistoryView`] is bound at construction to one [`AccessMode`]: the guest
//! session container or a signed-in [`HistoryService`]. Switching identity
//! means building a new view. The view owns `records` and `search_query`;
//! visible records are recomputed from both on every change.
//!
//! Mutations are applied locally first. When the backend call fails the
//! removed entries are put back and an error toast is raised. Results that
//! arrive after [`HistoryView::unmount`], or after a newer load started, are
//! dropped.

pub mod filter;
pub mod render;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::config::LensConfig;
use crate::error::{ExportError, LensError};
use crate::export::{self, ExportFormat};
use crate::history::HistoryService;
use crate::notify::{Notifier, Toast};
use crate::progress::{NoopReporter, ProgressReporter};
use crate::session::GuestHistory;
use crate::types::{HistoryEntry, RecordId};

pub use filter::filter_entries;
pub use render::{ConfidenceDisplay, EmptyState, HistoryRow, RowLayout};

/// Which record universe the view reads and mutates.
#[derive(Clone)]
pub enum AccessMode {
    Guest(GuestHistory),
    SignedIn(Arc<dyn HistoryService>),
}

impl AccessMode {
    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest(_))
    }

    pub fn subtitle(&self) -> &'static str {
        match self {
            Self::Guest(_) => "Session history (temporary)",
            Self::SignedIn(_) => "Your saved analysis results",
        }
    }
}

impl std::fmt::Debug for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Guest(guest) => f.debug_tuple("Guest").field(guest).finish(),
            Self::SignedIn(_) => f.write_str("SignedIn(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub export_dir: PathBuf,
    pub layout: RowLayout,
}

impl ViewOptions {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
            layout: RowLayout::default(),
        }
    }

    pub fn from_config(config: &LensConfig, root: &Path) -> Self {
        Self {
            export_dir: config.export_dir(root),
            layout: RowLayout {
                preview_chars: config.view.preview_chars,
                badge_limit: config.view.badge_limit,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(usize),
    /// The fetch failed; records were reset to empty.
    Failed,
    /// The view was unmounted or a newer load started first.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    /// Nothing matched; state is unchanged.
    NoOp,
    /// The backend refused; local state was restored.
    RolledBack,
}

#[derive(Debug)]
struct ViewState {
    records: Vec<HistoryEntry>,
    search_query: String,
    visible: Vec<HistoryEntry>,
    mounted: bool,
    load_generation: u64,
}

impl ViewState {
    fn refresh_visible(&mut self) {
        self.visible = filter_entries(&self.records, &self.search_query);
    }
}

/// Client-side history state. Clones share the same state.
#[derive(Clone)]
pub struct HistoryView {
    mode: AccessMode,
    notifier: Arc<dyn Notifier>,
    progress: Arc<dyn ProgressReporter>,
    options: ViewOptions,
    state: Arc<Mutex<ViewState>>,
}

impl std::fmt::Debug for HistoryView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryView")
            .field("mode", &self.mode)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl HistoryView {
    /// Mount a view with empty state. Call [`HistoryView::load`] to populate it.
    pub fn new(mode: AccessMode, notifier: Arc<dyn Notifier>, options: ViewOptions) -> Self {
        Self {
            mode,
            notifier,
            progress: Arc::new(NoopReporter),
            options,
            state: Arc::new(Mutex::new(ViewState {
                records: Vec::new(),
                search_query: String::new(),
                visible: Vec::new(),
                mounted: true,
                load_generation: 0,
            })),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn mode(&self) -> &AccessMode {
        &self.mode
    }

    pub fn subtitle(&self) -> &'static str {
        self.mode.subtitle()
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Raise a toast unless the view is gone.
    fn notify(&self, toast: Toast) {
        if self.is_mounted() {
            self.notifier.notify(toast);
        } else {
            debug!(title = %toast.title, "View unmounted, dropping notification");
        }
    }

    // ── Loading ────────────────────────────────────────────────────

    /// Replace `records` from the bound backend.
    pub async fn load(&self) -> LoadOutcome {
        let generation = {
            let mut state = self.state();
            state.load_generation += 1;
            state.load_generation
        };

        let fetched = match &self.mode {
            AccessMode::Guest(guest) => Ok(guest.load()),
            AccessMode::SignedIn(service) => service.list_history().await,
        };

        let outcome = {
            let mut state = self.state();
            if !state.mounted || state.load_generation != generation {
                debug!(generation, "Discarding stale history load");
                return LoadOutcome::Discarded;
            }
            let outcome = match fetched {
                Ok(entries) => {
                    state.records = entries;
                    LoadOutcome::Loaded(state.records.len())
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load history");
                    state.records.clear();
                    LoadOutcome::Failed
                }
            };
            state.refresh_visible();
            outcome
        };

        if outcome == LoadOutcome::Failed {
            self.notify(Toast::error(
                "Failed to load history",
                "Your history could not be retrieved. Please try again later.",
            ));
        }
        outcome
    }

    // ── Reading ────────────────────────────────────────────────────

    pub fn set_search_query(&self, query: impl Into<String>) {
        let mut state = self.state();
        state.search_query = query.into();
        state.refresh_visible();
    }

    pub fn search_query(&self) -> String {
        self.state().search_query.clone()
    }

    pub fn records(&self) -> Vec<HistoryEntry> {
        self.state().records.clone()
    }

    pub fn visible_records(&self) -> Vec<HistoryEntry> {
        self.state().visible.clone()
    }

    /// Visible records laid out as rows in local time.
    pub fn rows(&self) -> Vec<HistoryRow> {
        self.state()
            .visible
            .iter()
            .map(|entry| render::build_row(entry, self.options.layout))
            .collect()
    }

    /// `None` while any row is visible.
    pub fn empty_state(&self) -> Option<EmptyState> {
        let state = self.state();
        if !state.visible.is_empty() {
            None
        } else if state.search_query.is_empty() {
            Some(EmptyState::NoHistory)
        } else {
            Some(EmptyState::NoResults)
        }
    }

    /// "Clear All" is only offered when there is something to clear.
    pub fn can_clear(&self) -> bool {
        !self.state().records.is_empty()
    }

    pub fn is_mounted(&self) -> bool {
        self.state().mounted
    }

    /// Detach the view; later results and notifications are dropped.
    pub fn unmount(&self) {
        self.state().mounted = false;
    }

    // ── Mutations ──────────────────────────────────────────────────

    /// Remove one record. Unknown ids are a silent no-op.
    pub async fn delete(&self, id: &RecordId) -> MutationOutcome {
        let (index, removed, remaining) = {
            let mut state = self.state();
            let Some(index) = state.records.iter().position(|e| &e.id == id) else {
                debug!(%id, "Delete of unknown history entry ignored");
                return MutationOutcome::NoOp;
            };
            let removed = state.records.remove(index);
            state.refresh_visible();
            (index, removed, state.records.clone())
        };

        let result = match &self.mode {
            AccessMode::Guest(guest) => guest.save(&remaining).map_err(LensError::from),
            AccessMode::SignedIn(service) => service.delete_entry(id).await,
        };

        if let Err(e) = result {
            warn!(%id, error = %e, "Delete failed, restoring entry");
            self.restore_entry(index, removed);
            self.notify(Toast::error(
                "Failed to delete",
                "The analysis could not be removed. Please try again.",
            ));
            return MutationOutcome::RolledBack;
        }

        info!(%id, "Deleted history entry");
        self.notify(Toast::success("Deleted", "Analysis removed from history."));
        MutationOutcome::Applied
    }

    fn restore_entry(&self, index: usize, entry: HistoryEntry) {
        let mut state = self.state();
        if state.records.iter().any(|e| e.id == entry.id) {
            return;
        }
        let at = index.min(state.records.len());
        state.records.insert(at, entry);
        state.refresh_visible();
    }

    /// Empty the whole history for the bound mode.
    pub async fn clear_all(&self) -> MutationOutcome {
        let previous = {
            let mut state = self.state();
            let previous = std::mem::take(&mut state.records);
            state.refresh_visible();
            previous
        };

        let result = match &self.mode {
            AccessMode::Guest(guest) => guest.clear().map_err(LensError::from),
            AccessMode::SignedIn(service) => service.clear_history().await,
        };

        if let Err(e) = result {
            warn!(error = %e, "Clear failed, restoring history");
            {
                let mut state = self.state();
                if state.records.is_empty() {
                    state.records = previous;
                    state.refresh_visible();
                }
            }
            self.notify(Toast::error(
                "Failed to clear history",
                "Your history could not be cleared. Please try again.",
            ));
            return MutationOutcome::RolledBack;
        }

        info!(removed = previous.len(), "Cleared history");
        self.notify(Toast::success(
            "History Cleared",
            "All analysis history has been cleared.",
        ));
        MutationOutcome::Applied
    }

    // ── Export ─────────────────────────────────────────────────────

    /// Export the currently visible records.
    pub async fn export(&self, format: ExportFormat) -> crate::error::Result<PathBuf> {
        let entries = self.visible_records();
        self.export_entries(format, &entries).await
    }

    /// Export a single record by id.
    pub async fn export_entry(
        &self,
        id: &RecordId,
        format: ExportFormat,
    ) -> crate::error::Result<PathBuf> {
        let entry = self.state().records.iter().find(|e| &e.id == id).cloned();
        let Some(entry) = entry else {
            let err = ExportError::EntryNotFound(id.to_string());
            self.notify(Toast::error("Export Failed", err.to_string()));
            return Err(err.into());
        };
        self.export_entries(format, std::slice::from_ref(&entry))
            .await
    }

    async fn export_entries(
        &self,
        format: ExportFormat,
        entries: &[HistoryEntry],
    ) -> crate::error::Result<PathBuf> {
        let label = format.label();
        self.notify(Toast::info(
            "Export Started",
            format!("Exporting history as {label}..."),
        ));

        match export::write_export(
            &self.options.export_dir,
            format,
            entries,
            self.progress.as_ref(),
        )
        .await
        {
            Ok(path) => {
                self.notify(Toast::success(
                    "Export Complete",
                    format!("History exported as {label}."),
                ));
                Ok(path)
            }
            Err(e) => {
                warn!(format = %format, error = %e, "Export failed");
                self.notify(Toast::error(
                    "Export Failed",
                    format!("Could not export history as {label}."),
                ));
                Err(e.into())
            }
        }
    }
}
