//! Technique Lens core library: the analysis history store, query service and view model.
//!
//! Records are persisted through a [`store::RecordStore`], read back in
//! newest-first order by a [`history::HistoryService`], and browsed through
//! a [`view::HistoryView`] that is bound to either the guest session
//! container or the signed-in service.

pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod notify;
pub mod progress;
pub mod session;
pub mod store;
pub mod types;
pub mod view;
