use anyhow::Context;
use clap::Args;

use lens_core::history::{HistoryService, HttpHistoryService};
use lens_core::store::RecordStore;
use lens_core::view::AccessMode;

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct StatusArgs {}

pub async fn run(_args: StatusArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let config = globals.load_config()?;

    if globals.guest {
        let entries = globals.guest_history().load();
        println!("Technique Lens status (guest)");
        println!();
        println!("  Mode:     {}", AccessMode::Guest(globals.guest_history()).subtitle());
        println!("  Session:  {}", globals.guest_session_path().display());
        println!("  Entries:  {}", entries.len());
        return Ok(());
    }

    if let Some(url) = globals.remote_url(&config) {
        let service = HttpHistoryService::new(&url)
            .with_context(|| format!("Cannot use remote history service at {url}"))?;
        let entries = service
            .list_history()
            .await
            .context("Remote history service unavailable")?;
        println!("Technique Lens status (remote)");
        println!();
        println!("  Endpoint: {url}");
        println!("  Entries:  {}", entries.len());
        if let Some(newest) = entries.first() {
            println!("  Newest:   {}", newest.timestamp.to_rfc3339());
        }
        return Ok(());
    }

    let db_path = config.db_path(&globals.root);
    let store = globals.open_store(&config)?;
    let stats = store.stats().await.context("Failed to read database stats")?;

    println!("Technique Lens status for {}", globals.root.display());
    println!();
    println!("  Database: {}", db_path.display());
    if stats.db_size_bytes > 0 {
        println!("  Size:     {}", format_bytes(stats.db_size_bytes));
    }
    println!();
    println!("  Records:    {}", stats.total_records);
    println!("  Techniques: {}", stats.total_techniques);
    match (stats.oldest, stats.newest) {
        (Some(oldest), Some(newest)) => {
            println!("  Oldest:     {}", oldest.to_rfc3339());
            println!("  Newest:     {}", newest.to_rfc3339());
        }
        _ => println!("  Range:      (empty)"),
    }
    println!();
    println!("  Exports:  {}", config.export_dir(&globals.root).display());
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_are_humanized() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
