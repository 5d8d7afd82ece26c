use std::sync::Arc;

use anyhow::Context;
use clap::Args;

use lens_core::history::{HttpHistoryService, LocalHistoryService};
use lens_core::types::{HistoryEntry, NewAnalysis, TechniqueDetection};

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct RecordArgs {
    /// The analyzed input text
    #[arg(long)]
    pub text: String,

    /// A detected technique as `ID:NAME:CONFIDENCE` (repeatable)
    #[arg(long = "technique", short = 't', value_parser = parse_technique)]
    pub techniques: Vec<TechniqueDetection>,
}

pub async fn run(args: RecordArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let analysis = NewAnalysis::new(args.text, args.techniques);
    analysis.validate().context("Analysis rejected")?;
    let entry = record(&analysis, globals).await?;
    if globals.quiet {
        println!("{}", entry.id);
    } else {
        println!("Recorded {} ({} techniques)", entry.id, entry.techniques.len());
    }
    Ok(())
}

async fn record(analysis: &NewAnalysis, globals: &GlobalArgs) -> anyhow::Result<HistoryEntry> {
    if globals.guest {
        return globals
            .guest_history()
            .record(analysis)
            .context("Failed to record guest analysis");
    }

    let config = globals.load_config()?;
    if let Some(url) = globals.remote_url(&config) {
        let service = HttpHistoryService::new(&url)
            .with_context(|| format!("Cannot use remote history service at {url}"))?;
        return service
            .record(analysis)
            .await
            .context("Remote history service rejected the analysis");
    }

    let store = globals.open_store(&config)?;
    LocalHistoryService::new(Arc::new(store))
        .record(analysis)
        .await
        .context("Failed to record analysis")
}

/// Parse `ID:NAME:CONFIDENCE`. Names may contain `:`.
fn parse_technique(raw: &str) -> Result<TechniqueDetection, String> {
    let (rest, confidence) = raw
        .rsplit_once(':')
        .ok_or_else(|| format!("expected ID:NAME:CONFIDENCE, got '{raw}'"))?;
    let (id, name) = rest
        .split_once(':')
        .ok_or_else(|| format!("expected ID:NAME:CONFIDENCE, got '{raw}'"))?;
    let confidence: f64 = confidence
        .trim()
        .parse()
        .map_err(|_| format!("confidence '{confidence}' is not a number"))?;
    if id.trim().is_empty() {
        return Err("technique id must not be empty".to_string());
    }
    Ok(TechniqueDetection::new(id.trim(), name.trim(), confidence))
}
