use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;

use lens_core::export::ExportFormat;
use lens_core::progress::{IndicatifReporter, NoopReporter, ProgressReporter};
use lens_core::types::RecordId;
use lens_core::view::{HistoryView, ViewOptions};

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output format: csv or pdf
    #[arg(long, short, default_value = "csv")]
    pub format: ExportFormat,

    /// Export a single entry instead of the whole (filtered) history
    #[arg(long)]
    pub id: Option<String>,

    /// Only export entries matching this search
    #[arg(long, short)]
    pub search: Option<String>,

    /// Directory to write into (default: export.dir from config)
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

pub async fn run(args: ExportArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let config = globals.load_config()?;
    let mut options = ViewOptions::from_config(&config, &globals.root);
    if let Some(dir) = args.dir {
        options.export_dir = dir;
    }

    let progress: Arc<dyn ProgressReporter> = if globals.quiet {
        Arc::new(NoopReporter)
    } else {
        Arc::new(IndicatifReporter::stderr())
    };
    let view = HistoryView::new(globals.access_mode(&config)?, globals.notifier(), options)
        .with_progress(progress);
    let view = super::load_view(view).await?;
    if let Some(query) = &args.search {
        view.set_search_query(query.as_str());
    }

    let path = write(&view, args.format, args.id).await?;
    println!("{}", path.display());
    Ok(())
}

async fn write(
    view: &HistoryView,
    format: ExportFormat,
    id: Option<String>,
) -> anyhow::Result<PathBuf> {
    let path = match id {
        Some(id) => view.export_entry(&RecordId::from(id), format).await,
        None => view.export(format).await,
    };
    path.with_context(|| format!("Export to {} failed", format.label()))
}
