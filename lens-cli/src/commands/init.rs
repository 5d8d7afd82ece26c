use anyhow::Context;
use clap::Args;

use lens_core::config::LensConfig;
use lens_core::store::RecordStore;

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

pub async fn run(args: InitArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let config_path = globals.config_path();
    if config_path.exists() && !args.force {
        anyhow::bail!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    tokio::fs::create_dir_all(globals.lens_dir())
        .await
        .with_context(|| format!("Cannot create {}", globals.lens_dir().display()))?;

    let config = LensConfig::default();
    let content = config
        .to_toml_string()
        .context("Cannot serialize default config")?;
    tokio::fs::write(&config_path, content)
        .await
        .with_context(|| format!("Cannot write config: {}", config_path.display()))?;

    let store = globals.open_store(&config)?;
    let stats = store.stats().await.context("Cannot read database stats")?;

    if !globals.quiet {
        println!("Initialized Technique Lens in {}", globals.lens_dir().display());
        println!("  Config:   {}", config_path.display());
        println!(
            "  Database: {} ({} records)",
            config.db_path(&globals.root).display(),
            stats.total_records
        );
    }
    Ok(())
}
