use clap::Args;

use lens_core::view::MutationOutcome;

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct ClearArgs {}

pub async fn run(_args: ClearArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let view = globals.loaded_view().await?;
    let count = view.records().len();

    match view.clear_all().await {
        MutationOutcome::Applied | MutationOutcome::NoOp => {
            if !globals.quiet {
                println!("Removed {count} entr{}", if count == 1 { "y" } else { "ies" });
            }
            Ok(())
        }
        MutationOutcome::RolledBack => {
            anyhow::bail!("Failed to clear history: history service unavailable")
        }
    }
}
