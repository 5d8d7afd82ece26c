use clap::Args;

use lens_core::types::RecordId;
use lens_core::view::MutationOutcome;

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Identifier of the entry to delete
    pub id: String,
}

pub async fn run(args: DeleteArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let view = globals.loaded_view().await?;
    let id = RecordId::from(args.id);

    match view.delete(&id).await {
        MutationOutcome::Applied => Ok(()),
        MutationOutcome::NoOp => {
            if !globals.quiet {
                eprintln!("No history entry with id {id}");
            }
            Ok(())
        }
        MutationOutcome::RolledBack => {
            anyhow::bail!("Failed to delete {id}: history service unavailable")
        }
    }
}
