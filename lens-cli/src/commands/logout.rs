use anyhow::Context;
use clap::Args;

use lens_core::session::FileSessionStorage;

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

#[allow(clippy::unused_async)]
pub async fn run(_args: LogoutArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let path = globals.guest_session_path();
    FileSessionStorage::new(&path)
        .destroy()
        .with_context(|| format!("Cannot remove guest session: {}", path.display()))?;
    if !globals.quiet {
        println!("Guest session cleared");
    }
    Ok(())
}
