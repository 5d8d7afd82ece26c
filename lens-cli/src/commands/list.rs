use clap::Args;

use lens_core::view::render::render_table;

use super::GlobalArgs;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show entries whose text, technique id, or technique name matches
    #[arg(long, short)]
    pub search: Option<String>,

    /// Print entries as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: ListArgs, globals: &GlobalArgs) -> anyhow::Result<()> {
    let view = globals.loaded_view().await?;
    if let Some(query) = &args.search {
        view.set_search_query(query.as_str());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view.visible_records())?);
        return Ok(());
    }

    if !globals.quiet {
        println!("{}", view.subtitle());
        println!();
    }

    match view.empty_state() {
        Some(state) => {
            println!("{}", state.title());
            println!("  {}", state.description());
            if let Some(action) = state.call_to_action() {
                println!("  {action}: lens record --text \"...\"");
            }
        }
        None => print!("{}", render_table(&view.rows())),
    }
    Ok(())
}
