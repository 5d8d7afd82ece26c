use std::path::PathBuf;

use clap::Parser;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "lens",
    version,
    about = "Browse, search, export, and prune Technique Lens analysis history"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use the temporary guest session instead of saved history
    #[arg(long, global = true, conflicts_with = "remote")]
    guest: bool,

    /// Base URL of a remote history endpoint (overrides server.remote)
    #[arg(long, global = true, env = "LENS_REMOTE")]
    remote: Option<String>,

    /// Project directory holding `.lens/` (default: current directory)
    #[arg(long, global = true, default_value = ".")]
    path: PathBuf,
}

/// Classify an error into a process exit code.
///
///   0  success
///   1  general/unknown error
///   2  configuration error
///   4  database error
///   5  history service error (remote endpoint unreachable or refusing)
///   7  export failed
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    // Match message phrases, not bare words: the chain also carries user paths.
    const CONFIG: &[&str] = &[
        "cannot load config",
        "cannot write config",
        "cannot serialize default config",
        "config already exists",
        "invalid config",
        "invalid server config",
        "config file not found",
        "configuration error",
    ];
    const EXPORT: &[&str] = &["export error", "export to "];
    const DATABASE: &[&str] = &["cannot open database", "sqlite error", "store error"];
    const SERVICE: &[&str] = &[
        "service error",
        "history service unavailable",
        "network error",
        "remote api error",
    ];

    let lower = format!("{err:#}").to_lowercase();
    let mentions = |phrases: &[&str]| phrases.iter().any(|p| lower.contains(p));

    if mentions(CONFIG) {
        2 // config error
    } else if mentions(EXPORT) {
        7 // export failed
    } else if mentions(DATABASE) {
        4 // database error
    } else if mentions(SERVICE) {
        5 // history service error
    } else {
        1 // general error
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let globals = commands::GlobalArgs {
        root: cli.path,
        guest: cli.guest,
        remote: cli.remote,
        quiet: cli.quiet,
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: Failed to create runtime: {e}");
            std::process::exit(1);
        }
    };

    match runtime.block_on(commands::run(cli.command, &globals)) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}
