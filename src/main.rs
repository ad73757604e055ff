mod cli;
mod core;

use clap::{Parser, Subcommand};
use colored::Colorize;

#[derive(Parser)]
#[command(name = "hzsync", about = "Sync Hetzner Cloud pricing into Coroot's cost model", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Emit a JSON run report instead of text
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Verbose diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive per-CPU/per-memory rates from Hetzner billing and push them
    /// to Coroot (default)
    Sync {
        /// Compute and print rates without logging in or pushing
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let opts = cli::output::OutputOptions {
        format: if cli.json {
            cli::output::OutputFormat::Json
        } else {
            cli::output::OutputFormat::Text
        },
        pretty: cli.pretty,
        use_color: cli::output::detect_color(!cli.no_color),
        verbose: cli.verbose,
    };

    let dry_run = match cli.command {
        None => false,
        Some(Commands::Sync { dry_run }) => dry_run,
    };

    if let Err(err) = cli::sync_cmd::run(dry_run, &opts).await {
        let message = format!("error: {}", err);
        if opts.use_color {
            eprintln!("{}", message.red());
        } else {
            eprintln!("{}", message);
        }
        std::process::exit(err.exit_code());
    }
}
