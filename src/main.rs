mod batch;
mod config;
mod layout;
mod pdf;
mod shell;
mod source;

use anyhow::Result;
use clap::Parser;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::load_settings;
use shell::Shell;

/// Turn backup code files into a printable checklist PDF.
#[derive(Parser, Debug)]
#[command(name = "pdf_backupper")]
#[command(about = "Turn backup code files into a printable checklist PDF.", long_about = None)]
struct Args {
    /// JSON file overriding page layout defaults (padding, font, margins)
    #[arg(short, long)]
    settings: Option<PathBuf>,
}

/// Log to stderr so the menu on stdout stays readable. `RUST_LOG` overrides
/// the default of warnings only.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}=warn", env!("CARGO_PKG_NAME"))));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> Result<()> {
    let settings = load_settings(args.settings.as_deref())?;
    tracing::debug!("Using settings {:?}", settings);

    let stdin = io::stdin();
    let stdout = io::stdout();
    Shell::new(stdin.lock(), stdout.lock(), &settings).run()
}

fn main() {
    let args = Args::parse();
    init_logging();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        for cause in e.chain().skip(1) {
            eprintln!("Caused by: {}", cause);
        }
        std::process::exit(1);
    }
}
