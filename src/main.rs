// coil-lookup - find a coil's row in the shared coil spreadsheet

use std::io;
use std::path::PathBuf;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use coil_lookup::format_row;
use coil_lookup::source::is_remote_url;
use coil_lookup::Config;
use coil_lookup::LineScanner;
use coil_lookup::LoadStatus;
use coil_lookup::LoaderSession;
use log::LevelFilter;

const NOT_FOUND: &str = "Coil number not found.";

#[derive(Parser)]
#[command(name = "coil-lookup")]
#[command(about = "Look up coils by MILL COIL NO in a cached spreadsheet")]
#[command(version)]
struct Cli {
    /// Configuration file (default: <config dir>/coil-lookup/config.toml)
    #[arg(long, global = true, env = "COIL_LOOKUP_CONFIG")]
    config: Option<PathBuf>,

    /// Remote spreadsheet URL, overriding the configured one
    #[arg(long, global = true)]
    url: Option<String>,

    /// Cache database file, overriding the configured one
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// Log debug details to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a spreadsheet and cache it (remote URL by default)
    #[command(after_help = "\
Examples:
  coil-lookup load
  coil-lookup load https://example.com/coils.xlsx
  coil-lookup load --file ./march.xlsx")]
    Load {
        /// URL or local path; the configured URL when omitted
        location: Option<String>,

        /// Local spreadsheet file
        #[arg(long, short = 'f', conflicts_with = "location")]
        file: Option<PathBuf>,
    },

    /// Show the row of one coil number
    Lookup {
        /// Coil number (case and surrounding spaces are ignored)
        query: String,
    },

    /// List coil numbers matching a partial entry
    Suggest {
        partial: String,

        /// Maximum number of suggestions
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Read scanned codes from stdin, one per line, and look each up
    Scan,

    /// Write the loaded data to an .xlsx file named after its source
    Export {
        /// Target directory
        #[arg(long, short = 'd', default_value = ".")]
        dir: PathBuf,
    },

    /// Drop the cached data and reload from the remote URL
    ClearCache,

    /// Remove all cached state; the next run reloads from the remote URL
    Reset,

    /// Show where the current data came from
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = cli.url {
        config.remote_url = url;
    }
    if let Some(cache) = cli.cache {
        config.cache_path = Some(cache);
    }
    config.validate().context("Invalid command line settings")?;

    let session = LoaderSession::from_config(config).context("Failed to open coil session")?;
    let mut session = session.with_status_listener(|status| {
        if let LoadStatus::Loading { .. } = status {
            eprintln!("{}", status);
        }
    });

    match cli.command {
        Commands::Load { location, file } => cmd_load(&mut session, location, file),
        Commands::Lookup { query } => {
            start(&mut session)?;
            match session.lookup(&query) {
                Some(row) => println!("{}", format_row(row)),
                None => println!("{}", NOT_FOUND),
            }
            Ok(())
        }
        Commands::Suggest { partial, limit } => {
            start(&mut session)?;
            for suggestion in session.suggest(&partial, limit) {
                println!("{}", suggestion);
            }
            Ok(())
        }
        Commands::Scan => cmd_scan(&mut session),
        Commands::Export { dir } => {
            start(&mut session)?;
            let path = session.export(&dir).context("Export failed")?;
            println!("Exported to {}", path.display());
            Ok(())
        }
        Commands::ClearCache => {
            session.clear_cache().context("Failed to clear cached data")?;
            println!("{}", session.status());
            Ok(())
        }
        Commands::Reset => {
            session.reset().context("Reset failed")?;
            println!("App data cleared. The next run reloads from the remote source.");
            Ok(())
        }
        Commands::Status => {
            let status = session.startup().clone();
            println!("{}", status);
            if let LoadStatus::Loaded { rows, .. } = status {
                println!("Rows: {}", rows);
                println!("Key column: {}", session.config().key_column);
            }
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

/// Brings the session up from cache or remote; a failed load stops the command
fn start(session: &mut LoaderSession) -> Result<()> {
    let status = session.startup();
    if let LoadStatus::Failed { .. } = status {
        bail!("{}", status);
    }
    Ok(())
}

fn cmd_load(session: &mut LoaderSession, location: Option<String>, file: Option<PathBuf>) -> Result<()> {
    match (location, file) {
        (Some(location), None) if is_remote_url(&location) => session.load_remote_url(&location),
        (Some(location), None) => session.load_local(&PathBuf::from(location)),
        (_, Some(file)) => session.load_local(&file),
        (None, None) => session.load_remote(),
    }
    .context("Load failed")?;
    println!("{}", session.status());
    Ok(())
}

fn cmd_scan(session: &mut LoaderSession) -> Result<()> {
    start(session)?;
    let stdin = io::stdin();
    let mut scanner = LineScanner::new(stdin.lock());
    while let Some(outcome) = session.scan_with(&mut scanner)? {
        println!("> {}", outcome.code);
        match outcome.row {
            Some(row) => println!("{}", format_row(row)),
            None => println!("{}", NOT_FOUND),
        }
        println!();
    }
    Ok(())
}
