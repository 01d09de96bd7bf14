use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use dutype::error::{Error, Severity};
use dutype::index::build::{IndexBuilder, remove_root};
use dutype::index::info::store_report;
use dutype::index::{DucOracle, IndexOptions, Oracle, SnifferKind, Store};
use dutype::output;
use dutype::query::{Resolved, resolve};
use dutype::utils::AppConfig;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dutype", version)]
#[command(about = "Index what kind of data lives under a directory, then ask instantly")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Index store file (defaults to the per-user data directory)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Classifier worker threads (0 = all cores)
    #[arg(short, long, global = true)]
    jobs: Option<usize>,

    /// Smallest entry size, in bytes, that gets sniffed
    #[arg(long, global = true)]
    min_inspect: Option<u64>,

    /// Give up on the disk usage oracle after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Content sniffer: builtin or file
    #[arg(long, global = true)]
    sniffer: Option<SnifferKind>,

    /// Disk usage oracle executable
    #[arg(long, global = true)]
    oracle: Option<String>,

    /// Disk usage oracle database
    #[arg(long, global = true)]
    oracle_db: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// No progress bars
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify everything under the given roots and store the result
    Index {
        /// Roots to index (default: current directory)
        paths: Vec<String>,
    },
    /// Show what kind of data lives under the given paths
    Ls {
        /// Paths to look up (default: current directory)
        paths: Vec<String>,

        /// List every entry, not just the per-label summary
        #[arg(short, long)]
        long: bool,

        /// Emit JSON
        #[arg(long)]
        json: bool,
    },
    /// Show store location, age and indexed roots
    Info,
    /// Forget indexed roots
    Remove {
        /// Roots to remove (exact match)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let setup = effective_config(&cli).and_then(|config| {
        let store = Store::new(config.effective_store_path()?);
        Ok((config, store))
    });
    let (config, store) = match setup {
        Ok(setup) => setup,
        Err(e) => {
            let mut worst = Severity::Ok;
            report(&mut worst, "loading configuration", &e);
            return Ok(ExitCode::from(worst.exit_code() as u8));
        }
    };

    let worst = match cli.command {
        Commands::Index { ref paths } => cmd_index(&cli, &config, &store, or_cwd(paths)),
        Commands::Ls {
            ref paths,
            long,
            json,
        } => cmd_ls(&cli, &store, or_cwd(paths), long, json)?,
        Commands::Info => cmd_info(&cli, &config, &store)?,
        Commands::Remove { ref paths } => cmd_remove(&store, paths),
    };

    Ok(ExitCode::from(worst.exit_code() as u8))
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Config file values with command line overrides applied
fn effective_config(cli: &Cli) -> dutype::Result<AppConfig> {
    let mut config = AppConfig::load()?;

    if let Some(store) = &cli.store {
        config.store_path = Some(store.clone());
    }
    if let Some(jobs) = cli.jobs {
        config.jobs = jobs;
    }
    if let Some(min_inspect) = cli.min_inspect {
        config.min_inspect = min_inspect;
    }
    if let Some(timeout) = cli.timeout {
        config.oracle_timeout_secs = Some(timeout);
    }
    if let Some(sniffer) = cli.sniffer {
        config.sniffer = sniffer;
    }
    if let Some(oracle) = &cli.oracle {
        config.oracle_binary = oracle.clone();
    }
    if let Some(db) = &cli.oracle_db {
        config.oracle_database = Some(db.clone());
    }

    Ok(config)
}

fn or_cwd(paths: &[String]) -> Vec<String> {
    if paths.is_empty() {
        vec![".".to_string()]
    } else {
        paths.to_vec()
    }
}

fn build_oracle(config: &AppConfig) -> DucOracle {
    DucOracle::new(config.oracle_binary.clone())
        .with_database(config.oracle_database.clone())
        .with_timeout(config.oracle_timeout())
}

/// Log a failure and fold it into the worst severity so far
fn report(worst: &mut Severity, context: &str, err: &Error) -> Severity {
    error!("{}: {}", context, err);
    let severity = err.severity();
    *worst = (*worst).max(severity);
    severity
}

fn cmd_index(cli: &Cli, config: &AppConfig, store: &Store, paths: Vec<String>) -> Severity {
    let oracle = build_oracle(config);
    let sniffer = config.sniffer.build();
    let options = IndexOptions {
        min_inspect: config.min_inspect,
        jobs: config.jobs,
        progress: !cli.quiet && std::io::stderr().is_terminal(),
    };
    let builder = IndexBuilder::new(store, &oracle, sniffer.as_ref(), options);

    let mut out = output::stdout(!cli.no_color);
    let mut worst = Severity::Ok;

    for path in paths {
        match builder.index(&path) {
            Ok(build) => {
                if let Err(e) = output::print_build_report(&mut out, &build) {
                    error!("failed to write output: {}", e);
                }
            }
            Err(e) => {
                if report(&mut worst, &path, &e) == Severity::Fatal {
                    break;
                }
            }
        }
    }

    worst
}

fn cmd_ls(cli: &Cli, store: &Store, paths: Vec<String>, long: bool, json: bool) -> Result<Severity> {
    let mut worst = Severity::Ok;

    let index = match store.load() {
        Ok(index) => index,
        Err(e) => {
            report(&mut worst, "loading index", &e);
            return Ok(worst);
        }
    };

    let mut out = output::stdout(!cli.no_color);
    let mut views: Vec<Resolved> = Vec::new();

    for path in paths {
        match resolve(&index, &path) {
            Ok(resolved) if json => views.push(resolved),
            Ok(resolved) => output::print_view(&mut out, &resolved, long)?,
            Err(e) => {
                report(&mut worst, &path, &e);
            }
        }
    }

    if json {
        output::print_views_json(&mut out, &views)?;
    }

    Ok(worst)
}

fn cmd_info(cli: &Cli, config: &AppConfig, store: &Store) -> Result<Severity> {
    let mut worst = Severity::Ok;

    let info = match store_report(store) {
        Ok(info) => info,
        Err(e) => {
            report(&mut worst, "reading index store", &e);
            return Ok(worst);
        }
    };

    let mut out = output::stdout(!cli.no_color);
    match build_oracle(config).coverage() {
        Ok(rows) => output::print_info(&mut out, &info, Ok(rows.as_slice()))?,
        Err(e) => output::print_info(&mut out, &info, Err(e.to_string().as_str()))?,
    }

    Ok(worst)
}

fn cmd_remove(store: &Store, paths: &[String]) -> Severity {
    let mut worst = Severity::Ok;

    for path in paths {
        match remove_root(store, path) {
            Ok(true) => println!("Removed: {}", path),
            Ok(false) => {
                let e = Error::PathNotIndexed(path.clone());
                report(&mut worst, path, &e);
            }
            Err(e) => {
                if report(&mut worst, path, &e) == Severity::Fatal {
                    break;
                }
            }
        }
    }

    worst
}
