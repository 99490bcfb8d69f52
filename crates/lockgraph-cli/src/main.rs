//! Lockgraph - lockfile inspection and formatting
//!
//! Usage:
//!   lockgraph fmt Gemfile.lock            # Print canonical form
//!   lockgraph fmt Gemfile.lock --check    # Non-zero exit if not canonical
//!   lockgraph show Gemfile.lock           # List locked packages
//!   lockgraph catalogs Gemfile.lock       # Construct registry catalogs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lockgraph_core::catalog::UrlCatalogFactory;
use lockgraph_core::config::LockConfig;
use lockgraph_core::lockfile::{
    Diagnostics, LockedPackage, LockfileStore, PackageOrigin, serialize_lockfile_with,
};

#[derive(Parser)]
#[command(name = "lockgraph")]
#[command(about = "Locked dependency graph tool", long_about = None)]
struct Cli {
    /// Path to lockgraph.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite a lockfile in canonical form
    Fmt {
        /// Lockfile to format
        lockfile: PathBuf,

        /// Exit non-zero if the file is not already canonical
        #[arg(long, conflicts_with = "write")]
        check: bool,

        /// Write the result back instead of printing it
        #[arg(short, long)]
        write: bool,
    },

    /// List locked packages and their origins
    Show {
        /// Lockfile to read
        lockfile: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Construct catalog handles for every registry remote
    Catalogs {
        /// Lockfile to read
        lockfile: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lockgraph=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = LockConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Fmt {
            lockfile,
            check,
            write,
        } => run_fmt(&config, &lockfile, check, write),
        Commands::Show { lockfile, format } => run_show(&lockfile, format),
        Commands::Catalogs { lockfile } => run_catalogs(&config, &lockfile),
    }
}

fn run_fmt(config: &LockConfig, path: &Path, check: bool, write: bool) -> Result<()> {
    let store = LockfileStore::new(path);
    let original = store.read_text()?;
    let loaded = store.load()?;
    print_diagnostics(&loaded.diagnostics);

    let formatted = serialize_lockfile_with(&loaded.graph, &config.pseudo_entries());

    if check {
        if formatted != original {
            anyhow::bail!("{} is not in canonical form", path.display());
        }
        println!("{} is canonical", path.display());
    } else if write {
        store.save(&loaded.graph, config)?;
        tracing::info!(path = %path.display(), "formatted lockfile");
    } else {
        print!("{}", formatted);
    }

    Ok(())
}

fn run_show(path: &Path, format: OutputFormat) -> Result<()> {
    let loaded = LockfileStore::new(path).load()?;
    print_diagnostics(&loaded.diagnostics);
    let graph = &loaded.graph;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(graph)?),
        OutputFormat::Table => {
            if graph.package_count() == 0 {
                println!("No packages locked.");
                return Ok(());
            }

            println!("{:<30} {:<24} Origin", "Name", "Version");
            println!("{}", "-".repeat(80));
            for package in graph.iter_packages() {
                println!(
                    "{:<30} {:<24} {}",
                    package.name(),
                    package.full_version(),
                    describe_origin(package)
                );
            }
        }
    }

    Ok(())
}

fn run_catalogs(config: &LockConfig, path: &Path) -> Result<()> {
    let loaded =
        LockfileStore::new(path).load_with_catalogs(config, Arc::new(UrlCatalogFactory))?;
    print_diagnostics(&loaded.diagnostics);

    let catalogs = loaded.graph.server_catalogs();
    if catalogs.is_empty() {
        println!("No registry remotes.");
        return Ok(());
    }

    let state_dir = config.state_dir()?;
    let mut failures = 0;
    for (remote, slot) in catalogs {
        match slot {
            Ok(catalog) => println!(
                "ok     {:<40} {}",
                remote,
                catalog.cache_dir(&state_dir).display()
            ),
            Err(e) => {
                failures += 1;
                println!("error  {:<40} {}", remote, e.message);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} catalogs failed", failures, catalogs.len());
    }
    Ok(())
}

fn describe_origin(package: &LockedPackage) -> String {
    match package.origin() {
        PackageOrigin::Registry => "registry".to_string(),
        PackageOrigin::Git(git) => match &git.reference {
            Some(reference) => format!(
                "git {}@{} ({}: {})",
                git.remote, git.revision, reference.kind, reference.value
            ),
            None => format!("git {}@{}", git.remote, git.revision),
        },
        PackageOrigin::Path(path) => format!("path {}", path.location),
    }
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        eprintln!("warning: {}", diagnostic);
    }
}
