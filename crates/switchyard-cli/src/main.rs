//! switchyard CLI
//!
//! Command-line tool for inspecting and caching route tables.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use switchyard::{render_route_table, FileStore, ManifestFactory, RouteCache, RouteCollectorFactory};

/// Inspect and cache switchyard route tables.
#[derive(Parser)]
#[command(name = "switchyard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Route manifest files or directories.
    #[arg(short, long, env = "SWITCHYARD_ROUTES", value_delimiter = ',', default_value = "routes")]
    routes: Vec<String>,

    /// Directory backing the route cache.
    #[arg(short, long, env = "SWITCHYARD_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered routes.
    #[command(name = "router:list")]
    List,

    /// Write the route table to the cache.
    #[command(name = "router:cache")]
    Cache {
        /// Environment the cache entry belongs to.
        #[arg(short, long, env = "SWITCHYARD_ENV")]
        environment: Option<String>,

        /// Entry lifetime in seconds (no expiry if not specified).
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// Remove the cached route table.
    #[command(name = "router:cache-clear")]
    CacheClear {
        /// Environment the cache entry belongs to.
        #[arg(short, long, env = "SWITCHYARD_ENV")]
        environment: Option<String>,
    },
}

fn route_cache(cache_dir: Option<PathBuf>) -> Option<RouteCache> {
    let Some(dir) = cache_dir else {
        error!("Route cache is not configured (set --cache-dir or SWITCHYARD_CACHE_DIR).");
        return None;
    };
    Some(RouteCache::new(Arc::new(FileStore::new(dir))))
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let factory = ManifestFactory::new(&cli.routes);

    match cli.command {
        Commands::List => {
            let routes = factory.create()?;
            print!("{}", render_route_table(&routes));
        }

        Commands::Cache { environment, ttl } => {
            let Some(mut cache) = route_cache(cli.cache_dir) else {
                return Ok(ExitCode::FAILURE);
            };
            if let Some(seconds) = ttl {
                cache = cache.ttl(Duration::from_secs(seconds));
            }

            let key = RouteCache::cache_key(environment.as_deref());
            let dumped = factory
                .create()
                .and_then(|routes| cache.dump(&routes, environment.as_deref()));
            if let Err(e) = dumped {
                error!("{e}");
                return Ok(ExitCode::FAILURE);
            }
            info!("Route cache written ({key}).");
        }

        Commands::CacheClear { environment } => {
            let Some(cache) = route_cache(cli.cache_dir) else {
                return Ok(ExitCode::FAILURE);
            };

            let key = RouteCache::cache_key(environment.as_deref());
            if !cache.clear(environment.as_deref())? {
                error!("Route cache could not be cleared ({key}).");
                return Ok(ExitCode::FAILURE);
            }
            info!("Route cache cleared ({key}).");
        }
    }

    Ok(ExitCode::SUCCESS)
}
