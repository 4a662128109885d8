use clap::{Parser, Subcommand};
use status_poller::config::{ConfigLoader, PollerConfig};
use status_poller::metrics::MetricsCollector;
use status_poller::poller::StatusPoller;
use status_poller::session::Session;
use status_poller::snapshot::measure_fetch;
use status_poller::source::{HttpStatusSource, StatusSource};
use std::path::PathBuf;
use std::sync::Arc;
use validator::Validate;

#[derive(Parser)]
#[command(name = "status-poller")]
#[command(version = "0.1.0")]
#[command(about = "Live view of a backend's server-info endpoint", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the status endpoint interactively
    Watch {
        /// Path to a configuration file (JSON/YAML/TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Backend base URL, overrides the config file
        #[arg(short, long)]
        url: Option<String>,

        /// Start with live view on
        #[arg(short, long)]
        live: bool,

        /// Fetch once before the session starts instead of showing a loading state
        #[arg(long)]
        prefetch: bool,

        /// Disable the spinner and log bridge (stderr)
        #[arg(long)]
        no_progress: bool,
    },
    /// Fetch the status once and print it
    Fetch {
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long)]
        url: Option<String>,
    },
    /// Validate a configuration file
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn resolve_config(path: Option<PathBuf>, url: Option<String>) -> anyhow::Result<PollerConfig> {
    let mut config = match path {
        Some(path) => {
            log::info!("Loading config from {:?}", path);
            ConfigLoader::load(&path)?
        }
        None => ConfigLoader::defaults()?,
    };
    if let Some(url) = url {
        config.api_url = url;
        config.validate()?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "info"); }
    }
    let cli = Cli::parse();
    let logger = env_logger::Builder::from_default_env().build();
    let level = logger.filter();
    let multi = Arc::new(indicatif::MultiProgress::new());

    let progress = matches!(cli.command, Commands::Watch { no_progress: false, .. });
    if progress {
        indicatif_log_bridge::LogWrapper::new((*multi).clone(), logger).try_init()?;
    } else {
        log::set_boxed_logger(Box::new(logger))?;
    }
    log::set_max_level(level);

    match cli.command {
        Commands::Watch { config, url, live, prefetch, .. } => {
            let mut config = resolve_config(config, url)?;
            if live {
                config.live_view = Some(true);
            }
            if prefetch {
                config.prefetch = Some(true);
            }

            let source = Arc::new(HttpStatusSource::from_config(&config)?);
            log::info!("Watching {} ({})", config.name, source.describe());

            let seed = if config.prefetches() {
                let snapshot = measure_fetch(&*source).await;
                if snapshot.is_available() {
                    Some(snapshot)
                } else {
                    log::warn!("Prefetch failed, starting with a loading state");
                    None
                }
            } else {
                None
            };

            let metrics = Arc::new(MetricsCollector::new());
            let poller = StatusPoller::initialize(source, seed, Some(metrics.clone()));
            if config.starts_live() {
                poller.set_live_view(true);
            }

            let multi = progress.then(|| multi.clone());
            let output = ConfigLoader::create_output(&config, multi.clone())?;

            println!("Commands: r=refresh, l=toggle live view, s=status, q=quit");
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let shutdown = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            let final_metrics = Session::new(poller, output, multi).run(stdin, shutdown).await?;

            println!("\n✅ Session ended:");
            println!("   Fetches: {} ({} failed)", final_metrics.fetches_total, final_metrics.fetches_failed);
            println!(
                "   Manual: {} | Live view: {} | Initial: {}",
                final_metrics.manual_refreshes, final_metrics.live_view_ticks, final_metrics.initial_fetches
            );
            println!("   Success Rate: {:.1}%", final_metrics.success_rate);
            println!("   Average Duration: {}ms", final_metrics.avg_fetch_time_ms);
            println!("   Total Time: {:.1}s", final_metrics.elapsed_seconds);
        }
        Commands::Fetch { config, url } => {
            let config = resolve_config(config, url)?;
            let source = HttpStatusSource::from_config(&config)?;
            let snapshot = measure_fetch(&source).await;

            match &snapshot.payload {
                Some(payload) => {
                    println!("{}", serde_json::to_string_pretty(payload)?);
                    println!("✅ {} answered in {}ms", source.describe(), snapshot.duration_ms);
                }
                None => {
                    eprintln!("❌ {} unavailable after {}ms", source.describe(), snapshot.duration_ms);
                    std::process::exit(1);
                }
            }
        }
        Commands::Check { config } => match ConfigLoader::load(&config) {
            Ok(cfg) => {
                println!("✅ Config is valid:");
                println!("   Name: {}", cfg.name);
                println!("   Endpoint: {}", cfg.endpoint()?);
                println!("   Timeout: {}ms", cfg.timeout_ms);
                println!("   Live view: {} | Prefetch: {}", cfg.starts_live(), cfg.prefetches());
            }
            Err(e) => {
                eprintln!("❌ Config error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
