//! Murmuration main entry point
//!
//! This is the command-line interface for the Murmuration social graph
//! harvester.

use clap::Parser;
use murmuration::config::load_config_with_hash;
use murmuration::crawler::bootstrap;
use murmuration::{ApiError, Crawler, MurmurationError, SqliteStore};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Murmuration: a rate-limit-aware social graph harvester
///
/// Murmuration crawls a social network outward from a seed user or hashtag,
/// sharing call budgets across a pool of accounts, and stores the harvested
/// graph of users, tweets, hashtags and resolved links in SQLite.
#[derive(Parser, Debug)]
#[command(name = "murmuration")]
#[command(version = "1.0.0")]
#[command(about = "A rate-limit-aware social graph harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Crawl outward from this user's relationship sets
    #[arg(long, value_name = "SCREEN_NAME")]
    follow_user: Option<String>,

    /// Scan the hashtags this stored user posts under
    #[arg(long, value_name = "SCREEN_NAME")]
    follow_user_hashtags: Option<String>,

    /// Scan a hashtag and walk its co-occurrence frontier
    #[arg(long, value_name = "TAG")]
    follow_hashtag: Option<String>,

    /// Scan a single hashtag without walking the frontier (repeatable)
    #[arg(long, value_name = "TAG")]
    hash: Vec<String>,

    /// Fetch full content for tweets the store only knows by id
    #[arg(long)]
    hydrate_tweets: bool,

    /// Relationship depth for --follow-user (overrides the config)
    #[arg(long, value_name = "DEPTH")]
    depth: Option<u32>,

    /// Frontier hop bound for --follow-hashtag
    #[arg(long, value_name = "HOPS", default_value_t = 3)]
    hops: u32,

    /// Validate config and show what would run without calling the upstream
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let no_mode = cli.follow_user.is_none()
        && cli.follow_user_hashtags.is_none()
        && cli.follow_hashtag.is_none()
        && cli.hash.is_empty()
        && !cli.hydrate_tweets;
    if no_mode {
        tracing::error!(
            "nothing to do: pass --follow-user, --follow-user-hashtags, \
             --follow-hashtag, --hash or --hydrate-tweets"
        );
        std::process::exit(2);
    }

    let max_depth = cli.depth.unwrap_or(config.crawler.max_depth);
    let mut crawler = bootstrap(&config).await?;
    let outcome = run_modes(&mut crawler, &cli, max_depth).await;

    match outcome {
        Ok(()) => {
            tracing::info!("Run completed after {} upstream calls", crawler.calls_made());
            Ok(())
        }
        // the ceiling ending a run is the budget working, not a failure
        Err(MurmurationError::Api(ApiError::CallBudgetExhausted(ceiling))) => {
            tracing::info!("Run stopped at the call ceiling of {}", ceiling);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}

/// Runs every requested mode in sequence; the modes are combinable and
/// share one crawler, so work done by an earlier mode is not redone.
async fn run_modes(
    crawler: &mut Crawler<SqliteStore>,
    cli: &Cli,
    max_depth: u32,
) -> Result<(), MurmurationError> {
    for tag in &cli.hash {
        crawler.query_for_hashtag(tag).await?;
    }
    if let Some(screen_name) = &cli.follow_user {
        crawler.follow_user(screen_name, max_depth).await?;
    }
    if let Some(screen_name) = &cli.follow_user_hashtags {
        crawler.follow_user_hashtags(screen_name).await?;
    }
    if let Some(tag) = &cli.follow_hashtag {
        crawler.follow_hashtag(tag, cli.hops).await?;
    }
    if cli.hydrate_tweets {
        crawler.hydrate_tweets().await?;
    }
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("murmuration=info,warn"),
            1 => EnvFilter::new("murmuration=debug,info"),
            2 => EnvFilter::new("murmuration=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would run
fn handle_dry_run(config: &murmuration::config::Config) {
    println!("=== Murmuration Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max friends to load: {}", config.crawler.max_friends_to_load);
    println!("  Stale after: {} days", config.crawler.stale_after_days);
    println!("  Call ceiling: {}", config.crawler.call_ceiling);

    println!("\nUpstream API:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  Reset pad: {}s", config.api.reset_pad_secs);
    println!("  Cooldown: {}s", config.api.cooldown_secs);

    println!("\nLink Resolver:");
    println!("  Max hops: {}", config.resolver.max_hops);
    println!("  Max in flight: {}", config.resolver.max_in_flight);

    println!("\nStore:");
    println!("  Database: {}", config.store.database_path);

    println!("\nAccounts ({}):", config.accounts.len());
    for account in &config.accounts {
        println!("  - {}", account.name);
    }

    println!("\n✓ Configuration is valid");
}
