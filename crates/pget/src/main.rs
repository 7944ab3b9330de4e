//! pget - fetch a page through the counting cache

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use pagecache::{
    Fetcher, HttpFetcher, KeyValueStore, MemoryStore, PageCache, RemoteStore, SingleFlight,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL to fetch
    url: String,

    /// Store address (any Redis-compatible server)
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    store: String,

    /// Run against an in-process store instead of a server
    #[arg(long)]
    memory: bool,

    /// Cache entry lifetime in seconds
    #[arg(short, long, default_value_t = 10)]
    ttl: u64,

    /// Store operation deadline in seconds
    #[arg(long, default_value_t = 5)]
    store_timeout: u64,

    /// Fetch deadline in seconds
    #[arg(long, default_value_t = 30)]
    fetch_timeout: u64,

    /// Collapse concurrent fetches for the same URL
    #[arg(long)]
    single_flight: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let store: Arc<dyn KeyValueStore> = if args.memory {
        info!("Using in-process store (entries die with this run)");
        Arc::new(MemoryStore::new())
    } else {
        info!("Connecting to store at {}", args.store);
        Arc::new(
            RemoteStore::connect(&args.store, Duration::from_secs(args.store_timeout)).await?,
        )
    };

    let mut fetcher: Arc<dyn Fetcher> =
        Arc::new(HttpFetcher::new(Duration::from_secs(args.fetch_timeout))?);
    if args.single_flight {
        fetcher = Arc::new(SingleFlight::new(fetcher));
    }

    let cache = PageCache::new(store, fetcher).with_ttl(Duration::from_secs(args.ttl));

    info!("Fetching {}", args.url);
    println!("Fetching URL...");

    let content = cache.get_page(&args.url).await?;
    std::io::stdout().write_all(&content)?;
    println!();

    let count = cache.get_count(&args.url).await?;
    println!("URL accessed {} times", count);

    Ok(())
}
