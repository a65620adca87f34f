mod config;
mod crawler;
mod progress;
mod storage;

use tracing_subscriber::EnvFilter;

use config::Config;
use crawler::service::ScrapeService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = Config::from_env()?;
    let chunk_size = cfg.chunk_size;

    let service = ScrapeService::new(cfg)?;
    let summary = service.run().await?;

    let processed = (summary.last_processed + 1).max(0) as usize;

    println!("\n==============================");
    println!("ASINs attempted this chunk: {}", summary.attempted);
    println!("Products with data found:   {}", summary.found);
    println!("Processed so far: {} / {}", processed, summary.total);
    println!("==============================\n");

    if summary.remaining > 0 {
        println!(
            "Run again to process the next {} ASINs",
            chunk_size.min(summary.remaining)
        );
    } else {
        println!("All ASINs have been processed!");
    }

    Ok(())
}
