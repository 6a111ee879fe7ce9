mod common;
mod scenarios;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    println!("🚀 Starting ZKML credit pipeline scenarios...");

    scenarios::happy_path::run().await?;
    scenarios::failures::run().await?;
    scenarios::session_events::run().await?;

    println!("\n🎉 All scenarios completed successfully!");
    Ok(())
}
