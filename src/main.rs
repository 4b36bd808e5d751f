mod config;
mod discovery;
mod pip;
mod task;
mod tui;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = config::Config::load_or_default()?;

    tui::run(config).await?;

    Ok(())
}
