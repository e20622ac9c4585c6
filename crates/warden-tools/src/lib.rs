//! Shared helpers for the Warden operator tools

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Install a stderr log subscriber at the given level
pub fn init_logging(level: Level) -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
