use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

/// Warnings are always visible; `verbose` turns on the debug trace of OCR
/// block counts, key rotation and retry waits.
pub fn init(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = fmt()
        .with_max_level(level)
        .with_target(false)
        .with_level(true)
        .try_init();
    Ok(())
}
