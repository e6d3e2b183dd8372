//! Logger initialization (console + file)

use anyhow::Result;
use simplelog::*;
use std::fs::File;

/// Parse a level name, falling back to `Info` for anything unrecognised
pub fn parse_level(level: &str) -> LevelFilter {
    level.trim().parse().unwrap_or(LevelFilter::Info)
}

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file (truncated on start)
/// * `level` - Level name such as `info` or `debug`
pub fn init_logger(log_file_path: &str, level: &str) -> Result<()> {
    let level = parse_level(level);
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(level, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}
