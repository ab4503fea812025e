use anyhow::{Context, Result};
use log::{LevelFilter, debug};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::config::env::Config as AppConfig;

const CONSOLE_PATTERN: &str = "{d(%H:%M:%S)} {h({l:<5})} {m}{n}";
const FILE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {l:<5} {t} - {m}{n}";

/// Build the log4rs configuration: stderr always, plus `LOG_FILE` when set
pub fn build_config(config: &AppConfig) -> Result<Config> {
    let level = if config.debug_logs_enabled {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .build();

    let mut builder = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)));
    let mut root = Root::builder().appender("stderr");

    if let Some(path) = &config.log_file {
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(FILE_PATTERN)))
            .build(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;

        builder = builder.appender(Appender::builder().build("file", Box::new(file)));
        root = root.appender("file");
    }

    builder
        .build(root.build(level))
        .context("Invalid logging configuration")
}

/// Install the global logger and record where credentials live
pub fn init(config: &AppConfig) -> Result<()> {
    log4rs::init_config(build_config(config)?).context("Logger already initialized")?;

    debug!("Token path: {}", config.token_path.display());
    debug!("Credentials path: {}", config.credentials_path.display());
    Ok(())
}
