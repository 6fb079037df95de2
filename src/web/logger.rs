use std::path::Path;

use chrono::Local;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} - {l} - {m}{n}";

pub fn parse_level(level: &str) -> LevelFilter {
    level.parse().unwrap_or(LevelFilter::Info)
}

/// Console appender always; a timestamped file under `log_dir` when given.
pub fn build_config(level: &str, log_dir: Option<&Path>) -> anyhow::Result<Config> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();

    let mut builder = Config::builder().appender(Appender::builder().build("stdout", Box::new(stdout)));
    let mut root = Root::builder().appender("stdout");

    if let Some(dir) = log_dir {
        std::fs::create_dir_all(dir)?;
        let timestamp = Local::now().format("%Y-%m-%d-%H_%M").to_string();
        let file_appender = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build(dir.join(format!("{timestamp}.log")))?;
        builder = builder.appender(Appender::builder().build("file", Box::new(file_appender)));
        root = root.appender("file");
    }

    Ok(builder.build(root.build(parse_level(level)))?)
}

pub fn setup_logging(level: &str, log_dir: Option<&Path>) -> anyhow::Result<()> {
    log4rs::init_config(build_config(level, log_dir)?)?;
    Ok(())
}
