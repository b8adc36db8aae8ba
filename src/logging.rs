//! Log subscriber setup
//!
//! Everything is logged through `tracing`. The subscriber writes JSON lines or
//! compact text to stdout depending on [`LogFormat`].

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{AgentConfig, LogFormat};

/// Parses a level name; unknown names fall back to INFO.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" | "critical" | "fatal" => LevelFilter::ERROR,
        "off" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

pub fn init(config: &AgentConfig) -> anyhow::Result<()> {
    let level = parse_level(&config.log_level);
    let filter = filter::Targets::new().with_targets(vec![("aiops_agent", level)]);

    let json = (config.log_format == LogFormat::Json).then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .json()
            .flatten_event(true)
            .with_current_span(false)
    });

    let text = (config.log_format == LogFormat::Text).then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .compact()
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(json)
        .with(text)
        .with(filter)
        .try_init()?;

    tracing::info!(
        level = %level,
        format = ?config.log_format,
        "logging configured"
    );

    Ok(())
}
