use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use sinkroute::config::{BuildProfile, SinkConfig};
use sinkroute::logging::{self, Logger, SessionMetadata};

fn main() -> Result<()> {
    // Console sink output goes through this subscriber
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sinkroute=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let profile = BuildProfile::current();
    let config = SinkConfig::load_for_profile(profile)?;
    let logger = Logger::new(config, SessionMetadata::new());
    logger.set_session_metadata(SessionMetadata::describe(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        profile,
        logger.capabilities(),
    ));

    println!("Capabilities: {}", logger.capabilities());
    println!("Log file: {}", logger.log_file_path().display());

    let _guard = logging::global::install(logger)?;

    let messages: Vec<String> = std::env::args().skip(1).collect();
    if messages.is_empty() {
        logging::global::info("sinkroute started with no messages");
    }
    for message in messages {
        logging::global::info(message);
    }

    Ok(())
}
