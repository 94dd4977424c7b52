use crate::config::ObservabilityConfig;
use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Initialize structured logging.
///
/// `RUST_LOG` takes precedence over the configured level. Events go to stderr
/// so stdout stays free for results. JSON output carries the current span so
/// game and round ids travel with every event.
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;

    if config.json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .with(filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .try_init()?;
    }

    tracing::info!("set-arena telemetry initialized");
    Ok(())
}

/// Generate an id linking every event of one game
pub fn generate_game_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create a span with common round attributes
pub fn create_round_span(game_id: &str, round: u64) -> tracing::Span {
    tracing::info_span!("round", game.id = game_id, round = round)
}

/// Create a span for one agent task
pub fn create_agent_span(game_id: &str, agent: crate::model::AgentId) -> tracing::Span {
    tracing::info_span!("agent", game.id = game_id, agent.id = %agent)
}
