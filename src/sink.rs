// Presentation sink - one-way notifications, never consulted

use crate::model::{AgentId, Card, Slot};
use std::time::Duration;
use tracing::{debug, info};

/// Fire-and-forget notifications about board, score, freeze and countdown
/// changes. Calls may happen with the board lock held and must not block.
pub trait Sink: Send + Sync {
    fn on_card_placed(&self, _card: Card, _slot: Slot) {}

    fn on_card_removed(&self, _slot: Slot) {}

    fn on_marker_placed(&self, _agent: AgentId, _slot: Slot) {}

    fn on_marker_removed(&self, _agent: AgentId, _slot: Slot) {}

    fn on_score_changed(&self, _agent: AgentId, _score: u32) {}

    /// `remaining` reaches zero when the freeze is over
    fn on_freeze_changed(&self, _agent: AgentId, _remaining: Duration) {}

    fn on_countdown_changed(&self, _remaining: Duration, _warn: bool) {}

    fn on_winners_announced(&self, _winners: &[AgentId]) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl Sink for NullSink {}

/// Renders notifications as structured log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn on_card_placed(&self, card: Card, slot: Slot) {
        debug!(%card, slot, "Card placed");
    }

    fn on_card_removed(&self, slot: Slot) {
        debug!(slot, "Card removed");
    }

    fn on_marker_placed(&self, agent: AgentId, slot: Slot) {
        debug!(%agent, slot, "Marker placed");
    }

    fn on_marker_removed(&self, agent: AgentId, slot: Slot) {
        debug!(%agent, slot, "Marker removed");
    }

    fn on_score_changed(&self, agent: AgentId, score: u32) {
        info!(%agent, score, "Score changed");
    }

    fn on_freeze_changed(&self, agent: AgentId, remaining: Duration) {
        tracing::trace!(%agent, remaining_ms = remaining.as_millis() as u64, "Freeze tick");
    }

    fn on_countdown_changed(&self, remaining: Duration, warn: bool) {
        // Whole seconds are enough outside the warning window
        if warn {
            tracing::trace!(remaining_ms = remaining.as_millis() as u64, "Countdown");
        } else if remaining.subsec_millis() < 100 {
            debug!(remaining_secs = remaining.as_secs(), "Countdown");
        }
    }

    fn on_winners_announced(&self, winners: &[AgentId]) {
        let winners: Vec<String> = winners.iter().map(ToString::to_string).collect();
        info!(winners = ?winners, "Winners announced");
    }
}
