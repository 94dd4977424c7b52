// Synthetic input for autonomous agents

use crate::model::{AgentId, AgentPhase, Slot};
use crate::shutdown::ShutdownSignal;
use rand::rngs::StdRng;
use rand::Rng;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy)]
pub struct GeneratorTiming {
    /// Delay between two presses
    pub interval: Duration,
    /// Pause after the agent submits a claim
    pub grace: Duration,
}

/// Random slot presser feeding one autonomous agent.
///
/// Presses go through the agent's bounded input queue, so a busy agent slows
/// the generator down instead of letting presses pile up.
pub struct InputGenerator {
    agent: AgentId,
    slots: usize,
    input: mpsc::Sender<Slot>,
    phase: watch::Receiver<AgentPhase>,
    rng: StdRng,
    timing: GeneratorTiming,
    shutdown: ShutdownSignal,
}

impl InputGenerator {
    pub fn new(
        agent: AgentId,
        slots: usize,
        input: mpsc::Sender<Slot>,
        phase: watch::Receiver<AgentPhase>,
        rng: StdRng,
        timing: GeneratorTiming,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            agent,
            slots,
            input,
            phase,
            rng,
            timing,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        debug!(agent_id = %self.agent, "Input generator starting");

        while !self.shutdown.is_cancelled() && self.slots > 0 {
            let phase = *self.phase.borrow_and_update();
            match phase {
                AgentPhase::Closed => break,
                AgentPhase::Open => {
                    let slot = self.rng.random_range(0..self.slots);
                    trace!(agent_id = %self.agent, slot, "Synthetic press");
                    let sent = tokio::select! {
                        biased;
                        _ = self.shutdown.cancelled() => false,
                        sent = self.input.send(slot) => sent.is_ok(),
                    };
                    if !sent {
                        break;
                    }
                    if !self.pause(self.timing.interval).await {
                        break;
                    }
                }
                AgentPhase::AwaitingVerdict => {
                    // Let the coordinator dequeue before pressing again
                    if !self.pause(self.timing.grace).await || !self.wait_until_open().await {
                        break;
                    }
                }
                AgentPhase::Frozen(_) => {
                    if !self.wait_until_open().await {
                        break;
                    }
                }
            }
        }

        debug!(agent_id = %self.agent, "Input generator terminated");
    }

    /// Sleep unless shutdown arrives first. Returns false on shutdown.
    async fn pause(&mut self, duration: Duration) -> bool {
        if duration.is_zero() {
            tokio::task::yield_now().await;
            return !self.shutdown.is_cancelled();
        }
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    /// Block until the agent accepts input again. Returns false on shutdown
    /// or when the agent closed.
    async fn wait_until_open(&mut self) -> bool {
        let reopened = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => None,
            phase = self.phase.wait_for(|p| p.accepts_input() || p.is_closed()) => {
                phase.ok().map(|p| p.accepts_input())
            }
        };
        reopened.unwrap_or(false)
    }
}

impl std::fmt::Debug for InputGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputGenerator")
            .field("agent", &self.agent)
            .field("slots", &self.slots)
            .field("timing", &self.timing)
            .finish()
    }
}
