use crate::model::{AgentId, AgentPhase, FreezeKind, Verdict};
use serde::{Deserialize, Serialize};
use statig::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentEvent {
    /// Marker count reached the group size and a check was queued
    ClaimSubmitted,
    VerdictReceived(Verdict),
    FreezeElapsed,
    Terminate,
}

/// Transition table of one player agent.
///
/// Events that a state does not expect are ignored, which keeps late or
/// duplicated wakes harmless.
#[derive(Debug)]
pub struct AgentMachine {
    pub agent_id: AgentId,
    pub(crate) claims_submitted: u64,
    pub(crate) last_verdict: Option<Verdict>,
}

impl AgentMachine {
    pub fn new(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            claims_submitted: 0,
            last_verdict: None,
        }
    }
}

#[state_machine(initial = "State::open()", state(derive(Debug, Clone, PartialEq, Eq)))]
impl AgentMachine {
    #[state]
    fn open(&mut self, event: &AgentEvent) -> Outcome<State> {
        match event {
            AgentEvent::ClaimSubmitted => {
                self.claims_submitted += 1;
                tracing::debug!(agent_id = %self.agent_id, "Claim submitted, awaiting verdict");
                Transition(State::awaiting_verdict())
            }
            AgentEvent::Terminate => Transition(State::closed()),
            _ => Handled,
        }
    }

    #[state]
    fn awaiting_verdict(&mut self, event: &AgentEvent) -> Outcome<State> {
        match event {
            AgentEvent::VerdictReceived(verdict) => {
                self.last_verdict = Some(*verdict);
                tracing::debug!(agent_id = %self.agent_id, ?verdict, "Verdict received");
                match verdict {
                    Verdict::Reward => Transition(State::frozen(FreezeKind::Point)),
                    Verdict::Penalty => Transition(State::frozen(FreezeKind::Penalty)),
                    Verdict::Release => Transition(State::open()),
                }
            }
            AgentEvent::Terminate => Transition(State::closed()),
            _ => Handled,
        }
    }

    #[state]
    fn frozen(&mut self, kind: &mut FreezeKind, event: &AgentEvent) -> Outcome<State> {
        match event {
            AgentEvent::FreezeElapsed => {
                tracing::debug!(agent_id = %self.agent_id, kind = ?kind, "Freeze over");
                Transition(State::open())
            }
            AgentEvent::Terminate => Transition(State::closed()),
            _ => Handled,
        }
    }

    #[state]
    fn closed(&mut self, event: &AgentEvent) -> Outcome<State> {
        tracing::trace!(agent_id = %self.agent_id, ?event, "Agent closed, event ignored");
        Handled
    }
}

/// Observable phase for a machine state
pub fn phase_of(state: &State) -> AgentPhase {
    match state {
        State::Open { .. } => AgentPhase::Open,
        State::AwaitingVerdict { .. } => AgentPhase::AwaitingVerdict,
        State::Frozen { kind } => AgentPhase::Frozen(*kind),
        State::Closed { .. } => AgentPhase::Closed,
    }
}
