// Shared vocabulary for the board, the agents and the coordinator

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::oneshot;

/// Positional index of a board slot, in `[0, slots)`.
pub type Slot = usize;

/// Opaque card identifier. Distinct across deck, board and consumed pile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Card(pub u32);

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "card#{}", self.0)
    }
}

/// Agent identity, also its index into per-agent tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub usize);

impl AgentId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent{:03}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentKind {
    /// Input arrives from an external source through `AgentHandle::handle_input`
    Human,
    /// Input is produced by a dedicated generator task
    Autonomous,
}

/// Outcome the coordinator delivers for a single pending check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// The group qualified; the score was already incremented
    Reward,
    /// The group did not qualify
    Penalty,
    /// The claim went stale before it could be judged; no freeze
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FreezeKind {
    Point,
    Penalty,
}

/// Externally observable phase of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentPhase {
    Open,
    AwaitingVerdict,
    Frozen(FreezeKind),
    Closed,
}

impl AgentPhase {
    pub fn accepts_input(self) -> bool {
        matches!(self, AgentPhase::Open)
    }

    pub fn is_closed(self) -> bool {
        matches!(self, AgentPhase::Closed)
    }
}

/// A completed candidate claim waiting for the coordinator.
///
/// `slots` is the agent's marker set at submission time. The reply sender is
/// the agent's private outcome signal and is consumed exactly once.
#[derive(Debug)]
pub struct PendingCheck {
    pub agent: AgentId,
    pub slots: Vec<Slot>,
    pub reply: oneshot::Sender<Verdict>,
}

impl PendingCheck {
    pub fn new(agent: AgentId, slots: Vec<Slot>) -> (Self, oneshot::Receiver<Verdict>) {
        let (reply, outcome) = oneshot::channel();
        (
            Self {
                agent,
                slots,
                reply,
            },
            outcome,
        )
    }

    /// Deliver the verdict. A closed receiver means the agent already left.
    pub fn resolve(self, verdict: Verdict) {
        if self.reply.send(verdict).is_err() {
            tracing::debug!(agent = %self.agent, ?verdict, "Agent gone before verdict delivery");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_phase_input_gate() {
        assert!(AgentPhase::Open.accepts_input());
        assert!(!AgentPhase::AwaitingVerdict.accepts_input());
        assert!(!AgentPhase::Frozen(FreezeKind::Penalty).accepts_input());
        assert!(AgentPhase::Closed.is_closed());
    }

    #[tokio::test]
    async fn test_pending_check_delivers_once() {
        let (check, outcome) = PendingCheck::new(AgentId(2), vec![0, 1, 2]);
        assert_eq!(check.slots, vec![0, 1, 2]);
        check.resolve(Verdict::Penalty);
        assert_eq!(outcome.await.unwrap(), Verdict::Penalty);
    }

    #[test]
    fn test_resolve_after_agent_left_is_silent() {
        let (check, outcome) = PendingCheck::new(AgentId(0), vec![3]);
        drop(outcome);
        check.resolve(Verdict::Reward);
    }
}
