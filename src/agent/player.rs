// Player agent task - turns slot inputs into marker toggles and waits for
// verdicts on completed claims

use super::machine::{phase_of, AgentEvent, AgentMachine};
use crate::model::{AgentId, AgentKind, AgentPhase, FreezeKind, PendingCheck, Slot, Verdict};
use crate::shutdown::ShutdownSignal;
use crate::sink::Sink;
use crate::table::SharedTable;
use statig::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Freeze lengths and refresh slice for one agent
#[derive(Debug, Clone, Copy)]
pub struct FreezeTiming {
    pub point: Duration,
    pub penalty: Duration,
    pub tick: Duration,
}

impl FreezeTiming {
    pub fn duration(&self, kind: FreezeKind) -> Duration {
        match kind {
            FreezeKind::Point => self.point,
            FreezeKind::Penalty => self.penalty,
        }
    }
}

/// Score cell shared between an agent and the coordinator.
///
/// Only the coordinator writes it, and only while holding the table lock
/// during a `Reward` verdict. The owning agent reads it after that verdict
/// has been delivered on the check's oneshot, so it never observes a write
/// in progress. Observers outside the game only ever see a whole value.
#[derive(Debug, Default)]
pub struct Score(AtomicU32);

impl Score {
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn increment(&self) -> u32 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// External face of an agent: input entry point and observers.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    id: AgentId,
    kind: AgentKind,
    input: mpsc::Sender<Slot>,
    phase: watch::Receiver<AgentPhase>,
    score: Arc<Score>,
}

impl AgentHandle {
    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn phase(&self) -> AgentPhase {
        *self.phase.borrow()
    }

    pub fn score(&self) -> u32 {
        self.score.get()
    }

    /// Deliver one slot press. Returns false when the input was dropped
    /// because the agent is not accepting input or its queue is full.
    pub fn handle_input(&self, slot: Slot) -> bool {
        if !self.phase().accepts_input() {
            return false;
        }
        self.input.try_send(slot).is_ok()
    }

    /// Wait until the agent's phase satisfies `pred`. Returns the matching
    /// phase, or `Closed` if the agent task is gone.
    pub async fn wait_for_phase<F>(&self, mut pred: F) -> AgentPhase
    where
        F: FnMut(AgentPhase) -> bool,
    {
        let mut phase = self.phase.clone();
        let reached = match phase.wait_for(|current| pred(*current)).await {
            Ok(matched) => *matched,
            Err(_) => AgentPhase::Closed,
        };
        reached
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<AgentPhase> {
        self.phase.clone()
    }

    pub(crate) fn input_sender(&self) -> mpsc::Sender<Slot> {
        self.input.clone()
    }
}

/// Coordinator-side view of an agent: identity and score only.
#[derive(Debug, Clone)]
pub struct AgentLink {
    pub id: AgentId,
    pub score: Arc<Score>,
}

enum Wake {
    Shutdown,
    Input(Slot),
    InputClosed,
    Verdict(Verdict),
}

/// Owned state of a running agent task.
pub struct Player {
    id: AgentId,
    group_size: usize,
    table: SharedTable,
    sink: Arc<dyn Sink>,
    checks: mpsc::UnboundedSender<PendingCheck>,
    machine: StateMachine<AgentMachine>,
    inputs: mpsc::Receiver<Slot>,
    phase: watch::Sender<AgentPhase>,
    outcome: Option<oneshot::Receiver<Verdict>>,
    freeze: FreezeTiming,
    shutdown: ShutdownSignal,
    generator: Option<JoinHandle<()>>,
}

impl Player {
    /// Build an agent and its handles. The input queue holds at most one
    /// group's worth of presses.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: AgentId,
        kind: AgentKind,
        group_size: usize,
        table: SharedTable,
        sink: Arc<dyn Sink>,
        checks: mpsc::UnboundedSender<PendingCheck>,
        freeze: FreezeTiming,
        shutdown: ShutdownSignal,
    ) -> (Self, AgentHandle, AgentLink) {
        let (input_tx, inputs) = mpsc::channel(group_size.max(1));
        let (phase, phase_rx) = watch::channel(AgentPhase::Open);
        let score = Arc::new(Score::default());

        let player = Self {
            id,
            group_size,
            table,
            sink,
            checks,
            machine: AgentMachine::new(id).state_machine(),
            inputs,
            phase,
            outcome: None,
            freeze,
            shutdown,
            generator: None,
        };
        let handle = AgentHandle {
            id,
            kind,
            input: input_tx,
            phase: phase_rx,
            score: Arc::clone(&score),
        };
        (player, handle, AgentLink { id, score })
    }

    /// Attach the input generator of an autonomous agent; joined on exit.
    pub fn with_generator(mut self, generator: JoinHandle<()>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn current_phase(&self) -> AgentPhase {
        phase_of(self.machine.state())
    }

    /// Main loop of the agent task.
    pub async fn run(mut self) {
        info!(agent_id = %self.id, "Agent starting");

        loop {
            match self.current_phase() {
                AgentPhase::Open => self.serve_input().await,
                AgentPhase::AwaitingVerdict => self.await_verdict().await,
                AgentPhase::Frozen(kind) => self.serve_freeze(kind).await,
                AgentPhase::Closed => break,
            }
        }

        if let Some(generator) = self.generator.take() {
            if let Err(e) = generator.await {
                warn!(agent_id = %self.id, error = %e, "Input generator did not exit cleanly");
            }
        }
        let stats = self.machine.inner();
        info!(
            agent_id = %self.id,
            claims = stats.claims_submitted,
            last_verdict = ?stats.last_verdict,
            "Agent terminated"
        );
    }

    fn dispatch(&mut self, event: AgentEvent) {
        let before = self.current_phase();
        self.machine.handle(&event);
        let after = self.current_phase();
        if before == after {
            return;
        }

        // Presses queued while the agent was not accepting input are stale
        if after == AgentPhase::Open {
            let mut dropped = 0;
            while self.inputs.try_recv().is_ok() {
                dropped += 1;
            }
            if dropped > 0 {
                debug!(agent_id = %self.id, dropped, "Discarded stale inputs");
            }
        }

        debug!(agent_id = %self.id, from = ?before, to = ?after, "Agent phase changed");
        self.phase.send_replace(after);
    }

    async fn serve_input(&mut self) {
        let wake = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Wake::Shutdown,
            input = self.inputs.recv() => match input {
                Some(slot) => Wake::Input(slot),
                None => Wake::InputClosed,
            },
        };

        match wake {
            Wake::Input(slot) => self.toggle(slot).await,
            Wake::InputClosed => {
                // No more input can arrive; idle until termination
                self.shutdown.cancelled().await;
                self.dispatch(AgentEvent::Terminate);
            }
            _ => self.dispatch(AgentEvent::Terminate),
        }
    }

    /// Toggle the marker on `slot`; submit a check when the group completes.
    async fn toggle(&mut self, slot: Slot) {
        let completed = {
            let mut table = self.table.lock().await;
            if table.board.remove_marker(self.id, slot) {
                None
            } else if table.board.place_marker(self.id, slot)
                && table.board.marker_count(self.id) == self.group_size
            {
                Some(table.board.markers_of(self.id).to_vec())
            } else {
                None
            }
        };

        if let Some(slots) = completed {
            self.submit(slots);
        }
    }

    fn submit(&mut self, slots: Vec<Slot>) {
        let (check, outcome) = PendingCheck::new(self.id, slots);
        debug!(agent_id = %self.id, slots = ?check.slots, "Submitting claim");
        if self.checks.send(check).is_err() {
            // Coordinator already gone; nothing will ever judge this claim
            self.dispatch(AgentEvent::Terminate);
            return;
        }
        self.outcome = Some(outcome);
        self.dispatch(AgentEvent::ClaimSubmitted);
    }

    async fn await_verdict(&mut self) {
        let Some(outcome) = self.outcome.as_mut() else {
            self.dispatch(AgentEvent::VerdictReceived(Verdict::Release));
            return;
        };

        let wake = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Wake::Shutdown,
            verdict = outcome => Wake::Verdict(verdict.unwrap_or(Verdict::Release)),
        };

        self.outcome = None;
        match wake {
            Wake::Verdict(verdict) => self.dispatch(AgentEvent::VerdictReceived(verdict)),
            _ => self.dispatch(AgentEvent::Terminate),
        }
    }

    /// Sit out the freeze in short slices so the display stays live and
    /// termination is observed promptly.
    async fn serve_freeze(&mut self, kind: FreezeKind) {
        let until = Instant::now() + self.freeze.duration(kind);

        loop {
            let now = Instant::now();
            if now >= until {
                break;
            }
            let remaining = until - now;
            self.sink.on_freeze_changed(self.id, remaining);

            let cancelled = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => true,
                _ = tokio::time::sleep(remaining.min(self.freeze.tick)) => false,
            };
            if cancelled {
                self.sink.on_freeze_changed(self.id, Duration::ZERO);
                self.dispatch(AgentEvent::Terminate);
                return;
            }
        }
        self.sink.on_freeze_changed(self.id, Duration::ZERO);

        if kind == FreezeKind::Point {
            let cleared = self.table.lock().await.board.clear_markers(self.id);
            if cleared > 0 {
                debug!(agent_id = %self.id, cleared, "Cleared leftover markers after point");
            }
        }
        self.dispatch(AgentEvent::FreezeElapsed);
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .field("phase", &self.current_phase())
            .field("outcome_pending", &self.outcome.is_some())
            .field("has_generator", &self.generator.is_some())
            .finish()
    }
}
