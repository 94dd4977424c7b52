// Coordinator - runs rounds, judges claims and ends the game
//
// All board reads that lead to a mutation happen under one acquisition of the
// table lock. Verdicts travel back on each check's own oneshot channel.

use crate::agent::AgentLink;
use crate::config::GameConfig;
use crate::error::GameError;
use crate::model::{AgentId, Card, PendingCheck, Verdict};
use crate::oracle::Oracle;
use crate::shutdown::{ShutdownCoordinator, ShutdownSignal};
use crate::sink::Sink;
use crate::table::SharedTable;
use crate::telemetry::create_round_span;
use rand::rngs::StdRng;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn, Instrument};

/// Rule and timing parameters of the round loop
#[derive(Debug, Clone, Copy)]
pub struct RoundSettings {
    pub group_size: usize,
    pub round: Duration,
    pub warning: Duration,
    pub tick: Duration,
    pub warning_tick: Duration,
}

impl RoundSettings {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            group_size: config.table.group_size,
            round: config.timing.round(),
            warning: config.timing.warning(),
            tick: config.timing.countdown_tick(),
            warning_tick: config.timing.warning_tick(),
        }
    }
}

/// Final report of a game
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameOutcome {
    pub game_id: String,
    /// `None` when the game was terminated from outside
    pub winners: Option<Vec<AgentId>>,
    pub scores: Vec<(AgentId, u32)>,
    pub rounds: u64,
    pub terminated: bool,
    pub cards_consumed: usize,
}

impl GameOutcome {
    pub fn score_of(&self, agent: AgentId) -> Option<u32> {
        self.scores
            .iter()
            .find(|(id, _)| *id == agent)
            .map(|(_, score)| *score)
    }
}

enum Wake {
    Shutdown,
    Check(PendingCheck),
    ChecksClosed,
    Tick,
}

pub struct Coordinator {
    game_id: String,
    settings: RoundSettings,
    table: SharedTable,
    oracle: Arc<dyn Oracle>,
    sink: Arc<dyn Sink>,
    agents: Vec<AgentLink>,
    checks: mpsc::UnboundedReceiver<PendingCheck>,
    checks_closed: bool,
    queue: VecDeque<PendingCheck>,
    rng: StdRng,
    deadline: Instant,
    finished: bool,
    rounds: u64,
    shutdown: ShutdownSignal,
}

impl Coordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        game_id: String,
        settings: RoundSettings,
        table: SharedTable,
        oracle: Arc<dyn Oracle>,
        sink: Arc<dyn Sink>,
        agents: Vec<AgentLink>,
        checks: mpsc::UnboundedReceiver<PendingCheck>,
        rng: StdRng,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            game_id,
            settings,
            table,
            oracle,
            sink,
            agents,
            checks,
            checks_closed: false,
            queue: VecDeque::new(),
            rng,
            deadline: Instant::now() + settings.round,
            finished: false,
            rounds: 0,
            shutdown,
        }
    }

    #[cfg(test)]
    fn deadline(&self) -> Instant {
        self.deadline
    }

    #[cfg(test)]
    fn is_finished(&self) -> bool {
        self.finished
    }

    fn should_finish(&self) -> bool {
        self.finished || self.shutdown.is_cancelled()
    }

    /// Run rounds until no qualifying group is left or termination is
    /// requested, then announce, stop every agent task and join them.
    pub async fn run(mut self, tasks: ShutdownCoordinator) -> Result<GameOutcome, GameError> {
        info!(
            game_id = %self.game_id,
            agents = self.agents.len(),
            tasks = tasks.tracked(),
            group_size = self.settings.group_size,
            "Coordinator starting"
        );

        while !self.should_finish() {
            self.rounds += 1;
            let span = create_round_span(&self.game_id, self.rounds);
            self.play_round().instrument(span).await;
        }

        let terminated = self.shutdown.is_cancelled();
        self.release_remaining();

        let winners = if terminated {
            info!(game_id = %self.game_id, "Game terminated externally, no winners announced");
            None
        } else {
            Some(self.announce_winners().await)
        };

        let joined = tasks.shutdown_all().await;
        // Claims submitted while agents were being stopped
        self.release_remaining();
        joined?;

        let cards_consumed = self.table.lock().await.consumed().len();
        let outcome = GameOutcome {
            game_id: self.game_id.clone(),
            winners,
            scores: self
                .agents
                .iter()
                .map(|agent| (agent.id, agent.score.get()))
                .collect(),
            rounds: self.rounds,
            terminated,
            cards_consumed,
        };
        info!(game_id = %self.game_id, rounds = outcome.rounds, "Coordinator terminated");
        Ok(outcome)
    }

    async fn play_round(&mut self) {
        let placed = {
            let mut table = self.table.lock().await;
            table.populate(&mut self.rng)
        };
        self.deadline = Instant::now() + self.settings.round;
        info!(placed, round_ms = self.settings.round.as_millis() as u64, "Round started");

        self.run_countdown().await;
    }

    async fn run_countdown(&mut self) {
        while !self.should_finish() {
            self.wait_for_wake().await;
            self.refresh_countdown();
            self.resolve_pending().await;

            if Instant::now() >= self.deadline {
                self.reshuffle().await;
                break;
            }
        }
    }

    /// Timed wait that also ends on a new check or on termination.
    /// Slices get shorter inside the warning window.
    async fn wait_for_wake(&mut self) {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        let tick = if remaining <= self.settings.warning {
            self.settings.warning_tick
        } else {
            self.settings.tick
        };

        let wake = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Wake::Shutdown,
            check = self.checks.recv(), if !self.checks_closed => match check {
                Some(check) => Wake::Check(check),
                None => Wake::ChecksClosed,
            },
            _ = tokio::time::sleep(remaining.min(tick)) => Wake::Tick,
        };

        match wake {
            Wake::Check(check) => self.queue.push_back(check),
            Wake::ChecksClosed => {
                debug!("Every agent dropped its check sender");
                self.checks_closed = true;
            }
            Wake::Shutdown | Wake::Tick => {}
        }
    }

    fn refresh_countdown(&self) {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        self.sink
            .on_countdown_changed(remaining, remaining <= self.settings.warning);
    }

    /// Judge every queued check in submission order.
    pub async fn resolve_pending(&mut self) {
        while let Ok(check) = self.checks.try_recv() {
            self.queue.push_back(check);
        }
        while let Some(check) = self.queue.pop_front() {
            let verdict = self.verify(&check).await;
            check.resolve(verdict);
        }
    }

    /// Decide one claim. Board and deck only change on `Reward`.
    pub async fn verify(&mut self, check: &PendingCheck) -> Verdict {
        let group_size = self.settings.group_size;
        let Some(agent) = self.agents.get(check.agent.index()) else {
            warn!(agent_id = %check.agent, "Check from unknown agent released");
            return Verdict::Release;
        };

        let mut table = self.table.lock().await;

        let marked = table.board.marker_count(check.agent);
        if marked < group_size {
            debug!(agent_id = %check.agent, marked, "Stale claim, markers invalidated");
            return Verdict::Release;
        }

        let cards: Vec<Card> = check
            .slots
            .iter()
            .filter_map(|slot| table.board.card_at(*slot))
            .collect();
        if cards.len() < group_size {
            debug!(agent_id = %check.agent, present = cards.len(), "Stale claim, slot emptied");
            return Verdict::Release;
        }

        if !self.oracle.is_qualifying_group(&cards) {
            info!(agent_id = %check.agent, cards = ?cards, "Claim rejected, penalty");
            return Verdict::Penalty;
        }

        for slot in &check.slots {
            table.replace_card(*slot, &mut self.rng);
        }
        let score = agent.score.increment();
        drop(table);

        self.sink.on_score_changed(check.agent, score);
        self.deadline = Instant::now() + self.settings.round;
        info!(agent_id = %check.agent, cards = ?cards, score, "Claim accepted, point awarded");
        Verdict::Reward
    }

    /// Deadline expired: everything back to the deck, then decide whether
    /// the game can go on.
    async fn reshuffle(&mut self) {
        let (returned, deck_size, group_left) = {
            let mut table = self.table.lock().await;
            let returned = table.return_all_to_deck();
            let group_left = self.oracle.any_qualifying_group_exists(table.deck.cards());
            (returned, table.deck.len(), group_left)
        };
        self.sink.on_countdown_changed(Duration::ZERO, true);

        info!(returned, deck_size, group_left, "Round deadline reached, table cleared");
        if !group_left {
            info!("No qualifying group left in the deck, game over");
            self.finished = true;
        }
    }

    /// Clear the table and report every agent sharing the top score.
    async fn announce_winners(&mut self) -> Vec<AgentId> {
        self.table.lock().await.return_all_to_deck();

        let best = self
            .agents
            .iter()
            .map(|agent| agent.score.get())
            .max()
            .unwrap_or(0);
        let winners: Vec<AgentId> = self
            .agents
            .iter()
            .filter(|agent| agent.score.get() == best)
            .map(|agent| agent.id)
            .collect();

        info!(winners = ?winners, score = best, "Announcing winners");
        self.sink.on_winners_announced(&winners);
        winners
    }

    /// Release every check that will never be judged.
    fn release_remaining(&mut self) {
        while let Ok(check) = self.checks.try_recv() {
            self.queue.push_back(check);
        }
        let released = self.queue.len();
        for check in self.queue.drain(..) {
            check.resolve(Verdict::Release);
        }
        if released > 0 {
            debug!(released, "Released unjudged checks");
        }
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("game_id", &self.game_id)
            .field("settings", &self.settings)
            .field("agents", &self.agents.len())
            .field("queued", &self.queue.len())
            .field("finished", &self.finished)
            .field("rounds", &self.rounds)
            .finish()
    }
}
