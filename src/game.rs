// Game assembly - wires the table, the agents and the coordinator together
// and owns the lifecycle of the whole task tree

use crate::agent::{AgentHandle, FreezeTiming, GeneratorTiming, InputGenerator, Player};
use crate::config::GameConfig;
use crate::coordinator::{Coordinator, GameOutcome, RoundSettings};
use crate::error::GameError;
use crate::model::{AgentId, AgentKind};
use crate::oracle::Oracle;
use crate::shutdown::{ShutdownCoordinator, ShutdownTrigger};
use crate::sink::{Sink, TracingSink};
use crate::table::{SharedTable, Table};
use crate::telemetry::{create_agent_span, generate_game_id};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::iter;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, Instrument};

/// Collects the collaborators of a game before it starts.
pub struct GameBuilder {
    config: GameConfig,
    oracle: Option<Arc<dyn Oracle>>,
    sink: Arc<dyn Sink>,
    seed: Option<u64>,
}

impl GameBuilder {
    pub fn new(config: GameConfig) -> Self {
        let seed = config.seed;
        Self {
            config,
            oracle: None,
            sink: Arc::new(TracingSink),
            seed,
        }
    }

    pub fn oracle(mut self, oracle: impl Oracle + 'static) -> Self {
        self.oracle = Some(Arc::new(oracle));
        self
    }

    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = sink;
        self
    }

    /// Fix every random choice of the game. Overrides the configured seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Spawn every agent task and the coordinator. Must be called from
    /// within a tokio runtime.
    pub fn start(self) -> Result<Game, GameError> {
        self.config.validate()?;
        let oracle = self
            .oracle
            .ok_or_else(|| GameError::invalid_config("an oracle is required to start a game"))?;

        let config = self.config;
        let sink = self.sink;
        let game_id = generate_game_id();
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let slots = config.table.slots;
        let group_size = config.table.group_size;
        let table = Table::new(
            slots,
            group_size,
            config.table.deck_size,
            config.players.total(),
            Arc::clone(&sink),
        )
        .shared();

        let (checks_tx, checks_rx) = mpsc::unbounded_channel();
        let mut tasks = ShutdownCoordinator::new(config.timing.shutdown_grace());
        let freeze = FreezeTiming {
            point: config.timing.point_freeze(),
            penalty: config.timing.penalty_freeze(),
            tick: config.timing.freeze_tick(),
        };
        let generator_timing = GeneratorTiming {
            interval: config.timing.autonomous_input_interval(),
            grace: config.timing.autonomous_grace(),
        };

        // Humans first, so their ids are stable across bot counts
        let kinds = iter::repeat(AgentKind::Human)
            .take(config.players.human)
            .chain(iter::repeat(AgentKind::Autonomous).take(config.players.autonomous));

        let mut handles = Vec::with_capacity(config.players.total());
        let mut links = Vec::with_capacity(config.players.total());
        for (index, kind) in kinds.enumerate() {
            let id = AgentId(index);
            let (mut player, handle, link) = Player::new(
                id,
                kind,
                group_size,
                Arc::clone(&table),
                Arc::clone(&sink),
                checks_tx.clone(),
                freeze,
                tasks.signal(),
            );

            if kind == AgentKind::Autonomous {
                let generator = InputGenerator::new(
                    id,
                    slots,
                    handle.input_sender(),
                    handle.subscribe(),
                    StdRng::seed_from_u64(rng.random()),
                    generator_timing,
                    tasks.signal(),
                );
                let span = create_agent_span(&game_id, id);
                player = player.with_generator(tokio::spawn(generator.run().instrument(span)));
            }

            let span = create_agent_span(&game_id, id);
            tasks.spawn(id.to_string(), player.run().instrument(span));
            handles.push(handle);
            links.push(link);
        }
        drop(checks_tx);

        let trigger = tasks.trigger();
        let coordinator = Coordinator::new(
            game_id.clone(),
            RoundSettings::from_config(&config),
            Arc::clone(&table),
            oracle,
            sink,
            links,
            checks_rx,
            rng,
            tasks.signal(),
        );
        let span = tracing::info_span!("coordinator", game.id = %game_id);
        let task = tokio::spawn(coordinator.run(tasks).instrument(span));

        info!(
            game_id = %game_id,
            humans = config.players.human,
            bots = config.players.autonomous,
            slots,
            group_size,
            "Game started"
        );

        Ok(Game {
            game_id,
            agents: handles,
            table,
            trigger,
            task,
        })
    }
}

impl std::fmt::Debug for GameBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameBuilder")
            .field("config", &self.config)
            .field("has_oracle", &self.oracle.is_some())
            .field("seed", &self.seed)
            .finish()
    }
}

/// A running game.
pub struct Game {
    game_id: String,
    agents: Vec<AgentHandle>,
    table: SharedTable,
    trigger: ShutdownTrigger,
    task: JoinHandle<Result<GameOutcome, GameError>>,
}

impl Game {
    pub fn id(&self) -> &str {
        &self.game_id
    }

    pub fn agents(&self) -> &[AgentHandle] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&AgentHandle> {
        self.agents.get(id.index())
    }

    /// Shared table, for observers. Hold the lock briefly.
    pub fn table(&self) -> SharedTable {
        Arc::clone(&self.table)
    }

    /// Trigger usable after the game has been moved into `wait`
    pub fn terminator(&self) -> ShutdownTrigger {
        self.trigger.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Await the end of the game and the exit of every task.
    pub async fn wait(self) -> Result<GameOutcome, GameError> {
        self.task.await.map_err(|source| GameError::TaskJoin {
            task: "coordinator".to_string(),
            source,
        })?
    }

    /// Stop the game from outside. Returns once every task has been joined.
    pub async fn terminate(self) -> Result<GameOutcome, GameError> {
        info!(game_id = %self.game_id, "Termination requested");
        self.trigger.request();
        self.wait().await
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("game_id", &self.game_id)
            .field("agents", &self.agents.len())
            .field("finished", &self.task.is_finished())
            .finish()
    }
}
