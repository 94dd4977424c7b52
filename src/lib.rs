// Set Arena Library - real-time group claiming game engine
// This exposes the core components for testing and embedding

pub mod agent;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod game;
pub mod model;
pub mod oracle;
pub mod shutdown;
pub mod sink;
pub mod table;
pub mod telemetry;

// Re-export key types for easy access
pub use agent::{AgentHandle, AgentMachine, Score};
pub use config::{GameConfig, ObservabilityConfig, PlayersConfig, TableConfig, TimingConfig};
pub use coordinator::{Coordinator, GameOutcome, RoundSettings};
pub use error::GameError;
pub use game::{Game, GameBuilder};
pub use model::{AgentId, AgentKind, AgentPhase, Card, FreezeKind, Slot, Verdict};
pub use oracle::{Oracle, ResidueOracle};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal, ShutdownTrigger};
pub use sink::{NullSink, Sink, TracingSink};
pub use table::{Board, BoardError, Deck, SharedTable, Table};
pub use telemetry::{create_round_span, generate_game_id, init_telemetry};

#[cfg(any(test, feature = "testing"))]
pub use oracle::MockOracle;
