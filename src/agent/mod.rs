// Player agents - state machine, task loop and synthetic input

pub mod generator;
pub mod machine;
pub mod player;

pub use generator::{GeneratorTiming, InputGenerator};
pub use machine::{AgentEvent, AgentMachine};
pub use player::{AgentHandle, AgentLink, FreezeTiming, Player, Score};
