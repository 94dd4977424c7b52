use anyhow::Result;
use set_arena::{
    init_telemetry, AgentHandle, AgentId, AgentKind, GameBuilder, GameConfig, GameOutcome,
    ResidueOracle, ShutdownTrigger, Slot,
};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

pub struct PlayCommand {
    pub config_path: Option<PathBuf>,
    pub humans: Option<usize>,
    pub bots: Option<usize>,
    pub seed: Option<u64>,
    pub round_seconds: Option<u64>,
    pub json: bool,
}

impl PlayCommand {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            humans: None,
            bots: None,
            seed: None,
            round_seconds: None,
            json: false,
        }
    }

    pub fn with_players(mut self, humans: Option<usize>, bots: Option<usize>) -> Self {
        self.humans = humans;
        self.bots = bots;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_round_seconds(mut self, round_seconds: Option<u64>) -> Self {
        self.round_seconds = round_seconds;
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Loaded configuration with command-line overrides applied on top
    fn effective_config(&self) -> Result<GameConfig> {
        let mut config = GameConfig::load(self.config_path.as_deref())?;
        if let Some(humans) = self.humans {
            config.players.human = humans;
        }
        if let Some(bots) = self.bots {
            config.players.autonomous = bots;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(seconds) = self.round_seconds {
            config.timing.round_ms = seconds.saturating_mul(1_000);
        }
        config.validate()?;
        Ok(config)
    }

    pub async fn execute(&self) -> Result<()> {
        let config = self.effective_config()?;
        init_telemetry(&config.observability)?;

        let game = GameBuilder::new(config.clone())
            .oracle(ResidueOracle::new(config.table.group_size))
            .start()?;

        let humans: Vec<AgentHandle> = game
            .agents()
            .iter()
            .filter(|agent| agent.kind() == AgentKind::Human)
            .cloned()
            .collect();
        if !self.json {
            eprintln!(
                "Game {} started: {} slots, groups of {}, {} human and {} autonomous players",
                game.id(),
                config.table.slots,
                config.table.group_size,
                config.players.human,
                config.players.autonomous
            );
            if !humans.is_empty() {
                eprintln!("Type \"<agent> <slot>\" to toggle a marker, \"quit\" to stop");
            }
        }

        let terminator = game.terminator();
        let input = (!humans.is_empty()).then(|| tokio::spawn(read_inputs(humans, terminator.clone())));
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, terminating game");
                terminator.request();
            }
        });

        let outcome = game.wait().await;
        interrupt.abort();
        if let Some(input) = input {
            input.abort();
        }
        let outcome = outcome?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            print_summary(&outcome);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Press(AgentId, Slot),
    Quit,
}

fn parse_input(line: &str) -> Option<Input> {
    let mut parts = line.split_whitespace();
    let first = parts.next()?;
    if matches!(first, "q" | "quit") {
        return parts.next().is_none().then_some(Input::Quit);
    }

    let agent = first.parse().ok()?;
    let slot = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Input::Press(AgentId(agent), slot))
}

/// Feed stdin lines to the human agents until EOF or "quit".
async fn read_inputs(agents: Vec<AgentHandle>, terminator: ShutdownTrigger) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("Input stream closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read input");
                break;
            }
        };

        match parse_input(&line) {
            Some(Input::Quit) => {
                terminator.request();
                break;
            }
            Some(Input::Press(agent, slot)) => {
                match agents.iter().find(|handle| handle.id() == agent) {
                    Some(handle) => {
                        if !handle.handle_input(slot) {
                            debug!(agent_id = %agent, slot, phase = ?handle.phase(), "Input dropped");
                        }
                    }
                    None => warn!(agent_id = %agent, "No human player with this id"),
                }
            }
            None if line.trim().is_empty() => {}
            None => warn!(line = %line, "Expected \"<agent> <slot>\" or \"quit\""),
        }
    }
}

fn print_summary(outcome: &GameOutcome) {
    let status = if outcome.terminated {
        "terminated"
    } else {
        "finished"
    };
    println!(
        "Game {} {} after {} round(s), {} card(s) claimed",
        outcome.game_id, status, outcome.rounds, outcome.cards_consumed
    );

    let winners = outcome.winners.as_deref().unwrap_or_default();
    for (agent, score) in &outcome.scores {
        let mark = if winners.contains(agent) { "  winner" } else { "" };
        println!("  {agent}  {score:>3}{mark}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_press() {
        assert_eq!(parse_input("0 5"), Some(Input::Press(AgentId(0), 5)));
        assert_eq!(parse_input("  2   11 "), Some(Input::Press(AgentId(2), 11)));
    }

    #[test]
    fn test_parse_quit() {
        assert_eq!(parse_input("quit"), Some(Input::Quit));
        assert_eq!(parse_input("q"), Some(Input::Quit));
        assert_eq!(parse_input("quit now"), None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_input(""), None);
        assert_eq!(parse_input("1"), None);
        assert_eq!(parse_input("a 1"), None);
        assert_eq!(parse_input("1 2 3"), None);
        assert_eq!(parse_input("1 -2"), None);
    }
}
