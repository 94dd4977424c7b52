use anyhow::Result;
use clap::Parser;
use set_arena::GameConfig;

mod cli;

use cli::commands::config::ConfigCommand;
use cli::commands::play::PlayCommand;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    GameConfig::load_env_file()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            config,
            humans,
            bots,
            seed,
            round_seconds,
            json,
        } => {
            let command = PlayCommand::new(config)
                .with_players(humans, bots)
                .with_seed(seed)
                .with_round_seconds(round_seconds)
                .with_json(json);

            let runtime = tokio::runtime::Runtime::new()?;
            let result = runtime.block_on(command.execute());
            // A pending stdin read would otherwise keep the process alive
            runtime.shutdown_background();
            result
        }
        Commands::Config { config, write } => ConfigCommand::new(config).with_write(write).execute(),
    }
}
