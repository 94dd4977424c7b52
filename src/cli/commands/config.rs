use anyhow::Result;
use set_arena::GameConfig;
use std::path::PathBuf;

pub struct ConfigCommand {
    pub config_path: Option<PathBuf>,
    pub write: Option<PathBuf>,
}

impl ConfigCommand {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            write: None,
        }
    }

    pub fn with_write(mut self, write: Option<PathBuf>) -> Self {
        self.write = write;
        self
    }

    pub fn execute(&self) -> Result<()> {
        let config = GameConfig::load(self.config_path.as_deref())?;

        match &self.write {
            Some(path) => {
                config.save_to_file(path)?;
                println!("Configuration written to {}", path.display());
            }
            None => print!("{}", config.to_toml()?),
        }
        Ok(())
    }
}
