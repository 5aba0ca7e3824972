use std::{error::Error, fmt};

use clap::Parser;

use crate::{
    cli::Cli,
    config::{Config, ConfigError},
};

pub struct Runtime {
    pub cli: Cli,
    pub config: Config,
}

impl Runtime {
    pub fn new() -> Result<Self, RuntimeError> {
        let cli = Cli::parse();
        let config = Config::new(&cli)?;

        Ok(Runtime { cli, config })
    }
}

#[derive(Debug)]
pub enum RuntimeError {
    Config(ConfigError),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Config(e) => e.fmt(f),
        }
    }
}

impl Error for RuntimeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RuntimeError::Config(e) => Some(e),
        }
    }
}

impl From<ConfigError> for RuntimeError {
    fn from(e: ConfigError) -> Self {
        RuntimeError::Config(e)
    }
}
