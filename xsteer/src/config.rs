use std::{error::Error, fmt, path::PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// How the XDP program is attached to the interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachMode {
    /// Native driver mode, falling back to generic mode if the driver
    /// refuses the program.
    #[default]
    Auto,
    /// Native driver mode only.
    Driver,
    /// Generic (SKB) mode.
    Skb,
    /// Hardware offload.
    Hw,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Interface the redirect program attaches to.
    pub interface: String,
    pub attach_mode: AttachMode,
    /// bpffs path the socket map is pinned at. This is the handle external
    /// control planes open to manage bindings.
    pub pin_path: PathBuf,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            interface: "eth0".to_string(),
            attach_mode: AttachMode::Auto,
            pin_path: PathBuf::from("/sys/fs/bpf/xsteer"),
        }
    }
}

impl Config {
    /// Precedence: CLI overrides > `XSTEER_*` environment > YAML file >
    /// defaults.
    pub fn new(cli: &Cli) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        if let Some(config_path) = &cli.config {
            figment = figment.merge(Yaml::file(config_path));
        }

        let mut config: Config = figment.merge(Env::prefixed("XSTEER_")).extract()?;

        if let Some(iface) = &cli.iface {
            config.interface = iface.clone();
        }

        Ok(config)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Extraction(figment::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Extraction(e) => write!(f, "configuration error: {}", e),
        }
    }
}

impl Error for ConfigError {}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Extraction(e)
    }
}
