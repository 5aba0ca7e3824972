use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::Level;

#[derive(Parser, Debug, Serialize, Deserialize)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Set the path to the configuration file (e.g., "xsteer.yaml").
    #[arg(short, long, value_name = "FILE", env = "XSTEER_CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Attach to this network interface, overriding the configuration file.
    #[arg(short, long, value_name = "IFACE", env = "XSTEER_IFACE")]
    pub iface: Option<String>,

    /// Set the application's log level (e.g., "debug", "warn").
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        env = "XSTEER_LOG_LEVEL",
        default_value = "info"
    )]
    #[serde(with = "level_serde")]
    pub log_level: Level,
}

mod level_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(level.as_str())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<Level>().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::{env, path::PathBuf};

    use clap::Parser as _;
    use serial_test::serial;
    use tracing::Level;

    use super::Cli;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("XSTEER_CONFIG_PATH");
            env::remove_var("XSTEER_IFACE");
            env::remove_var("XSTEER_LOG_LEVEL");
        }
    }

    #[test]
    #[serial]
    fn parses_long_flags() {
        clear_env_vars();

        unsafe {
            // ensures that CLI args override env vars
            env::set_var("XSTEER_CONFIG_PATH", "/tmp/xsteer.yaml");
            env::set_var("XSTEER_IFACE", "eth9");
            env::set_var("XSTEER_LOG_LEVEL", "debug");
        }

        let args = [
            "xsteer",
            "--config",
            "/path/to/conf.yaml",
            "--iface",
            "eth1",
            "--log-level",
            "warn",
        ];
        let cli = Cli::parse_from(args);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/conf.yaml")));
        assert_eq!(cli.iface, Some("eth1".to_string()));
        assert_eq!(cli.log_level, Level::WARN);
    }

    #[test]
    #[serial]
    fn parses_from_env_when_no_args() {
        clear_env_vars();

        unsafe {
            env::set_var("XSTEER_CONFIG_PATH", "/tmp/xsteer.yaml");
            env::set_var("XSTEER_IFACE", "eth2");
            env::set_var("XSTEER_LOG_LEVEL", "debug");
        }

        let cli = Cli::parse_from(["xsteer"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/xsteer.yaml")));
        assert_eq!(cli.iface, Some("eth2".to_string()));
        assert_eq!(cli.log_level, Level::DEBUG);
    }

    #[test]
    #[serial]
    fn default_log_level_is_info() {
        clear_env_vars();
        let cli = Cli::parse_from(["xsteer"]);
        assert_eq!(cli.log_level, Level::INFO);
    }

    #[test]
    #[serial]
    fn iface_is_optional() {
        clear_env_vars();
        let cli = Cli::parse_from(["xsteer"]);
        assert_eq!(cli.iface, None);
    }
}
