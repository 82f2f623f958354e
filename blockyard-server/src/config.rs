//! Command-line options and configuration files.

use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use blockyard::WorldConfig;
use blockyard::worldgen::FlatTerrain;

use crate::logging::LoggingArgs;

/// Command-line options of `blockyard-server`.
#[derive(Clone, Debug, clap::Parser)]
#[command(author, about, version)]
pub struct Args {
    /// Address and port to listen on. Port 0 picks an unused port.
    #[arg(long = "bind", value_name = "ADDR", default_value = "127.0.0.1:0")]
    pub bind: SocketAddr,

    /// JSON file containing the world and terrain configuration.
    ///
    /// Missing fields take their default values.
    #[arg(long = "config", short = 'c', value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    #[expect(clippy::doc_markdown, reason = "will be displayed in --help")]
    /// Override a configuration value, after the configuration file is read.
    ///
    /// The value is specified as a key-value pair where the key is a dot-separated path
    /// such as "world.chunk_max", the separator is “=”, and the value is a JSON value
    /// (which, if a string, must be quoted); for example: -Sworld.world_size=128
    #[arg(long = "set", short = 'S', value_parser = parse_setting, value_name = "NAME=JSON")]
    pub set: Vec<(String, serde_json::Value)>,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub logging: LoggingArgs,
}

/// Everything configurable about the hosted world, as read from a configuration file.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct ServerConfig {
    #[allow(missing_docs)]
    pub world: WorldConfig,
    /// Initial contents of the world.
    pub terrain: FlatTerrain,
}

impl Args {
    /// Reads the configuration file, if any, applies `--set` overrides, and validates the
    /// result.
    pub fn server_config(&self) -> Result<ServerConfig, anyhow::Error> {
        let mut json = match &self.config_file {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("could not open config file {}", path.display()))?;
                serde_json::from_reader(BufReader::new(file))
                    .with_context(|| format!("syntax error in config file {}", path.display()))?
            }
            None => serde_json::to_value(ServerConfig::default())?,
        };

        for (key, value) in &self.set {
            set_path(&mut json, key, value.clone()).with_context(|| format!("--set {key}"))?;
        }

        let config: ServerConfig =
            serde_json::from_value(json).context("configuration is not valid")?;
        config.world.validate().context("configuration is not valid")?;
        Ok(config)
    }
}

fn parse_setting(arg: &str) -> Result<(String, serde_json::Value), anyhow::Error> {
    let (key, value) = arg.split_once('=').ok_or_else(|| anyhow::anyhow!("missing '='"))?;
    let value = serde_json::from_str(value)?;
    Ok((key.to_owned(), value))
}

/// Stores `value` at the dot-separated `path` within `json`, creating objects as needed.
fn set_path(
    json: &mut serde_json::Value,
    path: &str,
    value: serde_json::Value,
) -> Result<(), anyhow::Error> {
    let mut target = json;
    for key in path.split('.') {
        if target.is_null() {
            *target = serde_json::Value::Object(serde_json::Map::new());
        }
        let serde_json::Value::Object(map) = target else {
            anyhow::bail!("{key:?} is not inside an object");
        };
        target = map.entry(key).or_insert(serde_json::Value::Null);
    }
    *target = value;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser as _;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> clap::error::Result<Args> {
        Args::try_parse_from(std::iter::once("blockyard-server").chain(args.iter().copied()))
    }

    #[test]
    fn defaults() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.bind, "127.0.0.1:0".parse().unwrap());
        assert_eq!(args.server_config().unwrap(), ServerConfig::default());
    }

    #[test]
    fn set_overrides() {
        let args = parse(&[
            "--set",
            "world.world_size=32",
            "-Sterrain.cameras=[[1, 8, 1]]",
        ])
        .unwrap();
        let config = args.server_config().unwrap();
        assert_eq!(config.world.world_size, 32);
        assert_eq!(config.terrain.cameras, vec![blockyard::math::Cube::new(1, 8, 1)]);
    }

    #[test]
    fn set_syntax_errors() {
        assert!(parse(&["--set", "world.world_size"]).is_err());
        assert!(parse(&["--set", "world.world_size=big"]).is_err());
    }

    #[test]
    fn invalid_values_rejected() {
        let args = parse(&["--set", "world.chunk_max=0"]).unwrap();
        assert!(args.server_config().is_err());
        let args = parse(&["--set", "world.no_such_field=1"]).unwrap();
        assert!(args.server_config().is_err());
        let args = parse(&["--set", "world.world_size.x=1"]).unwrap();
        assert!(args.server_config().is_err());
    }

    #[test]
    fn set_path_creates_objects() {
        let mut json = serde_json::json!({});
        set_path(&mut json, "a.b", serde_json::json!(1)).unwrap();
        assert_eq!(json, serde_json::json!({"a": {"b": 1}}));
    }
}
