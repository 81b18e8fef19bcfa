use crate::{timeout::TimeoutOption, ExecErr};
use clap::{ArgAction, Parser};
use log::LevelFilter;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Raw timeout used when neither the command line nor the config file sets one.
pub const DEFAULT_TIMEOUT_RAW: &str = "7500";

/// Command line of `minecraft-query-exec`.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "minecraft-query-exec",
    version,
    about = "Query's a minecraft server port"
)]
pub struct Cli {
    /// The address and port of the server, e.g. `mc.example.com:25565`
    #[arg(value_name = "address:port")]
    pub address: String,

    /// The length in ms for timeout [default: 7500]
    #[arg(
        short,
        long,
        value_name = "int",
        num_args = 0..=1,
        env = "MINECRAFT_QUERY_TIMEOUT"
    )]
    pub timeout: Option<Option<String>>,

    /// JSON config file, e.g. `{ "timeout": 3000 }`
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Pick the raw timeout: command line or env first, then the config file,
    /// then [DEFAULT_TIMEOUT_RAW]. A bare `-t` carries no value and is
    /// treated like a boolean flag.
    pub fn timeout_option(&self, file_conf: Option<&FileConf>) -> TimeoutOption {
        match (&self.timeout, file_conf.and_then(|conf| conf.timeout.as_ref())) {
            (Some(Some(timeout)), _) => TimeoutOption::Text(timeout.clone()),
            (Some(None), _) => TimeoutOption::Unsupported("boolean"),
            (None, Some(value)) => TimeoutOption::from(value),
            (None, None) => TimeoutOption::Text(DEFAULT_TIMEOUT_RAW.into()),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Optional JSON configuration file.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConf {
    /// Kept as raw JSON so that `null` and wrongly typed values reach
    /// [crate::timeout::resolve_timeout] untouched.
    #[serde(default, deserialize_with = "present_value")]
    pub timeout: Option<Value>,
}

/// Distinguishes `"timeout": null` (`Some(Value::Null)`) from a missing key (`None`).
fn present_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl FileConf {
    pub fn from_json(json: &str) -> Result<Self, ExecErr> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ExecErr> {
        let json = std::fs::read_to_string(path).map_err(|err| {
            ExecErr::ConfigErr(format!(
                "Can not read config file {}, reason: {}",
                path.display(),
                err
            ))
        })?;

        Self::from_json(&json).map_err(|err| {
            ExecErr::ConfigErr(format!(
                "Invalid config file {}, reason: {}",
                path.display(),
                err
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeout::{resolve_timeout, DEFAULT_TIMEOUT_MS};
    use serde_json::json;

    #[test]
    fn address_is_required() {
        assert!(Cli::try_parse_from(["minecraft-query-exec"]).is_err());
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from([
            "minecraft-query-exec",
            "192.168.1.10:25565",
            "-t",
            "3000",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.address, "192.168.1.10:25565");
        assert_eq!(cli.timeout, Some(Some("3000".into())));
        assert_eq!(cli.log_level(), LevelFilter::Debug);
        assert_eq!(cli.config, None);
    }

    #[test]
    fn timeout_precedence() {
        let mut cli = Cli::try_parse_from(["minecraft-query-exec", "example.com:25565"]).unwrap();
        cli.timeout = None;
        let file_conf = FileConf::from_json(r#"{ "timeout": 1000 }"#).unwrap();

        assert_eq!(
            cli.timeout_option(None),
            TimeoutOption::Text(DEFAULT_TIMEOUT_RAW.into())
        );
        assert_eq!(
            cli.timeout_option(Some(&file_conf)),
            TimeoutOption::from(&json!(1000))
        );

        cli.timeout = Some(Some("250".into()));
        assert_eq!(
            cli.timeout_option(Some(&file_conf)),
            TimeoutOption::Text("250".into())
        );
    }

    #[test]
    fn bare_timeout_flag_falls_back_to_default() {
        let cli =
            Cli::try_parse_from(["minecraft-query-exec", "192.168.1.10:25565", "-t"]).unwrap();
        let option = cli.timeout_option(None);

        assert_eq!(cli.timeout, Some(None));
        assert_eq!(option, TimeoutOption::Unsupported("boolean"));
        assert_eq!(resolve_timeout(&option), DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn config_keeps_raw_timeout_shapes() {
        assert_eq!(FileConf::from_json("{}").unwrap().timeout, None);
        assert_eq!(
            FileConf::from_json(r#"{ "timeout": null }"#).unwrap().timeout,
            Some(Value::Null)
        );
        assert_eq!(
            FileConf::from_json(r#"{ "timeout": {} }"#).unwrap().timeout,
            Some(json!({}))
        );
        assert!(matches!(
            FileConf::from_json(r#"{ "tiemout": 1 }"#),
            Err(ExecErr::ConfigErr(_))
        ));
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        assert!(matches!(
            FileConf::load(Path::new("/nonexistent/minecraft-query-exec.json")),
            Err(ExecErr::ConfigErr(_))
        ));
    }
}
