//! `tracker.toml` loading.
//!
//! Precedence, lowest to highest: built-in defaults, the config file,
//! `TRACKER_*` environment variables, command-line flags.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracker_core::Actor;

/// Config file consulted when `--config` is not given. Optional.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "tracker.toml";
/// Journal used when neither config nor flags name one.
pub(crate) const DEFAULT_JOURNAL: &str = "tracker.jsonl";
/// Default rate limit: 60 requests per minute per IP.
pub(crate) const DEFAULT_RATE_LIMIT: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("no local actor configured; set [local] actor in tracker.toml or TRACKER_ACTOR")]
    MissingActor,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct TrackerConfig {
    pub(crate) journal: Option<PathBuf>,
    pub(crate) server: ServerConfig,
    pub(crate) local: LocalConfig,
    pub(crate) principals: Vec<PrincipalConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ServerConfig {
    pub(crate) port: u16,
    pub(crate) bind: String,
    /// Requests per minute per IP.
    pub(crate) rate_limit: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 8080,
            bind: "0.0.0.0".to_string(),
            rate_limit: DEFAULT_RATE_LIMIT,
        }
    }
}

/// Identity used by local subcommands that write to the ledger.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LocalConfig {
    pub(crate) actor: Option<String>,
}

/// A bearer token and the actor it authenticates as.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PrincipalConfig {
    pub(crate) token: String,
    pub(crate) actor: String,
}

impl TrackerConfig {
    /// Load from `path`, or from `tracker.toml` in the working directory if
    /// it exists, then apply environment overrides.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => TrackerConfig::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub(crate) fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply `TRACKER_JOURNAL`, `TRACKER_ACTOR` and `TRACKER_RATE_LIMIT`.
    pub(crate) fn apply_env<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(journal) = var("TRACKER_JOURNAL").filter(|v| !v.is_empty()) {
            self.journal = Some(PathBuf::from(journal));
        }
        if let Some(actor) = var("TRACKER_ACTOR").filter(|v| !v.is_empty()) {
            self.local.actor = Some(actor);
        }
        if let Some(raw) = var("TRACKER_RATE_LIMIT") {
            self.server.rate_limit = raw.parse().map_err(|_| ConfigError::Invalid {
                key: "TRACKER_RATE_LIMIT".to_string(),
                reason: format!("expected a non-negative integer, got '{}'", raw),
            })?;
        }
        Ok(())
    }

    pub(crate) fn journal_path(&self) -> PathBuf {
        self.journal
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_JOURNAL))
    }

    pub(crate) fn local_actor(&self) -> Result<Actor, ConfigError> {
        let identity = self.local.actor.as_deref().ok_or(ConfigError::MissingActor)?;
        Actor::new(identity).map_err(|_| ConfigError::MissingActor)
    }

    /// Token to actor table used by the HTTP server.
    pub(crate) fn principal_table(&self) -> Result<HashMap<String, Actor>, ConfigError> {
        let mut table = HashMap::new();
        for (idx, principal) in self.principals.iter().enumerate() {
            let key = format!("principals[{}]", idx);
            if principal.token.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "token must not be empty".to_string(),
                });
            }
            let actor = Actor::new(principal.actor.as_str()).map_err(|e| ConfigError::Invalid {
                key: key.clone(),
                reason: e.to_string(),
            })?;
            if table.insert(principal.token.clone(), actor).is_some() {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "duplicate token".to_string(),
                });
            }
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
journal = "data/ledger.jsonl"

[server]
port = 9000
rate_limit = 120

[local]
actor = "farm:green-valley"

[[principals]]
token = "t-farm"
actor = "farm:green-valley"

[[principals]]
token = "t-dist"
actor = "distributor:fresh-co"
"#;

    #[test]
    fn parses_full_config() {
        let config = TrackerConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.journal_path(), PathBuf::from("data/ledger.jsonl"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.rate_limit, 120);
        assert_eq!(config.local_actor().unwrap().as_str(), "farm:green-valley");
        let table = config.principal_table().unwrap();
        assert_eq!(table["t-dist"].as_str(), "distributor:fresh-co");
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = TrackerConfig::parse("").unwrap();
        assert_eq!(config.journal_path(), PathBuf::from(DEFAULT_JOURNAL));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.rate_limit, DEFAULT_RATE_LIMIT);
        assert!(matches!(config.local_actor(), Err(ConfigError::MissingActor)));
        assert!(config.principal_table().unwrap().is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(TrackerConfig::parse("jornal = \"x\"").is_err());
    }

    #[test]
    fn env_overrides_file() {
        let mut config = TrackerConfig::parse(SAMPLE).unwrap();
        config
            .apply_env(|key| match key {
                "TRACKER_JOURNAL" => Some("/tmp/other.jsonl".to_string()),
                "TRACKER_ACTOR" => Some("retailer:corner".to_string()),
                "TRACKER_RATE_LIMIT" => Some("5".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.journal_path(), PathBuf::from("/tmp/other.jsonl"));
        assert_eq!(config.local_actor().unwrap().as_str(), "retailer:corner");
        assert_eq!(config.server.rate_limit, 5);
    }

    #[test]
    fn bad_rate_limit_env_is_an_error() {
        let mut config = TrackerConfig::default();
        let err = config
            .apply_env(|key| (key == "TRACKER_RATE_LIMIT").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("TRACKER_RATE_LIMIT"));
    }

    #[test]
    fn duplicate_or_blank_tokens_are_rejected() {
        let dup = TrackerConfig::parse(
            "[[principals]]\ntoken = \"a\"\nactor = \"x\"\n[[principals]]\ntoken = \"a\"\nactor = \"y\"\n",
        )
        .unwrap();
        assert!(dup.principal_table().is_err());

        let blank = TrackerConfig::parse("[[principals]]\ntoken = \" \"\nactor = \"x\"\n").unwrap();
        assert!(blank.principal_table().is_err());

        let no_actor = TrackerConfig::parse("[[principals]]\ntoken = \"a\"\nactor = \"\"\n").unwrap();
        assert!(no_actor.principal_table().is_err());
    }
}
