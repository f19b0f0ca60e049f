//! Loadable TOML configuration. Grounded on the teacher's
//! `config::parse_config` (`File::open` + `read_to_string` +
//! `toml::from_str`), narrowed to the knobs this crate's `Repository`
//! actually consumes.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::Result;

fn default_user_agent() -> String {
    "apt-mirror-rs".to_string()
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

fn deserialize_timeout_secs<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Duration::from_secs(u64::deserialize(deserializer)?))
}

/// Transport and verification knobs for a `Repository`. Signature
/// verification is opt-in by default, matching the teacher's permissive
/// defaults and the degraded-but-documented behavior of an unverified
/// mirror.
#[derive(Clone, Debug, Deserialize)]
pub struct MirrorConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub require_signature: bool,
    #[serde(
        default = "default_http_timeout",
        rename = "http_timeout_secs",
        deserialize_with = "deserialize_timeout_secs"
    )]
    pub http_timeout: Duration,
}

impl MirrorConfig {
    pub fn parse<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut f = File::open(path)?;
        let mut content = String::new();
        content.reserve(1024);
        f.read_to_string(&mut content)?;
        Ok(toml::from_str(&content)?)
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        MirrorConfig {
            user_agent: default_user_agent(),
            require_signature: false,
            http_timeout: default_http_timeout(),
        }
    }
}
