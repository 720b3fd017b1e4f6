//! Store configuration resource.
//!
//! The resource is a YAML file holding the cluster properties handed to the
//! store connector and an optional keytab/principal pair:
//!
//! ```yaml
//! cluster:
//!   quorum: zk1,zk2,zk3
//!   client.port: 2181
//! security:
//!   keytab_file: /etc/widerow/app.keytab
//!   principal: app/host@EXAMPLE.COM
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tracing::{info, warn};

use crate::auth::Credentials;
use crate::error::ConfigError;

pub const DEFAULT_RESOURCE: &str = "widerow.yaml";
pub const CONF_DIR_ENV: &str = "WIDEROW_CONF_DIR";

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(5);
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60 * 60);

/// A named configuration file and the directories searched for it, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigResource {
    name: String,
    search_paths: Vec<PathBuf>,
}

impl ConfigResource {
    pub fn new(name: impl Into<String>, search_paths: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            search_paths,
        }
    }

    /// The default resource name looked up in a single directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(DEFAULT_RESOURCE, vec![dir.into()])
    }

    /// `$WIDEROW_CONF_DIR` first when set, then the working directory.
    pub fn from_env() -> Self {
        let mut search_paths = Vec::new();
        if let Some(dir) = std::env::var_os(CONF_DIR_ENV) {
            search_paths.push(PathBuf::from(dir));
        }
        search_paths.push(PathBuf::from("."));
        Self::new(DEFAULT_RESOURCE, search_paths)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// First search path that contains the resource.
    pub fn locate(&self) -> Result<PathBuf, ConfigError> {
        self.search_paths
            .iter()
            .map(|dir| dir.join(&self.name))
            .find(|path| path.is_file())
            .ok_or_else(|| ConfigError::ResourceNotFound {
                name: self.name.clone(),
                searched: self.search_paths.clone(),
            })
    }

    pub fn load(&self) -> Result<StoreConfig, ConfigError> {
        let path = self.locate()?;
        let config = StoreConfig::from_file(&path)?;
        info!(path = %path.display(), "loaded store configuration");
        Ok(config)
    }
}

/// Parsed configuration resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Passed verbatim to the store connector.
    #[serde(deserialize_with = "scalar_map")]
    pub cluster: BTreeMap<String, String>,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub keytab_file: Option<PathBuf>,
    pub principal: Option<String>,
}

impl StoreConfig {
    pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes as unit, not as an empty mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The login credentials, when both keytab and principal are configured.
    pub fn credentials(&self) -> Option<Credentials> {
        let keytab = self
            .security
            .keytab_file
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty());
        let principal = self
            .security
            .principal
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());

        match (keytab, principal) {
            (Some(keytab), Some(principal)) => Some(Credentials::new(keytab.clone(), principal)),
            (None, None) => None,
            (keytab, principal) => {
                warn!(
                    keytab = keytab.is_some(),
                    principal = principal.is_some(),
                    "keytab and principal must be configured together; skipping login"
                );
                None
            }
        }
    }
}

/// Cluster values may be written as YAML numbers or booleans; they are kept as text.
fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    raw.into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(D::Error::custom(format!(
                        "cluster property {key} must be a scalar, got {other:?}"
                    )));
                }
            };
            Ok((key, text))
        })
        .collect()
}

/// Knobs of the session manager.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub resource: ConfigResource,
    /// Table acquisition attempts before giving up.
    pub max_attempts: u32,
    /// Wait between acquisition attempts.
    pub retry_backoff: Duration,
    /// Period of the background credential refresh.
    pub refresh_interval: Duration,
}

impl SessionSettings {
    pub fn new(resource: ConfigResource) -> Self {
        Self {
            resource,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::new(ConfigResource::from_env())
    }
}
