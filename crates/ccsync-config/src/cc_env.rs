// Legacy `CC_Env.yml` credential file.
//
//   CC_IP: 10.10.20.85
//   CC_USERNAME: admin
//   CC_PASSWORD: secret
//   CC_INSECURE: true      # optional, defaults to true

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use tracing::debug;

use ccsync_core::ControllerConfig;

use crate::{ConfigError, parse_controller_url, tls_for};

/// Conventional file name, looked up next to the executable.
pub const CC_ENV_FILE: &str = "CC_Env.yml";

#[derive(Debug, Default, Deserialize)]
pub struct CcEnv {
    #[serde(rename = "CC_IP")]
    pub ip: Option<String>,
    #[serde(rename = "CC_USERNAME")]
    pub username: Option<String>,
    #[serde(rename = "CC_PASSWORD")]
    pub password: Option<String>,
    #[serde(rename = "CC_INSECURE")]
    pub insecure: Option<bool>,
}

impl CcEnv {
    /// Build a `ControllerConfig`. Every missing key is named in the error.
    pub fn to_controller_config(&self) -> Result<ControllerConfig, ConfigError> {
        let missing: Vec<&str> = [
            ("CC_IP", self.ip.as_deref()),
            ("CC_USERNAME", self.username.as_deref()),
            ("CC_PASSWORD", self.password.as_deref()),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_none_or(|s| s.trim().is_empty()))
        .map(|(k, _)| k)
        .collect();

        let (Some(ip), Some(username), Some(password)) = (&self.ip, &self.username, &self.password)
        else {
            return Err(missing_keys(&missing));
        };
        if !missing.is_empty() {
            return Err(missing_keys(&missing));
        }

        let url = parse_controller_url(ip)?;
        let mut config =
            ControllerConfig::new(url, username.clone(), SecretString::from(password.clone()));
        config.tls = tls_for(Some(self.insecure.unwrap_or(true)), None);
        Ok(config)
    }
}

fn missing_keys(keys: &[&str]) -> ConfigError {
    ConfigError::Validation {
        field: CC_ENV_FILE.into(),
        reason: format!("missing required key(s): {}", keys.join(", ")),
    }
}

/// Find a credential file: `path` as given, then the same file name next
/// to the running executable.
pub fn locate_cc_env(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    let name = path.file_name()?;
    let beside_exe = std::env::current_exe().ok()?.parent()?.join(name);
    beside_exe.is_file().then_some(beside_exe)
}

/// Locate and parse a credential file.
pub fn load_cc_env(path: &Path) -> Result<CcEnv, ConfigError> {
    let found = locate_cc_env(path).ok_or_else(|| ConfigError::CredentialFileMissing {
        path: path.display().to_string(),
    })?;
    debug!(path = %found.display(), "reading credential file");
    let raw = std::fs::read_to_string(&found)?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml {
        path: found.display().to_string(),
        source,
    })
}
