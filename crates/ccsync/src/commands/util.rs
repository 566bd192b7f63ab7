//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;

use tracing::debug;

use ccsync_core::{DesiredState, ResourceKey};

use crate::error::CliError;

/// Load a desired-state manifest. The format follows the file extension;
/// anything other than `.toml` or `.json` is read as YAML.
pub fn load_manifest(path: &Path) -> Result<DesiredState, CliError> {
    let manifest_err = |reason: String| CliError::Manifest {
        path: path.display().to_string(),
        reason,
    };

    let contents = std::fs::read_to_string(path).map_err(|e| manifest_err(e.to_string()))?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let desired: DesiredState = match extension.as_deref() {
        Some("toml") => toml::from_str(&contents).map_err(|e| manifest_err(e.to_string()))?,
        Some("json") => {
            serde_json::from_str(&contents).map_err(|e| manifest_err(e.to_string()))?
        }
        _ => serde_yaml::from_str(&contents).map_err(|e| manifest_err(e.to_string()))?,
    };

    debug!(
        path = %path.display(),
        pools = desired.pools.len(),
        sites = desired.sites.len(),
        reservations = desired.reservations.len(),
        "manifest loaded"
    );
    if desired.is_empty() {
        return Err(manifest_err("no pools, sites, or reservations declared".into()));
    }
    Ok(desired)
}

/// Where a resource lives: the hierarchy path for sites, the pool name,
/// or `site :: name` for reservations.
pub fn resource_label(key: &ResourceKey) -> String {
    match key {
        ResourceKey::Site { path, .. } => path.to_string(),
        ResourceKey::Pool { name } => name.clone(),
        ResourceKey::Reservation { site, name } => format!("{site} :: {name}"),
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal there is nobody to ask, so the prompt is an error.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(name: &str, contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(name);
        std::fs::write(&path, contents).expect("write");
        (dir, path)
    }

    #[test]
    fn yaml_manifest_loads() {
        let (_dir, path) = write(
            "desired.yaml",
            "pools:\n  - { name: US_CORP, cidr: 10.201.0.0/16 }\n\
             sites:\n  - { kind: area, name: US, parent: Global }\n",
        );
        let desired = load_manifest(&path).expect("valid manifest");
        assert_eq!(desired.pools.len(), 1);
        assert_eq!(desired.sites[0].path().as_str(), "Global/US");
    }

    #[test]
    fn json_manifest_loads() {
        let (_dir, path) = write(
            "desired.json",
            r#"{"pools": [{"name": "US_CORP", "cidr": "10.201.0.0/16"}]}"#,
        );
        let desired = load_manifest(&path).expect("valid manifest");
        assert_eq!(desired.pools[0].name, "US_CORP");
    }

    #[test]
    fn bad_cidr_names_the_file() {
        let (_dir, path) = write(
            "bad.yaml",
            "pools:\n  - { name: X, cidr: 10.0.0.0/40 }\n",
        );
        let err = load_manifest(&path).expect_err("invalid prefix");
        assert!(matches!(err, CliError::Manifest { ref path, .. } if path.ends_with("bad.yaml")));
    }

    #[test]
    fn empty_manifest_is_rejected() {
        let (_dir, path) = write("empty.yaml", "pools: []\n");
        assert!(load_manifest(&path).is_err());
    }

    #[test]
    fn yes_flag_skips_the_prompt() {
        assert!(confirm("Delete?", "delete", true).expect("auto-approved"));
    }
}
