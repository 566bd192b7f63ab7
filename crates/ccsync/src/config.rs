//! Translation from CLI flags, profiles, and credential files into a
//! `ccsync_core::ControllerConfig`.
//!
//! Precedence: flag (or its env var) > `--config` credential file >
//! profile > `CC_Env.yml` found in the working directory or beside the
//! executable.

use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use tracing::debug;

use ccsync_config::{CC_ENV_FILE, Config, Defaults, Profile};
use ccsync_core::{ControllerConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Resolve the controller connection for a command that needs one.
pub fn build_controller_config(
    global: &GlobalOpts,
    cfg: &Config,
) -> Result<ControllerConfig, CliError> {
    let (mut config, profile) = base_config(global, cfg)?;
    apply_overrides(&mut config, global)?;

    let timeout = global
        .timeout
        .or_else(|| profile.and_then(|p| p.timeout))
        .unwrap_or(cfg.defaults.timeout);
    let task_timeout = global
        .task_timeout
        .or_else(|| profile.and_then(|p| p.task_timeout))
        .unwrap_or(cfg.defaults.task_timeout);
    if timeout == 0 {
        return Err(CliError::Validation {
            field: "timeout".into(),
            reason: "must be at least one second".into(),
        });
    }
    if task_timeout == 0 {
        return Err(CliError::Validation {
            field: "task-timeout".into(),
            reason: "must be at least one second".into(),
        });
    }
    config.timeout = Duration::from_secs(timeout);
    config.tasks.timeout = Duration::from_secs(task_timeout);
    Ok(config)
}

/// The connection source plus the profile it came from, if any.
fn base_config<'a>(
    global: &GlobalOpts,
    cfg: &'a Config,
) -> Result<(ControllerConfig, Option<&'a Profile>), CliError> {
    // 1. Explicit credential file
    if let Some(ref path) = global.cc_env {
        debug!(path = %path.display(), "using credential file from --config");
        let config = ccsync_config::load_cc_env(path)?.to_controller_config()?;
        return Ok((config, None));
    }

    // 2. Named or default profile
    let profile_name = global
        .profile
        .clone()
        .unwrap_or_else(|| cfg.active_profile_name().to_owned());
    if let Some(profile) = cfg.profile(&profile_name) {
        debug!(profile = %profile_name, "using profile");
        let config = resolve_profile(profile, &profile_name, global, &cfg.defaults)?;
        return Ok((config, Some(profile)));
    }
    if global.profile.is_some() {
        let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
        available.sort_unstable();
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: if available.is_empty() {
                "(none)".into()
            } else {
                available.join(", ")
            },
            path: ccsync_config::config_path().display().to_string(),
        });
    }

    // 3. Conventional credential file, unless flags already name a controller
    let conventional = global
        .controller
        .is_none()
        .then(|| ccsync_config::locate_cc_env(Path::new(CC_ENV_FILE)))
        .flatten();
    if let Some(found) = conventional {
        debug!(path = %found.display(), "using credential file");
        let config = ccsync_config::load_cc_env(&found)?.to_controller_config()?;
        return Ok((config, None));
    }

    // 4. Flags only
    let controller = global
        .controller
        .as_deref()
        .ok_or_else(|| CliError::NoConfig {
            path: ccsync_config::config_path().display().to_string(),
        })?;
    let (Some(username), Some(password)) = (&global.username, &global.password) else {
        return Err(CliError::NoCredentials {
            profile: profile_name,
        });
    };
    let config = ControllerConfig::new(
        ccsync_config::parse_controller_url(controller)?,
        username.clone(),
        SecretString::from(password.clone()),
    );
    Ok((config, None))
}

/// Translate a profile into a `ControllerConfig`, letting flags supply
/// credentials the profile lacks.
fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
    defaults: &Defaults,
) -> Result<ControllerConfig, CliError> {
    let url = ccsync_config::parse_controller_url(
        global.controller.as_deref().unwrap_or(&profile.controller),
    )?;

    let username = match global.username {
        Some(ref name) => name.clone(),
        None => ccsync_config::resolve_username(profile, profile_name)?,
    };
    let password = match global.password {
        Some(ref pw) => SecretString::from(pw.clone()),
        None => ccsync_config::resolve_password(profile, profile_name)?,
    };

    let insecure = profile
        .insecure
        .or_else(|| defaults.insecure.then_some(true));

    let mut config = ControllerConfig::new(url, username, password);
    config.tls = ccsync_config::tls_for(insecure, profile.ca_cert.as_deref());
    Ok(config)
}

/// Flags win over whatever the base source said.
fn apply_overrides(config: &mut ControllerConfig, global: &GlobalOpts) -> Result<(), CliError> {
    if let Some(ref controller) = global.controller {
        config.url = ccsync_config::parse_controller_url(controller)?;
    }
    if let Some(ref username) = global.username {
        config.username.clone_from(username);
    }
    if let Some(ref password) = global.password {
        config.password = SecretString::from(password.clone());
    }
    if global.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["ccsync"];
        argv.extend_from_slice(args);
        argv.push("status");
        Cli::try_parse_from(argv).expect("valid args").global
    }

    #[test]
    fn flags_alone_are_enough() {
        let opts = global(&["-c", "10.10.20.85", "-u", "admin", "--password", "pw", "-k"]);
        let config = build_controller_config(&opts, &Config::default()).expect("resolves");
        assert_eq!(config.url.as_str(), "https://10.10.20.85/");
        assert_eq!(config.username, "admin");
        assert_eq!(config.password.expose_secret(), "pw");
        assert_eq!(config.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(config.tasks.timeout, Duration::from_secs(600));
    }

    #[test]
    fn profile_supplies_what_flags_omit() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "lab".into(),
            Profile {
                controller: "https://cc.lab.example".into(),
                username: Some("ops".into()),
                password: Some("from-profile".into()),
                task_timeout: Some(120),
                ..Profile::default()
            },
        );
        let opts = global(&["-p", "lab", "--password", "from-flag", "--timeout", "45"]);
        let config = build_controller_config(&opts, &cfg).expect("resolves");
        assert_eq!(config.url.host_str(), Some("cc.lab.example"));
        assert_eq!(config.username, "ops");
        assert_eq!(config.password.expose_secret(), "from-flag");
        assert_eq!(config.timeout, Duration::from_secs(45));
        assert_eq!(config.tasks.timeout, Duration::from_secs(120));
    }

    #[test]
    fn unknown_profile_is_reported() {
        let opts = global(&["-p", "nope"]);
        let err = build_controller_config(&opts, &Config::default()).expect_err("no profile");
        assert!(matches!(err, CliError::ProfileNotFound { ref name, .. } if name == "nope"));
    }

    #[test]
    fn credential_file_is_overridden_by_flags() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("lab.yml");
        std::fs::write(
            &path,
            "CC_IP: 10.10.20.85\nCC_USERNAME: admin\nCC_PASSWORD: C1sco12345\nCC_INSECURE: false\n",
        )
        .expect("write");

        let path_arg = path.display().to_string();
        let opts = global(&["--config", &path_arg, "-u", "operator"]);
        let config = build_controller_config(&opts, &Config::default()).expect("resolves");
        assert_eq!(config.url.host_str(), Some("10.10.20.85"));
        assert_eq!(config.username, "operator");
        assert_eq!(config.password.expose_secret(), "C1sco12345");
        assert_eq!(config.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn zero_task_timeout_is_rejected() {
        let opts = global(&[
            "-c",
            "cc",
            "-u",
            "a",
            "--password",
            "b",
            "--task-timeout",
            "0",
        ]);
        let err = build_controller_config(&opts, &Config::default()).expect_err("invalid");
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "task-timeout"));
    }
}
