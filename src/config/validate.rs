// src/config/validate.rs

use std::collections::HashSet;

use crate::config::duration::parse_duration;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{LauncherError, Result};
use crate::install::is_plain_file_name;
use crate::launch::TargetAddress;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = LauncherError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_payloads(&raw)?;
        validate_target_payload(&raw)?;
        let target = validate_target_address(&raw)?;
        let exit_timeout = match raw.launch.exit_timeout.as_deref() {
            Some(s) => Some(parse_duration(s).map_err(|e| {
                LauncherError::ConfigError(format!("[launch].exit_timeout: {e}"))
            })?),
            None => None,
        };
        Ok(ConfigFile::new_unchecked(raw.install, raw.launch, target, exit_timeout))
    }
}

fn validate_payloads(cfg: &RawConfigFile) -> Result<()> {
    if cfg.install.payloads.is_empty() {
        return Err(LauncherError::ConfigError(
            "[install].payloads must list at least one payload".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for name in cfg.install.payloads.iter() {
        if !is_plain_file_name(name) {
            return Err(LauncherError::ConfigError(format!(
                "payload name '{}' must be a plain file name",
                name
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(LauncherError::ConfigError(format!(
                "payload '{}' is listed more than once",
                name
            )));
        }
    }
    Ok(())
}

fn validate_target_payload(cfg: &RawConfigFile) -> Result<()> {
    let target = &cfg.launch.target;
    if !cfg.install.payloads.contains(target) {
        return Err(LauncherError::ConfigError(format!(
            "[launch].target '{}' is not one of the installed payloads",
            target
        )));
    }
    Ok(())
}

fn validate_target_address(cfg: &RawConfigFile) -> Result<TargetAddress> {
    let port = u16::try_from(cfg.launch.target_port)
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| {
            LauncherError::ConfigError(format!(
                "[launch].target_port must be in 1..=65535 (got {})",
                cfg.launch.target_port
            ))
        })?;

    Ok(TargetAddress::new(cfg.launch.target_host.clone(), port)?)
}
