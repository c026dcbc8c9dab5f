//! INI parsing logic for converting `Ini` → `Settings`.
//!
//! The single place where INI key names are mapped to struct fields. Starts
//! from `Settings::default()` and overlays any values found in the file.

use ini::Ini;
use std::path::PathBuf;

use super::file::ConfigFileError;
use super::settings::Settings;
use crate::pathmap::MountPair;

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub(super) fn parse_ini(ini: &Ini) -> Result<Settings, ConfigFileError> {
    let mut settings = Settings::default();

    if let Some(section) = ini.section(Some("ingest")) {
        if let Some(v) = section.get("interval") {
            let secs: u64 = v
                .parse()
                .map_err(|_| invalid("ingest", "interval", v, "must be a positive integer (seconds)"))?;
            if secs == 0 {
                return Err(invalid("ingest", "interval", v, "must be at least 1 second"));
            }
            settings.ingest.interval_secs = secs;
        }
        if let Some(v) = section.get("mass_deletion_guard") {
            settings.ingest.mass_deletion_guard = v.parse().map_err(|_| {
                invalid(
                    "ingest",
                    "mass_deletion_guard",
                    v,
                    "must be a non-negative integer",
                )
            })?;
        }
    }

    if let Some(section) = ini.section(Some("broker")) {
        if let Some(v) = section.get("queue") {
            let v = v.trim();
            if v.is_empty() {
                return Err(invalid("broker", "queue", v, "must not be empty"));
            }
            settings.broker.queue = v.to_string();
        }
        if let Some(v) = section.get("prefetch") {
            let prefetch: u16 = v
                .parse()
                .map_err(|_| invalid("broker", "prefetch", v, "must be an integer in 1..=65535"))?;
            if prefetch == 0 {
                return Err(invalid("broker", "prefetch", v, "must be at least 1"));
            }
            settings.broker.prefetch = prefetch;
        }
        if let Some(v) = section.get("reconnect_initial") {
            settings.broker.reconnect_initial_secs = v.parse().map_err(|_| {
                invalid(
                    "broker",
                    "reconnect_initial",
                    v,
                    "must be a positive integer (seconds)",
                )
            })?;
        }
        if let Some(v) = section.get("reconnect_cap") {
            settings.broker.reconnect_cap_secs = v.parse().map_err(|_| {
                invalid(
                    "broker",
                    "reconnect_cap",
                    v,
                    "must be a positive integer (seconds)",
                )
            })?;
        }
    }

    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                settings.logging.file = PathBuf::from(v);
            }
        }
    }

    // Pairs are consulted in file order; first match wins in the mapper.
    if let Some(section) = ini.section(Some("path_mapping")) {
        for (remote, local) in section.iter() {
            if remote.trim().is_empty() || local.trim().is_empty() {
                return Err(invalid(
                    "path_mapping",
                    remote,
                    local,
                    "both remote and local prefixes are required",
                ));
            }
            settings
                .path_mapping
                .push(MountPair::new(remote.trim(), local.trim()));
        }
    }

    Ok(settings)
}
