use std::{fs, io, path::PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const CONFIG_FILE: &str = "server.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: String,
    pub data_file: PathBuf,
    pub log_filter: String,
    /// Stop serving, without replying, once this many commands arrived.
    pub crash_after: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".into(),
            data_file: PathBuf::from("./data/appointments.json"),
            log_filter: "info".into(),
            crash_after: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    bind_addr: Option<String>,
    data_file: Option<PathBuf>,
    log_filter: Option<String>,
    crash_after: Option<u64>,
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(CONFIG_FILE) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse '{CONFIG_FILE}'"))?,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            return Err(error).with_context(|| format!("failed to read '{CONFIG_FILE}'"));
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;

    if let Some(v) = file_cfg.bind_addr {
        settings.bind_addr = v;
    }
    if let Some(v) = file_cfg.data_file {
        settings.data_file = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
    if file_cfg.crash_after.is_some() {
        settings.crash_after = file_cfg.crash_after;
    }
    Ok(())
}

/// Later keys win over earlier ones.
fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("SCHEDULER_BIND") {
        settings.bind_addr = v;
    }
    if let Some(v) = var("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }

    if let Some(v) = var("SCHEDULER_DATA_FILE") {
        settings.data_file = PathBuf::from(v);
    }
    if let Some(v) = var("APP__DATA_FILE") {
        settings.data_file = PathBuf::from(v);
    }

    if let Some(v) = var("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    if let Some(v) = var("APP__CRASH_AFTER") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.crash_after = Some(parsed);
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
