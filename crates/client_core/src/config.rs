use std::{fs, io, path::Path, time::Duration};

use anyhow::{bail, Context};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "client.toml";
const DEFAULT_EVENT_BUFFER: usize = 16;

/// Per-controller knobs derived from [`ClientSettings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Upper bound for a single gateway call. `None` waits indefinitely.
    pub attempt_timeout: Option<Duration>,
    /// Per-subscriber buffer before a slow subscriber starts lagging.
    pub event_buffer: usize,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            attempt_timeout: None,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_url: String,
    pub request_timeout_secs: u64,
    pub attempt_timeout_secs: Option<u64>,
    pub event_buffer: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8443".into(),
            request_timeout_secs: 30,
            attempt_timeout_secs: None,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl ClientSettings {
    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            attempt_timeout: self
                .attempt_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            event_buffer: self.event_buffer.max(1),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    request_timeout_secs: Option<u64>,
    attempt_timeout_secs: Option<u64>,
    event_buffer: Option<usize>,
}

/// Defaults, then `path` (or `client.toml` in the working directory), then
/// `APP__*` environment variables.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
            apply_file(&mut settings, &raw)
                .with_context(|| format!("invalid settings file '{}'", path.display()))?;
        }
        None => {
            if let Some(raw) = read_optional(Path::new(DEFAULT_SETTINGS_FILE))? {
                apply_file(&mut settings, &raw)
                    .with_context(|| format!("invalid settings file '{DEFAULT_SETTINGS_FILE}'"))?;
            }
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings.server_url = normalize_server_url(&settings.server_url)?;
    Ok(settings)
}

/// Reads an optional settings file. Only a missing file is skipped.
fn read_optional(path: &Path) -> anyhow::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err)
            .with_context(|| format!("failed to read settings file '{}'", path.display())),
    }
}

fn apply_file(settings: &mut ClientSettings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.attempt_timeout_secs {
        settings.attempt_timeout_secs = Some(v);
    }
    if let Some(v) = file_cfg.event_buffer {
        settings.event_buffer = v;
    }
    Ok(())
}

fn apply_env(settings: &mut ClientSettings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = var("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(parsed) = var("APP__REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.request_timeout_secs = parsed;
    }
    if let Some(parsed) = var("APP__ATTEMPT_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.attempt_timeout_secs = Some(parsed);
    }
    if let Some(parsed) = var("APP__EVENT_BUFFER").and_then(|v| v.parse().ok()) {
        settings.event_buffer = parsed;
    }
}

/// Checks that the URL is absolute http(s) and strips any trailing slash.
pub fn normalize_server_url(raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    let parsed = Url::parse(raw).with_context(|| format!("invalid server url '{raw}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("unsupported server url scheme '{}'", parsed.scheme());
    }
    if parsed.host_str().is_none() {
        bail!("server url '{raw}' has no host");
    }
    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
