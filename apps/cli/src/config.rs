use std::{fs, path::Path, time::Duration};

use client_core::{ApiShape, ControllerOptions, OverlapPolicy};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_url: String,
    pub api_shape: ApiShape,
    /// `None` disables the timeout.
    pub request_timeout_secs: Option<u64>,
    pub overlap_policy: OverlapPolicy,
    /// Symbol the daily index endpoint reports for.
    pub daily_symbol: String,
    /// Shown by `models` when the server cannot be reached.
    pub fallback_models: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".into(),
            api_shape: ApiShape::SymbolPost,
            request_timeout_secs: Some(30),
            overlap_policy: OverlapPolicy::Reject,
            daily_symbol: "^GSPC".into(),
            fallback_models: vec!["NVDA".into(), "AAPL".into()],
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            overlap_policy: self.overlap_policy,
            request_timeout: self.request_timeout(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    api_shape: Option<ApiShape>,
    request_timeout_secs: Option<u64>,
    overlap_policy: Option<OverlapPolicy>,
    daily_symbol: Option<String>,
    fallback_models: Option<Vec<String>>,
}

/// Defaults, then `config_path` if it exists, then the environment.
pub fn load_settings(config_path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(config_path) {
        apply_file(&mut settings, &raw, config_path);
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, raw: &str, origin: &Path) {
    let file_cfg = match toml::from_str::<FileSettings>(raw) {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!(path = %origin.display(), error = %err, "ignoring unreadable config file");
            return;
        }
    };

    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.api_shape {
        settings.api_shape = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = (v > 0).then_some(v);
    }
    if let Some(v) = file_cfg.overlap_policy {
        settings.overlap_policy = v;
    }
    if let Some(v) = file_cfg.daily_symbol {
        settings.daily_symbol = v;
    }
    if let Some(v) = file_cfg.fallback_models {
        settings.fallback_models = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("PREDICTOR_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = var("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = var("APP__API_SHAPE") {
        match v.parse::<ApiShape>() {
            Ok(shape) => settings.api_shape = shape,
            Err(err) => warn!(value = %v, error = %err, "ignoring APP__API_SHAPE"),
        }
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        match v.trim().parse::<u64>() {
            Ok(secs) => settings.request_timeout_secs = (secs > 0).then_some(secs),
            Err(err) => warn!(value = %v, error = %err, "ignoring APP__REQUEST_TIMEOUT_SECS"),
        }
    }

    if let Some(v) = var("APP__OVERLAP_POLICY") {
        match v.trim().to_ascii_lowercase().as_str() {
            "reject" => settings.overlap_policy = OverlapPolicy::Reject,
            "supersede" => settings.overlap_policy = OverlapPolicy::Supersede,
            _ => warn!(value = %v, "ignoring APP__OVERLAP_POLICY"),
        }
    }

    if let Some(v) = var("APP__DAILY_SYMBOL") {
        settings.daily_symbol = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
