use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Config, RateLimiters};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub api_keys: Option<ApiKeysConfig>,
    pub model: Option<ModelConfig>,
    pub indices: Option<IndicesConfig>,
    pub pipeline: Option<PipelineConfig>,
    pub storage: Option<StorageConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    pub model_api_key: Option<String>,
    pub s2_api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    pub base_url: Option<String>,
    pub name: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicesConfig {
    pub disabled: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub timeout_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub db_path: Option<String>,
}

/// Platform config directory path: `<config_dir>/originality/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("originality").join("config.toml"))
}

/// Load config by cascading CWD `.originality.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".originality.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

fn pick<S, T>(
    overlay: &Option<S>,
    base: &Option<S>,
    field: impl Fn(&S) -> Option<T>,
) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&field)
        .or_else(|| base.as_ref().and_then(&field))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        api_keys: Some(ApiKeysConfig {
            model_api_key: pick(&overlay.api_keys, &base.api_keys, |a| {
                a.model_api_key.clone()
            }),
            s2_api_key: pick(&overlay.api_keys, &base.api_keys, |a| a.s2_api_key.clone()),
        }),
        model: Some(ModelConfig {
            base_url: pick(&overlay.model, &base.model, |m| m.base_url.clone()),
            name: pick(&overlay.model, &base.model, |m| m.name.clone()),
            timeout_secs: pick(&overlay.model, &base.model, |m| m.timeout_secs),
        }),
        indices: Some(IndicesConfig {
            disabled: pick(&overlay.indices, &base.indices, |i| i.disabled.clone()),
            timeout_secs: pick(&overlay.indices, &base.indices, |i| i.timeout_secs),
        }),
        pipeline: Some(PipelineConfig {
            timeout_secs: pick(&overlay.pipeline, &base.pipeline, |p| p.timeout_secs),
            poll_interval_ms: pick(&overlay.pipeline, &base.pipeline, |p| p.poll_interval_ms),
        }),
        storage: Some(StorageConfig {
            db_path: pick(&overlay.storage, &base.storage, |s| s.db_path.clone()),
        }),
    }
}

/// Apply file values onto `config`. Values absent from the file keep
/// whatever `config` already holds.
pub fn apply(file: &ConfigFile, config: &mut Config) {
    if let Some(keys) = &file.api_keys {
        if let Some(k) = &keys.model_api_key {
            config.model_api_key = Some(k.clone());
        }
        if let Some(k) = &keys.s2_api_key {
            config.s2_api_key = Some(k.clone());
            config.rate_limiters = Arc::new(RateLimiters::new(true));
        }
    }
    if let Some(model) = &file.model {
        if let Some(url) = &model.base_url {
            config.model_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(name) = &model.name {
            config.model_name = name.clone();
        }
        if let Some(t) = model.timeout_secs {
            config.model_timeout_secs = t;
        }
    }
    if let Some(indices) = &file.indices {
        if let Some(disabled) = &indices.disabled {
            config.disabled_indices = disabled.clone();
        }
        if let Some(t) = indices.timeout_secs {
            config.index_timeout_secs = t;
        }
    }
    if let Some(pipeline) = &file.pipeline {
        if let Some(t) = pipeline.timeout_secs {
            config.pipeline_timeout_secs = t;
        }
        if let Some(ms) = pipeline.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
    }
    if let Some(path) = file.storage.as_ref().and_then(|s| s.db_path.as_ref()) {
        config.store_path = Some(PathBuf::from(path));
    }
}

/// Defaults, then config files, then environment variables.
pub fn resolve_config() -> Config {
    let mut config = Config::default();
    apply(&load_config(), &mut config);
    apply_env(&mut config);
    config
}

/// Environment variables read by [`apply_env`].
pub const ENV_MODEL_API_KEY: &str = "ORIGINALITY_API_KEY";
pub const ENV_MODEL_NAME: &str = "ORIGINALITY_MODEL";
pub const ENV_MODEL_URL: &str = "ORIGINALITY_MODEL_URL";
pub const ENV_S2_API_KEY: &str = "S2_API_KEY";
pub const ENV_DB_PATH: &str = "ORIGINALITY_DB";

/// Apply environment variables onto `config`. Blank values are ignored.
pub fn apply_env(config: &mut Config) {
    apply_env_with(config, |name| std::env::var(name).ok());
}

/// [`apply_env`] with an injectable variable lookup.
pub fn apply_env_with(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(key) = var(ENV_MODEL_API_KEY) {
        config.model_api_key = Some(key);
    }
    if let Some(name) = var(ENV_MODEL_NAME) {
        config.model_name = name;
    }
    if let Some(url) = var(ENV_MODEL_URL) {
        config.model_base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(key) = var(ENV_S2_API_KEY) {
        config.s2_api_key = Some(key);
        config.rate_limiters = Arc::new(RateLimiters::new(true));
    }
    if let Some(path) = var(ENV_DB_PATH) {
        config.store_path = Some(PathBuf::from(path));
    }
}
