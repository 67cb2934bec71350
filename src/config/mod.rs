/// Configuration system for parley.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults** — hardcoded in [`schema::ParleyConfig::default()`]
/// 2. **User global config** — `~/.parley/config.toml`
/// 3. **Project local config** — `.parley.toml` in the current working directory
/// 4. **Environment variables** — `PARLEY_*` overrides (highest precedence)
///
/// TOML files are deserialized as sparse overlays: only the keys a file
/// actually sets override the layer below it. Malformed or missing files are
/// silently skipped and the previous layer's values are retained.
pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

pub use schema::ParleyConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved parley configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars. This is the primary entry point for every module that needs
/// configuration.
pub fn load() -> ParleyConfig {
    let mut config = ParleyConfig::default();

    // Layer 2: user global config (~/.parley/config.toml)
    if let Some(overlay) = load_overlay(global_config_path()) {
        overlay.apply_to(&mut config);
    }

    // Layer 3: project local config (.parley.toml)
    if let Some(overlay) = load_overlay(project_config_path()) {
        overlay.apply_to(&mut config);
    }

    // Layer 4: environment variable overrides
    apply_env_overrides(&mut config);

    config
}

/// Load a sparse overlay from the given path (if it exists and parses).
fn load_overlay(path: Option<PathBuf>) -> Option<ConfigOverlay> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    toml::from_str(&content).ok()
}

// ---------------------------------------------------------------------------
// Sparse overlays
// ---------------------------------------------------------------------------

/// A config file parsed with every field optional, so that only
/// explicitly-set keys override the layer below.
#[derive(Debug, Deserialize)]
struct ConfigOverlay {
    backend: Option<BackendOverlay>,
    chat: Option<ChatOverlay>,
    transcript: Option<TranscriptOverlay>,
}

#[derive(Debug, Deserialize)]
struct BackendOverlay {
    base_url: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChatOverlay {
    lang: Option<String>,
    timestamps: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct TranscriptOverlay {
    enabled: Option<bool>,
}

impl ConfigOverlay {
    fn apply_to(&self, config: &mut ParleyConfig) {
        if let Some(ref backend) = self.backend {
            if let Some(ref url) = backend.base_url {
                config.backend.base_url = url.clone();
            }
            if let Some(ms) = backend.timeout_ms {
                config.backend.timeout_ms = ms;
            }
        }
        if let Some(ref chat) = self.chat {
            if let Some(ref lang) = chat.lang {
                config.chat.lang = lang.clone();
            }
            if let Some(timestamps) = chat.timestamps {
                config.chat.timestamps = timestamps;
            }
        }
        if let Some(ref transcript) = self.transcript
            && let Some(enabled) = transcript.enabled
        {
            config.transcript.enabled = enabled;
        }
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.parley/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    parley_dir().map(|dir| dir.join("config.toml"))
}

/// Path to the project local config: `.parley.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".parley.toml"))
}

/// The per-user parley data directory: `~/.parley/`.
pub fn parley_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".parley"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `PARLEY_BACKEND_URL` — backend base URL
/// - `PARLEY_TIMEOUT_MS` — request deadline in milliseconds
/// - `PARLEY_LANG` — default language code
/// - `PARLEY_TRANSCRIPT` — transcript logging (`1`/`true`/`yes`/`on`)
fn apply_env_overrides(config: &mut ParleyConfig) {
    if let Ok(val) = std::env::var("PARLEY_BACKEND_URL")
        && !val.is_empty()
    {
        config.backend.base_url = val;
    }
    if let Ok(val) = std::env::var("PARLEY_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.backend.timeout_ms = ms;
    }
    if let Ok(val) = std::env::var("PARLEY_LANG")
        && !val.is_empty()
    {
        config.chat.lang = val;
    }
    if let Ok(val) = std::env::var("PARLEY_TRANSCRIPT") {
        config.transcript.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.parley/config.toml`.
///
/// Creates the `~/.parley/` directory if it doesn't exist. Returns an error
/// if the file already exists (use `force = true` to overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.parley/ directory")?;
    }

    fs::write(&path, ParleyConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single config key in the global config file.
///
/// Reads the current global config (or defaults), updates the named key, and
/// writes the result back. Keys are dotted: `backend.base_url`,
/// `backend.timeout_ms`, `chat.lang`, `chat.timestamps`,
/// `transcript.enabled`.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let mut config = if path.exists() {
        let content = fs::read_to_string(&path).context("failed to read config file")?;
        toml::from_str(&content).context("failed to parse config file")?
    } else {
        ParleyConfig::default()
    };

    match key {
        "backend.base_url" => config.backend.base_url = value.to_string(),
        "backend.timeout_ms" => {
            config.backend.timeout_ms = value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{value}'"))?;
        }
        "chat.lang" => config.chat.lang = value.to_string(),
        "chat.timestamps" => config.chat.timestamps = is_truthy(value),
        "transcript.enabled" => config.transcript.enabled = is_truthy(value),
        _ => anyhow::bail!(
            "unknown config key '{key}' (known: backend.base_url, backend.timeout_ms, \
             chat.lang, chat.timestamps, transcript.enabled)"
        ),
    }

    let toml_str = toml::to_string_pretty(&config).context("failed to serialize config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, toml_str).context("failed to write config file")?;

    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
