/// Configuration schema and defaults.
///
/// Maps directly to the `~/.parley/config.toml` and `.parley.toml` file
/// schemas. Every field has a built-in default; users only set the values
/// they want to override.
use serde::{Deserialize, Serialize};

/// Default backend base URL.
const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default request deadline in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default UI language code.
const DEFAULT_LANG: &str = "en";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level parley configuration with sections `[backend]`, `[chat]`, and
/// `[transcript]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParleyConfig {
    pub backend: BackendConfig,
    pub chat: ChatConfig,
    pub transcript: TranscriptConfig,
}

/// `[backend]` — where the assistant backend lives and how long to wait.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend, without a trailing path.
    pub base_url: String,
    /// Fixed request deadline for every call, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// `[chat]` — interactive session defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Language code passed through verbatim to the backend (`en`, `fr`, `ht`).
    pub lang: String,
    /// Show per-message timestamps in the interactive view.
    pub timestamps: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            lang: DEFAULT_LANG.to_string(),
            timestamps: true,
        }
    }
}

/// `[transcript]` — local exchange log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    /// Append completed exchanges to `~/.parley/transcript.jsonl`.
    pub enabled: bool,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl ParleyConfig {
    /// Annotated default config, written by `parley config init`.
    pub fn default_toml() -> &'static str {
        r#"# parley configuration
# Precedence: this file < .parley.toml (per project) < PARLEY_* env vars

[backend]
# Base URL of the assistant backend.
base_url = "http://localhost:8000"
# Request deadline in milliseconds. Applies to every call; there are no retries.
timeout_ms = 10000

[chat]
# Language passed to the backend: en, fr, ht
lang = "en"
# Show per-message timestamps in the interactive session.
timestamps = true

[transcript]
# Log completed exchanges to ~/.parley/transcript.jsonl
enabled = true
"#
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ParleyConfig::default();
        assert_eq!(config.backend.base_url, "http://localhost:8000");
        assert_eq!(config.backend.timeout_ms, 10_000);
        assert_eq!(config.chat.lang, "en");
        assert!(config.chat.timestamps);
        assert!(config.transcript.enabled);
    }

    #[test]
    fn default_toml_parses_back_to_defaults() {
        let parsed: ParleyConfig = toml::from_str(ParleyConfig::default_toml()).unwrap();
        assert_eq!(
            parsed.backend.base_url,
            ParleyConfig::default().backend.base_url
        );
        assert_eq!(parsed.backend.timeout_ms, 10_000);
        assert_eq!(parsed.chat.lang, "en");
    }

    #[test]
    fn partial_toml_fills_missing_sections_with_defaults() {
        let parsed: ParleyConfig = toml::from_str(
            r#"
[backend]
base_url = "https://assistant.example.org"
"#,
        )
        .unwrap();
        assert_eq!(parsed.backend.base_url, "https://assistant.example.org");
        assert_eq!(parsed.backend.timeout_ms, 10_000);
        assert_eq!(parsed.chat.lang, "en");
        assert!(parsed.transcript.enabled);
    }
}
