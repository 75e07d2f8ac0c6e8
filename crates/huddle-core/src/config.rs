//! Application configuration model (`config.toml`).

use serde::{Deserialize, Serialize};
use std::time::Duration;

const MIN_TOAST_TTL_MS: u64 = 3_000;
const MAX_TOAST_TTL_MS: u64 = 5_000;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct RootConfig {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub email: EmailSettings,
    #[serde(default)]
    pub ui: UiSettings,
    #[serde(default)]
    pub logging: LogSettings,
    #[serde(default)]
    pub identity: IdentitySettings,
}

/// Hosted backend (REST + realtime) connection settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct BackendSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
    /// JWT of the signed-in user. Falls back to the anon key when absent.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            access_token: None,
            schema: default_schema(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl BackendSettings {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.anon_key.trim().is_empty()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

/// Transactional email used for assignment notices.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct EmailSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub from: String,
    /// Form-submission endpoint used when the primary API call fails.
    #[serde(default)]
    pub fallback_form_url: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct UiSettings {
    #[serde(default = "default_toast_ttl_ms")]
    pub toast_ttl_ms: u64,
    #[serde(default = "default_typing_throttle_ms")]
    pub typing_throttle_ms: u64,
    #[serde(default = "default_typing_expiry_ms")]
    pub typing_expiry_ms: u64,
    #[serde(default = "default_preview_max_chars")]
    pub preview_max_chars: usize,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            toast_ttl_ms: default_toast_ttl_ms(),
            typing_throttle_ms: default_typing_throttle_ms(),
            typing_expiry_ms: default_typing_expiry_ms(),
            preview_max_chars: default_preview_max_chars(),
        }
    }
}

impl UiSettings {
    /// Toast lifetime, kept within 3-5 seconds.
    pub fn toast_ttl(&self) -> Duration {
        Duration::from_millis(self.toast_ttl_ms.clamp(MIN_TOAST_TTL_MS, MAX_TOAST_TTL_MS))
    }

    pub fn typing_throttle(&self) -> Duration {
        Duration::from_millis(self.typing_throttle_ms)
    }

    pub fn typing_expiry(&self) -> Duration {
        Duration::from_millis(self.typing_expiry_ms)
    }
}

fn default_toast_ttl_ms() -> u64 {
    4_000
}

fn default_typing_throttle_ms() -> u64 {
    500
}

fn default_typing_expiry_ms() -> u64 {
    3_000
}

fn default_preview_max_chars() -> usize {
    50
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Defaults for the command line client.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct IdentitySettings {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub workspace_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: RootConfig = toml::from_str("").unwrap();
        assert_eq!(config.ui.typing_throttle(), Duration::from_millis(500));
        assert_eq!(config.ui.typing_expiry(), Duration::from_millis(3000));
        assert_eq!(config.ui.preview_max_chars, 50);
        assert_eq!(config.backend.schema, "public");
        assert!(!config.backend.is_configured());
    }

    #[test]
    fn test_toast_ttl_is_clamped() {
        let mut ui = UiSettings::default();
        ui.toast_ttl_ms = 60_000;
        assert_eq!(ui.toast_ttl(), Duration::from_secs(5));
        ui.toast_ttl_ms = 10;
        assert_eq!(ui.toast_ttl(), Duration::from_secs(3));
    }

    #[test]
    fn test_partial_sections_parse() {
        let config: RootConfig = toml::from_str(
            r#"
            [backend]
            url = "https://example.supabase.co"
            anon_key = "anon"

            [ui]
            typing_expiry_ms = 2500
            "#,
        )
        .unwrap();
        assert!(config.backend.is_configured());
        assert_eq!(config.backend.request_timeout_secs, 15);
        assert_eq!(config.ui.typing_expiry_ms, 2500);
        assert_eq!(config.ui.toast_ttl_ms, 4000);
    }
}
