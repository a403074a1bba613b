//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the app core starts with zero
//! configuration.

use std::path::PathBuf;

use creator_shared::constants::{DEFAULT_PRODUCT_ID, DEFAULT_PUBLISH_BASE_URL};
use creator_shared::types::Platform;

#[derive(Clone)]
pub struct ClientConfig {
    /// Directory holding `creator.db`.
    /// Env: `CREATOR_DATA_DIR`
    /// Default: the platform data directory.
    pub data_dir: Option<PathBuf>,

    /// Subscription product queried on the purchase oracle.
    /// Env: `CREATOR_PRODUCT_ID`
    /// Default: `com.ugcio.app.monthly`
    pub product_id: String,

    /// Base URL of the publish API and of public pages.
    /// Env: `CREATOR_PUBLISH_URL`
    /// Default: `https://ugcio.app`
    pub publish_base_url: String,

    /// API key sent as `x-api-key`. Publishing is disabled without one.
    /// Env: `CREATOR_PUBLISH_API_KEY`
    pub publish_api_key: Option<String>,

    /// Host platform; `web` runs entitlement in trial-only mode.
    /// Env: `CREATOR_PLATFORM` (`native` | `web`)
    /// Default: `native`
    pub platform: Platform,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("data_dir", &self.data_dir)
            .field("product_id", &self.product_id)
            .field("publish_base_url", &self.publish_base_url)
            .field("publish_api_key", &self.publish_api_key.as_ref().map(|_| "<redacted>"))
            .field("platform", &self.platform)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            product_id: DEFAULT_PRODUCT_ID.to_string(),
            publish_base_url: DEFAULT_PUBLISH_BASE_URL.to_string(),
            publish_api_key: None,
            platform: Platform::Native,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("CREATOR_DATA_DIR").filter(|v| !v.is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(id) = lookup("CREATOR_PRODUCT_ID").filter(|v| !v.trim().is_empty()) {
            config.product_id = id.trim().to_string();
        }

        if let Some(url) = lookup("CREATOR_PUBLISH_URL") {
            let url = url.trim().trim_end_matches('/');
            if url.starts_with("http://") || url.starts_with("https://") {
                config.publish_base_url = url.to_string();
            } else {
                tracing::warn!(value = %url, "Invalid CREATOR_PUBLISH_URL, using default");
            }
        }

        if let Some(key) = lookup("CREATOR_PUBLISH_API_KEY") {
            if !key.is_empty() {
                config.publish_api_key = Some(key);
            }
        }

        if let Some(name) = lookup("CREATOR_PLATFORM") {
            match Platform::from_name(&name) {
                Some(platform) => config.platform = platform,
                None => tracing::warn!(value = %name, "Invalid CREATOR_PLATFORM, using default"),
            }
        }

        // RUST_LOG is read by the EnvFilter in init_tracing.

        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = load(&[]);
        assert_eq!(config.product_id, "com.ugcio.app.monthly");
        assert_eq!(config.publish_base_url, "https://ugcio.app");
        assert_eq!(config.platform, Platform::Native);
        assert!(config.data_dir.is_none());
        assert!(config.publish_api_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("CREATOR_DATA_DIR", "/tmp/creator"),
            ("CREATOR_PUBLISH_URL", "http://localhost:3000/"),
            ("CREATOR_PUBLISH_API_KEY", "k"),
            ("CREATOR_PLATFORM", "Web"),
        ]);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/creator")));
        assert_eq!(config.publish_base_url, "http://localhost:3000");
        assert_eq!(config.publish_api_key.as_deref(), Some("k"));
        assert_eq!(config.platform, Platform::Web);
        assert!(!format!("{config:?}").contains("\"k\""));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = load(&[("CREATOR_PUBLISH_URL", "ugcio.app"), ("CREATOR_PLATFORM", "desktop")]);
        assert_eq!(config.publish_base_url, "https://ugcio.app");
        assert_eq!(config.platform, Platform::Native);
    }
}
