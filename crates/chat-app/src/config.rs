use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::Deserialize;

/// Webhook the assistant answers on when the configuration does not override
/// it.
pub const DEFAULT_WEBHOOK_URL: &str =
    "https://vendoerp.app.n8n.cloud/webhook/1a24ef20-03e9-48b0-b84f-22f7bb2dffbf";

const ENV_PREFIX: &str = "ASYSTENT_";

/// Process-level configuration resolved once at startup.
///
/// Sources, later wins: the per-user TOML file, then `ASYSTENT_`-prefixed
/// environment variables (`ASYSTENT_BACKEND_URL`, `ASYSTENT_BACKEND_API_KEY`,
/// `ASYSTENT_WEBHOOK_URL`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Base URL of the hosted backend project.
    pub backend_url: String,
    /// Publishable (anon) API key for the hosted backend.
    pub backend_api_key: String,
    #[serde(default = "default_webhook_url")]
    pub webhook_url: String,
}

fn default_webhook_url() -> String {
    DEFAULT_WEBHOOK_URL.to_string()
}

impl AppConfig {
    /// Per-user config file location, e.g. `~/.config/asystent/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("asystent")
            .join("config.toml")
    }

    pub fn load() -> Result<Self, figment::Error> {
        Self::figment(&Self::default_config_path()).extract()
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed(ENV_PREFIX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_resolve_and_webhook_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                    backend_url = "https://example.supabase.co"
                    backend_api_key = "anon-key"
                "#,
            )?;

            let config: AppConfig = AppConfig::figment(Path::new("config.toml")).extract()?;
            assert_eq!(config.backend_url, "https://example.supabase.co");
            assert_eq!(config.backend_api_key, "anon-key");
            assert_eq!(config.webhook_url, DEFAULT_WEBHOOK_URL);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_the_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                    backend_url = "https://example.supabase.co"
                    backend_api_key = "anon-key"
                    webhook_url = "https://file.example/webhook"
                "#,
            )?;
            jail.set_env("ASYSTENT_WEBHOOK_URL", "https://env.example/webhook");

            let config: AppConfig = AppConfig::figment(Path::new("config.toml")).extract()?;
            assert_eq!(config.webhook_url, "https://env.example/webhook");
            Ok(())
        });
    }

    #[test]
    fn missing_backend_settings_fail_extraction() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.toml", r#"webhook_url = "https://x.example""#)?;

            let result: Result<AppConfig, _> =
                AppConfig::figment(Path::new("config.toml")).extract();
            assert!(result.is_err());
            Ok(())
        });
    }
}
