use farewatch_shared::Masked;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub amadeus: AmadeusConfig,
    #[serde(default)]
    pub seats_aero: SeatsAeroConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    /// `amadeus`, `seats_aero` or `dummy`
    pub provider: String,
    pub max_results: u32,
    pub cache_ttl_seconds: u64,
    pub cache_max_entries: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: "dummy".into(),
            max_results: 20,
            cache_ttl_seconds: 300,
            cache_max_entries: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AmadeusConfig {
    #[serde(default = "default_amadeus_url")]
    pub base_url: String,
    pub api_key: Option<Masked<String>>,
    pub api_secret: Option<Masked<String>>,
}

fn default_amadeus_url() -> String {
    "https://test.api.amadeus.com".into()
}

impl Default for AmadeusConfig {
    fn default() -> Self {
        Self { base_url: default_amadeus_url(), api_key: None, api_secret: None }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeatsAeroConfig {
    #[serde(default = "default_seats_url")]
    pub base_url: String,
    pub api_key: Option<Masked<String>>,
}

fn default_seats_url() -> String {
    "https://seats.aero/partnerapi".into()
}

impl Default for SeatsAeroConfig {
    fn default() -> Self {
        Self { base_url: default_seats_url(), api_key: None }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_url")]
    pub base_url: String,
    pub api_key: Option<Masked<String>>,
}

fn default_llm_provider() -> String {
    "openai".into()
}

fn default_llm_model() -> String {
    "gpt-4.1-mini".into()
}

fn default_llm_url() -> String {
    "https://api.openai.com/v1".into()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            base_url: default_llm_url(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MonitorConfig {
    pub top_n: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { top_n: 3 }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `FAREWATCH_SEARCH__PROVIDER=amadeus`
            .add_source(
                config::Environment::with_prefix("FAREWATCH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    fn parse(toml: &str) -> Config {
        config::Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let cfg = parse("[server]\nport = 8080\n");
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.search.provider, "dummy");
        assert_eq!(cfg.search.cache_ttl_seconds, 300);
        assert_eq!(cfg.search.cache_max_entries, 500);
        assert_eq!(cfg.llm.model, "gpt-4.1-mini");
        assert_eq!(cfg.monitor.top_n, 3);
        assert!(cfg.amadeus.api_key.is_none());
    }

    #[test]
    fn test_secrets_are_masked_in_debug() {
        let cfg = parse(
            r#"
            [server]
            port = 3000
            [amadeus]
            api_key = "client-id"
            api_secret = "very-secret"
            "#,
        );
        let secret = cfg.amadeus.api_secret.as_ref().unwrap();
        assert_eq!(secret.expose(), "very-secret");
        assert_eq!(cfg.amadeus.base_url, "https://test.api.amadeus.com");
        assert!(!format!("{:?}", cfg).contains("very-secret"));
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let cfg = parse("[server]\nport = 3000\n[search]\nprovider = \"amadeus\"\n");
        assert_eq!(cfg.search.provider, "amadeus");
        assert_eq!(cfg.search.max_results, 20);
    }
}
