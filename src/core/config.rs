use ::config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub rate_limit: RateLimitConfig,
    pub stream: StreamConfig,
    pub export: ExportConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Longest gap between two body chunks before the stream is abandoned.
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub per_minute: u32,
    pub burst: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Upper bound for undecoded bytes held while waiting for a line to complete.
    pub max_pending_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    pub typst_bin: String,
    pub temp_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl AppConfig {
    /// Defaults, then `docgen.toml` if present, then `DOCGEN_*` variables
    /// (`DOCGEN_SERVER__PORT=9000`).
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name("docgen").required(false))
            .add_source(
                Environment::with_prefix("DOCGEN")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("gateway.url", "https://ai.gateway.lovable.dev/v1/chat/completions")?
            .set_default("gateway.model", "google/gemini-3-flash-preview")?
            .set_default("gateway.idle_timeout_secs", 120)?
            .set_default("rate_limit.per_minute", 30)?
            .set_default("rate_limit.burst", 10)?
            .set_default("stream.max_pending_bytes", 1_048_576)?
            .set_default("export.typst_bin", "typst")?
            .set_default("export.temp_dir", "/tmp")?
            .set_default(
                "client.endpoint",
                "http://127.0.0.1:8080/api/v1/documents/generate",
            )
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            gateway: GatewayConfig {
                url: "https://ai.gateway.lovable.dev/v1/chat/completions".to_string(),
                api_key: None,
                model: "google/gemini-3-flash-preview".to_string(),
                idle_timeout_secs: 120,
            },
            rate_limit: RateLimitConfig {
                per_minute: 30,
                burst: 10,
            },
            stream: StreamConfig {
                max_pending_bytes: 1_048_576, // 1MB
            },
            export: ExportConfig {
                typst_bin: "typst".to_string(),
                temp_dir: "/tmp".to_string(),
            },
            client: ClientConfig {
                endpoint: "http://127.0.0.1:8080/api/v1/documents/generate".to_string(),
                api_key: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_defaults_deserialize() {
        let config: AppConfig = AppConfig::builder()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.stream.max_pending_bytes, 1_048_576);
        assert!(config.gateway.api_key.is_none());
        assert_eq!(config.client.endpoint, AppConfig::default().client.endpoint);
    }
}
