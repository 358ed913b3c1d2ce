use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for TutorMate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub bedrock: BedrockConfig,
    pub retry: RetryConfig,
    pub tutorial: TutorialConfig,
    pub chat: ChatConfig,
    pub startup: StartupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    pub host: String,
    pub port: u16,
    pub debug: bool,
    /// Extra CORS origins on top of the local presentation-layer defaults.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedrockConfig {
    pub region: String,
    pub model_id: String,
    /// Overrides the regional runtime endpoint, e.g. for a VPC endpoint or a local stub.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Bedrock API key; read from the environment only.
    #[serde(skip)]
    pub bearer_token: Option<String>,
    pub anthropic_version: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub probe_max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_base: f64,
    pub jitter_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorialConfig {
    pub max_tokens: u32,
    pub min_transcript_chars: usize,
    pub min_questions: usize,
    pub max_questions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub max_tokens: u32,
    /// Number of trailing session messages embedded in the prompt.
    pub history_window: usize,
    pub max_transcript_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupConfig {
    pub max_attempts: u32,
    pub interval_ms: u64,
    /// Presentation-layer command launched once the API is healthy.
    pub ui_command: String,
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        Self::load_dotenv();

        let config_path =
            env::var("TUTORMATE_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from {}", config_path);
                        config
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to parse config file {}: {} - using defaults",
                            config_path,
                            e
                        );
                        Self::default()
                    }
                },
                Err(e) => {
                    tracing::error!(
                        "Failed to read config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            }
        } else {
            tracing::debug!("Config file not found at {} - using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();

        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    /// Load the first `.env` found; existing process variables win.
    pub fn load_dotenv() -> Option<&'static str> {
        let env_paths = ["../.env", ".env"];
        env_paths
            .into_iter()
            .find(|path| dotenvy::from_path(path).is_ok())
    }

    /// Whether `DEBUG` requests verbose logging, readable before the config is loaded
    pub fn debug_requested() -> bool {
        env::var("DEBUG").is_ok_and(|v| parse_flag(&v))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PORT") {
            if let Ok(port_num) = port.parse() {
                self.server.port = port_num;
            }
        }
        if let Some(debug) = var("DEBUG") {
            self.server.debug = parse_flag(&debug);
        }

        // Bedrock overrides
        if let Some(region) = var("AWS_REGION") {
            self.bedrock.region = region;
        }
        if let Some(model_id) = var("BEDROCK_MODEL_ID") {
            self.bedrock.model_id = model_id;
        }
        if let Some(endpoint) = var("BEDROCK_ENDPOINT_URL") {
            self.bedrock.endpoint_url = Some(endpoint);
        }
        if let Some(token) = var("AWS_BEARER_TOKEN_BEDROCK") {
            self.bedrock.bearer_token = Some(token);
        }
        if let Some(timeout) = var("BEDROCK_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.bedrock.timeout_secs = secs;
            }
        }

        // Retry overrides
        if let Some(attempts) = var("TUTORMATE_RETRY_MAX_ATTEMPTS") {
            if let Ok(n) = attempts.parse() {
                self.retry.max_attempts = n;
            }
        }

        // Chat overrides
        if let Some(window) = var("TUTORMATE_CHAT_HISTORY_WINDOW") {
            if let Ok(n) = window.parse() {
                self.chat.history_window = n;
            }
        }

        // Startup overrides
        if let Some(cmd) = var("TUTORMATE_UI_CMD") {
            self.startup.ui_command = cmd;
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.server.port == 0 {
            return Err("Server port cannot be 0".into());
        }

        if self.bedrock.timeout_secs == 0 {
            return Err("Bedrock timeout_secs cannot be 0".into());
        }

        if self.retry.max_attempts == 0 {
            return Err("Retry max_attempts cannot be 0".into());
        }
        if self.retry.jitter_factor < 0.0 || self.retry.jitter_factor > 1.0 {
            return Err("Retry jitter factor must be between 0.0 and 1.0".into());
        }

        if self.tutorial.min_questions > self.tutorial.max_questions {
            return Err("tutorial.min_questions cannot exceed tutorial.max_questions".into());
        }

        if self.bedrock.bearer_token.as_deref().is_none_or(str::is_empty) {
            return Err(
                "AWS_BEARER_TOKEN_BEDROCK is not set - Bedrock calls will be unauthenticated"
                    .into(),
            );
        }

        Ok(())
    }

    /// Runtime endpoint for the configured region unless overridden
    pub fn bedrock_endpoint(&self) -> String {
        match &self.bedrock.endpoint_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!(
                "https://bedrock-runtime.{}.amazonaws.com",
                self.bedrock.region
            ),
        }
    }

    /// Address the API binds to, as `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Health endpoint the launcher polls. Wildcard binds are probed on loopback.
    pub fn health_url(&self) -> String {
        let host = match self.server.host.as_str() {
            "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
            other => other,
        };
        format!("http://{}:{}/api/health", host, self.server.port)
    }

    pub fn get_bedrock_timeout(&self) -> Duration {
        Duration::from_secs(self.bedrock.timeout_secs)
    }

    pub fn get_probe_timeout(&self) -> Duration {
        Duration::from_secs(self.bedrock.probe_timeout_secs)
    }

    pub fn get_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.bedrock.connect_timeout_secs)
    }
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Default tracing filter when RUST_LOG is unset
pub fn log_filter(debug: bool) -> &'static str {
    if debug {
        "tutormate=debug,tower_http=debug,info"
    } else {
        "info"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "TutorMate AI API".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                host: "0.0.0.0".to_string(),
                port: 8000,
                debug: false,
                cors_origins: Vec::new(),
            },
            bedrock: BedrockConfig {
                region: "us-east-1".to_string(),
                model_id: "anthropic.claude-3-haiku-20240307-v1:0".to_string(),
                endpoint_url: None,
                bearer_token: None,
                anthropic_version: "bedrock-2023-05-31".to_string(),
                timeout_secs: 60,
                connect_timeout_secs: 10,
                probe_timeout_secs: 5,
                probe_max_tokens: 10,
            },
            retry: RetryConfig {
                max_attempts: 3,
                initial_delay_ms: 200,
                max_delay_ms: 5000,
                backoff_base: 2.0,
                jitter_factor: 0.2,
            },
            tutorial: TutorialConfig {
                max_tokens: 4000,
                min_transcript_chars: 50,
                min_questions: 5,
                max_questions: 8,
            },
            chat: ChatConfig {
                max_tokens: 1000,
                history_window: 6,
                max_transcript_chars: 12000,
            },
            startup: StartupConfig {
                max_attempts: 30,
                interval_ms: 1000,
                ui_command: "streamlit run app.py --server.port 8501".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut cfg = Config::default();
        cfg.apply_overrides(|key| vars.get(key).cloned());
        cfg
    }

    #[test]
    fn test_env_overrides_bind_and_model() {
        let cfg = overrides(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9100"),
            ("AWS_REGION", "eu-west-1"),
            ("BEDROCK_MODEL_ID", "anthropic.claude-3-sonnet"),
            ("DEBUG", "True"),
        ]);
        assert_eq!(cfg.bind_addr(), "127.0.0.1:9100");
        assert_eq!(cfg.bedrock.model_id, "anthropic.claude-3-sonnet");
        assert_eq!(
            cfg.bedrock_endpoint(),
            "https://bedrock-runtime.eu-west-1.amazonaws.com"
        );
        assert!(cfg.server.debug);
        assert_eq!(log_filter(cfg.server.debug), "tutormate=debug,tower_http=debug,info");
    }

    #[test]
    fn test_invalid_port_keeps_default() {
        let cfg = overrides(&[("PORT", "not-a-port")]);
        assert_eq!(cfg.server.port, 8000);
    }

    #[test]
    fn test_endpoint_override_trims_slash() {
        let cfg = overrides(&[("BEDROCK_ENDPOINT_URL", "http://localhost:4566/")]);
        assert_eq!(cfg.bedrock_endpoint(), "http://localhost:4566");
    }

    #[test]
    fn test_health_url_uses_loopback_for_wildcard() {
        let cfg = Config::default();
        assert_eq!(cfg.health_url(), "http://127.0.0.1:8000/api/health");
        let cfg = overrides(&[("HOST", "10.0.0.5"), ("PORT", "8080")]);
        assert_eq!(cfg.health_url(), "http://10.0.0.5:8080/api/health");
    }

    #[test]
    fn test_validate_flags_missing_token() {
        let cfg = Config::default();
        assert!(cfg.validate().is_err());
        let cfg = overrides(&[("AWS_BEARER_TOKEN_BEDROCK", "abc")]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_bearer_token_not_read_from_yaml() {
        let mut value =
            serde_yaml::to_value(Config::default()).expect("serialize default config");
        value["bedrock"]["bearer_token"] = serde_yaml::Value::from("from-file");
        value["chat"]["history_window"] = serde_yaml::Value::from(4);
        let parsed: Config = serde_yaml::from_value(value).expect("parse config");
        assert_eq!(parsed.chat.history_window, 4);
        assert!(parsed.bedrock.bearer_token.is_none());
    }
}
