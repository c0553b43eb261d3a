use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

pub const DEFAULT_SYSTEM_PROMPT: &str = "Sei un assistente AI che risponde in italiano.";

const API_KEY_ENV: &str = "GOOGLE_GENERATIVE_AI_API_KEY";
const BYPASS_PROXY_ENV: &str = "PARLA_DISABLE_SYSTEM_PROXY";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub google_api_key: Option<String>,
    pub google_base_url: Option<String>,
    /// Ignore `HTTP(S)_PROXY` for provider calls
    pub bypass_system_proxy: bool,
    /// Used when a chat request carries no system prompt
    pub default_system_prompt: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            google_api_key: None,
            google_base_url: None,
            bypass_system_proxy: false,
            default_system_prompt: default_system_prompt(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    provider: ProviderSection,
    #[serde(default)]
    chat: ChatSection,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct ProviderSection {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    bypass_system_proxy: bool,
}

#[derive(Debug, Deserialize)]
struct ChatSection {
    #[serde(default = "default_system_prompt")]
    default_system_prompt: String,
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            default_system_prompt: default_system_prompt(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl ServerConfig {
    /// Load from `PARLA_SERVER_CONFIG` or `./parla.toml` when present,
    /// otherwise from the environment. The API key always falls back to the
    /// environment so it can stay out of config files.
    pub fn load() -> anyhow::Result<Self> {
        let lookup = |key: &str| env::var(key).ok();
        let config = match config_path() {
            Some(path) => Self::from_file(&path, lookup)?,
            None => Self::from_lookup(lookup),
        };
        Ok(config)
    }

    fn from_file(path: &str, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path, err))?;
        let parsed: FileConfig = toml::from_str(&contents)
            .map_err(|err| anyhow::anyhow!("Failed to parse config {}: {}", path, err))?;

        Ok(Self {
            host: parsed.server.host,
            port: parsed.server.port,
            google_api_key: non_empty(parsed.provider.api_key).or_else(|| non_empty(lookup(API_KEY_ENV))),
            google_base_url: non_empty(parsed.provider.base_url),
            bypass_system_proxy: parsed.provider.bypass_system_proxy
                || lookup(BYPASS_PROXY_ENV).is_some(),
            default_system_prompt: parsed.chat.default_system_prompt,
        })
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let host = lookup("PARLA_SERVER_HOST").unwrap_or_else(default_host);
        let port = lookup("PARLA_SERVER_PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or_else(default_port);
        let default_system_prompt =
            non_empty(lookup("PARLA_DEFAULT_SYSTEM_PROMPT")).unwrap_or_else(default_system_prompt);

        Self {
            host,
            port,
            google_api_key: non_empty(lookup(API_KEY_ENV)),
            google_base_url: non_empty(lookup("PARLA_GEMINI_BASE_URL")),
            bypass_system_proxy: lookup(BYPASS_PROXY_ENV).is_some(),
            default_system_prompt,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn config_path() -> Option<String> {
    if let Ok(path) = env::var("PARLA_SERVER_CONFIG") {
        Some(path)
    } else if Path::new("parla.toml").exists() {
        Some("parla.toml".to_string())
    } else {
        None
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
