use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub session: SessionConfig,
    pub brokerage: BrokerageConfig,
    pub llm: LlmConfig,
    pub rewards: RewardsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory holding the prebuilt web client, served as a fallback.
    #[serde(default)]
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_backend")]
    pub backend: SessionBackend,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_session_ttl_hours")]
    pub ttl_hours: u64,
    #[serde(default)]
    pub secure_cookie: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerageConfig {
    pub trading_url: String,
    pub data_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RewardsConfig {
    #[serde(default = "default_quiz_correct_xp")]
    pub quiz_correct_xp: i32,
    #[serde(default = "default_xp_per_level")]
    pub xp_per_level: i32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    10
}

fn default_session_backend() -> SessionBackend {
    SessionBackend::Redis
}

fn default_cookie_name() -> String {
    "academy_sid".to_string()
}

fn default_session_ttl_hours() -> u64 {
    24 * 7
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    800
}

fn default_llm_timeout_secs() -> u64 {
    60
}

fn default_quiz_correct_xp() -> i32 {
    10
}

fn default_xp_per_level() -> i32 {
    100
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "postgres://localhost/trading_academy")?
            .set_default("database.max_connections", 10)?
            .set_default("redis.url", "redis://localhost:6379")?
            .set_default("session.backend", "redis")?
            .set_default("session.cookie_name", "academy_sid")?
            .set_default("session.ttl_hours", 24 * 7)?
            .set_default("session.secure_cookie", false)?
            .set_default("brokerage.trading_url", "https://paper-api.alpaca.markets")?
            .set_default("brokerage.data_url", "https://data.alpaca.markets")?
            .set_default("brokerage.timeout_secs", 15)?
            .set_default("llm.base_url", "https://api.openai.com/v1")?
            .set_default("llm.api_key", "")?
            .set_default("llm.model", "gpt-4o-mini")?
            .set_default("llm.temperature", 0.7)?
            .set_default("llm.max_tokens", 800)?
            .set_default("llm.timeout_secs", 60)?
            .set_default("rewards.quiz_correct_xp", 10)?
            .set_default("rewards.xp_per_level", 100)?
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Configuration for tests and local tooling; no environment lookups.
    pub fn for_local(brokerage_url: &str, llm_url: &str) -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                static_dir: None,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/trading_academy".to_string(),
                max_connections: default_max_connections(),
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
            },
            session: SessionConfig {
                backend: SessionBackend::Memory,
                cookie_name: default_cookie_name(),
                ttl_hours: default_session_ttl_hours(),
                secure_cookie: false,
            },
            brokerage: BrokerageConfig {
                trading_url: brokerage_url.to_string(),
                data_url: brokerage_url.to_string(),
                timeout_secs: default_timeout_secs(),
            },
            llm: LlmConfig {
                base_url: llm_url.to_string(),
                api_key: "test-key".to_string(),
                model: "gpt-4o-mini".to_string(),
                temperature: default_temperature(),
                max_tokens: default_max_tokens(),
                timeout_secs: default_llm_timeout_secs(),
            },
            rewards: RewardsConfig {
                quiz_correct_xp: default_quiz_correct_xp(),
                xp_per_level: default_xp_per_level(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_env_vars_override_defaults() {
        std::env::set_var("DATABASE__URL", "postgres://seed@db.internal/academy");
        std::env::set_var("REWARDS__XP_PER_LEVEL", "250");

        let config = Config::load().unwrap();

        std::env::remove_var("DATABASE__URL");
        std::env::remove_var("REWARDS__XP_PER_LEVEL");

        assert_eq!(config.database.url, "postgres://seed@db.internal/academy");
        assert_eq!(config.rewards.xp_per_level, 250);
        assert_eq!(config.session.cookie_name, "academy_sid");
    }
}
