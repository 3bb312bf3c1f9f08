use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_RATE_LIMIT: usize = 5;
const DEFAULT_LOG_DIR: &str = "logs";

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the dotenv file given on the command line.
    ReadEnvFile { path: PathBuf, source: dotenvy::Error },
    /// A required variable is unset or empty.
    Missing(&'static str),
    /// A variable is set but cannot be parsed.
    InvalidValue { var: &'static str, value: String, reason: String },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadEnvFile { path, source } => {
                write!(f, "failed to read env file '{}': {}", path.display(), source)
            }
            Self::Missing(var) => write!(f, "{var} is not set"),
            Self::InvalidValue { var, value, reason } => {
                write!(f, "invalid value for {var} ('{value}'): {reason}")
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadEnvFile { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Upstream model tier. The free tier falls back to the paid model on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Free,
    Paid,
}

impl ModelTier {
    pub fn model_id(&self) -> &'static str {
        match self {
            ModelTier::Free => "deepseek/deepseek-chat:free",
            ModelTier::Paid => "deepseek/deepseek-chat",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "free" => Some(ModelTier::Free),
            "paid" => Some(ModelTier::Paid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub openrouter_api_key: String,
    pub openrouter_api_url: String,
    /// Requests per user per minute.
    pub rate_limit: usize,
    pub model_tier: ModelTier,
    /// Directory for the log file.
    pub log_dir: PathBuf,
}

impl Config {
    /// Load configuration from the environment, after loading `env_file` (or `.env` if present).
    ///
    /// Variables already set in the process environment win over the file.
    pub fn load(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::ReadEnvFile {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            }
            None => {
                // A missing .env is normal in containers
                dotenvy::dotenv().ok();
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "TELEGRAM_BOT_TOKEN appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
            ));
        }

        let openrouter_api_key = get("OPENROUTER_API_KEY").ok_or(ConfigError::Missing("OPENROUTER_API_KEY"))?;

        let openrouter_api_url = get("OPENROUTER_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if let Err(e) = reqwest::Url::parse(&openrouter_api_url) {
            return Err(ConfigError::InvalidValue {
                var: "OPENROUTER_API_URL",
                value: openrouter_api_url,
                reason: e.to_string(),
            });
        }

        let rate_limit = match get("RATE_LIMIT") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| ConfigError::InvalidValue {
                var: "RATE_LIMIT",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_RATE_LIMIT,
        };

        let model_tier = match get("MODEL_TYPE") {
            Some(raw) => ModelTier::parse(&raw).ok_or_else(|| ConfigError::InvalidValue {
                var: "MODEL_TYPE",
                value: raw.clone(),
                reason: "expected 'free' or 'paid'".into(),
            })?,
            None => ModelTier::Free,
        };

        let log_dir = get("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));

        Ok(Self {
            telegram_bot_token,
            openrouter_api_key,
            openrouter_api_url,
            rate_limit,
            model_tier,
            log_dir,
        })
    }
}
