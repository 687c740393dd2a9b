use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that make startup impossible. All of these are reported before any
/// connection is attempted and terminate the process with a non-zero exit.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DISCORD_TOKEN is not set — export it or put `discord_token` in {0}")]
    MissingDiscordToken(String),
    #[error("GEMINI_API_KEY is not set — export it or put `gemini_api_key` in {0}")]
    MissingGeminiKey(String),
    #[error("BOT_NAME is not set — export it or put `bot_name` in {0}")]
    MissingBotName(String),
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidInteger { name: &'static str, value: String },
    #[error("{name} must be greater than 0")]
    Zero { name: &'static str },
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Prompt templates, kept as data so persona tuning is a config edit rather
/// than a code change. Slots: `{bot_name}`, `{transcript}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Used when someone mentions the bot or drops its name in a message.
    pub direct: String,
    /// Used when the channel hits the message threshold on its own.
    pub periodic: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            direct: "You are {bot_name}, one more regular in this Discord channel. \
                     You are from Madrid and speak with a casual, street-level register. \
                     You may sprinkle in slang from this set only: 'tío', 'en plan', \
                     'flipas', 'qué va', 'mazo' — use it sparingly, and never use emoji.\n\n\
                     Here are the latest messages in the channel:\n\n{transcript}\n\n\
                     Someone just addressed you directly. Reply only to the most recent \
                     message aimed at you, and do not call the person out by name. \
                     If it is casual banter, keep it to a sentence or two; if it is a \
                     substantive question, answer at more length with real, verifiable \
                     information from the web. Your reply:"
                .into(),
            periodic: "You are one more participant in this chat conversation. \
                       Here are the latest messages:\n\n{transcript}\n\n\
                       Now it is your turn to say something relevant and natural to the \
                       conversation, in no more than 40 words. Your username is \
                       {bot_name}. Your reply:"
                .into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Discord bot token. Env: `DISCORD_TOKEN`.
    pub discord_token: String,
    /// Gemini API key. Env: `GEMINI_API_KEY`.
    pub gemini_api_key: String,
    /// Name the bot answers to, matched case-insensitively as a substring.
    /// Env: `BOT_NAME`.
    pub bot_name: String,
    /// Messages seen in a channel before the bot chimes in unprompted.
    /// Env: `MESSAGE_THRESHOLD`.
    pub message_threshold: u32,
    /// How many recent messages to hand to the generator as context.
    /// Env: `MAX_HISTORY`.
    pub max_history: usize,
    /// Gemini model name.
    pub model: String,
    /// Sampling temperature for generation.
    pub temperature: f64,
    /// Hard deadline on a single generateContent call.
    pub generate_timeout_secs: u64,
    pub prompts: PromptsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            gemini_api_key: String::new(),
            bot_name: String::new(),
            message_threshold: 5,
            max_history: 30,
            model: "gemini-2.0-flash".into(),
            temperature: 0.7,
            generate_timeout_secs: 120,
            prompts: PromptsConfig::default(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".tertulia"))
        .unwrap_or_else(|| PathBuf::from(".tertulia"))
}

fn env_override(target: &mut String, name: &str) {
    if let Ok(value) = std::env::var(name) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            *target = trimmed.to_string();
        }
    }
}

fn env_override_int<T: std::str::FromStr>(
    target: &mut T,
    name: &'static str,
) -> Result<(), ConfigError> {
    if let Ok(value) = std::env::var(name) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(());
        }
        *target = trimmed.parse().map_err(|_| ConfigError::InvalidInteger {
            name,
            value: trimmed.to_string(),
        })?;
    }
    Ok(())
}

impl Config {
    /// Load from `<dir>/config.toml` if present, then apply env overrides and
    /// validate. `dir` defaults to `~/.tertulia`.
    pub fn load(dir: Option<&Path>) -> Result<Self, ConfigError> {
        let dir = dir.map_or_else(default_config_dir, Path::to_path_buf);
        let path = dir.join("config.toml");
        let path_display = path.display().to_string();

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path_display.clone(),
                source,
            })?;
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path_display.clone(),
                source,
            })?
        } else {
            Self::default()
        };

        env_override(&mut config.discord_token, "DISCORD_TOKEN");
        env_override(&mut config.gemini_api_key, "GEMINI_API_KEY");
        env_override(&mut config.bot_name, "BOT_NAME");
        env_override_int(&mut config.message_threshold, "MESSAGE_THRESHOLD")?;
        env_override_int(&mut config.max_history, "MAX_HISTORY")?;

        config.validate(&path_display)?;
        Ok(config)
    }

    fn validate(&self, path: &str) -> Result<(), ConfigError> {
        if self.discord_token.trim().is_empty() {
            return Err(ConfigError::MissingDiscordToken(path.to_string()));
        }
        if self.gemini_api_key.trim().is_empty() {
            return Err(ConfigError::MissingGeminiKey(path.to_string()));
        }
        if self.bot_name.trim().is_empty() {
            return Err(ConfigError::MissingBotName(path.to_string()));
        }
        if self.message_threshold == 0 {
            return Err(ConfigError::Zero {
                name: "message_threshold",
            });
        }
        if self.max_history == 0 {
            return Err(ConfigError::Zero {
                name: "max_history",
            });
        }
        Ok(())
    }

    /// Lowercased bot name, computed once per call site for substring matching.
    pub fn bot_name_lower(&self) -> String {
        self.bot_name.to_lowercase()
    }
}
