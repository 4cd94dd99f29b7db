//! Runtime configuration read from the environment.
//!
//! | variable                             | meaning                                  |
//! |--------------------------------------|------------------------------------------|
//! | `WK_INCLUDE` / `WK_EXCLUDE`          | regexes, separated by newlines or commas |
//! | `WK_EXCLUDE_UNKNOWN_PROJECT`         | drop heartbeats without a project        |
//! | `WK_INCLUDE_ONLY_WITH_PROJECT_FILE`  | require a `.wakatime-project` file       |
//! | `WK_LANGUAGE` / `WK_ALTERNATE_LANGUAGE` | language overwrite / fallback         |
//! | `WK_PROJECT` / `WK_ALTERNATE_PROJECT`   | project override / fallback           |
//! | `WK_USER_AGENT`                      | user agent for heartbeats without one    |

use crate::filter::FilterConfig;
use crate::language::LanguageConfig;
use crate::project::ProjectConfig;
use regex::Regex;

pub const DEFAULT_USER_AGENT: &str = concat!("wk/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid pattern {pattern:?} in {key}: {source}")]
    InvalidPattern {
        key: &'static str,
        pattern: String,
        source: regex::Error,
    },

    #[error("invalid boolean {value:?} in {key}")]
    InvalidBool { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub filter: FilterConfig,
    pub language: LanguageConfig,
    pub project: ProjectConfig,
    pub user_agent: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let filter = FilterConfig {
            exclude: patterns("WK_EXCLUDE", lookup("WK_EXCLUDE"))?,
            exclude_unknown_project: flag(
                "WK_EXCLUDE_UNKNOWN_PROJECT",
                lookup("WK_EXCLUDE_UNKNOWN_PROJECT"),
            )?,
            include: patterns("WK_INCLUDE", lookup("WK_INCLUDE"))?,
            include_only_with_project_file: flag(
                "WK_INCLUDE_ONLY_WITH_PROJECT_FILE",
                lookup("WK_INCLUDE_ONLY_WITH_PROJECT_FILE"),
            )?,
        };

        Ok(Config {
            filter,
            language: LanguageConfig {
                alternative: text("WK_ALTERNATE_LANGUAGE"),
                overwrite: text("WK_LANGUAGE"),
            },
            project: ProjectConfig {
                alternative: text("WK_ALTERNATE_PROJECT"),
                override_name: text("WK_PROJECT"),
            },
            user_agent: text("WK_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
        })
    }
}

fn patterns(key: &'static str, value: Option<String>) -> Result<Vec<Regex>, ConfigError> {
    let value = value.unwrap_or_default();

    value
        .split(|c: char| c == '\n' || c == ',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                key,
                pattern: pattern.to_owned(),
                source,
            })
        })
        .collect()
}

fn flag(key: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    let value = match value {
        Some(value) => value,
        None => return Ok(false),
    };

    match value.trim().to_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        _ => Err(ConfigError::InvalidBool { key, value }),
    }
}
