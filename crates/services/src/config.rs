use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Duration;

use crate::error::ConfigError;

pub const AUTO_ADVANCE_ENV: &str = "COURSE_PLAYER_AUTO_ADVANCE_MS";
pub const FLASHCARD_COMPLETION_ENV: &str = "COURSE_PLAYER_FLASHCARD_COMPLETION";
pub const DB_URL_ENV: &str = "COURSE_PLAYER_DB_URL";

const DEFAULT_AUTO_ADVANCE_MS: i64 = 1500;
const DEFAULT_DB_URL: &str = "sqlite://course_player.sqlite3";

/// Whether reaching the end of a flashcard deck counts as finishing the lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlashcardCompletion {
    /// The deck is study material only; nothing is recorded.
    #[default]
    Never,
    /// Pressing next on the last card marks the lesson complete and schedules
    /// auto-advance, like the other runners.
    DeckEnd,
}

impl FromStr for FlashcardCompletion {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "never" => Ok(Self::Never),
            "deck_end" | "deck-end" => Ok(Self::DeckEnd),
            _ => Err(ConfigError::InvalidValue {
                var: FLASHCARD_COMPLETION_ENV,
                value: value.to_owned(),
            }),
        }
    }
}

/// Player behavior knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Delay between a runner's success and moving to the next lesson.
    pub auto_advance_delay: Duration,
    pub flashcard_completion: FlashcardCompletion,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            auto_advance_delay: Duration::milliseconds(DEFAULT_AUTO_ADVANCE_MS),
            flashcard_completion: FlashcardCompletion::default(),
        }
    }
}

impl PlayerConfig {
    /// Reads overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for values that are present but unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads overrides through `lookup`; absent keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for values that are present but unparsable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(AUTO_ADVANCE_ENV) {
            let millis: u32 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: AUTO_ADVANCE_ENV,
                value: raw.clone(),
            })?;
            config.auto_advance_delay = Duration::milliseconds(i64::from(millis));
        }
        if let Some(raw) = lookup(FLASHCARD_COMPLETION_ENV) {
            config.flashcard_completion = raw.parse()?;
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_auto_advance_delay(mut self, delay: Duration) -> Self {
        self.auto_advance_delay = delay;
        self
    }

    #[must_use]
    pub fn with_flashcard_completion(mut self, completion: FlashcardCompletion) -> Self {
        self.flashcard_completion = completion;
        self
    }
}

/// The database URL from `lookup`, normalized, or the default file next to the
/// working directory.
#[must_use]
pub fn db_url_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> String {
    lookup(DB_URL_ENV)
        .filter(|raw| !raw.trim().is_empty())
        .map_or_else(|| normalize_sqlite_url(DEFAULT_DB_URL), |raw| normalize_sqlite_url(&raw))
}

/// Turns a bare path or `sqlite:` path into an absolute `sqlite://` URL.
#[must_use]
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite:file:") {
        return trimmed.to_owned();
    }
    if let Some(rest) = trimmed.strip_prefix("sqlite://") {
        if Path::new(rest.split('?').next().unwrap_or(rest)).is_absolute() {
            return trimmed.to_owned();
        }
        return format!("sqlite://{}", absolute(rest).display());
    }

    let path = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    format!("sqlite://{}", absolute(path).display())
}

fn absolute(path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    }
}

/// Creates the database file (and parent directories) so the pool can open it.
///
/// # Errors
///
/// Returns `ConfigError` when the URL has no path or the file cannot be created.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), ConfigError> {
    if db_url == "sqlite::memory:" || db_url.starts_with("sqlite:file:") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ConfigError::InvalidDbUrl(db_url.to_owned()))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ConfigError::InvalidDbUrl(db_url.to_owned()));
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}
