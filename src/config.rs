use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::clock::SystemClock;
use crate::generation::Provider;
use crate::labels::{Labels, Locale};
use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Environment variable that overrides `database_path`.
pub const DB_PATH_ENV: &str = "DAYBOOK_DB_PATH";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Display timezone as minutes east of UTC.
    #[serde(default = "default_timezone_offset_minutes")]
    pub timezone_offset_minutes: i32,
    #[serde(default)]
    pub locale: Locale,
    #[serde(default)]
    pub key_bindings: KeyBindings,
    #[serde(default = "default_current_theme")]
    pub current_theme: String,
    #[serde(default)]
    pub themes: HashMap<String, Theme>,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    #[serde(default = "default_quit")]
    pub quit: String,
    #[serde(default = "default_list_up")]
    pub list_up: String,
    #[serde(default = "default_list_down")]
    pub list_down: String,
    #[serde(default = "default_tab_left")]
    pub tab_left: String,
    #[serde(default = "default_tab_right")]
    pub tab_right: String,
    #[serde(default = "default_tab_1")]
    pub tab_1: String,
    #[serde(default = "default_tab_2")]
    pub tab_2: String,
    #[serde(default = "default_tab_3")]
    pub tab_3: String,
    #[serde(default = "default_help")]
    pub help: String,
    #[serde(default = "default_toggle_task_status")]
    pub toggle_task_status: String,
    #[serde(default = "default_postpone")]
    pub postpone: String,
    #[serde(default = "default_generate_blog")]
    pub generate_blog: String,
    #[serde(default = "default_copy_post")]
    pub copy_post: String,
    #[serde(default = "default_refresh")]
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_fg")]
    pub fg: String,
    #[serde(default = "default_bg")]
    pub bg: String,
    #[serde(default = "default_highlight_bg")]
    pub highlight_bg: String,
    #[serde(default = "default_highlight_fg")]
    pub highlight_fg: String,
    #[serde(default = "default_tab_bg")]
    pub tab_bg: String,
    #[serde(default = "default_overdue_fg")]
    pub overdue_fg: String,
    #[serde(default = "default_done_fg")]
    pub done_fg: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_claude_model")]
    pub claude_model: String,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_claude_base_url")]
    pub claude_base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_include_images")]
    pub include_images: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            timezone_offset_minutes: default_timezone_offset_minutes(),
            locale: Locale::default(),
            key_bindings: KeyBindings::default(),
            current_theme: default_current_theme(),
            themes: HashMap::new(),
            generation: GenerationConfig::default(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            quit: default_quit(),
            list_up: default_list_up(),
            list_down: default_list_down(),
            tab_left: default_tab_left(),
            tab_right: default_tab_right(),
            tab_1: default_tab_1(),
            tab_2: default_tab_2(),
            tab_3: default_tab_3(),
            help: default_help(),
            toggle_task_status: default_toggle_task_status(),
            postpone: default_postpone(),
            generate_blog: default_generate_blog(),
            copy_post: default_copy_post(),
            refresh: default_refresh(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: default_fg(),
            bg: default_bg(),
            highlight_bg: default_highlight_bg(),
            highlight_fg: default_highlight_fg(),
            tab_bg: default_tab_bg(),
            overdue_fg: default_overdue_fg(),
            done_fg: default_done_fg(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            openai_model: default_openai_model(),
            claude_model: default_claude_model(),
            openai_base_url: default_openai_base_url(),
            claude_base_url: default_claude_base_url(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            include_images: default_include_images(),
        }
    }
}

impl Theme {
    fn preset(fg: &str, bg: &str, highlight_bg: &str, highlight_fg: &str) -> Self {
        Self {
            fg: fg.to_string(),
            bg: bg.to_string(),
            highlight_bg: highlight_bg.to_string(),
            highlight_fg: highlight_fg.to_string(),
            ..Theme::default()
        }
    }

    /// Preset themes that are always available
    pub fn get_preset_themes() -> HashMap<String, Theme> {
        HashMap::from([
            ("default".to_string(), Theme::default()),
            ("dark".to_string(), Theme::preset("white", "black", "cyan", "black")),
            ("light".to_string(), Theme::preset("black", "white", "blue", "white")),
            ("green".to_string(), Theme::preset("green", "black", "yellow", "black")),
        ])
    }
}

// Default value functions
fn default_database_path() -> String {
    Config::default_database_path_for_profile(utils::Profile::Prod)
}

fn default_timezone_offset_minutes() -> i32 {
    540
}

fn default_quit() -> String {
    "q".to_string()
}

fn default_list_up() -> String {
    "k".to_string()
}

fn default_list_down() -> String {
    "j".to_string()
}

fn default_tab_left() -> String {
    "Left".to_string()
}

fn default_tab_right() -> String {
    "Right".to_string()
}

fn default_tab_1() -> String {
    "1".to_string()
}

fn default_tab_2() -> String {
    "2".to_string()
}

fn default_tab_3() -> String {
    "3".to_string()
}

fn default_help() -> String {
    "F1".to_string()
}

fn default_toggle_task_status() -> String {
    "Space".to_string()
}

fn default_postpone() -> String {
    "p".to_string()
}

fn default_generate_blog() -> String {
    "g".to_string()
}

fn default_copy_post() -> String {
    "y".to_string()
}

fn default_refresh() -> String {
    "r".to_string()
}

fn default_current_theme() -> String {
    "default".to_string()
}

fn default_fg() -> String {
    "white".to_string()
}

fn default_bg() -> String {
    "black".to_string()
}

fn default_highlight_bg() -> String {
    "blue".to_string()
}

fn default_highlight_fg() -> String {
    "white".to_string()
}

fn default_tab_bg() -> String {
    "gray".to_string()
}

fn default_overdue_fg() -> String {
    "lightred".to_string()
}

fn default_done_fg() -> String {
    "darkgray".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

fn default_claude_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_claude_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_include_images() -> bool {
    true
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Invalid timezone offset: {0} minutes")]
    InvalidOffset(i32),
}

impl Config {
    /// Load configuration from `path` (or the profile's default location),
    /// writing defaults there first if the file does not exist.
    pub fn load_with_profile(
        profile: utils::Profile,
        path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::get_config_path(profile)?,
        };

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            let config: Config = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            let mut config = Config {
                database_path: Self::default_database_path_for_profile(profile),
                ..Config::default()
            };
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.clock().map(|_| ())
    }

    /// Write configuration to `path`, creating its directory.
    pub fn save_to(&mut self, config_path: &Path) -> Result<(), ConfigError> {
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(config_path, toml_string).map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile).ok_or_else(|| {
            ConfigError::ConfigDirError("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("config.toml"))
    }

    fn default_database_path_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("daybook.db").to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => "~/.local/share/daybook-dev/daybook.db".to_string(),
                utils::Profile::Prod => "~/.local/share/daybook/daybook.db".to_string(),
            }
        }
    }

    /// Database path with `~` expanded; `DAYBOOK_DB_PATH` wins when set.
    pub fn get_database_path(&self) -> PathBuf {
        match std::env::var(DB_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => utils::expand_path(&path),
            _ => utils::expand_path(&self.database_path),
        }
    }

    /// Clock for the configured display timezone.
    pub fn clock(&self) -> Result<SystemClock, ConfigError> {
        SystemClock::from_offset_minutes(self.timezone_offset_minutes)
            .ok_or(ConfigError::InvalidOffset(self.timezone_offset_minutes))
    }

    pub fn labels(&self) -> Labels {
        Labels::for_locale(self.locale)
    }

    /// The active theme: user-defined first, then presets, then the default.
    /// An empty `highlight_fg` is derived from `highlight_bg`.
    pub fn get_active_theme(&self) -> Theme {
        use crate::tui::widgets::color::{format_color_for_display, get_contrast_text_color_from_str};

        let mut theme = self
            .themes
            .get(&self.current_theme)
            .cloned()
            .or_else(|| Theme::get_preset_themes().remove(&self.current_theme))
            .unwrap_or_default();

        if theme.highlight_fg.is_empty() {
            let fg = get_contrast_text_color_from_str(&theme.highlight_bg);
            theme.highlight_fg = format_color_for_display(&fg);
        }

        theme
    }
}
