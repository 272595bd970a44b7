//! Application settings and configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application settings
///
/// Persistent configuration for the VetChat console.
/// Settings are stored in JSON format and can be loaded/saved from disk.
/// Missing fields fall back to their defaults.
///
/// # Example
/// ```rust,no_run
/// use vetchat::model::Settings;
///
/// // Load settings (returns default if file doesn't exist)
/// let mut settings = Settings::load("vetchat.json").expect("Failed to load");
///
/// settings.room_poll_interval_ms = 10_000;
/// settings.save("vetchat.json").expect("Failed to save");
///
/// println!("Polling every {:?}", settings.polling_config().interval);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the clinic REST API
    pub api_base_url: String,
    /// Bearer token attached to every request
    pub auth_token: Option<String>,
    /// How long a cached room list stays fresh
    pub room_cache_ttl_ms: u64,
    /// Room list polling interval
    pub room_poll_interval_ms: u64,
    /// Delay between detecting a change and notifying subscribers
    pub notify_debounce_ms: u64,
    /// Open conversation polling interval
    pub message_poll_interval_ms: u64,
    /// Rooms requested per page
    pub room_page_size: u32,
    /// Messages requested per page
    pub message_page_size: u32,
    /// HTTP request timeout
    pub request_timeout_ms: u64,
    /// Rows from the bottom still counted as "at the bottom"
    pub bottom_threshold_rows: u32,
    /// Rows from the top that trigger loading older messages
    pub top_threshold_rows: u32,
    /// Log file used by the terminal console
    pub log_path: String,
}

impl Settings {
    /// Load settings from a JSON file
    ///
    /// # Arguments
    /// * `path` - Path to the settings file
    ///
    /// # Returns
    /// The loaded settings, or default settings if file doesn't exist
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read settings: {}", e)))?;

        // Handle empty file (return defaults)
        if data.trim().is_empty() {
            return Ok(Self::default());
        }

        let settings: Self = serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("Failed to parse settings: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a JSON file
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Config(format!("Failed to create settings directory: {}", e))
                })?;
            }
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| Error::Config(format!("Failed to write settings: {}", e)))?;

        Ok(())
    }

    /// Reject values the sync loops cannot run with
    pub fn validate(&self) -> Result<()> {
        let non_zero = [
            ("room_cache_ttl_ms", self.room_cache_ttl_ms),
            ("room_poll_interval_ms", self.room_poll_interval_ms),
            ("message_poll_interval_ms", self.message_poll_interval_ms),
            ("request_timeout_ms", self.request_timeout_ms),
            ("room_page_size", u64::from(self.room_page_size)),
            ("message_page_size", u64::from(self.message_page_size)),
        ];

        if let Some((name, _)) = non_zero.iter().find(|(_, value)| *value == 0) {
            return Err(Error::Config(format!("{} must be greater than zero", name)));
        }

        if self.api_base_url.trim().is_empty() {
            return Err(Error::Config("api_base_url must not be empty".to_string()));
        }

        Ok(())
    }

    /// Room cache freshness window
    pub fn room_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.room_cache_ttl_ms)
    }

    /// HTTP request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Configuration for the room list poller
    pub fn polling_config(&self) -> PollingConfig {
        PollingConfig {
            interval: Duration::from_millis(self.room_poll_interval_ms),
            debounce: Duration::from_millis(self.notify_debounce_ms),
            page_size: self.room_page_size,
        }
    }

    /// Configuration for conversation views
    pub fn conversation_config(&self) -> ConversationConfig {
        ConversationConfig {
            page_size: self.message_page_size,
            poll_interval: Duration::from_millis(self.message_poll_interval_ms),
            bottom_threshold: self.bottom_threshold_rows,
            top_threshold: self.top_threshold_rows,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            auth_token: None,
            room_cache_ttl_ms: 3_000,
            room_poll_interval_ms: 5_000,
            notify_debounce_ms: 300,
            message_poll_interval_ms: 2_000,
            room_page_size: 50,
            message_page_size: 20,
            request_timeout_ms: 10_000,
            bottom_threshold_rows: 3,
            top_threshold_rows: 1,
            log_path: "vetchat.log".to_string(),
        }
    }
}

/// Room list polling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// Time between detection cycles
    pub interval: Duration,
    /// Delay before subscribers are notified of a detected change
    pub debounce: Duration,
    /// Rooms requested per poll
    pub page_size: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Settings::default().polling_config()
    }
}

/// Conversation view parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversationConfig {
    /// Messages per page
    pub page_size: u32,
    /// Time between latest-page refreshes
    pub poll_interval: Duration,
    /// Rows from the bottom still counted as "at the bottom"
    pub bottom_threshold: u32,
    /// Rows from the top that trigger loading older messages
    pub top_threshold: u32,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Settings::default().conversation_config()
    }
}
