use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use url::Url;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub catalog: CatalogConfig,
    #[validate(nested)]
    pub site: SiteConfig,
    #[validate(nested)]
    pub browser: BrowserConfig,
    #[validate(nested)]
    pub retry: RetryConfig,
    pub rules: RulesConfig,
    #[validate(nested)]
    pub store: StoreConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CatalogConfig {
    #[validate(length(min = 1, message = "at least one catalog URL is required"))]
    pub urls: Vec<String>,
    /// Value of the `sorting` query parameter on listing pages.
    #[serde(default = "default_sorting")]
    pub sorting: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SiteConfig {
    #[validate(length(min = 1))]
    pub source: String,
    #[validate(length(min = 1))]
    pub pagination_selector: String,
    #[validate(length(min = 1))]
    pub grid_selector: String,
    #[validate(length(min = 1))]
    pub item_anchor_selector: String,
    #[serde(default)]
    pub modal_selectors: Vec<String>,
    /// JavaScript expression yielding the embedded product payload.
    #[validate(length(min = 1))]
    pub payload_expression: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BrowserConfig {
    pub headless: bool,
    #[validate(range(min = 320))]
    pub viewport_width: u32,
    #[validate(range(min = 240))]
    pub viewport_height: u32,
    #[validate(range(min = 1))]
    pub navigation_timeout_secs: u64,
    pub chrome_path: Option<String>,
    #[validate(length(min = 1, message = "user agent pool must not be empty"))]
    pub user_agents: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RetryConfig {
    #[validate(range(min = 1))]
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub growth_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    pub price_drop_threshold_percent: f64,
    pub early_release_cutoff_hour: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StoreConfig {
    #[validate(length(min = 1))]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub whatsapp: Option<WhatsAppConfig>,
    pub discord: Option<DiscordConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    pub api_url: String,
    pub instance: String,
    pub number: String,
    pub api_key: String,
    #[serde(default = "default_whatsapp_delay")]
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
    /// When set, logs are also written to a daily rolling file here.
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "catalog_watcher=debug".to_string(),
            directory: None,
        }
    }
}

fn default_sorting() -> Option<String> {
    Some("DescReleaseDate".to_string())
}

fn default_max_connections() -> u32 {
    1
}

fn default_whatsapp_delay() -> u64 {
    1200
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Path::new("config"))
    }

    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let dir = config_dir.to_string_lossy();

        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/default", dir)))
            .add_source(File::with_name(&format!("{}/{}", dir, run_mode)).required(false))
            // Local overrides (ignored by git)
            .add_source(File::with_name(&format!("{}/local", dir)).required(false))
            .add_source(
                Environment::with_prefix("CATALOG_WATCHER")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("catalog.urls")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        if config.browser.chrome_path.is_none() {
            config.browser.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Validate::validate(self).map_err(|e| ConfigError::Message(e.to_string()))?;

        for url in &self.catalog.urls {
            if Url::parse(url).is_err() {
                return Err(ConfigError::Message(format!("Invalid catalog URL: {}", url)));
            }
        }

        if self.retry.growth_factor < 1.0 {
            return Err(ConfigError::Message("Retry growth_factor must be at least 1".into()));
        }

        let threshold = self.rules.price_drop_threshold_percent;
        if threshold <= 0.0 || threshold > 100.0 {
            return Err(ConfigError::Message(
                "Price drop threshold must be between 0 and 100 percent".into(),
            ));
        }

        if self.rules.early_release_cutoff_hour > 23 {
            return Err(ConfigError::Message("Early release cutoff hour must be at most 23".into()));
        }

        if let Some(whatsapp) = &self.notifications.whatsapp {
            if Url::parse(&whatsapp.api_url).is_err() {
                return Err(ConfigError::Message("Invalid WhatsApp api_url".into()));
            }
        }

        if let Some(discord) = &self.notifications.discord {
            if !discord.webhook_url.starts_with("https://discord.com/api/webhooks/") {
                return Err(ConfigError::Message("Invalid Discord webhook URL format".into()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        catalog: CatalogConfig {
            urls: vec!["https://shop.example.com/nav/shoes".to_string()],
            sorting: default_sorting(),
        },
        site: SiteConfig {
            source: "nike".to_string(),
            pagination_selector: "#section-pagination ol a:last-child".to_string(),
            grid_selector: "[data-testid=\"products-search-3\"]".to_string(),
            item_anchor_selector: "[data-testid=\"products-search-3\"] a".to_string(),
            modal_selectors: vec!["button#adopt-accept-all-button".to_string()],
            payload_expression: "window.__NEXT_DATA__?.props?.pageProps?.product".to_string(),
        },
        browser: BrowserConfig {
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            navigation_timeout_secs: 60,
            chrome_path: None,
            user_agents: vec!["Mozilla/5.0 (Windows NT 10.0; Win64; x64)".to_string()],
        },
        retry: RetryConfig {
            max_attempts: 5,
            base_delay_ms: 3000,
            growth_factor: 5.0,
        },
        rules: RulesConfig {
            price_drop_threshold_percent: 30.0,
            early_release_cutoff_hour: 10,
        },
        store: StoreConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        notifications: NotificationsConfig::default(),
        logging: LoggingConfig::default(),
    }
}
