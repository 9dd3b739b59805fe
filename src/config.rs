use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use reqwest::Url;
use serde::Deserialize;

use crate::cache::EvictionPolicy;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Scheme and authority of the WebDAV server, e.g. `http://nas:8080`.
    pub server_base_uri: String,
    /// Folder path under the server, e.g. `/Public/Slideshow`.
    pub image_folder: String,
    /// Delay before the first photo is shown.
    #[serde(with = "humantime_serde")]
    pub first_advance: Duration,
    /// Period between photos after the first.
    #[serde(with = "humantime_serde")]
    pub advance_interval: Duration,
    /// How often the clock label is re-evaluated.
    #[serde(with = "humantime_serde")]
    pub clock_interval: Duration,
    /// Upper bound for any single HTTP request.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Capacity of the channel feeding the viewer.
    pub viewer_channel_capacity: usize,
    pub cache: CacheOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(mut self) -> Result<Self> {
        let trimmed = self.server_base_uri.trim_end_matches('/').len();
        self.server_base_uri.truncate(trimmed);
        ensure!(
            !self.server_base_uri.is_empty(),
            "server-base-uri must be set"
        );
        let base = Url::parse(&self.server_base_uri)
            .with_context(|| format!("server-base-uri {:?} is not a URL", self.server_base_uri))?;
        ensure!(
            matches!(base.scheme(), "http" | "https"),
            "server-base-uri must use http or https"
        );
        ensure!(
            self.image_folder.starts_with('/'),
            "image-folder must start with '/'"
        );
        ensure!(
            !self.advance_interval.is_zero(),
            "advance-interval must be greater than zero"
        );
        ensure!(
            !self.clock_interval.is_zero(),
            "clock-interval must be greater than zero"
        );
        ensure!(
            !self.request_timeout.is_zero(),
            "request-timeout must be greater than zero"
        );
        ensure!(
            self.viewer_channel_capacity > 0,
            "viewer-channel-capacity must be greater than zero"
        );
        self.cache.policy().context("invalid cache configuration")?;
        Ok(self)
    }

    /// Absolute URL of the listed folder.
    pub fn folder_url(&self) -> String {
        format!("{}{}", self.server_base_uri, self.image_folder)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            server_base_uri: String::new(),
            image_folder: String::new(),
            first_advance: Duration::from_secs(8),
            advance_interval: Duration::from_secs(18),
            clock_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            viewer_channel_capacity: 4,
            cache: CacheOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CacheOptions {
    /// Minimum time between two eviction sweeps.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Photos not shown for this long are evicted.
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,
}

impl CacheOptions {
    pub fn policy(&self) -> Result<EvictionPolicy> {
        ensure!(
            !self.max_age.is_zero(),
            "cache.max-age must be greater than zero"
        );
        Ok(EvictionPolicy {
            sweep_interval: chrono::Duration::from_std(self.sweep_interval)
                .context("cache.sweep-interval out of range")?,
            max_age: chrono::Duration::from_std(self.max_age)
                .context("cache.max-age out of range")?,
        })
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(15 * 60),
            max_age: Duration::from_secs(4 * 60 * 60),
        }
    }
}
