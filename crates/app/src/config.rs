//! Runtime configuration from `CLUB_*` environment variables.
//!
//! Every setting has a default so the server starts with no configuration.
//! Values that fail to parse are logged and replaced by the default.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::http::HeaderValue;
use chrono::Duration;

use api::ApiConfig;
use services::ServiceSettings;
use services::auth_service::DEFAULT_SESSION_TTL_HOURS;
use services::image_store::ImageHostConfig;

pub const DEFAULT_DB_URL: &str = "sqlite://club.sqlite3";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Env: `CLUB_DB_URL`. Run through [`normalize_sqlite_url`] before use.
    pub db_url: String,

    /// Env: `CLUB_HTTP_ADDR`. Default `127.0.0.1:8080`.
    pub http_addr: SocketAddr,

    /// Env: `CLUB_SESSION_TTL_HOURS`. Default one week.
    pub session_ttl_hours: i64,

    /// Env: `CLUB_IMAGE_HOST_URL` + `CLUB_IMAGE_HOST_KEY`. Both must be set.
    pub image_host: Option<ImageHostConfig>,

    /// Env: `CLUB_CORS_ORIGIN`. Unset allows any origin.
    pub cors_origin: Option<HeaderValue>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.to_string(),
            http_addr: ([127, 0, 0, 1], 8080).into(),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            image_host: None,
            cors_origin: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("CLUB_DB_URL").filter(|v| !v.trim().is_empty()) {
            config.db_url = url;
        }

        if let Some(addr) = lookup("CLUB_HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid CLUB_HTTP_ADDR, using default"),
            }
        }

        if let Some(raw) = lookup("CLUB_SESSION_TTL_HOURS") {
            match raw.parse::<i64>() {
                Ok(hours) if hours > 0 => config.session_ttl_hours = hours,
                _ => tracing::warn!(
                    value = %raw,
                    "Invalid CLUB_SESSION_TTL_HOURS, using default"
                ),
            }
        }

        let host_url = lookup("CLUB_IMAGE_HOST_URL").filter(|v| !v.is_empty());
        let host_key = lookup("CLUB_IMAGE_HOST_KEY").filter(|v| !v.is_empty());
        match (host_url, host_key) {
            (Some(base_url), Some(api_key)) => {
                config.image_host = Some(ImageHostConfig { base_url, api_key });
            }
            (None, None) => {}
            _ => tracing::warn!(
                "CLUB_IMAGE_HOST_URL and CLUB_IMAGE_HOST_KEY must be set together; image cleanup disabled"
            ),
        }

        if let Some(origin) = lookup("CLUB_CORS_ORIGIN").filter(|v| !v.is_empty() && v != "*") {
            match HeaderValue::from_str(&origin) {
                Ok(value) => config.cors_origin = Some(value),
                Err(_) => tracing::warn!(value = %origin, "Invalid CLUB_CORS_ORIGIN, allowing any"),
            }
        }

        config
    }

    #[must_use]
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            session_ttl: Duration::hours(self.session_ttl_hours),
            image_host: self.image_host.clone(),
        }
    }

    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            cors_origin: self.cors_origin.clone(),
        }
    }
}

/// Turn a `sqlite:` URL or bare path into an absolute `sqlite://` URL.
/// In-memory URLs pass through untouched.
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.contains("mode=memory") {
        return trimmed.to_string();
    }

    let path_str = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_env() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.db_url, DEFAULT_DB_URL);
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 8080).into());
        assert_eq!(config.session_ttl_hours, 168);
        assert!(config.image_host.is_none());
        assert!(config.cors_origin.is_none());
    }

    #[test]
    fn env_values_override_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("CLUB_DB_URL", "sqlite:///var/lib/club/club.db"),
            ("CLUB_HTTP_ADDR", "0.0.0.0:9000"),
            ("CLUB_SESSION_TTL_HOURS", "24"),
            ("CLUB_IMAGE_HOST_URL", "https://images.example.com/api"),
            ("CLUB_IMAGE_HOST_KEY", "k3y"),
            ("CLUB_CORS_ORIGIN", "https://club.example.com"),
        ]));
        assert_eq!(config.db_url, "sqlite:///var/lib/club/club.db");
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 9000).into());
        assert_eq!(config.service_settings().session_ttl, Duration::hours(24));
        let host = config.image_host.as_ref().unwrap();
        assert_eq!(host.base_url, "https://images.example.com/api");
        assert_eq!(
            config.api_config().cors_origin.unwrap(),
            "https://club.example.com"
        );
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("CLUB_HTTP_ADDR", "not-an-addr"),
            ("CLUB_SESSION_TTL_HOURS", "-3"),
            ("CLUB_IMAGE_HOST_URL", "https://images.example.com"),
            ("CLUB_CORS_ORIGIN", "*"),
        ]));
        assert_eq!(config.http_addr, AppConfig::default().http_addr);
        assert_eq!(config.session_ttl_hours, DEFAULT_SESSION_TTL_HOURS);
        assert!(config.image_host.is_none());
        assert!(config.cors_origin.is_none());
    }

    #[test]
    fn sqlite_urls_become_absolute() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:/tmp/club.db"),
            "sqlite:///tmp/club.db"
        );
        let relative = normalize_sqlite_url("sqlite:club.db");
        assert!(relative.starts_with("sqlite:///"));
        assert!(relative.ends_with("/club.db"));
    }
}
