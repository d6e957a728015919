//! Process configuration read from environment variables.

use std::time::Duration;

use thiserror::Error;

use bilio_infra::notify::SmtpSettings;
use bilio_observability::{LogConfig, LogFormat};
use bilio_promotions::DEFAULT_WAITLIST_DOMAIN;

const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value `{value}`: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `development`, `production`, ...
    pub env: String,
    pub port: u16,
    /// Absent: ledger kept in memory.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub log: LogConfig,
    pub request_timeout: Duration,
    /// Absent (development only): notifications are only logged.
    pub smtp: Option<SmtpSettings>,
    pub waitlist_domain: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let env = var("APP_ENV").unwrap_or_else(|| "development".to_string());
        let development = env.eq_ignore_ascii_case("development");

        let port = parse_or("APP_PORT", var("APP_PORT"), 8080u16)?;

        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None if development => DEV_JWT_SECRET.to_string(),
            None => return Err(ConfigError::Missing("JWT_SECRET")),
        };

        let format = match var("APP_LOG_FORMAT") {
            Some(raw) => raw.parse::<LogFormat>().map_err(|e| ConfigError::Invalid {
                key: "APP_LOG_FORMAT",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None if development => LogFormat::Pretty,
            None => LogFormat::Json,
        };
        let log = LogConfig {
            level: var("APP_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            format,
        };

        let timeout_secs = parse_or("APP_REQUEST_TIMEOUT_SECS", var("APP_REQUEST_TIMEOUT_SECS"), 30u64)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "APP_REQUEST_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let smtp = match (var("EMAIL_USER"), var("EMAIL_PASSWORD")) {
            (Some(username), Some(password)) => Some(SmtpSettings {
                host: var("APP_SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
                port: parse_or("APP_SMTP_PORT", var("APP_SMTP_PORT"), DEFAULT_SMTP_PORT)?,
                from: var("APP_EMAIL_FROM").unwrap_or_else(|| username.clone()),
                username,
                password,
            }),
            (None, None) if development => None,
            (None, None) => return Err(ConfigError::Missing("EMAIL_USER")),
            (Some(_), None) => return Err(ConfigError::Missing("EMAIL_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Missing("EMAIL_USER")),
        };

        Ok(Self {
            env,
            port,
            database_url: var("DATABASE_URL"),
            jwt_secret,
            log,
            request_timeout: Duration::from_secs(timeout_secs),
            smtp,
            waitlist_domain: var("APP_WAITLIST_DOMAIN")
                .map(|d| d.to_lowercase())
                .unwrap_or_else(|| DEFAULT_WAITLIST_DOMAIN.to_string()),
        })
    }

    pub fn is_development(&self) -> bool {
        self.env.eq_ignore_ascii_case("development")
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn development_defaults() {
        let cfg = config(&[]).unwrap();
        assert!(cfg.is_development());
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(cfg.log.level, "info");
        assert_eq!(cfg.log.format, LogFormat::Pretty);
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert_eq!(cfg.smtp, None);
        assert_eq!(cfg.waitlist_domain, "gmail.com");
    }

    #[test]
    fn production_requires_jwt_secret() {
        assert_eq!(
            config(&[("APP_ENV", "production")]).unwrap_err(),
            ConfigError::Missing("JWT_SECRET")
        );

        let cfg = config(&[
            ("APP_ENV", "production"),
            ("JWT_SECRET", "s3cret"),
            ("EMAIL_USER", "ops@gmail.com"),
            ("EMAIL_PASSWORD", "pw"),
        ])
        .unwrap();
        assert_eq!(cfg.jwt_secret, "s3cret");
        assert_eq!(cfg.log.format, LogFormat::Json);
    }

    #[test]
    fn log_only_notifications_are_development_only() {
        assert_eq!(
            config(&[("APP_ENV", "production"), ("JWT_SECRET", "s3cret")]).unwrap_err(),
            ConfigError::Missing("EMAIL_USER")
        );
        assert_eq!(
            config(&[("APP_ENV", "staging"), ("JWT_SECRET", "s3cret")]).unwrap_err(),
            ConfigError::Missing("EMAIL_USER")
        );
        assert_eq!(config(&[("APP_ENV", "Development")]).unwrap().smtp, None);
    }

    #[test]
    fn smtp_from_defaults_to_user() {
        let cfg = config(&[("EMAIL_USER", "ops@gmail.com"), ("EMAIL_PASSWORD", "pw")]).unwrap();
        let smtp = cfg.smtp.unwrap();
        assert_eq!(smtp.host, "smtp.gmail.com");
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.from, "ops@gmail.com");

        assert_eq!(
            config(&[("EMAIL_USER", "ops@gmail.com")]).unwrap_err(),
            ConfigError::Missing("EMAIL_PASSWORD")
        );
    }

    #[test]
    fn invalid_numbers_are_reported() {
        let err = config(&[("APP_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "APP_PORT", .. }));

        let err = config(&[("APP_REQUEST_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "APP_REQUEST_TIMEOUT_SECS", .. }));

        let err = config(&[("APP_LOG_FORMAT", "xml")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "APP_LOG_FORMAT", .. }));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = config(&[("DATABASE_URL", "  "), ("APP_WAITLIST_DOMAIN", "Example.ORG")]).unwrap();
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.waitlist_domain, "example.org");
    }
}
