use anyhow::{Context, Result};
use std::{str::FromStr, time::Duration};

/// What the redirect endpoint does when the visit counter could not be updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatsFailurePolicy {
    /// Log the lost visit and redirect anyway.
    #[default]
    Redirect,
    /// Answer with a server error instead of redirecting.
    Fail,
}

impl FromStr for StatsFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redirect" => Ok(Self::Redirect),
            "fail" => Ok(Self::Fail),
            other => anyhow::bail!("unknown stats failure policy '{other}' (expected 'redirect' or 'fail')"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite connection string, e.g. "sqlite:./snip.db"
    pub database_url: String,

    /// Host to bind the HTTP server to, e.g. "0.0.0.0"
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Public base URL used when printing short links, e.g. "https://go.example.com"
    /// Never has a trailing slash.
    pub base_url: String,

    /// Timeout for the liveness GET issued before a URL is shortened.
    pub probe_timeout: Duration,

    pub stats_failure_policy: StatsFailurePolicy,
}

impl AppConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = var("PORT")
            .unwrap_or_else(|| "3000".into())
            .parse::<u16>()
            .context("PORT must be a valid port number (1–65535)")?;

        let base_url = var("BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_owned();

        let probe_timeout_secs = var("PROBE_TIMEOUT_SECS")
            .unwrap_or_else(|| "5".into())
            .parse::<u64>()
            .context("PROBE_TIMEOUT_SECS must be a whole number of seconds")?;
        if probe_timeout_secs == 0 {
            anyhow::bail!("PROBE_TIMEOUT_SECS must be greater than zero");
        }

        let stats_failure_policy = match var("STATS_FAILURE_POLICY") {
            Some(raw) => raw
                .parse::<StatsFailurePolicy>()
                .context("invalid STATS_FAILURE_POLICY")?,
            None => StatsFailurePolicy::default(),
        };

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| "sqlite:./snip.db".into()),
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            base_url,
            probe_timeout: Duration::from_secs(probe_timeout_secs),
            stats_failure_policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let config = load(&[]).unwrap();
        assert_eq!(config.database_url, "sqlite:./snip.db");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
        assert_eq!(config.stats_failure_policy, StatsFailurePolicy::Redirect);
    }

    #[test]
    fn base_url_loses_trailing_slash() {
        let config = load(&[("BASE_URL", "https://go.example.com/")]).unwrap();
        assert_eq!(config.base_url, "https://go.example.com");
    }

    #[test]
    fn rejects_bad_port_and_zero_timeout() {
        assert!(load(&[("PORT", "not-a-port")]).is_err());
        assert!(load(&[("PROBE_TIMEOUT_SECS", "0")]).is_err());
    }

    #[test]
    fn parses_stats_failure_policy() {
        let config = load(&[("STATS_FAILURE_POLICY", "FAIL")]).unwrap();
        assert_eq!(config.stats_failure_policy, StatsFailurePolicy::Fail);
        assert!(load(&[("STATS_FAILURE_POLICY", "sometimes")]).is_err());
    }
}
