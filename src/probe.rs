use crate::error::AppError;
use async_trait::async_trait;
use std::time::Duration;

/// Prefix `https://` unless the input already names http or https
/// (case-insensitive).
pub fn normalize_url(input: &str) -> String {
    let input = input.trim();
    let has_scheme = ["http://", "https://"].iter().any(|scheme| {
        input
            .get(..scheme.len())
            .map(|prefix| prefix.eq_ignore_ascii_case(scheme))
            .unwrap_or(false)
    });

    if has_scheme {
        input.to_owned()
    } else {
        format!("https://{input}")
    }
}

/// Parse a normalized URL into the exact string that is both checked and
/// stored.
///
/// Parsing strips embedded tabs and newlines, punycodes the host and
/// percent-encodes the rest, so the result is always usable as a `Location`
/// header. The root slash the parser appends to a bare host is dropped again
/// unless the input had it.
pub fn parse_target(normalized: &str) -> Result<String, AppError> {
    let url = reqwest::Url::parse(normalized).map_err(|e| {
        tracing::info!("Rejecting unparsable URL '{}': {}", normalized.escape_debug(), e);
        AppError::Validation("URL is invalid or unreachable".into())
    })?;

    if !url.has_host() {
        return Err(AppError::Validation("URL is invalid or unreachable".into()));
    }

    let bare_root = url.path() == "/"
        && url.query().is_none()
        && url.fragment().is_none()
        && !normalized.ends_with('/');

    let mut target = String::from(url);
    if bare_root {
        target.pop();
    }

    Ok(target)
}

/// Checks that a candidate URL currently answers.
#[async_trait]
pub trait UrlProbe: Send + Sync {
    /// `Ok(())` only when the target responded with exactly 200.
    async fn check(&self, url: &str) -> Result<(), AppError>;
}

/// Liveness check over HTTP: one GET, only the status code is inspected.
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("snip/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl UrlProbe for HttpProbe {
    async fn check(&self, url: &str) -> Result<(), AppError> {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::info!("Liveness check failed for '{}': {}", url, e);
                return Err(AppError::Validation("URL is invalid or unreachable".into()));
            }
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::info!("Liveness check for '{}' returned {}", url, status);
            return Err(AppError::Validation(format!(
                "URL is invalid (Status: {})",
                status.as_u16()
            )));
        }

        Ok(())
    }
}
