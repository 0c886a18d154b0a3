use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::config::{ConsoleConfig, build_http_client};
use crate::types::{LogEntry, TokenLogs, UsageSummary};
use crate::{Result, UsageLensError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport seam between the lookup state machine and the gateway.
///
/// The token travels differently per endpoint: `fetch_usage` sends it as a
/// bearer credential, `fetch_logs` sends it as a plain lookup key in the
/// query string.
#[async_trait]
pub trait TokenUsageApi: Send + Sync {
    /// `Ok(None)` means the gateway accepted the request but attached no
    /// summary payload.
    async fn fetch_usage(&self, token: &str) -> Result<Option<UsageSummary>>;

    async fn fetch_logs(&self, token: &str, page: u32, page_size: u32) -> Result<TokenLogs>;
}

/// HTTP client for a gateway's self-service token lookup endpoints.
#[derive(Clone)]
pub struct ConsoleClient {
    http: reqwest::Client,
    base_url: String,
}

impl ConsoleClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn from_config(config: &ConsoleConfig) -> Result<Self> {
        let base_url = config.base_url.as_deref().ok_or_else(|| {
            UsageLensError::InvalidResponse("console base_url is missing".to_string())
        })?;
        let http = build_http_client(DEFAULT_TIMEOUT, &config.http_headers)?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    fn usage_url(&self) -> String {
        format!("{}/api/usage/token", self.base_url.trim_end_matches('/'))
    }

    fn logs_url(&self) -> String {
        format!("{}/api/log/token", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TokenUsageApi for ConsoleClient {
    async fn fetch_usage(&self, token: &str) -> Result<Option<UsageSummary>> {
        #[derive(Debug, Deserialize)]
        struct UsageEnvelope {
            #[serde(default)]
            code: Value,
            #[serde(default)]
            message: Option<String>,
            #[serde(default)]
            data: Option<UsageSummary>,
        }

        tracing::debug!("fetching token usage summary");
        let response = self
            .http
            .get(self.usage_url())
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UsageLensError::Api { status, body });
        }

        let envelope = response.json::<UsageEnvelope>().await?;
        if !is_truthy(&envelope.code) {
            return Err(UsageLensError::Rejected {
                message: envelope.message.unwrap_or_default(),
            });
        }
        Ok(envelope.data)
    }

    async fn fetch_logs(&self, token: &str, page: u32, page_size: u32) -> Result<TokenLogs> {
        #[derive(Debug, Deserialize)]
        struct LogsEnvelope {
            #[serde(default)]
            success: bool,
            #[serde(default)]
            message: Option<String>,
            #[serde(default)]
            data: Value,
            #[serde(default)]
            total: Value,
            #[serde(default)]
            pagination: Option<Pagination>,
        }

        #[derive(Debug, Deserialize, Default)]
        struct Pagination {
            #[serde(default)]
            total: Value,
        }

        tracing::debug!(page, page_size, "fetching usage log page");
        let page_param = page.to_string();
        let size_param = page_size.to_string();
        let response = self
            .http
            .get(self.logs_url())
            .query(&[
                ("key", token),
                ("p", page_param.as_str()),
                ("size", size_param.as_str()),
                ("order", "desc"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UsageLensError::Api { status, body });
        }

        let envelope = response.json::<LogsEnvelope>().await?;
        if !envelope.success {
            return Err(UsageLensError::Rejected {
                message: envelope.message.unwrap_or_default(),
            });
        }

        // Per-entry decode failures degrade to a default entry rather than
        // poisoning the whole page.
        let entries = match envelope.data {
            Value::Array(items) => items
                .into_iter()
                .map(|item| serde_json::from_value::<LogEntry>(item).unwrap_or_default())
                .collect(),
            _ => Vec::new(),
        };

        let top_total = coerce_total(&envelope.total);
        let reported_total = if top_total > 0 {
            top_total
        } else {
            envelope
                .pagination
                .map(|pagination| coerce_total(&pagination.total))
                .unwrap_or(0)
        };

        Ok(TokenLogs {
            entries,
            reported_total,
        })
    }
}

/// JSON truthiness for the usage envelope's `code` field, which gateways
/// populate with booleans, numbers, or strings depending on version.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Coerces a server-reported record count that may arrive as a number or a
/// numeric string. Anything non-numeric or non-positive maps to 0 so callers
/// can chain fallbacks.
fn coerce_total(value: &Value) -> u64 {
    let number = match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(text) => text.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if number.is_finite() && number > 0.0 {
        number as u64
    } else {
        0
    }
}
