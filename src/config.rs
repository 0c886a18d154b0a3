use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::stats::QUOTA_PER_UNIT;
use crate::types::DEFAULT_PAGE_SIZE;
use crate::{Result, UsageLensError};

/// Connection settings for one gateway console, loaded from TOML with
/// optional `USAGE_LENS_*` environment overrides on top.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    /// Page size for the first log fetch. Non-positive values fall back to
    /// the built-in default.
    #[serde(default)]
    pub default_page_size: Option<u32>,
    /// Tokens per displayed currency unit.
    #[serde(default)]
    pub quota_per_unit: Option<u64>,
    /// Extra headers attached to every request, for deployments sitting
    /// behind an access proxy.
    #[serde(default)]
    pub http_headers: BTreeMap<String, String>,
}

impl ConsoleConfig {
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Applies `USAGE_LENS_*` overrides through the provided lookup, which in
    /// production is the process environment.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = non_empty(lookup("USAGE_LENS_BASE_URL")) {
            self.base_url = Some(value);
        }
        if let Some(size) = non_empty(lookup("USAGE_LENS_PAGE_SIZE"))
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|size| *size > 0)
        {
            self.default_page_size = Some(size);
        }
        if let Some(rate) = non_empty(lookup("USAGE_LENS_QUOTA_PER_UNIT"))
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|rate| *rate > 0)
        {
            self.quota_per_unit = Some(rate);
        }
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn page_size(&self) -> u32 {
        self.default_page_size
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn quota_per_unit(&self) -> u64 {
        self.quota_per_unit
            .filter(|rate| *rate > 0)
            .unwrap_or(QUOTA_PER_UNIT)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn header_map_from_pairs(headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut out = HeaderMap::new();
    for (name, value) in headers {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
            UsageLensError::InvalidResponse(format!("invalid http header name {name:?}: {err}"))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|err| {
            UsageLensError::InvalidResponse(format!(
                "invalid http header value for {name:?}: {err}"
            ))
        })?;
        out.insert(header_name, header_value);
    }
    Ok(out)
}

pub(crate) fn build_http_client(
    timeout: Duration,
    headers: &BTreeMap<String, String>,
) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(timeout);
    if !headers.is_empty() {
        builder = builder.default_headers(header_map_from_pairs(headers)?);
    }
    builder.build().map_err(UsageLensError::Http)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_full_config() -> Result<()> {
        let config = ConsoleConfig::parse(
            r#"
            base_url = "https://relay.example.com"
            default_page_size = 20
            quota_per_unit = 250000

            [http_headers]
            "x-access-token" = "cf-token"
            "#,
        )?;
        assert_eq!(config.base_url.as_deref(), Some("https://relay.example.com"));
        assert_eq!(config.page_size(), 20);
        assert_eq!(config.quota_per_unit(), 250_000);
        assert_eq!(
            config.http_headers.get("x-access-token").map(String::as_str),
            Some("cf-token")
        );
        Ok(())
    }

    #[test]
    fn empty_config_uses_built_in_defaults() -> Result<()> {
        let config = ConsoleConfig::parse("")?;
        assert_eq!(config.base_url, None);
        assert_eq!(config.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(config.quota_per_unit(), QUOTA_PER_UNIT);
        Ok(())
    }

    #[test]
    fn non_positive_values_fall_back() -> Result<()> {
        let config = ConsoleConfig::parse("default_page_size = 0\nquota_per_unit = 0\n")?;
        assert_eq!(config.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(config.quota_per_unit(), QUOTA_PER_UNIT);
        Ok(())
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = ConsoleConfig {
            base_url: Some("https://old.example.com".to_string()),
            ..ConsoleConfig::default()
        };
        let env = BTreeMap::from([
            ("USAGE_LENS_BASE_URL".to_string(), "https://new.example.com".to_string()),
            ("USAGE_LENS_PAGE_SIZE".to_string(), "50".to_string()),
            ("USAGE_LENS_QUOTA_PER_UNIT".to_string(), "not a number".to_string()),
        ]);
        config.apply_overrides(|key| env.get(key).cloned());

        assert_eq!(config.base_url.as_deref(), Some("https://new.example.com"));
        assert_eq!(config.default_page_size, Some(50));
        assert_eq!(config.quota_per_unit, None);
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let mut config = ConsoleConfig {
            base_url: Some("https://keep.example.com".to_string()),
            ..ConsoleConfig::default()
        };
        let env = BTreeMap::from([
            ("USAGE_LENS_BASE_URL".to_string(), "   ".to_string()),
            ("USAGE_LENS_PAGE_SIZE".to_string(), "0".to_string()),
        ]);
        config.apply_overrides(|key| env.get(key).cloned());

        assert_eq!(config.base_url.as_deref(), Some("https://keep.example.com"));
        assert_eq!(config.default_page_size, None);
    }

    #[test]
    fn loads_from_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "base_url = \"https://relay.example.com\"")?;
        let config = ConsoleConfig::load(file.path())?;
        assert_eq!(config.base_url.as_deref(), Some("https://relay.example.com"));
        Ok(())
    }

    #[test]
    fn rejects_bad_header_names() {
        let headers = BTreeMap::from([("bad header".to_string(), "value".to_string())]);
        let err = header_map_from_pairs(&headers).unwrap_err();
        assert!(matches!(err, UsageLensError::InvalidResponse(_)));
    }

    #[test]
    fn builds_client_with_default_headers() -> Result<()> {
        let headers = BTreeMap::from([("x-access-token".to_string(), "cf-token".to_string())]);
        build_http_client(Duration::from_secs(5), &headers)?;
        Ok(())
    }
}
