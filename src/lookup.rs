use std::cmp::Reverse;

use serde_json::Value;

use crate::client::TokenUsageApi;
use crate::types::{DEFAULT_PAGE_SIZE, LogPage, LogRow, QueryOutcome, TokenLogs, UsageSummary};
use crate::{Result, UsageLensError};

/// Shown on the usage channel when a query is submitted with nothing to
/// look up.
pub const TOKEN_REQUIRED_MESSAGE: &str = "please enter a token";
/// Channel fallbacks for failures that carry no usable message of their own.
pub const USAGE_FALLBACK_MESSAGE: &str = "query failed";
pub const LOGS_FALLBACK_MESSAGE: &str = "failed to fetch usage logs";

/// Self-service token lookup state machine.
///
/// Holds the view state of one lookup surface: which token the data views
/// reflect, the latest summary, the committed log page, and one error string
/// per fetch channel. All mutation goes through [`submit`](Self::submit) and
/// [`paginate`](Self::paginate); the exclusive borrow gives the state a
/// single writer at any instant.
pub struct UsageLookup<A> {
    api: A,
    default_page_size: u32,
    queried: bool,
    queried_token: String,
    summary: Option<UsageSummary>,
    logs: LogPage,
    outcome: QueryOutcome,
}

impl<A> UsageLookup<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            default_page_size: DEFAULT_PAGE_SIZE,
            queried: false,
            queried_token: String::new(),
            summary: None,
            logs: LogPage::default(),
            outcome: QueryOutcome::default(),
        }
    }

    /// Non-positive sizes are ignored.
    pub fn with_default_page_size(mut self, page_size: u32) -> Self {
        if page_size > 0 {
            self.default_page_size = page_size;
            self.logs.page_size = page_size;
        }
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// True once a non-empty token has been submitted. The views below then
    /// reflect [`queried_token`](Self::queried_token) until the next
    /// submission.
    pub fn queried(&self) -> bool {
        self.queried
    }

    pub fn queried_token(&self) -> &str {
        &self.queried_token
    }

    pub fn summary(&self) -> Option<&UsageSummary> {
        self.summary.as_ref()
    }

    pub fn logs(&self) -> &LogPage {
        &self.logs
    }

    pub fn outcome(&self) -> &QueryOutcome {
        &self.outcome
    }

    fn normalized_size(&self, requested: u32) -> u32 {
        if requested > 0 {
            requested
        } else if self.logs.page_size > 0 {
            self.logs.page_size
        } else {
            self.default_page_size
        }
    }

    fn reset(&mut self) {
        self.queried = false;
        self.queried_token.clear();
        self.summary = None;
        self.logs = LogPage::empty(self.default_page_size);
    }
}

impl<A: TokenUsageApi> UsageLookup<A> {
    /// Submits a lookup for `raw_input`.
    ///
    /// Whitespace-only input resets the view without touching the network
    /// and flags the usage channel. Otherwise both fetches run concurrently
    /// and the error channels are published together once both settle, so a
    /// partial failure still shows the half that succeeded.
    pub async fn submit(&mut self, raw_input: &str) {
        let token = raw_input.trim();
        if token.is_empty() {
            self.reset();
            self.outcome = QueryOutcome {
                usage_error: TOKEN_REQUIRED_MESSAGE.to_string(),
                logs_error: String::new(),
            };
            return;
        }

        let token = token.to_string();
        let page_size = self.normalized_size(0);
        self.queried = true;
        self.queried_token = token.clone();
        self.outcome = QueryOutcome::default();

        tracing::debug!(page_size, "submitting token lookup");
        let (usage_result, logs_result) = tokio::join!(
            self.api.fetch_usage(&token),
            self.api.fetch_logs(&token, 1, page_size),
        );
        self.outcome = QueryOutcome {
            usage_error: self.commit_usage(usage_result),
            logs_error: self.commit_logs(logs_result, 1, page_size),
        };
    }

    /// Applies a pagination event. Before any query has been submitted this
    /// only moves the local page state; afterwards it refetches under the
    /// queried token.
    pub async fn paginate(&mut self, page: u32, page_size: u32) {
        let page = normalized_page(page);
        let page_size = self.normalized_size(page_size);
        if self.queried_token.is_empty() {
            self.logs.page = page;
            self.logs.page_size = page_size;
            return;
        }

        let token = self.queried_token.clone();
        let result = self.api.fetch_logs(&token, page, page_size).await;
        self.outcome.logs_error = self.commit_logs(result, page, page_size);
    }

    pub async fn change_page(&mut self, page: u32) {
        self.paginate(page, self.logs.page_size).await;
    }

    /// Changing page size always restarts from page 1; the old page offset
    /// is meaningless at a new size.
    pub async fn change_page_size(&mut self, page_size: u32) {
        self.paginate(1, page_size).await;
    }

    fn commit_usage(&mut self, result: Result<Option<UsageSummary>>) -> String {
        match result {
            Ok(summary) => {
                self.summary = summary;
                String::new()
            }
            Err(err) => {
                self.summary = None;
                error_text(&err, USAGE_FALLBACK_MESSAGE)
            }
        }
    }

    fn commit_logs(&mut self, result: Result<TokenLogs>, page: u32, page_size: u32) -> String {
        match result {
            Ok(payload) => {
                let mut entries = payload.entries;
                entries.sort_by_key(|entry| Reverse(entry.created_at.unwrap_or(0)));
                let offset = u64::from(page - 1) * u64::from(page_size);
                let rows = entries
                    .into_iter()
                    .enumerate()
                    .map(|(index, entry)| LogRow::new(entry, index, offset))
                    .collect::<Vec<_>>();
                let total = if payload.reported_total > 0 {
                    payload.reported_total
                } else {
                    rows.len() as u64
                };
                self.logs = LogPage {
                    rows,
                    page,
                    page_size,
                    total,
                };
                String::new()
            }
            Err(err) => {
                // Keep page and page_size: they are the retry target.
                self.logs.rows.clear();
                self.logs.total = 0;
                error_text(&err, LOGS_FALLBACK_MESSAGE)
            }
        }
    }
}

fn normalized_page(page: u32) -> u32 {
    page.max(1)
}

/// Extracts display text from a failure: the server's own message when one
/// exists, then a message/error field from an API body, then the error's
/// display form, then the channel fallback.
fn error_text(err: &UsageLensError, fallback: &str) -> String {
    let text = match err {
        UsageLensError::Rejected { message } => message.clone(),
        UsageLensError::Api { body, .. } => body_message(body).unwrap_or_else(|| err.to_string()),
        other => other.to_string(),
    };
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text
    }
}

fn body_message(body: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(body).ok()?;
    for field in ["message", "error"] {
        if let Some(text) = value.get(field).and_then(Value::as_str) {
            let text = text.trim();
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}
