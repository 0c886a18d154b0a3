use serde::{Deserialize, Serialize};

/// Page size used for the usage log when the caller has not configured one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Page sizes surfaced by pagination controls.
pub const PAGE_SIZE_OPTIONS: [u32; 4] = [10, 20, 50, 100];

/// Quota snapshot for a single token as reported by the gateway.
///
/// All fields are defaulted so a sparse or older server payload still
/// deserializes. Amounts are raw token counts, not currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UsageSummary {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub unlimited_quota: bool,
    #[serde(default)]
    pub total_granted: i64,
    #[serde(default)]
    pub total_used: i64,
    #[serde(default)]
    pub total_available: i64,
    /// Unix seconds; non-positive means the server did not report an expiry.
    #[serde(default)]
    pub expires_at: i64,
}

/// One row of the usage log, an immutable snapshot from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LogEntry {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(rename = "type", default)]
    pub kind: i64,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub quota: i64,
    #[serde(default)]
    pub ip: Option<String>,
}

impl LogEntry {
    pub fn kind(&self) -> Option<LogKind> {
        LogKind::from_code(self.kind)
    }
}

/// Well-known usage log record categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Recharge,
    Consume,
    Admin,
    System,
    Error,
}

impl LogKind {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Recharge),
            2 => Some(Self::Consume),
            3 => Some(Self::Admin),
            4 => Some(Self::System),
            5 => Some(Self::Error),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Recharge => "recharge",
            Self::Consume => "consume",
            Self::Admin => "admin",
            Self::System => "system",
            Self::Error => "error",
        }
    }
}

/// Decoded payload of one log fetch, before pagination state is committed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenLogs {
    pub entries: Vec<LogEntry>,
    /// Record count reported by the server, after consulting the top-level
    /// total and then the nested pagination total. 0 means the server
    /// reported none; callers fall back to the page length.
    pub reported_total: u64,
}

/// A log entry paired with the key a list view renders it under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRow {
    pub key: String,
    pub entry: LogEntry,
}

impl LogRow {
    /// Builds the display key from the entry's identity fields plus its
    /// position. `index` is the row's position within the page, `offset` is
    /// `(page - 1) * page_size`. Rows with identical ids and timestamps still
    /// get distinct keys through the position suffix.
    pub fn new(entry: LogEntry, index: usize, offset: u64) -> Self {
        let id = match entry.id {
            Some(id) => id.to_string(),
            None => "row".to_string(),
        };
        let created = match entry.created_at {
            Some(created_at) => created_at.to_string(),
            None => index.to_string(),
        };
        let key = format!("{id}-{created}-{}", offset + index as u64);
        Self { key, entry }
    }
}

/// The committed state of the usage log view.
///
/// `page` and `page_size` always reflect the last successful fetch; a failed
/// fetch clears `rows` and `total` but leaves them alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogPage {
    pub rows: Vec<LogRow>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

impl LogPage {
    pub fn empty(page_size: u32) -> Self {
        Self {
            rows: Vec::new(),
            page: 1,
            page_size,
            total: 0,
        }
    }
}

impl Default for LogPage {
    fn default() -> Self {
        Self::empty(DEFAULT_PAGE_SIZE)
    }
}

/// Per-channel error text of the last query. Empty string means no error.
///
/// The two channels stay separate so a caller can tell which half of a query
/// failed; they are joined only for banner display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct QueryOutcome {
    pub usage_error: String,
    pub logs_error: String,
}

impl QueryOutcome {
    pub fn is_clean(&self) -> bool {
        self.usage_error.is_empty() && self.logs_error.is_empty()
    }

    /// Joins the non-empty channels for a single-line banner.
    pub fn banner(&self) -> String {
        let mut parts = Vec::new();
        if !self.usage_error.is_empty() {
            parts.push(self.usage_error.as_str());
        }
        if !self.logs_error.is_empty() {
            parts.push(self.logs_error.as_str());
        }
        parts.join("; ")
    }
}
